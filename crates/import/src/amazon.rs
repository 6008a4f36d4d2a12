use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;

use reckon_core::{CanonicalTransaction, Money, Source};

use crate::cell::{normalize_amount, normalize_date, Cell, DateOrder};
use crate::header::HeaderLocator;
use crate::mapper::resolve_field;
use crate::workbook::Workbook;

const AMAZON_PATTERNS: &[&str] = &[
    r"\bamazon\b",
    r"\bamzn\b",
    r"amznmktplace",
    r"amazon eu",
    r"amzn digital",
    r"amazon prime",
    r"amzn prime",
];

const DETAIL_DATE_ALIASES: &[&str] = &["Order Date", "Date", "Transaction Date", "Payment Date"];
const DETAIL_AMOUNT_ALIASES: &[&str] = &[
    "Grand Total",
    "Order Total",
    "Total Charged",
    "Item Total",
    "Total",
    "Amount",
    "GBP",
];

/// Recognizes Amazon-like merchant/description text.
pub struct AmazonClassifier {
    patterns: Vec<Regex>,
}

impl Default for AmazonClassifier {
    fn default() -> Self {
        AmazonClassifier {
            patterns: AMAZON_PATTERNS
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("fixed pattern list compiles"))
                .collect(),
        }
    }
}

impl AmazonClassifier {
    pub fn looks_amazon(&self, text: &str) -> bool {
        let text = text.trim();
        !text.is_empty() && self.patterns.iter().any(|rx| rx.is_match(text))
    }
}

/// A card charge suspected of being an Amazon purchase. `source_ref` is
/// the index of the originating canonical transaction, so matched parents
/// can be suppressed from the transaction stream afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct AmazonParent {
    pub source: Source,
    pub posted_date: NaiveDate,
    /// Absolute value: refund rows match detail rows the same way.
    pub amount: Money,
    pub merchant: String,
    pub source_ref: usize,
}

/// One itemized row from an Amazon order-history sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct AmazonDetail {
    pub sheet: String,
    pub row_index: usize,
    pub detail_date: Option<NaiveDate>,
    pub amount: Option<Money>,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    /// Accepted distance between parent posting and detail date.
    pub date_tolerance_days: i64,
    /// Wider window for split-shipment group matching.
    pub group_window_days: i64,
    /// Largest detail combination tried when grouping.
    pub max_group: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            date_tolerance_days: 5,
            group_window_days: 7,
            max_group: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SingleMatch {
    pub parent: AmazonParent,
    pub detail: AmazonDetail,
}

#[derive(Debug, Clone)]
pub struct GroupMatch {
    pub parent: AmazonParent,
    pub details: Vec<AmazonDetail>,
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub matched: Vec<SingleMatch>,
    pub unmatched_parents: Vec<AmazonParent>,
    pub unmatched_details: Vec<AmazonDetail>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupedOutcome {
    pub singles: Vec<SingleMatch>,
    pub groups: Vec<GroupMatch>,
    pub unmatched_parents: Vec<AmazonParent>,
    pub unmatched_details: Vec<AmazonDetail>,
}

/// Extracts candidate parents from the canonical stream: any transaction
/// whose merchant or description text matches an Amazon pattern.
pub fn parents_from(
    txns: &[CanonicalTransaction],
    classifier: &AmazonClassifier,
) -> Vec<AmazonParent> {
    txns.iter()
        .enumerate()
        .filter(|(_, t)| classifier.looks_amazon(t.merchant_or_description()))
        .map(|(i, t)| AmazonParent {
            source: t.source,
            posted_date: t.posted_date,
            amount: t.amount.abs(),
            merchant: t.merchant_or_description().to_string(),
            source_ref: i,
        })
        .collect()
}

/// Pulls detail rows from every sheet whose name mentions Amazon and the
/// target year. Rows without an amount are skipped; dates are optional.
pub fn extract_details(wb: &Workbook, year: i32) -> Vec<AmazonDetail> {
    let locator = HeaderLocator::default();
    let groups: &[&[&str]] = &[&["date", "order", "posted"], &["total", "amount"]];
    let mut out = Vec::new();

    for name in wb.amazon_sheets(year) {
        let Some(grid) = wb.grid(name) else { continue };
        let Ok(loc) = locator.locate(grid, groups) else {
            continue;
        };
        let date_aliases: Vec<String> = DETAIL_DATE_ALIASES.iter().map(|s| s.to_string()).collect();
        let amount_aliases: Vec<String> =
            DETAIL_AMOUNT_ALIASES.iter().map(|s| s.to_string()).collect();
        let date_col = resolve_field(&loc.headers, &date_aliases);
        let Some(amount_col) = resolve_field(&loc.headers, &amount_aliases) else {
            tracing::warn!(sheet = name, "no amount column in Amazon detail sheet");
            continue;
        };

        for (row_index, row) in grid.iter().enumerate().skip(loc.row_index + 1) {
            let amount = normalize_amount(row.get(amount_col).unwrap_or(&Cell::Empty))
                .ok()
                .map(Money::abs)
                .filter(|m| !m.is_zero());
            let Some(amount) = amount else { continue };
            let detail_date = date_col
                .and_then(|i| normalize_date(row.get(i).unwrap_or(&Cell::Empty), DateOrder::DayFirst).ok());
            out.push(AmazonDetail {
                sheet: name.to_string(),
                row_index,
                detail_date,
                amount: Some(amount),
            });
        }
    }
    out
}

fn cent_key(amount: Money) -> i64 {
    amount.rounded().to_cents()
}

fn within(parent: &AmazonParent, detail_date: Option<NaiveDate>, days: i64) -> bool {
    match detail_date {
        // Undated details match at any distance.
        None => true,
        Some(d) => (d - parent.posted_date).num_days().abs() <= days,
    }
}

/// First-fit single matching: details are bucketed by cent-exact amount,
/// each parent scans its bucket in original order and takes the first
/// unconsumed candidate inside the date window. No global optimum is
/// attempted; a consumed detail is never revisited.
pub fn match_single(
    parents: &[AmazonParent],
    details: &[AmazonDetail],
    opts: &MatchOptions,
) -> MatchOutcome {
    let mut used = vec![false; details.len()];
    let index = build_amount_index(details);

    let mut matched = Vec::new();
    let mut unmatched_parents = Vec::new();

    for parent in parents {
        match take_single(parent, details, &index, &mut used, opts.date_tolerance_days) {
            Some(i) => matched.push(SingleMatch {
                parent: parent.clone(),
                detail: details[i].clone(),
            }),
            None => unmatched_parents.push(parent.clone()),
        }
    }

    MatchOutcome {
        matched,
        unmatched_parents,
        unmatched_details: leftover(details, &used),
    }
}

/// Single matching plus a split-shipment pass: a parent that found no
/// single counterpart may consume up to `max_group` unused details whose
/// amounts sum exactly to its own, each within the wider group window.
pub fn match_with_grouping(
    parents: &[AmazonParent],
    details: &[AmazonDetail],
    opts: &MatchOptions,
) -> GroupedOutcome {
    let mut used = vec![false; details.len()];
    let index = build_amount_index(details);

    let mut singles = Vec::new();
    let mut groups = Vec::new();
    let mut unmatched_parents = Vec::new();

    for parent in parents {
        if let Some(i) = take_single(parent, details, &index, &mut used, opts.date_tolerance_days) {
            singles.push(SingleMatch {
                parent: parent.clone(),
                detail: details[i].clone(),
            });
            continue;
        }
        if let Some(combo) = find_group(parent, details, &used, opts) {
            for &i in &combo {
                used[i] = true;
            }
            groups.push(GroupMatch {
                parent: parent.clone(),
                details: combo.iter().map(|&i| details[i].clone()).collect(),
            });
            continue;
        }
        unmatched_parents.push(parent.clone());
    }

    GroupedOutcome {
        singles,
        groups,
        unmatched_parents,
        unmatched_details: leftover(details, &used),
    }
}

/// Removes canonical transactions whose parents matched a detail row —
/// their spend is accounted for by the itemized Amazon data instead.
pub fn suppress_matched_parents(
    txns: Vec<CanonicalTransaction>,
    details: &[AmazonDetail],
    classifier: &AmazonClassifier,
    opts: &MatchOptions,
) -> (Vec<CanonicalTransaction>, Vec<AmazonParent>) {
    let parents = parents_from(&txns, classifier);
    let outcome = match_single(&parents, details, opts);
    let suppressed_refs: Vec<usize> = outcome.matched.iter().map(|m| m.parent.source_ref).collect();
    let suppressed: Vec<AmazonParent> = outcome.matched.into_iter().map(|m| m.parent).collect();

    let kept = txns
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !suppressed_refs.contains(i))
        .map(|(_, t)| t)
        .collect();
    (kept, suppressed)
}

fn build_amount_index(details: &[AmazonDetail]) -> HashMap<i64, Vec<usize>> {
    let mut index: HashMap<i64, Vec<usize>> = HashMap::new();
    for (i, d) in details.iter().enumerate() {
        if let Some(amount) = d.amount {
            index.entry(cent_key(amount)).or_default().push(i);
        }
    }
    index
}

fn take_single(
    parent: &AmazonParent,
    details: &[AmazonDetail],
    index: &HashMap<i64, Vec<usize>>,
    used: &mut [bool],
    tolerance_days: i64,
) -> Option<usize> {
    let bucket = index.get(&cent_key(parent.amount))?;
    let hit = bucket
        .iter()
        .copied()
        .find(|&i| !used[i] && within(parent, details[i].detail_date, tolerance_days))?;
    used[hit] = true;
    Some(hit)
}

/// Depth-first search for a combination of 2..=max_group unused details
/// summing exactly to the parent amount. Candidates keep original order,
/// so earlier rows are preferred — consistent with the single pass.
fn find_group(
    parent: &AmazonParent,
    details: &[AmazonDetail],
    used: &[bool],
    opts: &MatchOptions,
) -> Option<Vec<usize>> {
    let target = cent_key(parent.amount);
    let candidates: Vec<(usize, i64)> = details
        .iter()
        .enumerate()
        .filter(|(i, d)| {
            !used[*i]
                && d.amount.is_some()
                && within(parent, d.detail_date, opts.group_window_days)
        })
        .map(|(i, d)| (i, cent_key(d.amount.expect("filtered above"))))
        .filter(|(_, cents)| *cents > 0 && *cents < target)
        .collect();

    let mut picked = Vec::new();
    dfs(target, &candidates, 0, opts.max_group, &mut picked)
}

fn dfs(
    remaining: i64,
    candidates: &[(usize, i64)],
    start: usize,
    slots: usize,
    picked: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    for pos in start..candidates.len() {
        let (idx, cents) = candidates[pos];
        if cents > remaining {
            continue;
        }
        picked.push(idx);
        if cents == remaining && picked.len() >= 2 {
            return Some(picked.clone());
        }
        if slots > 1 {
            if let Some(found) = dfs(remaining - cents, candidates, pos + 1, slots - 1, picked) {
                return Some(found);
            }
        }
        picked.pop();
    }
    None
}

fn leftover(details: &[AmazonDetail], used: &[bool]) -> Vec<AmazonDetail> {
    details
        .iter()
        .enumerate()
        .filter(|(i, _)| !used[*i])
        .map(|(_, d)| d.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parent(cents: i64, posted: NaiveDate) -> AmazonParent {
        AmazonParent {
            source: Source::Amex,
            posted_date: posted,
            amount: Money::from_cents(cents),
            merchant: "AMAZON EU".to_string(),
            source_ref: 0,
        }
    }

    fn detail(cents: i64, d: Option<NaiveDate>) -> AmazonDetail {
        AmazonDetail {
            sheet: "2024 Amazon".to_string(),
            row_index: 1,
            detail_date: d,
            amount: Some(Money::from_cents(cents)),
        }
    }

    // ── classification ────────────────────────────────────────────────────────

    #[test]
    fn looks_amazon_variants() {
        let c = AmazonClassifier::default();
        for text in [
            "AMAZON EU SARL",
            "AMZN Mktp UK",
            "amznmktplace",
            "Amazon Prime*XY12",
            "AMZN DIGITAL",
        ] {
            assert!(c.looks_amazon(text), "{text}");
        }
        assert!(!c.looks_amazon("WATERSTONES"));
        assert!(!c.looks_amazon(""));
    }

    // ── single matching ───────────────────────────────────────────────────────

    #[test]
    fn exact_amount_within_tolerance_matches() {
        let parents = vec![parent(4999, date(2024, 3, 10))];
        let details = vec![detail(4999, Some(date(2024, 3, 12)))];
        let out = match_single(&parents, &details, &MatchOptions::default());
        assert_eq!(out.matched.len(), 1);
        assert!(out.unmatched_parents.is_empty());
        assert!(out.unmatched_details.is_empty());
    }

    #[test]
    fn beyond_tolerance_leaves_both_unmatched() {
        let parents = vec![parent(4999, date(2024, 3, 10))];
        let details = vec![detail(4999, Some(date(2024, 3, 20)))];
        let out = match_single(&parents, &details, &MatchOptions::default());
        assert!(out.matched.is_empty());
        assert_eq!(out.unmatched_parents.len(), 1);
        assert_eq!(out.unmatched_details.len(), 1);
    }

    #[test]
    fn undated_detail_matches_at_any_distance() {
        let parents = vec![parent(2500, date(2024, 1, 1))];
        let details = vec![detail(2500, None)];
        let out = match_single(&parents, &details, &MatchOptions::default());
        assert_eq!(out.matched.len(), 1);
    }

    #[test]
    fn first_fit_not_best_fit() {
        let parents = vec![parent(1000, date(2024, 6, 10))];
        let details = vec![
            detail(1000, Some(date(2024, 6, 14))), // 4 days off, but first
            detail(1000, Some(date(2024, 6, 10))), // exact date, never reached
        ];
        let out = match_single(&parents, &details, &MatchOptions::default());
        assert_eq!(out.matched[0].detail.detail_date, Some(date(2024, 6, 14)));
    }

    #[test]
    fn consumed_detail_is_never_reused() {
        let parents = vec![
            parent(1500, date(2024, 2, 1)),
            parent(1500, date(2024, 2, 2)),
        ];
        let details = vec![detail(1500, Some(date(2024, 2, 1)))];
        let out = match_single(&parents, &details, &MatchOptions::default());
        assert_eq!(out.matched.len(), 1);
        assert_eq!(out.unmatched_parents.len(), 1);
        // Consumption invariant: each detail appears in at most one pair.
        assert!(out.unmatched_details.is_empty());
    }

    #[test]
    fn amounts_must_match_to_the_cent() {
        let parents = vec![parent(4999, date(2024, 3, 10))];
        let details = vec![detail(4998, Some(date(2024, 3, 10)))];
        let out = match_single(&parents, &details, &MatchOptions::default());
        assert!(out.matched.is_empty());
    }

    // ── grouped matching ──────────────────────────────────────────────────────

    #[test]
    fn split_shipment_sums_to_parent() {
        let parents = vec![parent(6000, date(2024, 5, 10))];
        let details = vec![
            detail(2500, Some(date(2024, 5, 11))),
            detail(3500, Some(date(2024, 5, 12))),
        ];
        let out = match_with_grouping(&parents, &details, &MatchOptions::default());
        assert!(out.singles.is_empty());
        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.groups[0].details.len(), 2);
        assert!(out.unmatched_details.is_empty());
    }

    #[test]
    fn group_respects_max_size() {
        let parents = vec![parent(4000, date(2024, 5, 10))];
        let details = vec![
            detail(1000, Some(date(2024, 5, 10))),
            detail(1000, Some(date(2024, 5, 10))),
            detail(1000, Some(date(2024, 5, 10))),
            detail(1000, Some(date(2024, 5, 10))),
        ];
        let opts = MatchOptions {
            max_group: 3,
            ..MatchOptions::default()
        };
        let out = match_with_grouping(&parents, &details, &opts);
        // Four details would be needed; three are allowed.
        assert!(out.groups.is_empty());
        assert_eq!(out.unmatched_parents.len(), 1);
        assert_eq!(out.unmatched_details.len(), 4);
    }

    #[test]
    fn group_respects_wider_window() {
        let parents = vec![parent(6000, date(2024, 5, 10))];
        let details = vec![
            detail(2500, Some(date(2024, 5, 16))), // 6 days: inside group window
            detail(3500, Some(date(2024, 5, 19))), // 9 days: outside
        ];
        let out = match_with_grouping(&parents, &details, &MatchOptions::default());
        assert!(out.groups.is_empty());
        assert_eq!(out.unmatched_parents.len(), 1);
    }

    #[test]
    fn single_pass_takes_priority_over_grouping() {
        let parents = vec![parent(6000, date(2024, 5, 10))];
        let details = vec![
            detail(6000, Some(date(2024, 5, 11))),
            detail(2500, Some(date(2024, 5, 11))),
            detail(3500, Some(date(2024, 5, 11))),
        ];
        let out = match_with_grouping(&parents, &details, &MatchOptions::default());
        assert_eq!(out.singles.len(), 1);
        assert!(out.groups.is_empty());
        assert_eq!(out.unmatched_details.len(), 2);
    }

    #[test]
    fn grouped_parents_are_exclusive_classes() {
        // matched(single) / matched(group) / unmatched partition the parents
        let parents = vec![
            parent(6000, date(2024, 5, 10)),
            parent(1234, date(2024, 5, 10)),
            parent(9999, date(2024, 5, 10)),
        ];
        let details = vec![
            detail(6000, Some(date(2024, 5, 11))),
            detail(1000, Some(date(2024, 5, 10))),
            detail(234, Some(date(2024, 5, 10))),
        ];
        let out = match_with_grouping(&parents, &details, &MatchOptions::default());
        assert_eq!(
            out.singles.len() + out.groups.len() + out.unmatched_parents.len(),
            parents.len()
        );
        assert_eq!(out.singles.len(), 1);
        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.unmatched_parents.len(), 1);
    }

    // ── parent extraction & suppression ───────────────────────────────────────

    fn txn(desc: &str, cents: i64) -> CanonicalTransaction {
        CanonicalTransaction {
            source: Source::Mc,
            posted_date: date(2024, 3, 10),
            amount: Money::from_cents(cents),
            merchant_raw: None,
            description_raw: Some(desc.to_string()),
            category_raw: None,
            currency: None,
            account: None,
        }
    }

    #[test]
    fn parents_carry_absolute_amounts_and_refs() {
        let txns = vec![txn("TESCO", 500), txn("AMAZON EU", -4999)];
        let parents = parents_from(&txns, &AmazonClassifier::default());
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].amount.to_cents(), 4999);
        assert_eq!(parents[0].source_ref, 1);
    }

    #[test]
    fn suppression_removes_only_matched_parents() {
        let txns = vec![
            txn("AMAZON EU", 4999),
            txn("TESCO", 1200),
            txn("AMZN Mktp", 333), // no matching detail
        ];
        let details = vec![detail(4999, Some(date(2024, 3, 11)))];
        let (kept, suppressed) = suppress_matched_parents(
            txns,
            &details,
            &AmazonClassifier::default(),
            &MatchOptions::default(),
        );
        assert_eq!(suppressed.len(), 1);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().any(|t| t.description_raw.as_deref() == Some("TESCO")));
        assert!(kept.iter().any(|t| t.description_raw.as_deref() == Some("AMZN Mktp")));
    }
}
