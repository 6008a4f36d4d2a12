use thiserror::Error;

use reckon_core::{
    compare_to_truth, rollup, CanonicalTransaction, Money, MonthlyRollup, MonthlyTotals,
    VarianceRow,
};

use crate::amazon::{self, AmazonClassifier, MatchOptions};
use crate::config::{apply_categories, AppConfig};
use crate::filters::{CardBillFilter, SuppressRules, TransferFilter};
use crate::header::HeaderLocator;
use crate::mapper::map_rows;
use crate::schema::SourceSchema;
use crate::truth::{extract_cards_only, extract_truth, TruthError, TruthSchema};
use crate::workbook::{Workbook, WorkbookError, DEFAULT_BANK_TOKENS};

/// Environment-driven feature toggles, read once at startup and passed
/// down as a value.
#[derive(Debug, Clone, Copy)]
pub struct Flags {
    /// `AMAZON_SUPPRESS_PARENTS=1`: drop card charges whose itemized
    /// Amazon detail matched, so the detail rows stand in for them.
    pub suppress_amazon_parents: bool,
    /// `BANK_SUPPRESS_CARD_BILLS=0` disables; default on.
    pub suppress_card_bills: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Flags {
            suppress_amazon_parents: false,
            suppress_card_bills: true,
        }
    }
}

impl Flags {
    pub fn from_env() -> Flags {
        Flags {
            suppress_amazon_parents: std::env::var("AMAZON_SUPPRESS_PARENTS")
                .is_ok_and(|v| v == "1"),
            suppress_card_bills: std::env::var("BANK_SUPPRESS_CARD_BILLS")
                .map(|v| v != "0")
                .unwrap_or(true),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
    #[error(transparent)]
    Truth(#[from] TruthError),
    #[error("invalid suppression pattern: {0}")]
    Rules(#[from] regex::Error),
}

/// Everything the reconciliation run produced, for rendering.
#[derive(Debug, Clone)]
pub struct ReconReport {
    pub year: i32,
    pub txn_count: usize,
    pub rollups: Vec<MonthlyRollup>,
    pub truth: Vec<MonthlyTotals>,
    pub variance: Vec<VarianceRow>,
}

impl ReconReport {
    pub fn all_green(&self) -> bool {
        self.variance.iter().all(VarianceRow::passes)
    }
}

/// Parses every statement sheet for the year into one canonical stream:
/// card sheets (with the transfer filter), embedded bank sheets (with the
/// card-bill filter, flag-gated), then category rules, configured
/// suppression, and optionally Amazon-parent suppression.
pub fn collect_transactions(
    wb: &Workbook,
    year: i32,
    config: &AppConfig,
    flags: &Flags,
) -> Result<Vec<CanonicalTransaction>, PipelineError> {
    let locator = HeaderLocator::default();
    let transfer_filter = TransferFilter::default();
    let mut txns = Vec::new();

    for (schema, tokens) in [
        (SourceSchema::amex(), &["amex"][..]),
        (SourceSchema::mastercard(), &["mc", "master"][..]),
    ] {
        let name = wb
            .card_sheet(year, tokens)
            .ok_or_else(|| WorkbookError::MissingSheet(format!("{year} {}", schema.source)))?;
        let mapped = map_sheet(wb, name, &locator, &schema, None);
        tracing::info!(sheet = name, rows = mapped.len(), "parsed card sheet");
        txns.extend(transfer_filter.apply(mapped));
    }

    let mut bank_txns = Vec::new();
    for name in wb.bank_sheets(DEFAULT_BANK_TOKENS) {
        let schema = SourceSchema::bank();
        let mapped = map_sheet(wb, name, &locator, &schema, Some(name));
        tracing::info!(sheet = name, rows = mapped.len(), "parsed bank sheet");
        bank_txns.extend(mapped);
    }
    if flags.suppress_card_bills {
        bank_txns = CardBillFilter::default().apply(bank_txns);
    }
    txns.extend(bank_txns);

    let txns = apply_categories(txns, &config.categories);
    let mut txns = SuppressRules::compile(&config.suppress)?.apply(txns);

    if flags.suppress_amazon_parents {
        let details = amazon::extract_details(wb, year);
        let (kept, suppressed) = amazon::suppress_matched_parents(
            txns,
            &details,
            &AmazonClassifier::default(),
            &MatchOptions::default(),
        );
        let total: Money = suppressed.iter().map(|p| p.amount).sum();
        tracing::info!(count = suppressed.len(), %total, "suppressed matched Amazon parents");
        txns = kept;
    }

    Ok(txns)
}

/// Full run: canonical stream, monthly rollup, truth extraction, variance.
pub fn reconcile(
    wb: &Workbook,
    year: i32,
    config: &AppConfig,
    flags: &Flags,
    cards_only: bool,
) -> Result<ReconReport, PipelineError> {
    let txns = collect_transactions(wb, year, config, flags)?;
    let rollups = rollup(year, &txns);

    let detail_name = wb.detail_sheet()?;
    let grid = wb.grid(detail_name).expect("detail sheet just resolved");
    let schema = TruthSchema::default();
    let truth = if cards_only {
        extract_cards_only(grid, year, &schema)?
    } else {
        extract_truth(grid, year, &schema)?
    };

    let variance = compare_to_truth(&rollups, &truth);
    Ok(ReconReport {
        year,
        txn_count: txns.len(),
        rollups,
        truth,
        variance,
    })
}

fn map_sheet(
    wb: &Workbook,
    name: &str,
    locator: &HeaderLocator,
    schema: &SourceSchema,
    account: Option<&str>,
) -> Vec<CanonicalTransaction> {
    let Some(grid) = wb.grid(name) else {
        return Vec::new();
    };
    let groups = schema.header_group_refs();
    let refs: Vec<&[&str]> = groups.iter().map(|g| g.as_slice()).collect();
    match locator.locate(grid, &refs) {
        Ok(loc) => {
            tracing::debug!(sheet = name, header_row = loc.row_index, strategy = loc.strategy, "located header");
            map_rows(grid, &loc, schema, account)
        }
        Err(err) => {
            tracing::warn!(sheet = name, %err, "sheet yielded no header");
            Vec::new()
        }
    }
}
