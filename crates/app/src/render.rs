use rust_decimal::Decimal;
use serde_json::json;

use reckon_core::Money;
use reckon_import::amazon::{AmazonDetail, AmazonParent, GroupedOutcome};
use reckon_import::pipeline::ReconReport;

fn two(m: Money) -> String {
    format!("{:.2}", m.as_decimal())
}

fn sum_parents(parents: &[AmazonParent]) -> Money {
    parents.iter().map(|p| p.amount).sum()
}

fn sum_details(details: &[AmazonDetail]) -> Money {
    details
        .iter()
        .map(|d| d.amount.unwrap_or(Money::zero()))
        .sum()
}

pub fn variance_table(report: &ReconReport) {
    println!("\nReconciliation ({}) — computed vs Detail", report.year);
    println!("Month |   Inc(Our)   Inc(Truth)   ΔIncome    |   Exp(Our)   Exp(Truth)      ΔExp");
    println!("------+---------------------------------------+--------------------------------------");
    for r in &report.variance {
        let inc_mark = if r.income_ok() { "✅" } else { "❌" };
        let exp_mark = if r.expenses_ok() { "✅" } else { "❌" };
        println!(
            "{:>5} | {:>10} {:>12} {:>10} {} | {:>10} {:>12} {:>10} {}",
            r.month.number(),
            two(r.income_ours),
            two(r.income_truth),
            two(r.income_diff),
            inc_mark,
            two(r.expenses_ours),
            two(r.expenses_truth),
            two(r.expenses_diff),
            exp_mark,
        );
    }
    let verdict = if report.all_green() {
        "ALL GREEN ✅"
    } else {
        "MISMATCHES FOUND ❌ (likely Amazon detail needed)"
    };
    println!("\nResult: {verdict}");
}

pub fn amazon_report(parents: &[AmazonParent], details: &[AmazonDetail], outcome: &GroupedOutcome) {
    let matched_sum: Money = outcome.singles.iter().map(|m| m.parent.amount).sum::<Money>()
        + outcome.groups.iter().map(|g| g.parent.amount).sum::<Money>();
    let matched_count = outcome.singles.len() + outcome.groups.len();

    println!(
        "Parents (card Amazon): {}, sum £{}",
        parents.len(),
        two(sum_parents(parents))
    );
    println!(
        "Details (Amazon tabs): {}, sum £{}",
        details.len(),
        two(sum_details(details))
    );
    println!("Matched: {matched_count}, sum £{}", two(matched_sum));
    if !outcome.groups.is_empty() {
        println!(
            "  of which grouped (split shipments): {}",
            outcome.groups.len()
        );
    }
    println!(
        "Unmatched parents: {}, sum £{}",
        outcome.unmatched_parents.len(),
        two(sum_parents(&outcome.unmatched_parents))
    );
    println!(
        "Unmatched details: {}, sum £{}",
        outcome.unmatched_details.len(),
        two(sum_details(&outcome.unmatched_details))
    );

    println!("\nSample matches (10):");
    for m in outcome.singles.iter().take(10) {
        let detail_date = m
            .detail
            .detail_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "—".to_string());
        println!(
            "  {} £{}  {}  ⇄  {} [{}]",
            m.parent.posted_date,
            two(m.parent.amount),
            m.parent.merchant,
            detail_date,
            m.detail.sheet,
        );
    }
    for g in outcome.groups.iter().take(10) {
        println!(
            "  {} £{}  {}  ⇄  group of {}",
            g.parent.posted_date,
            two(g.parent.amount),
            g.parent.merchant,
            g.details.len(),
        );
    }

    println!("\nTop 10 unmatched parents:");
    for p in outcome.unmatched_parents.iter().take(10) {
        println!("  {} £{}  {}", p.posted_date, two(p.amount), p.merchant);
    }

    println!("\nTop 10 unmatched details:");
    for d in outcome.unmatched_details.iter().take(10) {
        let date = d
            .detail_date
            .map(|x| x.to_string())
            .unwrap_or_else(|| "—".to_string());
        println!(
            "  {} £{}  [{}]",
            date,
            two(d.amount.unwrap_or(Money::zero())),
            d.sheet
        );
    }
}

pub fn amazon_summary(
    parents: &[AmazonParent],
    details: &[AmazonDetail],
    outcome: &GroupedOutcome,
) -> serde_json::Value {
    let parents_sum = sum_parents(parents);
    let matched_sum: Money = outcome.singles.iter().map(|m| m.parent.amount).sum::<Money>()
        + outcome.groups.iter().map(|g| g.parent.amount).sum::<Money>();
    let coverage_pct = if parents_sum.is_zero() {
        Decimal::ZERO
    } else {
        (matched_sum.as_decimal() / parents_sum.as_decimal() * Decimal::from(100)).round_dp(1)
    };

    json!({
        "parents": { "count": parents.len(), "sum": two(parents_sum) },
        "details": { "count": details.len(), "sum": two(sum_details(details)) },
        "matched": {
            "singles": outcome.singles.len(),
            "groups": outcome.groups.len(),
            "sum": two(matched_sum),
            "coverage_pct": coverage_pct.to_string(),
        },
        "unmatched_parents": {
            "count": outcome.unmatched_parents.len(),
            "sum": two(sum_parents(&outcome.unmatched_parents)),
        },
        "unmatched_details": {
            "count": outcome.unmatched_details.len(),
            "sum": two(sum_details(&outcome.unmatched_details)),
        },
    })
}
