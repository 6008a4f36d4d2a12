use anyhow::Context;
use std::path::Path;

use reckon_import::amazon::{self, GroupedOutcome, MatchOptions};
use reckon_import::{pipeline, AmazonClassifier, AppConfig, Flags, Workbook};

use crate::render;

pub fn compare(file: &Path, year: i32, config_dir: &Path, cards_only: bool) -> anyhow::Result<()> {
    let config = AppConfig::load(config_dir).context("loading configuration")?;
    let flags = Flags::from_env();
    let wb = Workbook::open(file)
        .with_context(|| format!("opening workbook {}", file.display()))?;

    let report = pipeline::reconcile(&wb, year, &config, &flags, cards_only)
        .context("reconciliation failed")?;

    tracing::info!(txns = report.txn_count, "reconciliation complete");
    render::variance_table(&report);
    Ok(())
}

pub fn amazon(
    file: &Path,
    year: i32,
    config_dir: &Path,
    grouped: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = AppConfig::load(config_dir).context("loading configuration")?;
    // Parent suppression would hide the very rows this report is about.
    let flags = Flags {
        suppress_amazon_parents: false,
        ..Flags::from_env()
    };
    let wb = Workbook::open(file)
        .with_context(|| format!("opening workbook {}", file.display()))?;

    let txns = pipeline::collect_transactions(&wb, year, &config, &flags)?;
    let classifier = AmazonClassifier::default();
    let parents = amazon::parents_from(&txns, &classifier);
    let details = amazon::extract_details(&wb, year);
    let opts = MatchOptions::default();

    let outcome = if grouped {
        amazon::match_with_grouping(&parents, &details, &opts)
    } else {
        let single = amazon::match_single(&parents, &details, &opts);
        GroupedOutcome {
            singles: single.matched,
            groups: Vec::new(),
            unmatched_parents: single.unmatched_parents,
            unmatched_details: single.unmatched_details,
        }
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&render::amazon_summary(&parents, &details, &outcome))?
        );
    } else {
        render::amazon_report(&parents, &details, &outcome);
    }
    Ok(())
}
