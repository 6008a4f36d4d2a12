use calamine::{open_workbook_auto, Reader};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cell::Cell;

/// Sheet-name tokens that mark an embedded bank statement. The workbook
/// holds pasted-in account exports named after their owner.
pub const DEFAULT_BANK_TOKENS: &[&str] = &["account", "david", "sonya"];

const DETAIL_SHEET: &str = "Detail";

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("failed to open workbook {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("failed to read sheet {sheet}: {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },
    #[error("missing sheet: {0}")]
    MissingSheet(String),
}

/// An entire workbook read once into memory. Per-sheet volume is small
/// (thousands of rows), so no streaming — the grids live for the whole
/// run and every consumer works off the same immutable data.
pub struct Workbook {
    sheets: Vec<(String, Vec<Vec<Cell>>)>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Workbook, WorkbookError> {
        let mut reader = open_workbook_auto(path).map_err(|source| WorkbookError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut sheets = Vec::new();
        for name in reader.sheet_names() {
            let range = reader
                .worksheet_range(&name)
                .map_err(|source| WorkbookError::Sheet {
                    sheet: name.clone(),
                    source,
                })?;
            let grid: Vec<Vec<Cell>> = range
                .rows()
                .map(|row| row.iter().map(Cell::from).collect())
                .collect();
            tracing::debug!(sheet = %name, rows = grid.len(), "loaded sheet");
            sheets.push((name, grid));
        }
        Ok(Workbook { sheets })
    }

    /// Test/synthetic constructor.
    pub fn from_sheets(sheets: Vec<(String, Vec<Vec<Cell>>)>) -> Workbook {
        Workbook { sheets }
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|(n, _)| n.as_str())
    }

    pub fn grid(&self, name: &str) -> Option<&Vec<Vec<Cell>>> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, g)| g)
    }

    // ── sheet-name classification ─────────────────────────────────────────────
    // Sheet names encode source and year: "2024 amex", "2024 mc",
    // "David account", "Detail", "2024 Amazon orders".

    /// First sheet whose name mentions the year and any of `tokens`.
    pub fn card_sheet(&self, year: i32, tokens: &[&str]) -> Option<&str> {
        let year = year.to_string();
        self.sheet_names().find(|name| {
            let lower = name.to_lowercase();
            lower.contains(&year) && tokens.iter().any(|t| lower.contains(*t))
        })
    }

    /// All sheets that look like embedded bank statements.
    pub fn bank_sheets(&self, tokens: &[&str]) -> Vec<&str> {
        self.sheet_names()
            .filter(|name| {
                let lower = name.to_lowercase();
                tokens.iter().any(|t| lower.contains(*t))
            })
            .collect()
    }

    /// The truth ledger tab. Its absence is fatal: comparing against an
    /// all-zero truth would report every month as variance and mask the
    /// real problem.
    pub fn detail_sheet(&self) -> Result<&str, WorkbookError> {
        self.sheet_names()
            .find(|name| name.to_lowercase().contains("detail"))
            .ok_or_else(|| WorkbookError::MissingSheet(DETAIL_SHEET.to_string()))
    }

    /// Amazon order-history tabs for the given year.
    pub fn amazon_sheets(&self, year: i32) -> Vec<&str> {
        let year = year.to_string();
        self.sheet_names()
            .filter(|name| {
                let lower = name.to_lowercase();
                (lower.contains("amazon") || lower.contains("amzn")) && lower.contains(&year)
            })
            .collect()
    }
}
