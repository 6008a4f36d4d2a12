use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

/// A calendar month, 1..=12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month(u8);

impl Month {
    pub fn new(n: u8) -> Option<Self> {
        (1..=12).contains(&n).then_some(Month(n))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index into a 12-slot array.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn all() -> impl Iterator<Item = Month> {
        (1..=12).map(Month)
    }

    /// Parses a spelled-out month name, case-insensitive ("March" -> 3).
    pub fn from_name(name: &str) -> Option<Self> {
        const NAMES: [&str; 12] = [
            "january",
            "february",
            "march",
            "april",
            "may",
            "june",
            "july",
            "august",
            "september",
            "october",
            "november",
            "december",
        ];
        let lower = name.trim().to_lowercase();
        NAMES
            .iter()
            .position(|n| *n == lower)
            .map(|i| Month(i as u8 + 1))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-month income/expense totals, both held as positive magnitudes.
/// Produced both by the computed rollup and by the truth ledger extractor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub month: Month,
    pub income_total: Money,
    pub expenses_total: Money,
}

impl MonthlyTotals {
    pub fn empty(month: Month) -> Self {
        MonthlyTotals {
            month,
            income_total: Money::zero(),
            expenses_total: Money::zero(),
        }
    }
}
