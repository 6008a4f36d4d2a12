use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;
use crate::period::Month;

/// Where a transaction row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Amex,
    Mc,
    Bank,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Amex => "amex",
            Source::Mc => "mc",
            Source::Bank => "bank",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A statement row normalized to the unified sign convention:
/// **positive amount = expense (outflow), negative = income (inflow)**,
/// regardless of how the source encodes it. Created once during
/// canonicalization and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    pub source: Source,
    pub posted_date: NaiveDate,
    pub amount: Money,
    pub merchant_raw: Option<String>,
    pub description_raw: Option<String>,
    pub category_raw: Option<String>,
    pub currency: Option<String>,
    /// Sheet name for embedded bank statements (e.g. "David account").
    pub account: Option<String>,
}

impl CanonicalTransaction {
    pub fn is_expense(&self) -> bool {
        !self.amount.is_negative()
    }

    pub fn year(&self) -> i32 {
        self.posted_date.year()
    }

    pub fn month(&self) -> Month {
        Month::new(self.posted_date.month() as u8).expect("chrono month is 1..=12")
    }

    /// Merchant text if present, else the raw description. The matching and
    /// suppression engines classify on this.
    pub fn merchant_or_description(&self) -> &str {
        self.merchant_raw
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.description_raw.as_deref())
            .unwrap_or("")
    }
}
