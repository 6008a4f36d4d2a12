use calamine::Data;
use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use reckon_core::Money;

/// Excel's day-zero. Using 1899-12-30 (not -31) absorbs the phantom
/// 1900-02-29 that Excel's serial scheme counts.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// A raw spreadsheet cell value, detached from calamine so the pipeline
/// can be tested on synthetic grids.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    pub fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed string form; `Empty` becomes "".
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Cell {
        match data {
            Data::Empty => Cell::Empty,
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            other => Cell::Text(other.to_string()),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum CellError {
    #[error("unrecognized date: {0:?}")]
    DateParse(String),
    #[error("unparseable amount: {0:?}")]
    AmountParse(String),
}

/// Which way to read an ambiguous `a/b/year` date where both parts could be
/// a day. Per-source policy, carried on the schema rather than hardcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    #[default]
    DayFirst,
    MonthFirst,
}

/// Converts a raw cell into a calendar date. Recognized forms, in order:
/// Excel date serials, ISO `YYYY-MM-DD` (slash/dot variants), numeric
/// `a/b/year` pairs resolved by `order`, then spelled-month forms like
/// `12 Jan 2024`. Two-digit years resolve to 20xx.
pub fn normalize_date(cell: &Cell, order: DateOrder) -> Result<NaiveDate, CellError> {
    match cell {
        Cell::Number(serial) => from_excel_serial(*serial)
            .ok_or_else(|| CellError::DateParse(serial.to_string())),
        Cell::Text(s) => parse_date_text(s, order),
        other => Err(CellError::DateParse(other.as_text())),
    }
}

fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    // Truncate to the calendar day: time-of-day fractions are discarded.
    Some((epoch + Duration::milliseconds(millis)).date())
}

fn parse_date_text(raw: &str, order: DateOrder) -> Result<NaiveDate, CellError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(CellError::DateParse(raw.to_string()));
    }

    if let Some(d) = parse_ymd(s) {
        return Ok(d);
    }
    if let Some(d) = parse_numeric_pair(s, order) {
        return Ok(d);
    }
    if let Some(d) = parse_spelled_month(s) {
        return Ok(d);
    }
    Err(CellError::DateParse(raw.to_string()))
}

/// `YYYY-MM-DD`, `YYYY/M/D`, `YYYY.MM.DD`.
fn parse_ymd(s: &str) -> Option<NaiveDate> {
    let parts = split_date_parts(s)?;
    let [a, b, c] = parts;
    if a.len() != 4 {
        return None;
    }
    let y: i32 = a.parse().ok()?;
    let m: u32 = b.parse().ok()?;
    let d: u32 = c.parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// `a/b/year` with 2- or 4-digit year. Tries the policy's reading first,
/// then the other one if that yields no valid calendar date (so `25/03`
/// still parses under a month-first policy).
fn parse_numeric_pair(s: &str, order: DateOrder) -> Option<NaiveDate> {
    let [a, b, c] = split_date_parts(s)?;
    if a.len() > 2 || b.len() > 2 {
        return None;
    }
    let a: u32 = a.parse().ok()?;
    let b: u32 = b.parse().ok()?;
    let year = expand_year(c.parse().ok()?);

    let readings = match order {
        DateOrder::DayFirst => [(a, b), (b, a)],
        DateOrder::MonthFirst => [(b, a), (a, b)],
    };
    readings
        .into_iter()
        .find_map(|(day, month)| NaiveDate::from_ymd_opt(year, month, day))
}

/// `12 Jan 2024`, `12-Jan-24`, `1 March 2024`.
fn parse_spelled_month(s: &str) -> Option<NaiveDate> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let cleaned = s.to_lowercase();
    let mut parts = cleaned
        .split(|c: char| c == ' ' || c == '-' || c == '/' || c == '.')
        .filter(|p| !p.is_empty());
    let day: u32 = parts.next()?.parse().ok()?;
    let mon_text = parts.next()?;
    let year = expand_year(parts.next()?.parse().ok()?);
    let month = MONTHS.iter().position(|m| mon_text.starts_with(m))? as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn split_date_parts(s: &str) -> Option<[&str; 3]> {
    let parts: Vec<&str> = s
        .split(['/', '-', '.'])
        .map(str::trim)
        .collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit())) {
        return None;
    }
    Some([parts[0], parts[1], parts[2]])
}

fn expand_year(y: i32) -> i32 {
    if y < 100 {
        y + 2000
    } else {
        y
    }
}

/// Converts a raw cell into a signed decimal amount. Numbers pass through;
/// strings lose currency symbols, thousands separators and whitespace, with
/// accounting parentheses read as negation.
pub fn normalize_amount(cell: &Cell) -> Result<Money, CellError> {
    match cell {
        Cell::Number(n) => Decimal::from_f64(*n)
            .map(Money::from_decimal)
            .ok_or_else(|| CellError::AmountParse(n.to_string())),
        Cell::Text(s) => parse_amount_text(s),
        other => Err(CellError::AmountParse(other.as_text())),
    }
}

/// Like `normalize_amount`, but absence means "no value": empty cells and
/// blank strings yield zero. Used where a column is legitimately sparse
/// (debit/credit pairs, optional category totals).
pub fn amount_or_zero(cell: &Cell) -> Result<Money, CellError> {
    if cell.is_empty() {
        return Ok(Money::zero());
    }
    normalize_amount(cell)
}

fn parse_amount_text(raw: &str) -> Result<Money, CellError> {
    let s = raw.trim();
    let (negated, s) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '£' | '$' | '€' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return Err(CellError::AmountParse(raw.to_string()));
    }
    let mut dec =
        Decimal::from_str(&cleaned).map_err(|_| CellError::AmountParse(raw.to_string()))?;
    if negated {
        dec = -dec;
    }
    Ok(Money::from_decimal(dec))
}
