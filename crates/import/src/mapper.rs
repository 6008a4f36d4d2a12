use reckon_core::{CanonicalTransaction, Money};

use crate::cell::{amount_or_zero, normalize_amount, normalize_date, Cell};
use crate::header::{HeaderLocation, HeaderMap};
use crate::schema::{SignRule, SourceSchema};

/// Resolves a logical field to a column index: one pass over the alias
/// list looking for exact (case-insensitive) name matches, then a second
/// pass accepting substring containment. The first alias to find a hit
/// wins — not the first column to match any alias.
pub fn resolve_field(headers: &HeaderMap, aliases: &[String]) -> Option<usize> {
    for alias in aliases {
        if let Some(i) = headers.position_exact(alias) {
            return Some(i);
        }
    }
    for alias in aliases {
        if let Some(i) = headers.position_containing(alias) {
            return Some(i);
        }
    }
    None
}

/// Walks aliases one at a time and returns the first non-empty cell value
/// among the columns they resolve to. Used for fields like category where
/// several columns exist and the better-curated one may be blank.
fn resolve_value_chain(headers: &HeaderMap, row: &[Cell], aliases: &[String]) -> Option<String> {
    for alias in aliases {
        let Some(col) = headers
            .position_exact(alias)
            .or_else(|| headers.position_containing(alias))
        else {
            continue;
        };
        let cell = row.get(col).unwrap_or(&Cell::Empty);
        if !cell.is_empty() {
            return Some(cell.as_text());
        }
    }
    None
}

struct Columns {
    date: usize,
    description: Option<usize>,
    amount: Option<usize>,
    debit: Option<usize>,
    credit: Option<usize>,
}

/// Maps the data rows below a located header into canonical transactions.
///
/// Rows without a resolvable date are dropped silently (trailing totals,
/// spacer rows). Rows with an unparseable date or amount are skipped with
/// a diagnostic — one bad row must not abort the batch. `account` tags
/// embedded bank sheets with their sheet name.
pub fn map_rows(
    grid: &[Vec<Cell>],
    loc: &HeaderLocation,
    schema: &SourceSchema,
    account: Option<&str>,
) -> Vec<CanonicalTransaction> {
    let headers = &loc.headers;

    let Some(date_col) = resolve_field(headers, &schema.date) else {
        tracing::warn!(source = %schema.source, "no date column resolved, sheet yields no rows");
        return Vec::new();
    };
    let cols = Columns {
        date: date_col,
        description: resolve_field(headers, &schema.description),
        amount: resolve_field(headers, &schema.amount),
        debit: resolve_field(headers, &schema.debit),
        credit: resolve_field(headers, &schema.credit),
    };
    if cols.amount.is_none() && cols.debit.is_none() && cols.credit.is_none() {
        tracing::warn!(source = %schema.source, "no amount or debit/credit columns resolved");
        return Vec::new();
    }

    let mut out = Vec::new();
    for (offset, row) in grid.iter().enumerate().skip(loc.row_index + 1) {
        let date_cell = row.get(cols.date).unwrap_or(&Cell::Empty);
        if date_cell.is_empty() {
            continue;
        }
        let posted_date = match normalize_date(date_cell, schema.date_order) {
            Ok(d) => d,
            Err(err) => {
                tracing::debug!(source = %schema.source, row = offset, %err, "skipping row");
                continue;
            }
        };

        let amount = match row_amount(&cols, row, schema.sign_rule) {
            Ok(Some(a)) => a,
            Ok(None) => continue,
            Err(err) => {
                tracing::debug!(source = %schema.source, row = offset, %err, "skipping row");
                continue;
            }
        };

        let description_raw = cols
            .description
            .map(|i| row.get(i).unwrap_or(&Cell::Empty).as_text())
            .filter(|s| !s.is_empty());
        let merchant_raw = resolve_value_chain(headers, row, &schema.merchant)
            .or_else(|| description_raw.clone());

        out.push(CanonicalTransaction {
            source: schema.source,
            posted_date,
            amount,
            merchant_raw,
            description_raw,
            category_raw: resolve_value_chain(headers, row, &schema.category),
            currency: resolve_value_chain(headers, row, &schema.currency),
            account: account.map(str::to_string),
        });
    }
    out
}

/// `Ok(None)` means the row carries no amount and should be dropped.
fn row_amount(
    cols: &Columns,
    row: &[Cell],
    sign_rule: SignRule,
) -> Result<Option<Money>, crate::cell::CellError> {
    if let Some(ai) = cols.amount {
        let cell = row.get(ai).unwrap_or(&Cell::Empty);
        if cell.is_empty() {
            return Ok(None);
        }
        let amount = normalize_amount(cell)?;
        return Ok(Some(match sign_rule {
            SignRule::AsIs => amount,
            SignRule::FlipSigned => -amount,
        }));
    }

    let debit = match cols.debit {
        Some(i) => amount_or_zero(row.get(i).unwrap_or(&Cell::Empty))?,
        None => Money::zero(),
    };
    let credit = match cols.credit {
        Some(i) => amount_or_zero(row.get(i).unwrap_or(&Cell::Empty))?,
        None => Money::zero(),
    };
    if !debit.is_zero() {
        Ok(Some(debit))
    } else if !credit.is_zero() {
        Ok(Some(-credit))
    } else {
        Ok(None)
    }
}
