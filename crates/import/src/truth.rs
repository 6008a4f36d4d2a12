use thiserror::Error;

use reckon_core::{Money, Month, MonthlyTotals};

use crate::cell::{amount_or_zero, Cell};
use crate::header::HeaderMap;

/// Shape of the hand-maintained "Detail" ledger tab, as data. The sheet
/// predates any export format: the year column's header is often blank,
/// the numeric month lives in the third column, and salaries are entered
/// as negatives.
#[derive(Debug, Clone)]
pub struct TruthSchema {
    pub total_expenses: String,
    pub salary_headers: Vec<String>,
    pub month_header: String,
    pub year_header: String,
    /// Positional fallbacks, by the sheet's own convention.
    pub year_col_fallback: usize,
    pub month_col_fallback: usize,
    pub scan_limit: usize,
    /// Category whitelist for the cards-only reconciliation view.
    pub cards_only_categories: Vec<String>,
}

impl Default for TruthSchema {
    fn default() -> Self {
        TruthSchema {
            total_expenses: "Total expenses".to_string(),
            salary_headers: vec!["David salary".to_string(), "Sonya salary".to_string()],
            month_header: "Month".to_string(),
            year_header: "Year".to_string(),
            year_col_fallback: 0,
            month_col_fallback: 2,
            scan_limit: 100,
            cards_only_categories: [
                "Grocery",
                "Restaurants",
                "Entertainment",
                "Travel",
                "Oyster",
                "Clothes",
                "Kitchen",
                "Electronics",
                "Accessories",
                "Supplies",
                "Gift",
                "UK cabs",
                "Others",
                "Services",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum TruthError {
    #[error("no truth header row found (looked for {0:?})")]
    HeaderNotFound(String),
}

/// Parses the truth ledger into per-month totals for one year.
///
/// Header location uses its own heuristic: a row naming the explicit
/// total-expenses column alongside at least one salary column, falling
/// back to total-expenses alone. Income is the absolute sum of salary
/// cells; expenses prefer the explicit total and otherwise sum the named
/// category columns with sign (negative entries are refunds and reduce
/// the total).
pub fn extract_truth(
    grid: &[Vec<Cell>],
    year: i32,
    schema: &TruthSchema,
) -> Result<Vec<MonthlyTotals>, TruthError> {
    let header_idx = find_truth_header(grid, schema)?;
    let headers = HeaderMap::promote(&grid[header_idx]);

    // A blank/unlabeled year header is expected; fall back positionally.
    let year_col = headers
        .position_exact(&schema.year_header)
        .unwrap_or(schema.year_col_fallback);
    let month_col = headers.position_exact(&schema.month_header);
    let income_cols: Vec<usize> = schema
        .salary_headers
        .iter()
        .filter_map(|h| headers.position_exact(h))
        .collect();
    let total_col = headers.position_exact(&schema.total_expenses);

    let mut income = [Money::zero(); 12];
    let mut expenses = [Money::zero(); 12];

    for row in grid.iter().skip(header_idx + 1) {
        if cell_year(row.get(year_col).unwrap_or(&Cell::Empty)) != Some(year) {
            continue;
        }
        let Some(month) = row_month(row, month_col, schema.month_col_fallback) else {
            continue;
        };

        let salary_sum: Money = income_cols
            .iter()
            .map(|&i| amount_or_zero(row.get(i).unwrap_or(&Cell::Empty)).unwrap_or(Money::zero()))
            .sum();
        income[month.index()] += salary_sum.abs();

        let explicit_total = total_col
            .map(|i| amount_or_zero(row.get(i).unwrap_or(&Cell::Empty)).unwrap_or(Money::zero()))
            .map(Money::abs)
            .filter(|m| !m.is_zero());
        let row_expenses = explicit_total.unwrap_or_else(|| {
            category_sum(row, &headers, &income_cols, year_col, month_col, total_col)
        });
        expenses[month.index()] += row_expenses;
    }

    Ok(collect_months(income, expenses))
}

/// Cards-only view: expenses restricted to a whitelist of category
/// columns, income left at zero. Refund magnitudes count toward spend
/// here (the card statements report them the same way).
pub fn extract_cards_only(
    grid: &[Vec<Cell>],
    year: i32,
    schema: &TruthSchema,
) -> Result<Vec<MonthlyTotals>, TruthError> {
    let whitelist: Vec<String> = schema
        .cards_only_categories
        .iter()
        .map(|s| s.trim().to_lowercase())
        .collect();

    let header_idx = grid
        .iter()
        .take(schema.scan_limit)
        .position(|row| {
            let texts: Vec<String> = row.iter().map(|c| c.as_text().to_lowercase()).collect();
            whitelist.iter().filter(|w| texts.contains(*w)).count() >= 3
        })
        .map(Ok)
        .unwrap_or_else(|| find_truth_header(grid, schema))?;

    let headers = HeaderMap::promote(&grid[header_idx]);
    let wl_cols: Vec<usize> = headers
        .names()
        .iter()
        .enumerate()
        .filter(|(_, name)| whitelist.contains(&name.trim().to_lowercase()))
        .map(|(i, _)| i)
        .collect();

    let mut expenses = [Money::zero(); 12];
    for row in grid.iter().skip(header_idx + 1) {
        if cell_year(row.get(schema.year_col_fallback).unwrap_or(&Cell::Empty)) != Some(year) {
            continue;
        }
        let Some(month) = row_month(row, None, schema.month_col_fallback) else {
            continue;
        };
        let sum: Money = wl_cols
            .iter()
            .map(|&i| {
                amount_or_zero(row.get(i).unwrap_or(&Cell::Empty))
                    .unwrap_or(Money::zero())
                    .abs()
            })
            .sum();
        expenses[month.index()] += sum;
    }

    Ok(collect_months([Money::zero(); 12], expenses))
}

fn find_truth_header(grid: &[Vec<Cell>], schema: &TruthSchema) -> Result<usize, TruthError> {
    let total = schema.total_expenses.trim().to_lowercase();
    let salaries: Vec<String> = schema
        .salary_headers
        .iter()
        .map(|s| s.trim().to_lowercase())
        .collect();

    let row_texts = |row: &[Cell]| -> Vec<String> {
        row.iter().map(|c| c.as_text().to_lowercase()).collect()
    };

    for (i, row) in grid.iter().take(schema.scan_limit).enumerate() {
        let texts = row_texts(row);
        if texts.contains(&total) && salaries.iter().any(|s| texts.contains(s)) {
            return Ok(i);
        }
    }
    // Relaxed pass: the salary columns were renamed but the total survives.
    for (i, row) in grid.iter().take(schema.scan_limit * 2).enumerate() {
        if row_texts(row).contains(&total) {
            tracing::warn!(row = i, "truth header found without salary columns");
            return Ok(i);
        }
    }
    Err(TruthError::HeaderNotFound(schema.total_expenses.clone()))
}

fn category_sum(
    row: &[Cell],
    headers: &HeaderMap,
    income_cols: &[usize],
    year_col: usize,
    month_col: Option<usize>,
    total_col: Option<usize>,
) -> Money {
    let mut sum = Money::zero();
    for i in 0..headers.len() {
        if income_cols.contains(&i)
            || i == year_col
            || Some(i) == month_col
            || Some(i) == total_col
            || headers.is_placeholder(i)
        {
            continue;
        }
        let v = amount_or_zero(row.get(i).unwrap_or(&Cell::Empty)).unwrap_or(Money::zero());
        sum += v;
    }
    sum
}

fn cell_year(cell: &Cell) -> Option<i32> {
    match cell {
        Cell::Number(n) if n.fract() == 0.0 => Some(*n as i32),
        Cell::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn row_month(row: &[Cell], named_col: Option<usize>, fallback_col: usize) -> Option<Month> {
    let cell = row.get(named_col.unwrap_or(fallback_col)).unwrap_or(&Cell::Empty);
    match cell {
        Cell::Number(n) if n.fract() == 0.0 => Month::new(*n as u8),
        Cell::Text(s) => s
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(Month::new)
            .or_else(|| Month::from_name(s)),
        _ => None,
    }
}

fn collect_months(income: [Money; 12], expenses: [Money; 12]) -> Vec<MonthlyTotals> {
    Month::all()
        .map(|month| MonthlyTotals {
            month,
            income_total: income[month.index()],
            expenses_total: expenses[month.index()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    /// A miniature Detail tab: three preamble rows, a header row whose
    /// year column is unlabeled, salaries entered negative.
    fn detail_grid() -> Vec<Vec<Cell>> {
        vec![
            vec![Cell::text("Household budget"), Cell::Empty, Cell::Empty],
            vec![Cell::Empty, Cell::Empty, Cell::Empty],
            vec![Cell::Empty, Cell::Empty, Cell::Empty],
            vec![
                Cell::Empty, // year column, blank header
                Cell::text("Month name"),
                Cell::Empty, // numeric month column, blank header
                Cell::text("David salary"),
                Cell::text("Sonya salary"),
                Cell::text("Housing"),
                Cell::text("Grocery"),
                Cell::text("Total expenses"),
            ],
            vec![
                num(2024.0),
                Cell::text("March"),
                num(3.0),
                num(-3000.0),
                num(-2000.0),
                num(1800.0),
                num(1400.0),
                num(3200.0),
            ],
            vec![
                num(2024.0),
                Cell::text("April"),
                num(4.0),
                num(-3000.0),
                num(-2000.0),
                num(1800.0),
                num(1350.5),
                Cell::Empty, // no explicit total: fall back to category sum
            ],
            vec![
                num(2023.0), // other year, ignored
                Cell::text("April"),
                num(4.0),
                num(-9999.0),
                Cell::Empty,
                num(9999.0),
                Cell::Empty,
                num(9999.0),
            ],
        ]
    }

    #[test]
    fn header_found_by_total_and_salary() {
        let grid = detail_grid();
        let out = extract_truth(&grid, 2024, &TruthSchema::default()).unwrap();
        assert_eq!(out.len(), 12);
        // March from the explicit total
        assert_eq!(out[2].expenses_total.to_cents(), 320_000);
        assert_eq!(out[2].income_total.to_cents(), 500_000);
    }

    #[test]
    fn income_is_absolute_sum_of_salaries() {
        let out = extract_truth(&detail_grid(), 2024, &TruthSchema::default()).unwrap();
        assert_eq!(out[3].income_total.to_cents(), 500_000);
    }

    #[test]
    fn missing_total_falls_back_to_category_sum() {
        let out = extract_truth(&detail_grid(), 2024, &TruthSchema::default()).unwrap();
        // April: Housing 1800 + Grocery 1350.50
        assert_eq!(out[3].expenses_total.to_cents(), 315_050);
    }

    #[test]
    fn refunds_reduce_the_category_sum() {
        let mut grid = detail_grid();
        // April Grocery becomes a -200 refund month
        grid[5][6] = num(-200.0);
        let out = extract_truth(&grid, 2024, &TruthSchema::default()).unwrap();
        assert_eq!(out[3].expenses_total.to_cents(), 160_000);
    }

    #[test]
    fn other_years_are_excluded() {
        let out = extract_truth(&detail_grid(), 2024, &TruthSchema::default()).unwrap();
        assert!(out[0].expenses_total.is_zero());
        let out_2023 = extract_truth(&detail_grid(), 2023, &TruthSchema::default()).unwrap();
        assert_eq!(out_2023[3].expenses_total.to_cents(), 999_900);
    }

    #[test]
    fn months_without_rows_are_zero() {
        let out = extract_truth(&detail_grid(), 2024, &TruthSchema::default()).unwrap();
        for m in [0usize, 1, 4, 11] {
            assert!(out[m].income_total.is_zero());
            assert!(out[m].expenses_total.is_zero());
        }
    }

    #[test]
    fn no_header_is_an_error() {
        let grid = vec![vec![Cell::text("nothing"), Cell::text("useful")]];
        assert!(matches!(
            extract_truth(&grid, 2024, &TruthSchema::default()),
            Err(TruthError::HeaderNotFound(_))
        ));
    }

    #[test]
    fn relaxed_header_pass_accepts_total_alone() {
        let grid = vec![
            vec![
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                Cell::text("Wages"), // salaries renamed
                Cell::text("Total expenses"),
            ],
            vec![num(2024.0), Cell::Empty, num(1.0), num(-1000.0), num(750.0)],
        ];
        let out = extract_truth(&grid, 2024, &TruthSchema::default()).unwrap();
        assert_eq!(out[0].expenses_total.to_cents(), 75_000);
        // No salary columns resolved, so no income recorded
        assert!(out[0].income_total.is_zero());
    }

    // ── cards-only view ───────────────────────────────────────────────────────

    fn cards_grid() -> Vec<Vec<Cell>> {
        vec![
            vec![
                Cell::Empty,
                Cell::text("Month name"),
                Cell::Empty,
                Cell::text("Grocery"),
                Cell::text("Restaurants"),
                Cell::text("Travel"),
                Cell::text("David salary"),
            ],
            vec![
                num(2024.0),
                Cell::text("Jan"),
                num(1.0),
                num(400.0),
                num(-25.0), // refund: counts as magnitude in this view
                num(130.0),
                num(-3000.0),
            ],
        ]
    }

    #[test]
    fn cards_only_sums_whitelisted_magnitudes() {
        let out = extract_cards_only(&cards_grid(), 2024, &TruthSchema::default()).unwrap();
        assert_eq!(out[0].expenses_total.to_cents(), 55_500);
        assert!(out[0].income_total.is_zero());
    }

    #[test]
    fn cards_only_ignores_non_whitelisted_columns() {
        let out = extract_cards_only(&cards_grid(), 2024, &TruthSchema::default()).unwrap();
        // The salary column is not part of the spend whitelist
        assert_eq!(out[0].expenses_total.to_cents(), 55_500);
    }
}
