use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::period::{Month, MonthlyTotals};
use crate::transaction::CanonicalTransaction;

/// One month of computed totals. Sums are carried at full precision;
/// presentation rounding happens in the comparison/render layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRollup {
    pub year: i32,
    pub month: Month,
    pub income_total: Money,
    pub expenses_total: Money,
    pub savings: Money,
    /// (income - expenses) / income, `None` when the month had no income.
    pub savings_rate: Option<Decimal>,
}

impl MonthlyRollup {
    pub fn totals(&self) -> MonthlyTotals {
        MonthlyTotals {
            month: self.month,
            income_total: self.income_total,
            expenses_total: self.expenses_total,
        }
    }
}

/// Buckets canonical transactions into per-month income/expense totals for
/// one calendar year. Transactions outside the year are excluded first.
/// Sign convention: amount >= 0 accumulates into expenses, amount < 0 is
/// negated into income.
pub fn rollup(year: i32, txns: &[CanonicalTransaction]) -> Vec<MonthlyRollup> {
    let mut income = [Money::zero(); 12];
    let mut expenses = [Money::zero(); 12];

    for t in txns.iter().filter(|t| t.year() == year) {
        let i = t.month().index();
        if t.is_expense() {
            expenses[i] += t.amount;
        } else {
            income[i] += -t.amount;
        }
    }

    Month::all()
        .map(|month| {
            let income_total = income[month.index()];
            let expenses_total = expenses[month.index()];
            let savings = income_total - expenses_total;
            let savings_rate = (income_total.as_decimal() > Decimal::ZERO)
                .then(|| savings.as_decimal() / income_total.as_decimal());
            MonthlyRollup {
                year,
                month,
                income_total,
                expenses_total,
                savings,
                savings_rate,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Source;
    use chrono::NaiveDate;

    fn txn(date: (i32, u32, u32), amount_cents: i64) -> CanonicalTransaction {
        CanonicalTransaction {
            source: Source::Bank,
            posted_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount: Money::from_cents(amount_cents),
            merchant_raw: None,
            description_raw: None,
            category_raw: None,
            currency: None,
            account: None,
        }
    }

    #[test]
    fn always_returns_twelve_months() {
        let out = rollup(2024, &[]);
        assert_eq!(out.len(), 12);
        assert!(out.iter().all(|r| r.income_total.is_zero() && r.expenses_total.is_zero()));
    }

    #[test]
    fn expenses_and_income_split_by_sign() {
        let txns = vec![
            txn((2024, 3, 5), 320_000),  // expense
            txn((2024, 3, 12), -500_000), // income
            txn((2024, 3, 20), 1),        // expense, one cent
        ];
        let out = rollup(2024, &txns);
        let march = &out[2];
        assert_eq!(march.expenses_total.to_cents(), 320_001);
        assert_eq!(march.income_total.to_cents(), 500_000);
        assert_eq!(march.savings.to_cents(), 179_999);
    }

    #[test]
    fn other_years_excluded() {
        let txns = vec![txn((2023, 6, 1), 1000), txn((2024, 6, 1), 2000)];
        let out = rollup(2024, &txns);
        assert_eq!(out[5].expenses_total.to_cents(), 2000);
    }

    #[test]
    fn savings_rate_none_without_income() {
        let txns = vec![txn((2024, 1, 2), 5000)];
        let out = rollup(2024, &txns);
        assert!(out[0].savings_rate.is_none());
    }

    #[test]
    fn savings_rate_fraction_of_income() {
        let txns = vec![txn((2024, 1, 2), -10_000), txn((2024, 1, 3), 2_500)];
        let out = rollup(2024, &txns);
        assert_eq!(out[0].savings_rate.unwrap(), Decimal::new(75, 2));
    }

    #[test]
    fn sign_invariant_expenses_equal_nonnegative_sum() {
        // For every month, expenses_total must equal the sum of amounts >= 0.
        let txns = vec![
            txn((2024, 7, 1), 100),
            txn((2024, 7, 2), 0),
            txn((2024, 7, 3), -900),
            txn((2024, 7, 4), 250),
        ];
        let out = rollup(2024, &txns);
        let expected: Money = txns
            .iter()
            .filter(|t| t.is_expense())
            .map(|t| t.amount)
            .sum();
        assert_eq!(out[6].expenses_total, expected);
        assert_eq!(out[6].income_total.to_cents(), 900);
    }
}
