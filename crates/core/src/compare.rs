use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::period::{Month, MonthlyTotals};
use crate::rollup::MonthlyRollup;

/// One month of computed-vs-truth comparison. All values here are rounded
/// to two places — this is the presentation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceRow {
    pub month: Month,
    pub income_ours: Money,
    pub income_truth: Money,
    pub income_diff: Money,
    pub expenses_ours: Money,
    pub expenses_truth: Money,
    pub expenses_diff: Money,
}

impl VarianceRow {
    pub fn income_ok(&self) -> bool {
        self.income_diff.is_zero()
    }

    pub fn expenses_ok(&self) -> bool {
        self.expenses_diff.is_zero()
    }

    /// A month reconciles only when both deltas are exactly zero.
    pub fn passes(&self) -> bool {
        self.income_ok() && self.expenses_ok()
    }
}

/// Joins computed rollups against truth rows by month. Months absent from
/// the truth set are skipped rather than compared against zeros.
pub fn compare_to_truth(ours: &[MonthlyRollup], truth: &[MonthlyTotals]) -> Vec<VarianceRow> {
    ours.iter()
        .filter_map(|r| {
            let t = truth.iter().find(|t| t.month == r.month)?;
            let income_ours = r.income_total.rounded();
            let income_truth = t.income_total.rounded();
            let expenses_ours = r.expenses_total.rounded();
            let expenses_truth = t.expenses_total.rounded();
            Some(VarianceRow {
                month: r.month,
                income_ours,
                income_truth,
                income_diff: (income_ours - income_truth).rounded(),
                expenses_ours,
                expenses_truth,
                expenses_diff: (expenses_ours - expenses_truth).rounded(),
            })
        })
        .collect()
}
