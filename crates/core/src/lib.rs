pub mod compare;
pub mod money;
pub mod period;
pub mod rollup;
pub mod transaction;

pub use compare::{compare_to_truth, VarianceRow};
pub use money::Money;
pub use period::{Month, MonthlyTotals};
pub use rollup::{rollup, MonthlyRollup};
pub use transaction::{CanonicalTransaction, Source};
