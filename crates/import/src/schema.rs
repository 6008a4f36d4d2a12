use reckon_core::Source;

use crate::cell::DateOrder;

/// How a source's single signed amount column maps onto the canonical
/// convention (positive = expense). Card exports already report spend as
/// positive; bank statements report inflow as positive and must flip.
/// When no amount column resolves, the mapper falls back to separate
/// debit/credit columns and this rule is not consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignRule {
    #[default]
    AsIs,
    FlipSigned,
}

/// Per-source description of where fields live: ordered alias lists per
/// logical field, the token groups that identify the header row, and the
/// sign/date policies. Source-specific differences are data here, not code
/// forks.
#[derive(Debug, Clone)]
pub struct SourceSchema {
    pub source: Source,
    /// Keyword groups for the header locator; every group must hit.
    pub header_groups: Vec<Vec<String>>,
    pub date: Vec<String>,
    pub description: Vec<String>,
    pub merchant: Vec<String>,
    pub amount: Vec<String>,
    pub debit: Vec<String>,
    pub credit: Vec<String>,
    pub category: Vec<String>,
    pub currency: Vec<String>,
    pub sign_rule: SignRule,
    pub date_order: DateOrder,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl SourceSchema {
    /// Amex export: spend already positive; the hand-added `CONVERTED £`
    /// column supersedes the provider's `Amount`, and `CATEGORIE` is the
    /// curated category (`Category` is often an IBAN-ish provider field,
    /// kept as a last resort).
    pub fn amex() -> SourceSchema {
        SourceSchema {
            source: Source::Amex,
            header_groups: vec![strings(&["date"]), strings(&["description"]), strings(&["amount"])],
            date: strings(&["Date"]),
            description: strings(&["Description"]),
            merchant: strings(&["Doing Business As"]),
            amount: strings(&["CONVERTED £", "Amount"]),
            debit: vec![],
            credit: vec![],
            category: strings(&["CATEGORIE", "Subcategory", "Category"]),
            currency: strings(&["Currency"]),
            sign_rule: SignRule::AsIs,
            date_order: DateOrder::DayFirst,
        }
    }

    /// Mastercard export, same shape as Amex but with its own date and
    /// category spellings.
    pub fn mastercard() -> SourceSchema {
        SourceSchema {
            source: Source::Mc,
            header_groups: vec![strings(&["date"]), strings(&["description"]), strings(&["amount"])],
            date: strings(&["Converted date", "Date"]),
            description: strings(&["Description"]),
            merchant: vec![],
            amount: strings(&["CONVERTED £", "Amount"]),
            debit: vec![],
            credit: vec![],
            category: strings(&["CATEGORY", "Category"]),
            currency: strings(&["Currency"]),
            sign_rule: SignRule::AsIs,
            date_order: DateOrder::DayFirst,
        }
    }

    /// Embedded bank statement sheets. Either a single signed amount
    /// column (positive = inflow, hence `FlipSigned`) or separate
    /// Money In / Money Out columns.
    pub fn bank() -> SourceSchema {
        SourceSchema {
            source: Source::Bank,
            header_groups: vec![
                strings(&["date"]),
                strings(&["description", "narrative", "details", "payee"]),
                strings(&["amount", "debit", "credit", "money out", "money in"]),
            ],
            date: strings(&["Date", "Date Posted", "Transaction Date"]),
            description: strings(&["Description", "Narrative", "Details", "Payee"]),
            merchant: vec![],
            amount: strings(&["Amount", "Amount (£)", "Amount GBP"]),
            debit: strings(&["Debit", "Money Out"]),
            credit: strings(&["Credit", "Money In"]),
            category: strings(&["Category"]),
            currency: vec![],
            sign_rule: SignRule::FlipSigned,
            date_order: DateOrder::DayFirst,
        }
    }

    pub fn header_group_refs(&self) -> Vec<Vec<&str>> {
        self.header_groups
            .iter()
            .map(|g| g.iter().map(String::as_str).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_schemas_use_single_signed_amount() {
        for schema in [SourceSchema::amex(), SourceSchema::mastercard()] {
            assert_eq!(schema.sign_rule, SignRule::AsIs);
            assert!(schema.debit.is_empty());
            assert!(schema.credit.is_empty());
            assert!(!schema.amount.is_empty());
        }
    }

    #[test]
    fn bank_schema_flips_and_carries_debit_credit() {
        let bank = SourceSchema::bank();
        assert_eq!(bank.sign_rule, SignRule::FlipSigned);
        assert!(!bank.debit.is_empty());
        assert!(!bank.credit.is_empty());
    }

    #[test]
    fn converted_amount_precedes_provider_amount() {
        let amex = SourceSchema::amex();
        assert_eq!(amex.amount[0], "CONVERTED £");
        assert_eq!(amex.amount[1], "Amount");
    }
}
