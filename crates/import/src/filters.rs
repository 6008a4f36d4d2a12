use regex::Regex;

use reckon_core::{CanonicalTransaction, Source};

use crate::config::SuppressConfig;

/// Card rows that are really transfers or bill payments, not spending.
/// Matching rows with negative (inflow) amounts are dropped so a card-bill
/// payment never shows up as phantom income.
const PAYMENT_PATTERNS: &[&str] = &[
    r"\bpayment\b",
    r"direct\s*debit",
    r"thank\s*you",
    r"auto\s*pay",
    r"autopay",
    r"statement\s*balance",
    r"balance\s*payment",
    r"bill\s*pay",
    r"transfer",
    r"repayment",
    r"payment\s*received",
    r"credit\s*card\s*repayment",
];

/// Bank rows that are card-bill settlements. These are outflows in the
/// bank data whose spending is already counted line-by-line on the card
/// sheets; keeping them would double-count every statement.
const CARD_BILL_PATTERNS: &[&str] = &[
    r"american\s*express",
    r"\bamex\b",
    r"master\s*card",
    r"mastercard",
    r"visa\s*card",
    r"direct\s*debit.*(card|payment)",
    r"credit\s*card.*payment",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("fixed pattern list compiles"))
        .collect()
}

fn compile_list(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")))
        .collect()
}

/// Removes internal transfers and card-bill payments from card data.
pub struct TransferFilter {
    patterns: Vec<Regex>,
}

impl Default for TransferFilter {
    fn default() -> Self {
        TransferFilter {
            patterns: compile(PAYMENT_PATTERNS),
        }
    }
}

impl TransferFilter {
    pub fn looks_like_payment(&self, text: &str) -> bool {
        let text = text.trim();
        !text.is_empty() && self.patterns.iter().any(|rx| rx.is_match(text))
    }

    pub fn apply(&self, txns: Vec<CanonicalTransaction>) -> Vec<CanonicalTransaction> {
        let before = txns.len();
        let kept: Vec<_> = txns
            .into_iter()
            .filter(|t| {
                !(t.amount.is_negative() && self.looks_like_payment(t.merchant_or_description()))
            })
            .collect();
        let dropped = before - kept.len();
        if dropped > 0 {
            tracing::info!(dropped, "filtered card payment/transfer rows");
        }
        kept
    }
}

/// Drops bank rows that settle a card statement. Default-on, disabled via
/// the `BANK_SUPPRESS_CARD_BILLS=0` flag at the application boundary.
pub struct CardBillFilter {
    patterns: Vec<Regex>,
}

impl Default for CardBillFilter {
    fn default() -> Self {
        CardBillFilter {
            patterns: compile(CARD_BILL_PATTERNS),
        }
    }
}

impl CardBillFilter {
    pub fn is_card_bill(&self, text: &str) -> bool {
        self.patterns.iter().any(|rx| rx.is_match(text))
    }

    pub fn apply(&self, txns: Vec<CanonicalTransaction>) -> Vec<CanonicalTransaction> {
        let before = txns.len();
        let kept: Vec<_> = txns
            .into_iter()
            .filter(|t| {
                t.source != Source::Bank || !self.is_card_bill(t.merchant_or_description())
            })
            .collect();
        let dropped = before - kept.len();
        if dropped > 0 {
            tracing::info!(dropped, "suppressed bank card-bill rows");
        }
        kept
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressKind {
    Expense,
    Income,
}

struct CompiledLists {
    expense: Vec<Regex>,
    income: Vec<Regex>,
}

/// User-configured suppression rules, compiled once from `suppress.toml`.
/// Bank and card sources carry separate lists; expense rules test rows
/// with positive amounts, income rules rows with negative amounts.
pub struct SuppressRules {
    bank: CompiledLists,
    cards: CompiledLists,
}

impl SuppressRules {
    pub fn compile(config: &SuppressConfig) -> Result<Self, regex::Error> {
        Ok(SuppressRules {
            bank: CompiledLists {
                expense: compile_list(&config.bank.expense_ignore)?,
                income: compile_list(&config.bank.income_ignore)?,
            },
            cards: CompiledLists {
                expense: compile_list(&config.cards.expense_ignore)?,
                income: compile_list(&config.cards.income_ignore)?,
            },
        })
    }

    pub fn should_suppress(&self, txn: &CanonicalTransaction) -> Option<SuppressKind> {
        let lists = match txn.source {
            Source::Bank => &self.bank,
            Source::Amex | Source::Mc => &self.cards,
        };
        let text = txn.merchant_or_description().trim();
        if txn.amount.is_negative() {
            lists
                .income
                .iter()
                .any(|rx| rx.is_match(text))
                .then_some(SuppressKind::Income)
        } else if !txn.amount.is_zero() {
            lists
                .expense
                .iter()
                .any(|rx| rx.is_match(text))
                .then_some(SuppressKind::Expense)
        } else {
            None
        }
    }

    pub fn apply(&self, txns: Vec<CanonicalTransaction>) -> Vec<CanonicalTransaction> {
        let before = txns.len();
        let kept: Vec<_> = txns
            .into_iter()
            .filter(|t| self.should_suppress(t).is_none())
            .collect();
        let dropped = before - kept.len();
        if dropped > 0 {
            tracing::info!(dropped, "suppressed rows via configured rules");
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SuppressConfig, SuppressLists};
    use chrono::NaiveDate;
    use reckon_core::Money;

    fn txn(source: Source, desc: &str, amount_cents: i64) -> CanonicalTransaction {
        CanonicalTransaction {
            source,
            posted_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            amount: Money::from_cents(amount_cents),
            merchant_raw: None,
            description_raw: Some(desc.to_string()),
            category_raw: None,
            currency: None,
            account: None,
        }
    }

    // ── transfer filter ───────────────────────────────────────────────────────

    #[test]
    fn drops_negative_payment_rows() {
        let filter = TransferFilter::default();
        let txns = vec![
            txn(Source::Amex, "PAYMENT RECEIVED - THANK YOU", -50_000),
            txn(Source::Amex, "TESCO STORES", 1200),
        ];
        let kept = filter.apply(txns);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].description_raw.as_deref(), Some("TESCO STORES"));
    }

    #[test]
    fn keeps_positive_rows_even_when_text_matches() {
        // A merchant named "Transfer Coffee" spending money is real spend.
        let filter = TransferFilter::default();
        let kept = filter.apply(vec![txn(Source::Mc, "TRANSFER COFFEE LTD", 350)]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn direct_debit_variants_match() {
        let filter = TransferFilter::default();
        assert!(filter.looks_like_payment("DIRECT DEBIT PAYMENT"));
        assert!(filter.looks_like_payment("AutoPay"));
        assert!(!filter.looks_like_payment("WAITROSE"));
        assert!(!filter.looks_like_payment(""));
    }

    // ── card-bill filter ──────────────────────────────────────────────────────

    #[test]
    fn bank_card_bills_are_suppressed() {
        let filter = CardBillFilter::default();
        let txns = vec![
            txn(Source::Bank, "AMERICAN EXPRESS DD", 150_000),
            txn(Source::Bank, "WAITROSE", 4500),
            // Same text on a card source is untouched
            txn(Source::Amex, "AMERICAN EXPRESS DD", 150_000),
        ];
        let kept = filter.apply(txns);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|t| t.description_raw.as_deref() != Some("AMERICAN EXPRESS DD")
            || t.source == Source::Amex));
    }

    // ── configured suppression ────────────────────────────────────────────────

    fn rules(bank_income: &[&str], cards_expense: &[&str]) -> SuppressRules {
        let config = SuppressConfig {
            bank: SuppressLists {
                expense_ignore: vec![],
                income_ignore: bank_income.iter().map(|s| s.to_string()).collect(),
            },
            cards: SuppressLists {
                expense_ignore: cards_expense.iter().map(|s| s.to_string()).collect(),
                income_ignore: vec![],
            },
        };
        SuppressRules::compile(&config).unwrap()
    }

    #[test]
    fn income_rules_only_touch_negative_amounts() {
        let rules = rules(&["refund from hmrc"], &[]);
        let inflow = txn(Source::Bank, "REFUND FROM HMRC", -20_000);
        let outflow = txn(Source::Bank, "REFUND FROM HMRC", 20_000);
        assert_eq!(rules.should_suppress(&inflow), Some(SuppressKind::Income));
        assert_eq!(rules.should_suppress(&outflow), None);
    }

    #[test]
    fn card_rules_do_not_apply_to_bank_rows() {
        let rules = rules(&[], &["amazon prime"]);
        let card = txn(Source::Mc, "AMAZON PRIME", 799);
        let bank = txn(Source::Bank, "AMAZON PRIME", 799);
        assert_eq!(rules.should_suppress(&card), Some(SuppressKind::Expense));
        assert_eq!(rules.should_suppress(&bank), None);
    }

    #[test]
    fn bad_user_pattern_is_an_error_not_a_panic() {
        let config = SuppressConfig {
            bank: SuppressLists {
                expense_ignore: vec!["(unclosed".to_string()],
                income_ignore: vec![],
            },
            cards: SuppressLists::default(),
        };
        assert!(SuppressRules::compile(&config).is_err());
    }
}
