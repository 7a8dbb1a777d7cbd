//! Bank statement import: amount parsing, keyword classification and
//! closing-balance reconciliation.

use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::types::{round_money, BankStatementLine, CoreError, CoreResult, VoucherType};
use crate::utils::period::parse_flexible_date;

/// One keyword rule. Keywords match case-insensitively anywhere in the
/// narration; rules are tried in order and the first hit wins.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub keywords: Vec<String>,
    pub category: String,
    pub voucher_type: VoucherType,
}

impl ClassificationRule {
    fn new(keywords: &[&str], category: &str, voucher_type: VoucherType) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            category: category.to_string(),
            voucher_type,
        }
    }

    fn matches(&self, description_upper: &str) -> bool {
        self.keywords.iter().any(|k| description_upper.contains(k))
    }
}

/// Ordered rule set mapping narrations to categories
#[derive(Debug, Clone)]
pub struct BankClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for BankClassifier {
    fn default() -> Self {
        Self {
            rules: vec![
                ClassificationRule::new(
                    &["NEFT", "RTGS", "IMPS", "UPI", "PAYMENT RECEIVED", "TRANSFER FROM"],
                    "Sales Receipt",
                    VoucherType::Receipt,
                ),
                ClassificationRule::new(
                    &["PAYMENT TO", "TRANSFER TO", "EMI", "BILL PAY"],
                    "Payment",
                    VoucherType::Payment,
                ),
                ClassificationRule::new(
                    &["CHARGES", "FEE", "COMMISSION"],
                    "Bank Charges",
                    VoucherType::Payment,
                ),
                ClassificationRule::new(
                    &["INTEREST", "INT CREDIT"],
                    "Interest Income",
                    VoucherType::Receipt,
                ),
                ClassificationRule::new(
                    &["SALARY", "PAYROLL", "WAGES"],
                    "Salary Payment",
                    VoucherType::Payment,
                ),
            ],
        }
    }
}

impl BankClassifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Category and voucher type for a narration; unmatched lines fall back
    /// to an Uncategorized journal for manual review.
    pub fn classify(&self, description: &str) -> (String, VoucherType) {
        let upper = description.to_uppercase();
        for rule in &self.rules {
            if rule.matches(&upper) {
                return (rule.category.clone(), rule.voucher_type);
            }
        }
        ("Uncategorized".to_string(), VoucherType::Journal)
    }
}

/// Parse a statement amount cell.
///
/// Accepts currency symbols, thousands separators and parenthesized
/// negatives; blank or dash cells mean zero.
pub fn parse_amount(raw: &str) -> CoreResult<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Ok(BigDecimal::from(0));
    }
    let negative = trimmed.starts_with('(') && trimmed.ends_with(')');
    let mut inner = if negative {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    };
    // currency markers only appear as a prefix
    inner = inner.strip_prefix('₹').unwrap_or(inner).trim_start();
    if inner.len() >= 2 && inner.is_char_boundary(2) && inner[..2].eq_ignore_ascii_case("rs") {
        inner = inner[2..].trim_start_matches('.').trim_start();
    }
    let mut cleaned = String::with_capacity(inner.len());
    for ch in inner.chars() {
        match ch {
            '0'..='9' | '.' | '-' => cleaned.push(ch),
            ',' | ' ' => {}
            _ => {
                return Err(CoreError::Validation(format!(
                    "unparseable amount '{trimmed}'"
                )))
            }
        }
    }
    let mut amount = BigDecimal::from_str(&cleaned)
        .map_err(|_| CoreError::Validation(format!("unparseable amount '{trimmed}'")))?;
    if negative {
        amount = -amount;
    }
    Ok(amount)
}

/// Unparsed statement row as it comes off a CSV or spreadsheet export
#[derive(Debug, Clone, Default)]
pub struct RawStatementRow {
    pub date: String,
    pub description: String,
    pub debit: String,
    pub credit: String,
    pub balance: String,
}

/// Result of importing a batch of raw rows
#[derive(Debug)]
pub struct ImportedStatement {
    pub lines: Vec<BankStatementLine>,
    /// Rows dropped for a missing date or no amount on either side
    pub skipped: usize,
}

/// Parse and classify raw rows. Malformed rows are skipped, not fatal:
/// statement exports routinely carry header, footer and summary lines.
pub fn import_rows(rows: &[RawStatementRow], classifier: &BankClassifier) -> ImportedStatement {
    let zero = BigDecimal::from(0);
    let mut lines = Vec::new();
    let mut skipped = 0;
    for row in rows {
        let Some(date) = parse_flexible_date(&row.date) else {
            skipped += 1;
            continue;
        };
        let debit = parse_amount(&row.debit).unwrap_or_else(|_| zero.clone());
        let credit = parse_amount(&row.credit).unwrap_or_else(|_| zero.clone());
        if debit == zero && credit == zero {
            skipped += 1;
            continue;
        }
        let balance = parse_amount(&row.balance).unwrap_or_else(|_| zero.clone());
        let (category, voucher_type) = classifier.classify(&row.description);
        lines.push(BankStatementLine {
            id: None,
            date,
            description: row.description.trim().to_string(),
            debit,
            credit,
            balance,
            category,
            voucher_type,
        });
    }
    ImportedStatement { lines, skipped }
}

/// Outcome of a closing-balance check
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub opening_balance: BigDecimal,
    pub closing_balance: BigDecimal,
    pub computed_closing: BigDecimal,
    pub total_credits: BigDecimal,
    pub total_debits: BigDecimal,
    pub difference: BigDecimal,
    pub reconciled: bool,
}

/// Check the stated closing balance against opening plus movements.
/// A sub-paisa difference counts as reconciled.
pub fn reconcile(
    lines: &[BankStatementLine],
    opening_balance: &BigDecimal,
    closing_balance: &BigDecimal,
) -> Reconciliation {
    let total_credits: BigDecimal = lines.iter().map(|l| &l.credit).sum();
    let total_debits: BigDecimal = lines.iter().map(|l| &l.debit).sum();
    let computed_closing = opening_balance + &total_credits - &total_debits;
    let difference = closing_balance - &computed_closing;
    let tolerance = BigDecimal::from_str("0.01").unwrap_or_else(|_| BigDecimal::from(0));
    let reconciled = difference.abs() < tolerance;
    Reconciliation {
        opening_balance: opening_balance.clone(),
        closing_balance: closing_balance.clone(),
        computed_closing: round_money(&computed_closing),
        total_credits,
        total_debits,
        difference: round_money(&difference),
        reconciled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_classify_priority_order() {
        let c = BankClassifier::default();
        // NEFT wins over the payment rule even when both match
        assert_eq!(
            c.classify("NEFT TRANSFER TO SUPPLIER"),
            ("Sales Receipt".to_string(), VoucherType::Receipt)
        );
        assert_eq!(
            c.classify("payment to abc vendor"),
            ("Payment".to_string(), VoucherType::Payment)
        );
        assert_eq!(
            c.classify("SMS CHARGES FOR JUNE"),
            ("Bank Charges".to_string(), VoucherType::Payment)
        );
        assert_eq!(
            c.classify("INT CREDIT Q1"),
            ("Interest Income".to_string(), VoucherType::Receipt)
        );
        assert_eq!(
            c.classify("SALARY MAY 2025"),
            ("Salary Payment".to_string(), VoucherType::Payment)
        );
        assert_eq!(
            c.classify("CHQ DEP 000123"),
            ("Uncategorized".to_string(), VoucherType::Journal)
        );
    }

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(parse_amount("1,50,000.50").unwrap(), dec("150000.50"));
        assert_eq!(parse_amount("₹ 2,500").unwrap(), dec("2500"));
        assert_eq!(parse_amount("Rs. 900").unwrap(), dec("900"));
        assert_eq!(parse_amount("(1200.00)").unwrap(), dec("-1200.00"));
        assert_eq!(parse_amount("").unwrap(), dec("0"));
        assert_eq!(parse_amount("-").unwrap(), dec("0"));
        assert!(parse_amount("N/A").is_err());
    }

    #[test]
    fn test_import_skips_malformed_rows() {
        let rows = vec![
            RawStatementRow {
                date: "03-05-2025".to_string(),
                description: "NEFT CR FROM XYZ CORP".to_string(),
                credit: "25,000".to_string(),
                ..RawStatementRow::default()
            },
            // header line: no date
            RawStatementRow {
                date: "Txn Date".to_string(),
                description: "Description".to_string(),
                ..RawStatementRow::default()
            },
            // summary line: no amounts
            RawStatementRow {
                date: "31-05-2025".to_string(),
                description: "CLOSING BALANCE".to_string(),
                ..RawStatementRow::default()
            },
        ];
        let imported = import_rows(&rows, &BankClassifier::default());
        assert_eq!(imported.lines.len(), 1);
        assert_eq!(imported.skipped, 2);
        assert_eq!(imported.lines[0].category, "Sales Receipt");
        assert_eq!(imported.lines[0].credit, dec("25000"));
    }

    fn line(debit: &str, credit: &str) -> BankStatementLine {
        BankStatementLine {
            id: None,
            date: NaiveDate::from_ymd_opt(2025, 5, 10).unwrap(),
            description: "x".to_string(),
            debit: dec(debit),
            credit: dec(credit),
            balance: dec("0"),
            category: "Uncategorized".to_string(),
            voucher_type: VoucherType::Journal,
        }
    }

    #[test]
    fn test_reconcile_matches() {
        let lines = vec![line("50000", "0"), line("1500", "0"), line("0", "25000")];
        let result = reconcile(&lines, &dec("100000"), &dec("73500"));
        assert!(result.reconciled);
        assert_eq!(result.computed_closing, dec("73500.00"));
        assert_eq!(result.total_credits, dec("25000"));
        assert_eq!(result.total_debits, dec("51500"));
    }

    #[test]
    fn test_reconcile_detects_mismatch() {
        let lines = vec![line("100", "0")];
        let result = reconcile(&lines, &dec("1000"), &dec("950"));
        assert!(!result.reconciled);
        assert_eq!(result.difference, dec("50.00"));
    }

    #[test]
    fn test_reconcile_sub_paisa_tolerance() {
        let lines = vec![line("0.004", "0")];
        let result = reconcile(&lines, &dec("1000"), &dec("1000"));
        assert!(result.reconciled);
    }
}
