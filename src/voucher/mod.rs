//! Voucher construction: the deterministic mapping from business events to
//! balanced double-entry ledger postings.
//!
//! Every builder function verifies debits equal credits before returning;
//! an imbalance here is a programming error, never a retryable condition.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::{
    CoreError, CoreResult, LedgerEntry, LedgerRef, TransactionKind, TransactionRecord, Voucher,
    VoucherType,
};

/// Parent groups in the external chart of accounts
pub mod groups {
    pub const SUNDRY_DEBTORS: &str = "Sundry Debtors";
    pub const SUNDRY_CREDITORS: &str = "Sundry Creditors";
    pub const DUTIES_AND_TAXES: &str = "Duties & Taxes";
    pub const SALES_ACCOUNTS: &str = "Sales Accounts";
    pub const PURCHASE_ACCOUNTS: &str = "Purchase Accounts";
    pub const INDIRECT_EXPENSES: &str = "Indirect Expenses";
    pub const INDIRECT_INCOME: &str = "Indirect Income";
    pub const BANK_ACCOUNTS: &str = "Bank Accounts";
    pub const CASH_IN_HAND: &str = "Cash-in-Hand";
}

/// Incremental voucher builder
#[derive(Debug)]
pub struct VoucherBuilder {
    voucher: Voucher,
}

impl VoucherBuilder {
    pub fn new(voucher_type: VoucherType, date: NaiveDate, narration: impl Into<String>) -> Self {
        Self {
            voucher: Voucher {
                voucher_type,
                date,
                narration: narration.into(),
                reference: None,
                party: None,
                entries: Vec::new(),
                masters: Vec::new(),
            },
        }
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.voucher.reference = Some(reference.into());
        self
    }

    pub fn party(mut self, party: impl Into<String>) -> Self {
        self.voucher.party = Some(party.into());
        self
    }

    /// Add a debit entry and remember the master it refers to.
    /// Zero-amount entries are dropped.
    pub fn debit(mut self, ledger: &str, amount: &BigDecimal, parent_group: &str) -> Self {
        self.push(ledger, amount, true, parent_group);
        self
    }

    /// Add a credit entry and remember the master it refers to
    pub fn credit(mut self, ledger: &str, amount: &BigDecimal, parent_group: &str) -> Self {
        self.push(ledger, amount, false, parent_group);
        self
    }

    fn push(&mut self, ledger: &str, amount: &BigDecimal, is_debit: bool, parent_group: &str) {
        if *amount == BigDecimal::from(0) {
            return;
        }
        let entry = if is_debit {
            LedgerEntry::debit(ledger, amount.clone())
        } else {
            LedgerEntry::credit(ledger, amount.clone())
        };
        self.voucher.entries.push(entry);
        let master = LedgerRef::new(ledger, parent_group);
        if !self.voucher.masters.contains(&master) {
            self.voucher.masters.push(master);
        }
    }

    /// Verify the double-entry invariant and return the voucher
    pub fn build(self) -> CoreResult<Voucher> {
        if self.voucher.entries.len() < 2 {
            return Err(CoreError::Validation(
                "a voucher needs at least two ledger entries".to_string(),
            ));
        }
        for entry in &self.voucher.entries {
            if entry.amount < BigDecimal::from(0) {
                return Err(CoreError::Validation(format!(
                    "entry amount for '{}' cannot be negative",
                    entry.ledger
                )));
            }
        }
        let debits = self.voucher.total_debits();
        let credits = self.voucher.total_credits();
        if debits != credits {
            return Err(CoreError::ImbalancedVoucher { debits, credits });
        }
        Ok(self.voucher)
    }
}

/// Sales invoice: debit the customer for the gross total, credit Sales for
/// the subtotal and the output tax ledgers for each nonzero component.
pub fn sales_voucher(
    date: NaiveDate,
    customer: &str,
    invoice_no: &str,
    subtotal: &BigDecimal,
    cgst: &BigDecimal,
    sgst: &BigDecimal,
    igst: &BigDecimal,
    total: &BigDecimal,
) -> CoreResult<Voucher> {
    VoucherBuilder::new(
        VoucherType::Sales,
        date,
        format!("Sales Invoice {invoice_no}"),
    )
    .reference(invoice_no)
    .party(customer)
    .debit(customer, total, groups::SUNDRY_DEBTORS)
    .credit("Sales", subtotal, groups::SALES_ACCOUNTS)
    .credit("Output CGST", cgst, groups::DUTIES_AND_TAXES)
    .credit("Output SGST", sgst, groups::DUTIES_AND_TAXES)
    .credit("Output IGST", igst, groups::DUTIES_AND_TAXES)
    .build()
}

/// Purchase invoice: credit the vendor for the gross total, debit Purchase
/// and the input tax ledgers.
pub fn purchase_voucher(
    date: NaiveDate,
    vendor: &str,
    reference: &str,
    subtotal: &BigDecimal,
    cgst: &BigDecimal,
    sgst: &BigDecimal,
    igst: &BigDecimal,
    total: &BigDecimal,
) -> CoreResult<Voucher> {
    VoucherBuilder::new(
        VoucherType::Purchase,
        date,
        format!("Purchase against invoice {reference}"),
    )
    .reference(reference)
    .party(vendor)
    .credit(vendor, total, groups::SUNDRY_CREDITORS)
    .debit("Purchase", subtotal, groups::PURCHASE_ACCOUNTS)
    .debit("Input CGST", cgst, groups::DUTIES_AND_TAXES)
    .debit("Input SGST", sgst, groups::DUTIES_AND_TAXES)
    .debit("Input IGST", igst, groups::DUTIES_AND_TAXES)
    .build()
}

/// Expense accrual: debit the expense category, credit the vendor
pub fn expense_voucher(
    date: NaiveDate,
    vendor: &str,
    category: &str,
    amount: &BigDecimal,
    description: &str,
) -> CoreResult<Voucher> {
    VoucherBuilder::new(VoucherType::Journal, date, format!("Expense: {description}"))
        .debit(category, amount, groups::INDIRECT_EXPENSES)
        .credit(vendor, amount, groups::SUNDRY_CREDITORS)
        .build()
}

/// Settling an accrued expense: debit the vendor, credit the paying ledger
pub fn expense_payment_voucher(
    date: NaiveDate,
    vendor: &str,
    paid_from: &str,
    amount: &BigDecimal,
    narration: &str,
) -> CoreResult<Voucher> {
    let paying_group = if paid_from.eq_ignore_ascii_case("cash") {
        groups::CASH_IN_HAND
    } else {
        groups::BANK_ACCOUNTS
    };
    VoucherBuilder::new(VoucherType::Payment, date, narration)
        .debit(vendor, amount, groups::SUNDRY_CREDITORS)
        .credit(paid_from, amount, paying_group)
        .build()
}

/// Payment with TDS withheld: debit the payee for the gross amount, credit
/// the bank for the net payable and the section-wise TDS payable ledger for
/// the withheld tax.
pub fn tds_payment_voucher(
    date: NaiveDate,
    payee: &str,
    section: &str,
    gross: &BigDecimal,
    tds_amount: &BigDecimal,
    net_payable: &BigDecimal,
) -> CoreResult<Voucher> {
    let tds_ledger = format!("TDS Payable - {section}");
    VoucherBuilder::new(
        VoucherType::Journal,
        date,
        format!("Payment with TDS under section {section}"),
    )
    .debit(payee, gross, groups::SUNDRY_CREDITORS)
    .credit("Bank", net_payable, groups::BANK_ACCOUNTS)
    .credit(&tds_ledger, tds_amount, groups::DUTIES_AND_TAXES)
    .build()
}

/// Classified bank line: credits become receipts into the bank, debits
/// become payments out of it, against the inferred category ledger.
pub fn bank_line_voucher(
    date: NaiveDate,
    description: &str,
    category: &str,
    debit: &BigDecimal,
    credit: &BigDecimal,
) -> CoreResult<Voucher> {
    let zero = BigDecimal::from(0);
    if *credit > zero {
        VoucherBuilder::new(VoucherType::Receipt, date, description)
            .debit("Bank", credit, groups::BANK_ACCOUNTS)
            .credit(category, credit, groups::INDIRECT_INCOME)
            .build()
    } else if *debit > zero {
        VoucherBuilder::new(VoucherType::Payment, date, description)
            .debit(category, debit, groups::INDIRECT_EXPENSES)
            .credit("Bank", debit, groups::BANK_ACCOUNTS)
            .build()
    } else {
        Err(CoreError::Validation(
            "bank line has neither a debit nor a credit amount".to_string(),
        ))
    }
}

/// Bank-to-bank transfer
pub fn contra_voucher(
    date: NaiveDate,
    from_ledger: &str,
    to_ledger: &str,
    amount: &BigDecimal,
    narration: &str,
) -> CoreResult<Voucher> {
    VoucherBuilder::new(VoucherType::Contra, date, narration)
        .debit(to_ledger, amount, groups::BANK_ACCOUNTS)
        .credit(from_ledger, amount, groups::BANK_ACCOUNTS)
        .build()
}

/// Build the canonical voucher for a persisted transaction record
pub fn build_for_record(record: &TransactionRecord) -> CoreResult<Voucher> {
    match record.kind {
        TransactionKind::Sale => sales_voucher(
            record.date,
            &record.party,
            record.reference.as_deref().unwrap_or(""),
            &record.subtotal,
            &record.cgst,
            &record.sgst,
            &record.igst,
            &record.total,
        ),
        TransactionKind::Purchase => purchase_voucher(
            record.date,
            &record.party,
            record.reference.as_deref().unwrap_or(""),
            &record.subtotal,
            &record.cgst,
            &record.sgst,
            &record.igst,
            &record.total,
        ),
        TransactionKind::Expense => expense_voucher(
            record.date,
            &record.party,
            record.category.as_deref().unwrap_or("Others"),
            &record.total,
            record.reference.as_deref().unwrap_or(&record.party),
        ),
        TransactionKind::Payment => expense_payment_voucher(
            record.date,
            &record.party,
            record.category.as_deref().unwrap_or("Bank"),
            &record.total,
            &format!("Payment to {}", record.party),
        ),
        TransactionKind::Receipt => VoucherBuilder::new(
            VoucherType::Receipt,
            record.date,
            format!("Receipt from {}", record.party),
        )
        .debit("Bank", &record.total, groups::BANK_ACCOUNTS)
        .credit(&record.party, &record.total, groups::SUNDRY_DEBTORS)
        .build(),
        TransactionKind::BankEntry => {
            let category = record.category.as_deref().unwrap_or("Uncategorized");
            // for bank entries the direction is carried by the category's
            // voucher side: subtotal holds the debit, total the credit
            bank_line_voucher(
                record.date,
                record.reference.as_deref().unwrap_or(category),
                category,
                &record.subtotal,
                &record.total,
            )
        }
        TransactionKind::TdsEntry => {
            let tds = record.tds.as_ref().ok_or_else(|| {
                CoreError::Validation("TDS transaction is missing its TDS detail".to_string())
            })?;
            tds_payment_voucher(
                record.date,
                &record.party,
                &tds.section,
                &record.total,
                &tds.tds_amount,
                &tds.net_payable,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_sales_voucher_intra_state() {
        let v = sales_voucher(
            d(2025, 6, 1),
            "Acme Traders",
            "INV/2025-26/001",
            &dec("1000"),
            &dec("90"),
            &dec("90"),
            &dec("0"),
            &dec("1180"),
        )
        .unwrap();
        assert_eq!(v.voucher_type, VoucherType::Sales);
        assert!(v.is_balanced());
        // zero IGST entry was dropped
        assert_eq!(v.entries.len(), 4);
        assert_eq!(v.entries[0].ledger, "Acme Traders");
        assert!(v.entries[0].is_debit);
        assert!(v.masters.iter().any(|m| m.name == "Output CGST"
            && m.parent_group == groups::DUTIES_AND_TAXES));
    }

    #[test]
    fn test_purchase_voucher_inter_state() {
        let v = purchase_voucher(
            d(2025, 6, 1),
            "Supply Co",
            "PB-991",
            &dec("2000"),
            &dec("0"),
            &dec("0"),
            &dec("360"),
            &dec("2360"),
        )
        .unwrap();
        assert!(v.is_balanced());
        assert_eq!(v.entries.len(), 3);
        let vendor = &v.entries[0];
        assert_eq!(vendor.ledger, "Supply Co");
        assert!(!vendor.is_debit);
        assert_eq!(vendor.amount, dec("2360"));
    }

    #[test]
    fn test_tds_payment_voucher() {
        let v = tds_payment_voucher(
            d(2025, 7, 15),
            "Contractor",
            "194C",
            &dec("50000"),
            &dec("500"),
            &dec("49500"),
        )
        .unwrap();
        assert!(v.is_balanced());
        assert!(v
            .entries
            .iter()
            .any(|e| e.ledger == "TDS Payable - 194C" && !e.is_debit));
    }

    #[test]
    fn test_bank_credit_becomes_receipt() {
        let v = bank_line_voucher(
            d(2025, 5, 3),
            "NEFT CR FROM XYZ CORP",
            "Sales Receipt",
            &dec("0"),
            &dec("25000"),
        )
        .unwrap();
        assert_eq!(v.voucher_type, VoucherType::Receipt);
        assert!(v.entries[0].is_debit);
        assert_eq!(v.entries[0].ledger, "Bank");
    }

    #[test]
    fn test_bank_debit_becomes_payment() {
        let v = bank_line_voucher(
            d(2025, 5, 4),
            "PAYMENT TO ABC VENDOR",
            "Payment",
            &dec("9000"),
            &dec("0"),
        )
        .unwrap();
        assert_eq!(v.voucher_type, VoucherType::Payment);
        assert!(!v.entries[1].is_debit);
        assert_eq!(v.entries[1].ledger, "Bank");
    }

    #[test]
    fn test_imbalance_is_an_error() {
        let err = VoucherBuilder::new(VoucherType::Journal, d(2025, 4, 1), "broken")
            .debit("Rent", &dec("100"), groups::INDIRECT_EXPENSES)
            .credit("Bank", &dec("90"), groups::BANK_ACCOUNTS)
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::ImbalancedVoucher { .. }));
    }

    #[test]
    fn test_contra_voucher() {
        let v = contra_voucher(
            d(2025, 4, 2),
            "HDFC Bank",
            "ICICI Bank",
            &dec("10000"),
            "Funds transfer",
        )
        .unwrap();
        assert_eq!(v.voucher_type, VoucherType::Contra);
        assert!(v.is_balanced());
    }

    #[test]
    fn test_single_entry_rejected() {
        let err = VoucherBuilder::new(VoucherType::Journal, d(2025, 4, 1), "half")
            .debit("Rent", &dec("100"), groups::INDIRECT_EXPENSES)
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
