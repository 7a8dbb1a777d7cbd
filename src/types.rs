//! Core types and data structures for the posting engine

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Round a monetary amount to paise (2 decimal places, half-up).
pub fn round_money(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

/// Business transaction kinds recorded locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Sale,
    Purchase,
    Expense,
    Payment,
    Receipt,
    BankEntry,
    TdsEntry,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Sale => "sale",
            TransactionKind::Purchase => "purchase",
            TransactionKind::Expense => "expense",
            TransactionKind::Payment => "payment",
            TransactionKind::Receipt => "receipt",
            TransactionKind::BankEntry => "bank_entry",
            TransactionKind::TdsEntry => "tds_entry",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(TransactionKind::Sale),
            "purchase" => Some(TransactionKind::Purchase),
            "expense" => Some(TransactionKind::Expense),
            "payment" => Some(TransactionKind::Payment),
            "receipt" => Some(TransactionKind::Receipt),
            "bank_entry" => Some(TransactionKind::BankEntry),
            "tds_entry" => Some(TransactionKind::TdsEntry),
            _ => None,
        }
    }
}

/// External synchronization state of a locally persisted transaction.
///
/// Allowed transitions: Pending -> Synced (terminal) and Pending <-> Failed.
/// A Synced transaction is never resubmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncState {
    Pending,
    Synced,
    Failed,
}

impl SyncState {
    /// Integer flag used by the sqlite store.
    pub fn as_flag(&self) -> i64 {
        match self {
            SyncState::Pending => 0,
            SyncState::Synced => 1,
            SyncState::Failed => 2,
        }
    }

    pub fn from_flag(flag: i64) -> Self {
        match flag {
            1 => SyncState::Synced,
            2 => SyncState::Failed,
            _ => SyncState::Pending,
        }
    }
}

/// One line of a sale or purchase invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: BigDecimal,
    pub rate: BigDecimal,
    pub amount: BigDecimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: BigDecimal, rate: BigDecimal) -> Self {
        let amount = &quantity * &rate;
        Self {
            description: description.into(),
            quantity,
            rate,
            amount,
        }
    }
}

/// TDS withholding details attached to a payment transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TdsDetail {
    /// Statutory section code, e.g. "194C"
    pub section: String,
    /// Payee PAN used for threshold aggregation
    pub payee_pan: String,
    /// Applied rate in percent
    pub rate: BigDecimal,
    pub tds_amount: BigDecimal,
    pub net_payable: BigDecimal,
    /// Q1..Q4 of the financial year
    pub quarter: String,
    /// "YYYY-YY" label
    pub financial_year: String,
}

/// Durable, immutable record of one business event.
///
/// Amounts are fixed at creation; only `sync_state` changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub kind: TransactionKind,
    /// Customer, vendor or payee name
    pub party: String,
    pub party_gstin: Option<String>,
    /// Invoice or reference number
    pub reference: Option<String>,
    /// Expense or bank classification category
    pub category: Option<String>,
    pub items: Vec<LineItem>,
    pub subtotal: BigDecimal,
    pub cgst: BigDecimal,
    pub sgst: BigDecimal,
    pub igst: BigDecimal,
    pub total: BigDecimal,
    pub tds: Option<TdsDetail>,
    pub date: NaiveDate,
    pub sync_state: SyncState,
    pub created_at: NaiveDateTime,
}

impl TransactionRecord {
    /// Start a record with zeroed tax components; callers fill in what applies.
    pub fn new(kind: TransactionKind, party: impl Into<String>, date: NaiveDate) -> Self {
        let zero = BigDecimal::from(0);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            party: party.into(),
            party_gstin: None,
            reference: None,
            category: None,
            items: Vec::new(),
            subtotal: zero.clone(),
            cgst: zero.clone(),
            sgst: zero.clone(),
            igst: zero.clone(),
            total: zero,
            tds: None,
            date,
            sync_state: SyncState::Pending,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Voucher types understood by the external ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoucherType {
    Sales,
    Purchase,
    Payment,
    Receipt,
    Journal,
    Contra,
}

impl VoucherType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherType::Sales => "Sales",
            VoucherType::Purchase => "Purchase",
            VoucherType::Payment => "Payment",
            VoucherType::Receipt => "Receipt",
            VoucherType::Journal => "Journal",
            VoucherType::Contra => "Contra",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "Sales" => Some(VoucherType::Sales),
            "Purchase" => Some(VoucherType::Purchase),
            "Payment" => Some(VoucherType::Payment),
            "Receipt" => Some(VoucherType::Receipt),
            "Journal" => Some(VoucherType::Journal),
            "Contra" => Some(VoucherType::Contra),
            _ => None,
        }
    }
}

/// Single ledger posting within a voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub ledger: String,
    pub amount: BigDecimal,
    pub is_debit: bool,
}

impl LedgerEntry {
    pub fn debit(ledger: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            ledger: ledger.into(),
            amount,
            is_debit: true,
        }
    }

    pub fn credit(ledger: impl Into<String>, amount: BigDecimal) -> Self {
        Self {
            ledger: ledger.into(),
            amount,
            is_debit: false,
        }
    }
}

/// A ledger master an entry refers to, with the parent group used if it has
/// to be created externally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRef {
    pub name: String,
    pub parent_group: String,
}

impl LedgerRef {
    pub fn new(name: impl Into<String>, parent_group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_group: parent_group.into(),
        }
    }
}

/// Balanced double-entry voucher ready for submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub voucher_type: VoucherType,
    pub date: NaiveDate,
    pub narration: String,
    pub reference: Option<String>,
    /// Party ledger named in the voucher header, when the type carries one
    pub party: Option<String>,
    /// Ordered ledger entries; debits and credits must balance exactly
    pub entries: Vec<LedgerEntry>,
    /// Masters that must exist externally before this voucher can post
    pub masters: Vec<LedgerRef>,
}

impl Voucher {
    pub fn total_debits(&self) -> BigDecimal {
        self.entries
            .iter()
            .filter(|e| e.is_debit)
            .map(|e| &e.amount)
            .sum()
    }

    pub fn total_credits(&self) -> BigDecimal {
        self.entries
            .iter()
            .filter(|e| !e.is_debit)
            .map(|e| &e.amount)
            .sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.total_debits() == self.total_credits()
    }
}

/// One parsed bank statement line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankStatementLine {
    /// Assigned by the store on insert
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub description: String,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub balance: BigDecimal,
    pub category: String,
    pub voucher_type: VoucherType,
}

/// Transport-level failure classification for the external channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportKind {
    ConnectionRefused,
    Timeout,
    Other(String),
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::ConnectionRefused => write!(f, "connection refused"),
            TransportKind::Timeout => write!(f, "request timed out"),
            TransportKind::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Outcome of submitting a voucher to the external ledger.
///
/// Transport failures and rejections are data, not errors: the caller decides
/// whether and when to retry.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected { reason: String },
    TransportFailure { kind: TransportKind },
}

/// Errors that can occur in the posting engine
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid GST rate: {0}")]
    InvalidRate(String),
    #[error("Unknown TDS section: {0}")]
    UnknownSection(String),
    #[error("Voucher is not balanced: debits = {debits}, credits = {credits}")]
    ImbalancedVoucher {
        debits: BigDecimal,
        credits: BigDecimal,
    },
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Transport failure: {0}")]
    Transport(TransportKind),
    #[error("External ledger rejected the request: {0}")]
    ProtocolRejection(String),
}

/// Result type for posting engine operations
pub type CoreResult<T> = Result<T, CoreError>;
