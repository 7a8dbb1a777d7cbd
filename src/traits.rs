//! Traits for storage abstraction and the external ledger seam

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::types::*;

/// Storage abstraction for the local transaction record.
///
/// The local store is authoritative: every business event is persisted here
/// before any external call, and external failures never unwind a local
/// write. Implementations are single-writer; `next_invoice_number` is not
/// atomic across processes.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist a new transaction record. Fails with `DataIntegrity` if the
    /// reference (invoice number) is already taken.
    async fn insert_transaction(&self, record: &TransactionRecord) -> CoreResult<()>;

    /// Fetch a transaction by id
    async fn get_transaction(&self, id: &str) -> CoreResult<Option<TransactionRecord>>;

    /// List transactions, optionally filtered by kind and date range
    async fn list_transactions(
        &self,
        kind: Option<TransactionKind>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> CoreResult<Vec<TransactionRecord>>;

    /// Transition the sync state of a record. A record already Synced can
    /// never leave that state.
    async fn update_sync_state(&self, id: &str, state: SyncState) -> CoreResult<()>;

    /// Total transaction amounts grouped by category
    async fn totals_by_category(
        &self,
        kind: TransactionKind,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> CoreResult<HashMap<String, BigDecimal>>;

    /// Record counts grouped by sync state
    async fn counts_by_sync_state(&self) -> CoreResult<HashMap<SyncState, usize>>;

    /// Next invoice number in `PREFIX/FY/NNN` form, scanning for the highest
    /// sequence previously issued within that (prefix, financial year) scope.
    async fn next_invoice_number(&self, prefix: &str, financial_year: &str) -> CoreResult<String>;

    /// Sum of payment amounts already recorded for a payee under a TDS
    /// section within a financial year, for threshold aggregation.
    async fn sum_payments_to_payee(
        &self,
        section: &str,
        payee_pan: &str,
        financial_year: &str,
    ) -> CoreResult<BigDecimal>;

    /// Persist a classified bank statement line, returning its row id
    async fn insert_bank_line(&self, line: &BankStatementLine) -> CoreResult<i64>;

    /// List bank statement lines, optionally filtered
    async fn list_bank_lines(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        category: Option<&str>,
    ) -> CoreResult<Vec<BankStatementLine>>;

    /// Read a connection/company setting
    async fn get_setting(&self, key: &str) -> CoreResult<Option<String>>;

    /// Write a connection/company setting
    async fn set_setting(&self, key: &str, value: &str) -> CoreResult<()>;
}

/// Seam to the external general-ledger system.
///
/// All methods are best-effort: the external system is only the
/// ledger-of-record when reachable, and the engine treats every failure here
/// as retryable. No method on this trait retries by itself.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Lightweight read-only probe; true iff a well-formed, non-empty
    /// response came back without a transport error.
    async fn is_connected(&self) -> bool;

    /// Make sure a ledger master exists externally, creating it with the
    /// given parent group and zero opening balance if absent. Returns true
    /// if the ledger is known to exist afterwards. Non-throwing: a false
    /// result does not block voucher submission.
    async fn ensure_ledger(&self, name: &str, parent_group: &str) -> bool;

    /// Serialize and post one voucher, classifying the outcome
    async fn submit_voucher(&self, voucher: &Voucher) -> SubmitOutcome;
}
