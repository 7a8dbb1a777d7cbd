//! # Ledger Bridge
//!
//! A transaction-to-ledger posting engine for Indian small-business
//! accounting: compute taxes, build balanced vouchers, keep a durable local
//! record, and synchronize with a TallyPrime instance over its XML/HTTP
//! interface.
//!
//! ## Features
//!
//! - **GST computation**: slab-validated CGST/SGST/IGST splits decided by
//!   supplier and recipient state
//! - **TDS withholding**: section-wise rates with single and financial-year
//!   aggregate thresholds
//! - **Double-entry vouchers**: deterministic, always-balanced ledger
//!   postings for sales, purchases, expenses and bank entries
//! - **Durable local store**: every event persists locally before any
//!   network call, with SQLite and in-memory backends
//! - **Idempotent sync**: pending and failed records retry; a synced record
//!   is never resubmitted
//! - **Bank statements**: keyword classification and closing-balance
//!   reconciliation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ledger_bridge::{MemoryStore, PostingEngine, TallyClient};
//!
//! # async fn run() -> ledger_bridge::CoreResult<()> {
//! let store = MemoryStore::new();
//! let gateway = TallyClient::with_defaults()?;
//! let engine = PostingEngine::new(store, gateway);
//! # Ok(())
//! # }
//! ```

pub mod bank;
pub mod engine;
pub mod store;
pub mod tally;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;
pub mod voucher;

// Re-export commonly used types
pub use engine::{
    BankImportReport, ExpenseInput, PostingEngine, PostingReceipt, PurchaseInput, SaleInput,
    SyncPolicy, SyncReport, TdsPaymentInput, TdsPostingReceipt,
};
pub use store::{MemoryStore, SqliteStore};
pub use tally::{ClientConfig, TallyClient};
pub use tax::*;
pub use traits::*;
pub use types::*;
