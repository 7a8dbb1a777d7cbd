//! SQLite-backed transaction store.
//!
//! Amounts are stored as decimal TEXT to keep paise exact; line items and
//! TDS details are stored as JSON columns. Calls block on a connection
//! mutex, which is acceptable for a single-writer local database file.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use crate::traits::TransactionStore;
use crate::types::*;

use super::{format_invoice, parse_invoice_sequence};

const DATE_FMT: &str = "%Y-%m-%d";
const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S%.f";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id          TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,
    party       TEXT NOT NULL,
    party_gstin TEXT,
    reference   TEXT,
    category    TEXT,
    items       TEXT NOT NULL,
    subtotal    TEXT NOT NULL,
    cgst        TEXT NOT NULL,
    sgst        TEXT NOT NULL,
    igst        TEXT NOT NULL,
    total       TEXT NOT NULL,
    tds         TEXT,
    date        TEXT NOT NULL,
    sync_state  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_reference
    ON transactions(kind, reference) WHERE reference IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
CREATE TABLE IF NOT EXISTS bank_lines (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    date         TEXT NOT NULL,
    description  TEXT NOT NULL,
    debit        TEXT NOT NULL,
    credit       TEXT NOT NULL,
    balance      TEXT NOT NULL,
    category     TEXT NOT NULL,
    voucher_type TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS settings (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// SQLite store over a single shared connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and if necessary initialize) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        let conn = Connection::open(path).map_err(map_sql)?;
        conn.execute_batch(SCHEMA).map_err(map_sql)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(map_sql)?;
        conn.execute_batch(SCHEMA).map_err(map_sql)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn map_sql(err: rusqlite::Error) -> CoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            CoreError::DataIntegrity(err.to_string())
        }
        _ => CoreError::Storage(err.to_string()),
    }
}

fn parse_dec(raw: &str, column: &str) -> CoreResult<BigDecimal> {
    BigDecimal::from_str(raw)
        .map_err(|e| CoreError::DataIntegrity(format!("bad decimal in {column}: {e}")))
}

fn parse_date(raw: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FMT)
        .map_err(|e| CoreError::DataIntegrity(format!("bad date '{raw}': {e}")))
}

/// Raw column values pulled out of a transactions row before decoding
struct RawTx {
    id: String,
    kind: String,
    party: String,
    party_gstin: Option<String>,
    reference: Option<String>,
    category: Option<String>,
    items: String,
    subtotal: String,
    cgst: String,
    sgst: String,
    igst: String,
    total: String,
    tds: Option<String>,
    date: String,
    sync_state: i64,
    created_at: String,
}

const TX_COLUMNS: &str = "id, kind, party, party_gstin, reference, category, items, \
     subtotal, cgst, sgst, igst, total, tds, date, sync_state, created_at";

fn read_raw_tx(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTx> {
    Ok(RawTx {
        id: row.get(0)?,
        kind: row.get(1)?,
        party: row.get(2)?,
        party_gstin: row.get(3)?,
        reference: row.get(4)?,
        category: row.get(5)?,
        items: row.get(6)?,
        subtotal: row.get(7)?,
        cgst: row.get(8)?,
        sgst: row.get(9)?,
        igst: row.get(10)?,
        total: row.get(11)?,
        tds: row.get(12)?,
        date: row.get(13)?,
        sync_state: row.get(14)?,
        created_at: row.get(15)?,
    })
}

fn decode_tx(raw: RawTx) -> CoreResult<TransactionRecord> {
    let kind = TransactionKind::from_str_opt(&raw.kind)
        .ok_or_else(|| CoreError::DataIntegrity(format!("unknown kind '{}'", raw.kind)))?;
    let items: Vec<LineItem> = serde_json::from_str(&raw.items)
        .map_err(|e| CoreError::DataIntegrity(format!("bad items JSON: {e}")))?;
    let tds: Option<TdsDetail> = match &raw.tds {
        Some(json) => Some(
            serde_json::from_str(json)
                .map_err(|e| CoreError::DataIntegrity(format!("bad TDS JSON: {e}")))?,
        ),
        None => None,
    };
    let created_at = NaiveDateTime::parse_from_str(&raw.created_at, TIMESTAMP_FMT)
        .map_err(|e| CoreError::DataIntegrity(format!("bad timestamp '{}': {e}", raw.created_at)))?;
    Ok(TransactionRecord {
        id: raw.id,
        kind,
        party: raw.party,
        party_gstin: raw.party_gstin,
        reference: raw.reference,
        category: raw.category,
        items,
        subtotal: parse_dec(&raw.subtotal, "subtotal")?,
        cgst: parse_dec(&raw.cgst, "cgst")?,
        sgst: parse_dec(&raw.sgst, "sgst")?,
        igst: parse_dec(&raw.igst, "igst")?,
        total: parse_dec(&raw.total, "total")?,
        tds,
        date: parse_date(&raw.date)?,
        sync_state: SyncState::from_flag(raw.sync_state),
        created_at,
    })
}

struct RawBankLine {
    id: i64,
    date: String,
    description: String,
    debit: String,
    credit: String,
    balance: String,
    category: String,
    voucher_type: String,
}

fn read_raw_bank_line(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBankLine> {
    Ok(RawBankLine {
        id: row.get(0)?,
        date: row.get(1)?,
        description: row.get(2)?,
        debit: row.get(3)?,
        credit: row.get(4)?,
        balance: row.get(5)?,
        category: row.get(6)?,
        voucher_type: row.get(7)?,
    })
}

fn decode_bank_line(raw: RawBankLine) -> CoreResult<BankStatementLine> {
    let voucher_type = VoucherType::from_str_opt(&raw.voucher_type).ok_or_else(|| {
        CoreError::DataIntegrity(format!("unknown voucher type '{}'", raw.voucher_type))
    })?;
    Ok(BankStatementLine {
        id: Some(raw.id),
        date: parse_date(&raw.date)?,
        description: raw.description,
        debit: parse_dec(&raw.debit, "debit")?,
        credit: parse_dec(&raw.credit, "credit")?,
        balance: parse_dec(&raw.balance, "balance")?,
        category: raw.category,
        voucher_type,
    })
}

#[async_trait]
impl TransactionStore for SqliteStore {
    async fn insert_transaction(&self, record: &TransactionRecord) -> CoreResult<()> {
        let items = serde_json::to_string(&record.items)
            .map_err(|e| CoreError::Storage(format!("serializing items: {e}")))?;
        let tds = match &record.tds {
            Some(detail) => Some(
                serde_json::to_string(detail)
                    .map_err(|e| CoreError::Storage(format!("serializing TDS detail: {e}")))?,
            ),
            None => None,
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO transactions (id, kind, party, party_gstin, reference, category, \
             items, subtotal, cgst, sgst, igst, total, tds, date, sync_state, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                record.id,
                record.kind.as_str(),
                record.party,
                record.party_gstin,
                record.reference,
                record.category,
                items,
                record.subtotal.to_string(),
                record.cgst.to_string(),
                record.sgst.to_string(),
                record.igst.to_string(),
                record.total.to_string(),
                tds,
                record.date.format(DATE_FMT).to_string(),
                record.sync_state.as_flag(),
                record.created_at.format(TIMESTAMP_FMT).to_string(),
            ],
        )
        .map_err(map_sql)?;
        Ok(())
    }

    async fn get_transaction(&self, id: &str) -> CoreResult<Option<TransactionRecord>> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                &format!("SELECT {TX_COLUMNS} FROM transactions WHERE id = ?1"),
                params![id],
                read_raw_tx,
            )
            .optional()
            .map_err(map_sql)?;
        raw.map(decode_tx).transpose()
    }

    async fn list_transactions(
        &self,
        kind: Option<TransactionKind>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> CoreResult<Vec<TransactionRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut sql = format!("SELECT {TX_COLUMNS} FROM transactions WHERE 1=1");
        let mut args: Vec<String> = Vec::new();
        if let Some(k) = kind {
            args.push(k.as_str().to_string());
            sql.push_str(&format!(" AND kind = ?{}", args.len()));
        }
        if let Some(f) = from {
            args.push(f.format(DATE_FMT).to_string());
            sql.push_str(&format!(" AND date >= ?{}", args.len()));
        }
        if let Some(t) = to {
            args.push(t.format(DATE_FMT).to_string());
            sql.push_str(&format!(" AND date <= ?{}", args.len()));
        }
        sql.push_str(" ORDER BY date, created_at");
        let mut stmt = conn.prepare(&sql).map_err(map_sql)?;
        let raws = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), read_raw_tx)
            .map_err(map_sql)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sql)?;
        raws.into_iter().map(decode_tx).collect()
    }

    async fn update_sync_state(&self, id: &str, state: SyncState) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let current: Option<i64> = conn
            .query_row(
                "SELECT sync_state FROM transactions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql)?;
        let current =
            current.ok_or_else(|| CoreError::Storage(format!("transaction '{id}' not found")))?;
        if SyncState::from_flag(current) == SyncState::Synced && state != SyncState::Synced {
            return Err(CoreError::DataIntegrity(format!(
                "transaction '{id}' is already synced"
            )));
        }
        conn.execute(
            "UPDATE transactions SET sync_state = ?1 WHERE id = ?2",
            params![state.as_flag(), id],
        )
        .map_err(map_sql)?;
        Ok(())
    }

    async fn totals_by_category(
        &self,
        kind: TransactionKind,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> CoreResult<HashMap<String, BigDecimal>> {
        // amounts are TEXT, so the grouping happens in SQL but the exact sum
        // happens here
        let records = self.list_transactions(Some(kind), from, to).await?;
        let mut totals: HashMap<String, BigDecimal> = HashMap::new();
        for record in records {
            let category = record
                .category
                .unwrap_or_else(|| "Uncategorized".to_string());
            *totals.entry(category).or_insert_with(|| BigDecimal::from(0)) += &record.total;
        }
        Ok(totals)
    }

    async fn counts_by_sync_state(&self) -> CoreResult<HashMap<SyncState, usize>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT sync_state, COUNT(*) FROM transactions GROUP BY sync_state")
            .map_err(map_sql)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
            .map_err(map_sql)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sql)?;
        Ok(rows
            .into_iter()
            .map(|(flag, count)| (SyncState::from_flag(flag), count as usize))
            .collect())
    }

    async fn next_invoice_number(&self, prefix: &str, financial_year: &str) -> CoreResult<String> {
        let conn = self.conn.lock().unwrap();
        let scope = format!("{prefix}/{financial_year}/%");
        let mut stmt = conn
            .prepare("SELECT reference FROM transactions WHERE reference LIKE ?1")
            .map_err(map_sql)?;
        let references = stmt
            .query_map(params![scope], |row| row.get::<_, String>(0))
            .map_err(map_sql)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sql)?;
        let highest = references
            .iter()
            .filter_map(|r| parse_invoice_sequence(r, prefix, financial_year))
            .max()
            .unwrap_or(0);
        Ok(format_invoice(prefix, financial_year, highest + 1))
    }

    async fn sum_payments_to_payee(
        &self,
        section: &str,
        payee_pan: &str,
        financial_year: &str,
    ) -> CoreResult<BigDecimal> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT total, tds FROM transactions WHERE tds IS NOT NULL")
            .map_err(map_sql)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(map_sql)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sql)?;
        let mut sum = BigDecimal::from(0);
        for (total, tds_json) in rows {
            let detail: TdsDetail = serde_json::from_str(&tds_json)
                .map_err(|e| CoreError::DataIntegrity(format!("bad TDS JSON: {e}")))?;
            if detail.section == section
                && detail.payee_pan == payee_pan
                && detail.financial_year == financial_year
            {
                sum += parse_dec(&total, "total")?;
            }
        }
        Ok(sum)
    }

    async fn insert_bank_line(&self, line: &BankStatementLine) -> CoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO bank_lines (date, description, debit, credit, balance, category, \
             voucher_type) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                line.date.format(DATE_FMT).to_string(),
                line.description,
                line.debit.to_string(),
                line.credit.to_string(),
                line.balance.to_string(),
                line.category,
                line.voucher_type.as_str(),
            ],
        )
        .map_err(map_sql)?;
        Ok(conn.last_insert_rowid())
    }

    async fn list_bank_lines(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        category: Option<&str>,
    ) -> CoreResult<Vec<BankStatementLine>> {
        let conn = self.conn.lock().unwrap();
        let mut sql = String::from(
            "SELECT id, date, description, debit, credit, balance, category, voucher_type \
             FROM bank_lines WHERE 1=1",
        );
        let mut args: Vec<String> = Vec::new();
        if let Some(f) = from {
            args.push(f.format(DATE_FMT).to_string());
            sql.push_str(&format!(" AND date >= ?{}", args.len()));
        }
        if let Some(t) = to {
            args.push(t.format(DATE_FMT).to_string());
            sql.push_str(&format!(" AND date <= ?{}", args.len()));
        }
        if let Some(c) = category {
            args.push(c.to_string());
            sql.push_str(&format!(" AND category = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY date, id");
        let mut stmt = conn.prepare(&sql).map_err(map_sql)?;
        let raws = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), read_raw_bank_line)
            .map_err(map_sql)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sql)?;
        raws.into_iter().map(decode_bank_line).collect()
    }

    async fn get_setting(&self, key: &str) -> CoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_sql)
    }

    async fn set_setting(&self, key: &str, value: &str) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(map_sql)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sale(party: &str, reference: &str, total: i64, date: NaiveDate) -> TransactionRecord {
        let mut r = TransactionRecord::new(TransactionKind::Sale, party, date);
        r.reference = Some(reference.to_string());
        r.total = BigDecimal::from(total);
        r
    }

    #[tokio::test]
    async fn test_round_trip_with_items_and_tds() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut record = sale("Acme Traders", "INV/2025-26/001", 1180, d(2025, 6, 1));
        record.party_gstin = Some("29ABCDE1234F1Z5".to_string());
        record.items = vec![LineItem::new(
            "Widgets",
            BigDecimal::from(2),
            BigDecimal::from(500),
        )];
        record.subtotal = BigDecimal::from(1000);
        record.cgst = BigDecimal::from(90);
        record.sgst = BigDecimal::from(90);
        record.tds = Some(TdsDetail {
            section: "194C".to_string(),
            payee_pan: "ABCPD1234E".to_string(),
            rate: BigDecimal::from(1),
            tds_amount: BigDecimal::from(10),
            net_payable: BigDecimal::from(990),
            quarter: "Q1".to_string(),
            financial_year: "2025-26".to_string(),
        });
        store.insert_transaction(&record).await.unwrap();
        let fetched = store.get_transaction(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn test_duplicate_reference_is_data_integrity() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_transaction(&sale("Acme", "INV/2025-26/001", 100, d(2025, 6, 1)))
            .await
            .unwrap();
        let err = store
            .insert_transaction(&sale("Beta", "INV/2025-26/001", 200, d(2025, 6, 2)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn test_synced_guard_persists() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = sale("Acme", "INV/2025-26/001", 100, d(2025, 6, 1));
        store.insert_transaction(&record).await.unwrap();
        store
            .update_sync_state(&record.id, SyncState::Failed)
            .await
            .unwrap();
        store
            .update_sync_state(&record.id, SyncState::Synced)
            .await
            .unwrap();
        let err = store
            .update_sync_state(&record.id, SyncState::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn test_invoice_sequence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert_transaction(&sale("Acme", "INV/2025-26/004", 100, d(2025, 6, 1)))
                .await
                .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.next_invoice_number("INV", "2025-26").await.unwrap(),
            "INV/2025-26/005"
        );
    }

    #[tokio::test]
    async fn test_bank_lines_filtering() {
        let store = SqliteStore::open_in_memory().unwrap();
        let line = BankStatementLine {
            id: None,
            date: d(2025, 5, 3),
            description: "NEFT CR FROM XYZ".to_string(),
            debit: BigDecimal::from(0),
            credit: BigDecimal::from(25000),
            balance: BigDecimal::from(125000),
            category: "Sales Receipt".to_string(),
            voucher_type: VoucherType::Receipt,
        };
        let id = store.insert_bank_line(&line).await.unwrap();
        assert!(id > 0);
        let matched = store
            .list_bank_lines(None, None, Some("Sales Receipt"))
            .await
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, Some(id));
        let none = store
            .list_bank_lines(None, None, Some("Payment"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_counts_by_sync_state() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..3 {
            let r = sale("Acme", &format!("INV/2025-26/00{i}"), 100, d(2025, 6, 1));
            store.insert_transaction(&r).await.unwrap();
            if i == 0 {
                store
                    .update_sync_state(&r.id, SyncState::Synced)
                    .await
                    .unwrap();
            }
        }
        let counts = store.counts_by_sync_state().await.unwrap();
        assert_eq!(counts[&SyncState::Pending], 2);
        assert_eq!(counts[&SyncState::Synced], 1);
    }
}
