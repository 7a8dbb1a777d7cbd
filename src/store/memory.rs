//! In-memory transaction store, used in tests and as the reference
//! implementation of the storage contract.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::traits::TransactionStore;
use crate::types::*;

use super::{format_invoice, parse_invoice_sequence};

#[derive(Default)]
struct Inner {
    transactions: HashMap<String, TransactionRecord>,
    bank_lines: Vec<BankStatementLine>,
    settings: HashMap<String, String>,
    next_bank_id: i64,
}

/// Thread-safe in-memory store
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_bank_id: 1,
                ..Inner::default()
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn in_range(date: NaiveDate, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t)
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert_transaction(&self, record: &TransactionRecord) -> CoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        if let Some(reference) = &record.reference {
            let taken = inner
                .transactions
                .values()
                .any(|t| t.kind == record.kind && t.reference.as_deref() == Some(reference));
            if taken {
                return Err(CoreError::DataIntegrity(format!(
                    "reference '{reference}' already exists"
                )));
            }
        }
        inner
            .transactions
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_transaction(&self, id: &str) -> CoreResult<Option<TransactionRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.transactions.get(id).cloned())
    }

    async fn list_transactions(
        &self,
        kind: Option<TransactionKind>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> CoreResult<Vec<TransactionRecord>> {
        let inner = self.inner.read().unwrap();
        let mut records: Vec<TransactionRecord> = inner
            .transactions
            .values()
            .filter(|t| kind.map_or(true, |k| t.kind == k))
            .filter(|t| in_range(t.date, from, to))
            .cloned()
            .collect();
        records.sort_by(|a, b| (a.date, &a.created_at).cmp(&(b.date, &b.created_at)));
        Ok(records)
    }

    async fn update_sync_state(&self, id: &str, state: SyncState) -> CoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        let record = inner
            .transactions
            .get_mut(id)
            .ok_or_else(|| CoreError::Storage(format!("transaction '{id}' not found")))?;
        if record.sync_state == SyncState::Synced && state != SyncState::Synced {
            return Err(CoreError::DataIntegrity(format!(
                "transaction '{id}' is already synced"
            )));
        }
        record.sync_state = state;
        Ok(())
    }

    async fn totals_by_category(
        &self,
        kind: TransactionKind,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> CoreResult<HashMap<String, BigDecimal>> {
        let inner = self.inner.read().unwrap();
        let mut totals: HashMap<String, BigDecimal> = HashMap::new();
        for record in inner.transactions.values() {
            if record.kind != kind || !in_range(record.date, from, to) {
                continue;
            }
            let category = record
                .category
                .clone()
                .unwrap_or_else(|| "Uncategorized".to_string());
            *totals.entry(category).or_insert_with(|| BigDecimal::from(0)) += &record.total;
        }
        Ok(totals)
    }

    async fn counts_by_sync_state(&self) -> CoreResult<HashMap<SyncState, usize>> {
        let inner = self.inner.read().unwrap();
        let mut counts = HashMap::new();
        for record in inner.transactions.values() {
            *counts.entry(record.sync_state).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn next_invoice_number(&self, prefix: &str, financial_year: &str) -> CoreResult<String> {
        let inner = self.inner.read().unwrap();
        let highest = inner
            .transactions
            .values()
            .filter_map(|t| t.reference.as_deref())
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
        let inner = self.inner.read().unwrap();
        let sum = inner
            .transactions
            .values()
            .filter_map(|t| t.tds.as_ref().map(|d| (t, d)))
            .filter(|(_, d)| {
                d.section == section
                    && d.payee_pan == payee_pan
                    && d.financial_year == financial_year
            })
            .map(|(t, _)| &t.total)
            .sum();
        Ok(sum)
    }

    async fn insert_bank_line(&self, line: &BankStatementLine) -> CoreResult<i64> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next_bank_id;
        inner.next_bank_id += 1;
        let mut stored = line.clone();
        stored.id = Some(id);
        inner.bank_lines.push(stored);
        Ok(id)
    }

    async fn list_bank_lines(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        category: Option<&str>,
    ) -> CoreResult<Vec<BankStatementLine>> {
        let inner = self.inner.read().unwrap();
        let mut lines: Vec<BankStatementLine> = inner
            .bank_lines
            .iter()
            .filter(|l| in_range(l.date, from, to))
            .filter(|l| category.map_or(true, |c| l.category == c))
            .cloned()
            .collect();
        lines.sort_by(|a, b| (a.date, a.id).cmp(&(b.date, b.id)));
        Ok(lines)
    }

    async fn get_setting(&self, key: &str) -> CoreResult<Option<String>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        inner.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sale(party: &str, reference: &str, total: &str, date: NaiveDate) -> TransactionRecord {
        let mut r = TransactionRecord::new(TransactionKind::Sale, party, date);
        r.reference = Some(reference.to_string());
        r.total = BigDecimal::from_str(total).unwrap();
        r
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        let record = sale("Acme", "INV/2025-26/001", "1180", d(2025, 6, 1));
        store.insert_transaction(&record).await.unwrap();
        let fetched = store.get_transaction(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.party, "Acme");
        assert_eq!(fetched.sync_state, SyncState::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected() {
        let store = MemoryStore::new();
        store
            .insert_transaction(&sale("Acme", "INV/2025-26/001", "100", d(2025, 6, 1)))
            .await
            .unwrap();
        let err = store
            .insert_transaction(&sale("Other", "INV/2025-26/001", "200", d(2025, 6, 2)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn test_synced_is_terminal() {
        let store = MemoryStore::new();
        let record = sale("Acme", "INV/2025-26/001", "100", d(2025, 6, 1));
        store.insert_transaction(&record).await.unwrap();
        store
            .update_sync_state(&record.id, SyncState::Synced)
            .await
            .unwrap();
        let err = store
            .update_sync_state(&record.id, SyncState::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[tokio::test]
    async fn test_failed_can_retry() {
        let store = MemoryStore::new();
        let record = sale("Acme", "INV/2025-26/001", "100", d(2025, 6, 1));
        store.insert_transaction(&record).await.unwrap();
        store
            .update_sync_state(&record.id, SyncState::Failed)
            .await
            .unwrap();
        store
            .update_sync_state(&record.id, SyncState::Synced)
            .await
            .unwrap();
        let fetched = store.get_transaction(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.sync_state, SyncState::Synced);
    }

    #[tokio::test]
    async fn test_next_invoice_number_increments() {
        let store = MemoryStore::new();
        assert_eq!(
            store.next_invoice_number("INV", "2025-26").await.unwrap(),
            "INV/2025-26/001"
        );
        store
            .insert_transaction(&sale("Acme", "INV/2025-26/001", "100", d(2025, 6, 1)))
            .await
            .unwrap();
        store
            .insert_transaction(&sale("Beta", "INV/2025-26/007", "100", d(2025, 6, 2)))
            .await
            .unwrap();
        assert_eq!(
            store.next_invoice_number("INV", "2025-26").await.unwrap(),
            "INV/2025-26/008"
        );
        // a different financial year starts a fresh sequence
        assert_eq!(
            store.next_invoice_number("INV", "2026-27").await.unwrap(),
            "INV/2026-27/001"
        );
    }

    #[tokio::test]
    async fn test_list_filters_by_kind_and_range() {
        let store = MemoryStore::new();
        store
            .insert_transaction(&sale("Acme", "INV/2025-26/001", "100", d(2025, 6, 1)))
            .await
            .unwrap();
        let mut expense = TransactionRecord::new(TransactionKind::Expense, "Vendor", d(2025, 7, 1));
        expense.category = Some("Rent".to_string());
        expense.total = BigDecimal::from(5000);
        store.insert_transaction(&expense).await.unwrap();

        let sales = store
            .list_transactions(Some(TransactionKind::Sale), None, None)
            .await
            .unwrap();
        assert_eq!(sales.len(), 1);
        let july = store
            .list_transactions(None, Some(d(2025, 7, 1)), Some(d(2025, 7, 31)))
            .await
            .unwrap();
        assert_eq!(july.len(), 1);
        assert_eq!(july[0].kind, TransactionKind::Expense);
    }

    #[tokio::test]
    async fn test_totals_by_category() {
        let store = MemoryStore::new();
        for (category, amount) in [("Rent", 5000), ("Rent", 2500), ("Travel", 1200)] {
            let mut r = TransactionRecord::new(TransactionKind::Expense, "Vendor", d(2025, 7, 1));
            r.category = Some(category.to_string());
            r.total = BigDecimal::from(amount);
            store.insert_transaction(&r).await.unwrap();
        }
        let totals = store
            .totals_by_category(TransactionKind::Expense, None, None)
            .await
            .unwrap();
        assert_eq!(totals["Rent"], BigDecimal::from(7500));
        assert_eq!(totals["Travel"], BigDecimal::from(1200));
    }

    #[tokio::test]
    async fn test_sum_payments_to_payee_scoped_by_fy() {
        let store = MemoryStore::new();
        for (fy, gross) in [("2025-26", "20000"), ("2025-26", "15000"), ("2024-25", "90000")] {
            let mut r = TransactionRecord::new(TransactionKind::TdsEntry, "Contractor", d(2025, 7, 1));
            r.total = BigDecimal::from_str(gross).unwrap();
            r.tds = Some(TdsDetail {
                section: "194C".to_string(),
                payee_pan: "ABCPD1234E".to_string(),
                rate: BigDecimal::from(1),
                tds_amount: BigDecimal::from(0),
                net_payable: BigDecimal::from(0),
                quarter: "Q2".to_string(),
                financial_year: fy.to_string(),
            });
            store.insert_transaction(&r).await.unwrap();
        }
        let sum = store
            .sum_payments_to_payee("194C", "ABCPD1234E", "2025-26")
            .await
            .unwrap();
        assert_eq!(sum, BigDecimal::from(35000));
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get_setting("company_gstin").await.unwrap().is_none());
        store
            .set_setting("company_gstin", "29ABCDE1234F1Z5")
            .await
            .unwrap();
        assert_eq!(
            store.get_setting("company_gstin").await.unwrap().as_deref(),
            Some("29ABCDE1234F1Z5")
        );
    }
}
