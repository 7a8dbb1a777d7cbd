//! The posting engine: records business events locally first, then pushes
//! them to the external ledger when it is reachable.
//!
//! Local persistence always happens before any network call, and a network
//! failure never unwinds a local write. Sync is driven off the stored
//! `SyncState`, so a crashed or offline session picks up where it left off.

use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::bank::{self, BankClassifier, RawStatementRow, Reconciliation};
use crate::tax::{
    calculate_gst_from_gstins, calculate_tds, check_threshold, PayeeType, TaxBreakdown, TdsCalc,
    ThresholdCheck,
};
use crate::traits::{LedgerGateway, TransactionStore};
use crate::types::*;
use crate::utils::period::{financial_year, quarter};
use crate::utils::validation::{
    validate_gstin, validate_name, validate_pan, validate_positive_amount,
};
use crate::voucher;

/// Settings key holding the company's own GSTIN
pub const COMPANY_GSTIN_KEY: &str = "company_gstin";

/// Invoice number prefix used for sales
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

/// Retry policy for batch synchronization. Backoff applies only to
/// transport failures; a rejection is final until the operator intervenes.
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// What the caller gets back after recording an event
#[derive(Debug, Clone)]
pub struct PostingReceipt {
    pub transaction_id: String,
    pub reference: Option<String>,
    pub total: BigDecimal,
    pub sync_state: SyncState,
    /// Operator-facing status line
    pub message: String,
}

/// What the caller gets back after recording a payment under TDS
#[derive(Debug)]
pub struct TdsPostingReceipt {
    pub receipt: PostingReceipt,
    pub threshold: ThresholdCheck,
    /// Present only when TDS actually applied
    pub tds: Option<TdsCalc>,
}

/// Batch sync outcome
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
}

/// Bank statement import outcome
#[derive(Debug)]
pub struct BankImportReport {
    pub imported: Vec<BankStatementLine>,
    pub skipped: usize,
    pub reconciliation: Option<Reconciliation>,
}

/// A sales invoice to record
#[derive(Debug, Clone)]
pub struct SaleInput {
    pub customer: String,
    pub customer_gstin: Option<String>,
    pub items: Vec<LineItem>,
    /// GST rate in percent, from the slab set
    pub gst_rate: BigDecimal,
    pub date: NaiveDate,
}

/// A purchase bill to record
#[derive(Debug, Clone)]
pub struct PurchaseInput {
    pub vendor: String,
    pub vendor_gstin: Option<String>,
    /// Vendor's bill number
    pub reference: String,
    pub items: Vec<LineItem>,
    pub gst_rate: BigDecimal,
    pub date: NaiveDate,
}

/// An expense to accrue
#[derive(Debug, Clone)]
pub struct ExpenseInput {
    pub vendor: String,
    pub category: String,
    pub amount: BigDecimal,
    pub description: String,
    pub date: NaiveDate,
}

/// A payment to a payee with potential TDS withholding
#[derive(Debug, Clone)]
pub struct TdsPaymentInput {
    pub payee: String,
    pub payee_pan: String,
    pub section: String,
    pub payee_type: PayeeType,
    /// Gross amount before withholding
    pub amount: BigDecimal,
    pub date: NaiveDate,
}

/// Orchestrates tax computation, local persistence and ledger sync
pub struct PostingEngine<S, G> {
    store: S,
    gateway: G,
    classifier: BankClassifier,
    invoice_prefix: String,
}

impl<S, G> PostingEngine<S, G>
where
    S: TransactionStore,
    G: LedgerGateway,
{
    pub fn new(store: S, gateway: G) -> Self {
        Self {
            store,
            gateway,
            classifier: BankClassifier::default(),
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
        }
    }

    pub fn with_invoice_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.invoice_prefix = prefix.into();
        self
    }

    pub fn with_classifier(mut self, classifier: BankClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record the company's own GSTIN, used to decide intra vs inter-state
    pub async fn set_company_gstin(&self, gstin: &str) -> CoreResult<()> {
        if !validate_gstin(gstin) {
            return Err(CoreError::Validation(format!("invalid GSTIN '{gstin}'")));
        }
        self.store.set_setting(COMPANY_GSTIN_KEY, gstin).await
    }

    pub async fn company_gstin(&self) -> CoreResult<Option<String>> {
        self.store.get_setting(COMPANY_GSTIN_KEY).await
    }

    /// Record a sales invoice: compute GST, issue the next invoice number,
    /// persist, then push to the ledger if it is reachable.
    pub async fn record_sale(&self, input: SaleInput) -> CoreResult<PostingReceipt> {
        validate_name(&input.customer, "customer name")?;
        let subtotal = self.validated_subtotal(&input.items)?;
        if let Some(gstin) = &input.customer_gstin {
            if !validate_gstin(gstin) {
                return Err(CoreError::Validation(format!("invalid GSTIN '{gstin}'")));
            }
        }
        let company_gstin = self.company_gstin().await?;
        let breakdown = calculate_gst_from_gstins(
            &subtotal,
            &input.gst_rate,
            company_gstin.as_deref(),
            input.customer_gstin.as_deref(),
        )?;

        let fy = financial_year(input.date);
        let invoice_no = self
            .store
            .next_invoice_number(&self.invoice_prefix, &fy)
            .await?;

        let mut record = TransactionRecord::new(TransactionKind::Sale, &input.customer, input.date);
        record.party_gstin = input.customer_gstin.clone();
        record.reference = Some(invoice_no);
        record.items = input.items;
        apply_breakdown(&mut record, &breakdown);

        self.persist_and_push(record).await
    }

    /// Record a purchase bill against the vendor's invoice number
    pub async fn record_purchase(&self, input: PurchaseInput) -> CoreResult<PostingReceipt> {
        validate_name(&input.vendor, "vendor name")?;
        validate_name(&input.reference, "bill reference")?;
        let subtotal = self.validated_subtotal(&input.items)?;
        if let Some(gstin) = &input.vendor_gstin {
            if !validate_gstin(gstin) {
                return Err(CoreError::Validation(format!("invalid GSTIN '{gstin}'")));
            }
        }
        let company_gstin = self.company_gstin().await?;
        // vendor is the supplier on a purchase
        let breakdown = calculate_gst_from_gstins(
            &subtotal,
            &input.gst_rate,
            input.vendor_gstin.as_deref(),
            company_gstin.as_deref(),
        )?;

        let mut record =
            TransactionRecord::new(TransactionKind::Purchase, &input.vendor, input.date);
        record.party_gstin = input.vendor_gstin.clone();
        record.reference = Some(input.reference);
        record.items = input.items;
        apply_breakdown(&mut record, &breakdown);

        self.persist_and_push(record).await
    }

    /// Accrue an expense under a category
    pub async fn record_expense(&self, input: ExpenseInput) -> CoreResult<PostingReceipt> {
        validate_name(&input.vendor, "vendor name")?;
        validate_name(&input.category, "expense category")?;
        validate_positive_amount(&input.amount, "expense amount")?;

        let mut record =
            TransactionRecord::new(TransactionKind::Expense, &input.vendor, input.date);
        record.category = Some(input.category);
        record.reference = Some(input.description);
        let amount = round_money(&input.amount);
        record.subtotal = amount.clone();
        record.total = amount;

        self.persist_and_push(record).await
    }

    /// Settle an accrued expense out of a bank or cash ledger
    pub async fn pay_expense(
        &self,
        vendor: &str,
        paid_from: &str,
        amount: &BigDecimal,
        date: NaiveDate,
    ) -> CoreResult<PostingReceipt> {
        validate_name(vendor, "vendor name")?;
        validate_name(paid_from, "paying ledger")?;
        validate_positive_amount(amount, "payment amount")?;

        let mut record = TransactionRecord::new(TransactionKind::Payment, vendor, date);
        record.category = Some(paid_from.to_string());
        let amount = round_money(amount);
        record.subtotal = amount.clone();
        record.total = amount;

        self.persist_and_push(record).await
    }

    /// Record a payment checking TDS applicability first. Below both
    /// thresholds the payment is recorded without withholding.
    pub async fn record_tds_payment(
        &self,
        input: TdsPaymentInput,
    ) -> CoreResult<TdsPostingReceipt> {
        validate_name(&input.payee, "payee name")?;
        validate_positive_amount(&input.amount, "payment amount")?;
        if !validate_pan(&input.payee_pan) {
            return Err(CoreError::Validation(format!(
                "invalid PAN '{}'",
                input.payee_pan
            )));
        }

        let threshold = check_threshold(
            &self.store,
            &input.section,
            &input.payee_pan,
            &input.amount,
            input.date,
        )
        .await?;

        let gross = round_money(&input.amount);
        let (mut record, tds_calc) = if threshold.tds_applicable {
            let calc = calculate_tds(&input.section, &gross, input.payee_type)?;
            let mut record =
                TransactionRecord::new(TransactionKind::TdsEntry, &input.payee, input.date);
            record.tds = Some(TdsDetail {
                section: calc.section.clone(),
                payee_pan: input.payee_pan.clone(),
                rate: calc.rate.clone(),
                tds_amount: calc.tds_amount.clone(),
                net_payable: calc.net_payable.clone(),
                quarter: quarter(input.date).to_string(),
                financial_year: financial_year(input.date),
            });
            (record, Some(calc))
        } else {
            let mut record =
                TransactionRecord::new(TransactionKind::Payment, &input.payee, input.date);
            record.category = Some("Bank".to_string());
            // below both thresholds: no withholding, but the payment still
            // counts toward the payee's financial-year aggregate
            record.tds = Some(TdsDetail {
                section: input.section.clone(),
                payee_pan: input.payee_pan.clone(),
                rate: BigDecimal::from(0),
                tds_amount: BigDecimal::from(0),
                net_payable: gross.clone(),
                quarter: quarter(input.date).to_string(),
                financial_year: financial_year(input.date),
            });
            (record, None)
        };
        record.subtotal = gross.clone();
        record.total = gross;

        let receipt = self.persist_and_push(record).await?;
        Ok(TdsPostingReceipt {
            receipt,
            threshold,
            tds: tds_calc,
        })
    }

    /// Parse, classify and persist a batch of raw statement rows. When both
    /// balances are given the import also reports reconciliation.
    pub async fn import_bank_statement(
        &self,
        rows: &[RawStatementRow],
        opening_balance: Option<&BigDecimal>,
        closing_balance: Option<&BigDecimal>,
    ) -> CoreResult<BankImportReport> {
        let parsed = bank::import_rows(rows, &self.classifier);
        let mut imported = Vec::with_capacity(parsed.lines.len());
        for line in parsed.lines {
            let id = self.store.insert_bank_line(&line).await?;
            let mut stored = line;
            stored.id = Some(id);
            imported.push(stored);
        }
        tracing::info!(
            imported = imported.len(),
            skipped = parsed.skipped,
            "bank statement imported"
        );
        let reconciliation = match (opening_balance, closing_balance) {
            (Some(opening), Some(closing)) => Some(bank::reconcile(&imported, opening, closing)),
            _ => None,
        };
        Ok(BankImportReport {
            imported,
            skipped: parsed.skipped,
            reconciliation,
        })
    }

    /// Turn one imported statement line into a transaction and push it
    pub async fn post_bank_line(&self, line: &BankStatementLine) -> CoreResult<PostingReceipt> {
        let zero = BigDecimal::from(0);
        if line.debit == zero && line.credit == zero {
            return Err(CoreError::Validation(
                "bank line has neither a debit nor a credit amount".to_string(),
            ));
        }
        let mut record =
            TransactionRecord::new(TransactionKind::BankEntry, &line.category, line.date);
        record.category = Some(line.category.clone());
        record.reference = Some(line.description.clone());
        // convention shared with the voucher mapping: subtotal carries the
        // debit side, total the credit side
        record.subtotal = round_money(&line.debit);
        record.total = round_money(&line.credit);

        self.persist_and_push(record).await
    }

    /// Submit one stored transaction to the ledger. A record already marked
    /// Synced is rejected locally, before any network traffic.
    pub async fn sync_transaction(&self, id: &str) -> CoreResult<SyncState> {
        match self.sync_once(id).await? {
            SubmitOutcome::Accepted => Ok(SyncState::Synced),
            _ => Ok(SyncState::Failed),
        }
    }

    /// Push everything Pending or Failed, with capped exponential backoff
    /// on transport failures. Rejections are not retried.
    pub async fn sync_pending(&self, policy: &SyncPolicy) -> CoreResult<SyncReport> {
        let mut report = SyncReport::default();
        let records = self.store.list_transactions(None, None, None).await?;
        for record in records {
            if record.sync_state == SyncState::Synced {
                continue;
            }
            report.attempted += 1;
            let mut delay = policy.base_delay;
            let mut attempt = 0;
            loop {
                attempt += 1;
                match self.sync_once(&record.id).await? {
                    SubmitOutcome::Accepted => {
                        report.synced += 1;
                        break;
                    }
                    SubmitOutcome::Rejected { .. } => {
                        report.failed += 1;
                        break;
                    }
                    SubmitOutcome::TransportFailure { .. } => {
                        if attempt >= policy.max_attempts {
                            report.failed += 1;
                            break;
                        }
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(policy.max_delay);
                    }
                }
            }
        }
        tracing::info!(
            attempted = report.attempted,
            synced = report.synced,
            failed = report.failed,
            "sync batch finished"
        );
        Ok(report)
    }

    /// Counts of stored transactions by sync state
    pub async fn sync_status(&self) -> CoreResult<std::collections::HashMap<SyncState, usize>> {
        self.store.counts_by_sync_state().await
    }

    fn validated_subtotal(&self, items: &[LineItem]) -> CoreResult<BigDecimal> {
        if items.is_empty() {
            return Err(CoreError::Validation(
                "at least one line item is required".to_string(),
            ));
        }
        let mut subtotal = BigDecimal::from(0);
        for item in items {
            validate_name(&item.description, "item description")?;
            validate_positive_amount(&item.amount, "item amount")?;
            subtotal += &item.amount;
        }
        Ok(round_money(&subtotal))
    }

    /// Insert the record, then push it if the ledger answers a probe.
    /// Failure to push never fails the recording.
    async fn persist_and_push(&self, record: TransactionRecord) -> CoreResult<PostingReceipt> {
        self.store.insert_transaction(&record).await?;
        tracing::info!(
            id = %record.id,
            kind = record.kind.as_str(),
            total = %record.total,
            "transaction recorded"
        );

        let sync_state = if self.gateway.is_connected().await {
            self.sync_transaction(&record.id).await?
        } else {
            SyncState::Pending
        };
        let message = match sync_state {
            SyncState::Synced => "posted to the ledger".to_string(),
            SyncState::Pending => {
                "saved locally; will sync when the ledger is reachable".to_string()
            }
            SyncState::Failed => "saved locally; ledger submission failed".to_string(),
        };
        Ok(PostingReceipt {
            transaction_id: record.id,
            reference: record.reference,
            total: record.total,
            sync_state,
            message,
        })
    }

    async fn sync_once(&self, id: &str) -> CoreResult<SubmitOutcome> {
        let record = self
            .store
            .get_transaction(id)
            .await?
            .ok_or_else(|| CoreError::Storage(format!("transaction '{id}' not found")))?;
        if record.sync_state == SyncState::Synced {
            return Err(CoreError::DataIntegrity(format!(
                "transaction '{id}' is already synced"
            )));
        }

        let voucher = voucher::build_for_record(&record)?;
        for master in &voucher.masters {
            if !self
                .gateway
                .ensure_ledger(&master.name, &master.parent_group)
                .await
            {
                // submission itself will name the missing ledger
                tracing::warn!(ledger = %master.name, "ledger master not confirmed");
            }
        }

        let outcome = self.gateway.submit_voucher(&voucher).await;
        match &outcome {
            SubmitOutcome::Accepted => {
                self.store.update_sync_state(id, SyncState::Synced).await?;
                tracing::info!(id, "voucher accepted by the ledger");
            }
            SubmitOutcome::Rejected { reason } => {
                self.store.update_sync_state(id, SyncState::Failed).await?;
                tracing::warn!(id, %reason, "voucher rejected by the ledger");
            }
            SubmitOutcome::TransportFailure { kind } => {
                self.store.update_sync_state(id, SyncState::Failed).await?;
                tracing::warn!(id, error = %kind, "voucher submission failed in transport");
            }
        }
        Ok(outcome)
    }
}

fn apply_breakdown(record: &mut TransactionRecord, breakdown: &TaxBreakdown) {
    record.subtotal = breakdown.taxable_value.clone();
    record.cgst = breakdown.cgst.clone();
    record.sgst = breakdown.sgst.clone();
    record.igst = breakdown.igst.clone();
    record.total = breakdown.total.clone();
}
