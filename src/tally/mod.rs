//! TallyPrime integration: XML envelopes over HTTP, ledger masters,
//! voucher submission and report exports.

pub mod client;
pub mod masters;
pub mod reports;
pub mod vouchers;
pub mod xml;

pub use client::{ClientConfig, TallyClient};
pub use masters::LedgerInfo;
pub use vouchers::voucher_xml;

use async_trait::async_trait;

use crate::traits::LedgerGateway;
use crate::types::{SubmitOutcome, Voucher};

/// Classify an import response body.
///
/// Tally acknowledges success with a CREATED or ACCEPTED counter somewhere
/// in the envelope; anything else is a rejection, with LINEERROR carrying
/// the reason when present.
pub(crate) fn classify_import_response(body: &str) -> SubmitOutcome {
    let upper = body.to_uppercase();
    if upper.contains("CREATED") || upper.contains("ACCEPTED") {
        return SubmitOutcome::Accepted;
    }
    let reason = xml::text_of(body, "LINEERROR")
        .unwrap_or_else(|| "request was not accepted".to_string());
    SubmitOutcome::Rejected { reason }
}

#[async_trait]
impl LedgerGateway for TallyClient {
    async fn is_connected(&self) -> bool {
        self.probe().await
    }

    async fn ensure_ledger(&self, name: &str, parent_group: &str) -> bool {
        match self.ensure_ledger_master(name, parent_group, None).await {
            Ok(exists) => exists,
            Err(err) => {
                tracing::warn!(ledger = name, error = %err, "could not ensure ledger master");
                false
            }
        }
    }

    async fn submit_voucher(&self, voucher: &Voucher) -> SubmitOutcome {
        self.post_voucher(voucher).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_created() {
        let body = "<ENVELOPE><IMPORTRESULT><CREATED>1</CREATED></IMPORTRESULT></ENVELOPE>";
        assert_eq!(classify_import_response(body), SubmitOutcome::Accepted);
    }

    #[test]
    fn test_classify_accepted_case_insensitive() {
        let body = "<envelope><accepted>1</accepted></envelope>";
        assert_eq!(classify_import_response(body), SubmitOutcome::Accepted);
    }

    #[test]
    fn test_classify_rejection_with_reason() {
        let body = "<ENVELOPE><LINEERROR>Ledger 'Sales' does not exist!</LINEERROR></ENVELOPE>";
        match classify_import_response(body) {
            SubmitOutcome::Rejected { reason } => {
                assert_eq!(reason, "Ledger 'Sales' does not exist!");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_rejection_without_reason() {
        let body = "<ENVELOPE></ENVELOPE>";
        assert!(matches!(
            classify_import_response(body),
            SubmitOutcome::Rejected { .. }
        ));
    }
}
