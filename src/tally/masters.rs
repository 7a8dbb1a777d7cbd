//! Ledger and stock master operations

use bigdecimal::BigDecimal;

use crate::types::{CoreError, CoreResult, SubmitOutcome};

use super::client::{export_request, import_request, TallyClient};
use super::xml::{text_of, RequestBuilder};
use super::classify_import_response;

/// What Tally reports about an existing ledger master
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerInfo {
    pub name: String,
    pub parent: String,
}

impl TallyClient {
    /// Look up one ledger master by name
    pub async fn get_ledger(&self, name: &str) -> CoreResult<Option<LedgerInfo>> {
        let request = export_request("Collection", "LedgerMaster", &[("LEDGERNAME", name)]);
        let body = self.send(request).await.map_err(CoreError::Transport)?;
        let upper = body.to_uppercase();
        if !upper.contains("<LEDGER") {
            return Ok(None);
        }
        let found = text_of(&body, "NAME").unwrap_or_else(|| name.to_string());
        let parent = text_of(&body, "PARENT").unwrap_or_default();
        Ok(Some(LedgerInfo {
            name: found,
            parent,
        }))
    }

    pub async fn ledger_exists(&self, name: &str) -> CoreResult<bool> {
        Ok(self.get_ledger(name).await?.is_some())
    }

    /// Create a ledger master under the given parent group. Party ledgers
    /// carry their GSTIN so Tally can apply GST classifications.
    pub async fn create_ledger(
        &self,
        name: &str,
        parent_group: &str,
        opening_balance: &BigDecimal,
        gstin: Option<&str>,
    ) -> CoreResult<SubmitOutcome> {
        let mut b = RequestBuilder::new();
        b.open_attrs("LEDGER", &[("NAME", name), ("ACTION", "Create")])
            .open("NAME.LIST")
            .leaf("NAME", name)
            .close("NAME.LIST")
            .leaf("PARENT", parent_group)
            .leaf("OPENINGBALANCE", &opening_balance.to_string())
            .leaf("ISBILLWISEON", "Yes")
            .leaf("ISCOSTCENTRESON", "No");
        if let Some(gstin) = gstin {
            b.leaf("PARTYGSTIN", gstin)
                .leaf("GSTREGISTRATIONTYPE", "Regular");
        }
        b.close("LEDGER");
        let request = import_request("All Masters", &b.finish());
        match self.send(request).await {
            Ok(body) => Ok(classify_import_response(&body)),
            Err(kind) => Ok(SubmitOutcome::TransportFailure { kind }),
        }
    }

    /// Idempotent: returns true when the ledger exists after the call
    pub async fn ensure_ledger_master(
        &self,
        name: &str,
        parent_group: &str,
        gstin: Option<&str>,
    ) -> CoreResult<bool> {
        if self.ledger_exists(name).await? {
            return Ok(true);
        }
        let zero = BigDecimal::from(0);
        match self.create_ledger(name, parent_group, &zero, gstin).await? {
            SubmitOutcome::Accepted => Ok(true),
            SubmitOutcome::Rejected { reason } => {
                tracing::warn!(ledger = name, %reason, "ledger master creation rejected");
                Ok(false)
            }
            SubmitOutcome::TransportFailure { kind } => Err(CoreError::Transport(kind)),
        }
    }

    pub async fn create_stock_group(&self, name: &str, parent: &str) -> CoreResult<SubmitOutcome> {
        let mut b = RequestBuilder::new();
        b.open_attrs("STOCKGROUP", &[("NAME", name), ("ACTION", "Create")])
            .open("NAME.LIST")
            .leaf("NAME", name)
            .close("NAME.LIST")
            .leaf("PARENT", parent)
            .close("STOCKGROUP");
        let request = import_request("All Masters", &b.finish());
        match self.send(request).await {
            Ok(body) => Ok(classify_import_response(&body)),
            Err(kind) => Ok(SubmitOutcome::TransportFailure { kind }),
        }
    }

    pub async fn create_stock_item(
        &self,
        name: &str,
        group: &str,
        unit: &str,
    ) -> CoreResult<SubmitOutcome> {
        let mut b = RequestBuilder::new();
        b.open_attrs("STOCKITEM", &[("NAME", name), ("ACTION", "Create")])
            .open("NAME.LIST")
            .leaf("NAME", name)
            .close("NAME.LIST")
            .leaf("PARENT", group)
            .leaf("BASEUNITS", unit)
            .close("STOCKITEM");
        let request = import_request("All Masters", &b.finish());
        match self.send(request).await {
            Ok(body) => Ok(classify_import_response(&body)),
            Err(kind) => Ok(SubmitOutcome::TransportFailure { kind }),
        }
    }
}
