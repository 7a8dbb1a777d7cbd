//! Report exports: raw XML fetched from Tally's built-in reports.
//!
//! Report bodies vary widely between Tally releases, so these return the
//! response verbatim for the caller to interpret.

use chrono::NaiveDate;

use crate::types::{CoreError, CoreResult};
use crate::utils::period::format_date_wire;

use super::client::{export_request, TallyClient};

fn period_vars(from: NaiveDate, to: NaiveDate) -> [(String, String); 2] {
    [
        ("SVFROMDATE".to_string(), format_date_wire(from)),
        ("SVTODATE".to_string(), format_date_wire(to)),
    ]
}

impl TallyClient {
    async fn export_report(
        &self,
        id: &str,
        vars: &[(String, String)],
    ) -> CoreResult<String> {
        let borrowed: Vec<(&str, &str)> =
            vars.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let request = export_request("Data", id, &borrowed);
        self.send(request).await.map_err(CoreError::Transport)
    }

    pub async fn trial_balance(&self, from: NaiveDate, to: NaiveDate) -> CoreResult<String> {
        self.export_report("Trial Balance", &period_vars(from, to))
            .await
    }

    pub async fn balance_sheet(&self, from: NaiveDate, to: NaiveDate) -> CoreResult<String> {
        self.export_report("Balance Sheet", &period_vars(from, to))
            .await
    }

    pub async fn profit_and_loss(&self, from: NaiveDate, to: NaiveDate) -> CoreResult<String> {
        self.export_report("Profit and Loss", &period_vars(from, to))
            .await
    }

    /// Day-book style export of one ledger's vouchers for a period
    pub async fn ledger_vouchers(
        &self,
        ledger: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> CoreResult<String> {
        let mut vars = period_vars(from, to).to_vec();
        vars.push(("LEDGERNAME".to_string(), ledger.to_string()));
        self.export_report("Ledger Vouchers", &vars).await
    }
}
