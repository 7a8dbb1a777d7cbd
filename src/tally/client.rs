//! HTTP transport to a TallyPrime instance.
//!
//! Tally listens on a plain HTTP port and speaks XML request envelopes in
//! POST bodies. Transport failures are classified, never retried here.

use std::time::Duration;

use crate::types::{CoreError, CoreResult, TransportKind};

use super::xml::{texts_of, RequestBuilder};

/// Connection settings for the Tally HTTP endpoint
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9000,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for one Tally endpoint
pub struct TallyClient {
    http: reqwest::Client,
    url: String,
}

impl TallyClient {
    pub fn new(config: ClientConfig) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CoreError::Transport(TransportKind::Other(e.to_string())))?;
        Ok(Self {
            http,
            url: format!("http://{}:{}", config.host, config.port),
        })
    }

    pub fn with_defaults() -> CoreResult<Self> {
        Self::new(ClientConfig::default())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST one request envelope and return the raw response body
    pub(crate) async fn send(&self, body: String) -> Result<String, TransportKind> {
        let response = self
            .http
            .post(&self.url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(classify)?;
        response.text().await.map_err(classify)
    }

    /// Probe reachability with a harmless read-only export. True only when
    /// a response envelope actually came back.
    pub async fn probe(&self) -> bool {
        let request = export_request("Collection", "List of Companies", &[]);
        match self.send(request).await {
            Ok(body) => body.to_uppercase().contains("<ENVELOPE"),
            Err(kind) => {
                tracing::debug!(error = %kind, "ledger endpoint unreachable");
                false
            }
        }
    }

    /// Name of the company currently loaded in Tally
    pub async fn company_name(&self) -> CoreResult<Option<String>> {
        let request = export_request("Data", "CurrentCompany", &[]);
        let body = self
            .send(request)
            .await
            .map_err(CoreError::Transport)?;
        if let Some(name) = first_nonempty(texts_of(&body, "NAME")) {
            return Ok(Some(name));
        }
        // older releases answer the collection form only
        let request = export_request("Collection", "List of Companies", &[]);
        let body = self
            .send(request)
            .await
            .map_err(CoreError::Transport)?;
        Ok(first_nonempty(texts_of(&body, "NAME")))
    }
}

fn first_nonempty(names: Vec<String>) -> Option<String> {
    names.into_iter().find(|n| !n.is_empty())
}

fn classify(err: reqwest::Error) -> TransportKind {
    if err.is_timeout() {
        TransportKind::Timeout
    } else if err.is_connect() {
        TransportKind::ConnectionRefused
    } else {
        TransportKind::Other(err.to_string())
    }
}

/// Read-only export envelope: `TALLYREQUEST=Export`, with the static
/// variables Tally expects for XML output.
pub(crate) fn export_request(kind: &str, id: &str, static_vars: &[(&str, &str)]) -> String {
    let mut b = RequestBuilder::new();
    b.open("ENVELOPE")
        .open("HEADER")
        .leaf("VERSION", "1")
        .leaf("TALLYREQUEST", "Export")
        .leaf("TYPE", kind)
        .leaf("ID", id)
        .close("HEADER")
        .open("BODY")
        .open("DESC")
        .open("STATICVARIABLES")
        .leaf("SVEXPORTFORMAT", "$SysName:XML");
    for (name, value) in static_vars {
        b.leaf(name, value);
    }
    b.close("STATICVARIABLES")
        .close("DESC")
        .close("BODY")
        .close("ENVELOPE");
    b.finish()
}

/// Write envelope: `TALLYREQUEST=Import` carrying one TALLYMESSAGE.
/// `message` is already-built XML for a LEDGER or VOUCHER element.
pub(crate) fn import_request(id: &str, message: &str) -> String {
    let mut b = RequestBuilder::new();
    b.open("ENVELOPE")
        .open("HEADER")
        .leaf("VERSION", "1")
        .leaf("TALLYREQUEST", "Import")
        .leaf("TYPE", "Data")
        .leaf("ID", id)
        .close("HEADER")
        .open("BODY")
        .open("DESC")
        .open("STATICVARIABLES")
        .leaf("IMPORTDUPS", "@@DUPS")
        .close("STATICVARIABLES")
        .close("DESC")
        .open("DATA")
        .open_attrs("TALLYMESSAGE", &[("xmlns:UDF", "TallyUDF")])
        .raw(message)
        .close("TALLYMESSAGE")
        .close("DATA")
        .close("BODY")
        .close("ENVELOPE");
    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_request_shape() {
        let xml = export_request(
            "Collection",
            "LedgerMaster",
            &[("LEDGERNAME", "Shah & Sons")],
        );
        assert!(xml.starts_with("<ENVELOPE><HEADER><VERSION>1</VERSION>"));
        assert!(xml.contains("<TALLYREQUEST>Export</TALLYREQUEST>"));
        assert!(xml.contains("<TYPE>Collection</TYPE><ID>LedgerMaster</ID>"));
        assert!(xml.contains("<SVEXPORTFORMAT>$SysName:XML</SVEXPORTFORMAT>"));
        assert!(xml.contains("<LEDGERNAME>Shah &amp; Sons</LEDGERNAME>"));
    }

    #[test]
    fn test_import_request_wraps_message() {
        let xml = import_request("Vouchers", "<VOUCHER></VOUCHER>");
        assert!(xml.contains("<TALLYREQUEST>Import</TALLYREQUEST>"));
        assert!(xml.contains("<IMPORTDUPS>@@DUPS</IMPORTDUPS>"));
        assert!(xml.contains(
            "<TALLYMESSAGE xmlns:UDF=\"TallyUDF\"><VOUCHER></VOUCHER></TALLYMESSAGE>"
        ));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 9000);
    }
}
