//! Voucher serialization and submission.
//!
//! Sign convention on the wire: a debit entry is deemed positive
//! (`ISDEEMEDPOSITIVE` = Yes) with a positive amount; a credit entry is
//! deemed negative with a negated amount. Tally rejects the message if the
//! entries do not sum to zero, which mirrors the local balance invariant.

use crate::types::{round_money, SubmitOutcome, Voucher};
use crate::utils::period::format_date_wire;

use super::client::{import_request, TallyClient};
use super::xml::RequestBuilder;
use super::classify_import_response;

/// Serialize one voucher into its VOUCHER element
pub fn voucher_xml(voucher: &Voucher) -> String {
    let mut b = RequestBuilder::new();
    b.open_attrs(
        "VOUCHER",
        &[
            ("VCHTYPE", voucher.voucher_type.as_str()),
            ("ACTION", "Create"),
        ],
    )
    .leaf("DATE", &format_date_wire(voucher.date))
    .leaf("VOUCHERTYPENAME", voucher.voucher_type.as_str());
    if let Some(reference) = &voucher.reference {
        b.leaf("VOUCHERNUMBER", reference);
    }
    if let Some(party) = &voucher.party {
        b.leaf("PARTYLEDGERNAME", party);
    }
    b.leaf("NARRATION", &voucher.narration);
    for entry in &voucher.entries {
        let amount = round_money(&entry.amount);
        let (deemed, signed) = if entry.is_debit {
            ("Yes", amount.to_string())
        } else {
            ("No", (-amount).to_string())
        };
        b.open("ALLLEDGERENTRIES.LIST")
            .leaf("LEDGERNAME", &entry.ledger)
            .leaf("ISDEEMEDPOSITIVE", deemed)
            .leaf("AMOUNT", &signed)
            .close("ALLLEDGERENTRIES.LIST");
    }
    b.close("VOUCHER");
    b.finish()
}

impl TallyClient {
    /// Post one voucher and classify Tally's answer
    pub async fn post_voucher(&self, voucher: &Voucher) -> SubmitOutcome {
        let request = import_request("Vouchers", &voucher_xml(voucher));
        match self.send(request).await {
            Ok(body) => classify_import_response(&body),
            Err(kind) => SubmitOutcome::TransportFailure { kind },
        }
    }
}
