//! GST (Goods and Services Tax) split computation for Indian tax compliance
//!
//! Intra-state supplies split the tax equally into CGST and SGST; inter-state
//! supplies carry the whole amount as IGST. Whether a supply is intra-state is
//! decided by the two-digit state codes of the supplier and recipient.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{round_money, CoreError, CoreResult};
use crate::utils::validation::{is_same_state, validate_positive_amount};

/// The statutory GST rate slabs, in basis points (0.25% = 25)
const RATE_SLABS_BP: [i64; 7] = [0, 25, 300, 500, 1200, 1800, 2800];

fn slab_rates() -> impl Iterator<Item = BigDecimal> {
    RATE_SLABS_BP
        .iter()
        .map(|bp| BigDecimal::from(*bp) / BigDecimal::from(100))
}

fn is_valid_rate(rate: &BigDecimal) -> bool {
    slab_rates().any(|slab| slab == *rate)
}

/// Computed GST breakdown for one taxable value.
///
/// Exactly one of the following holds: cgst and sgst are both positive and
/// igst is zero (intra-state), igst is positive and cgst/sgst are zero
/// (inter-state), or all three are zero (zero-rated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub taxable_value: BigDecimal,
    /// Rate in percent, from the slab set
    pub rate: BigDecimal,
    pub cgst: BigDecimal,
    pub sgst: BigDecimal,
    pub igst: BigDecimal,
    /// cgst + sgst + igst
    pub total_tax: BigDecimal,
    /// taxable_value + total_tax
    pub total: BigDecimal,
}

impl TaxBreakdown {
    /// Check the exclusivity invariant over the three components
    pub fn validate(&self) -> CoreResult<()> {
        let zero = BigDecimal::from(0);
        let intra = self.cgst > zero && self.sgst > zero && self.igst == zero;
        let inter = self.igst > zero && self.cgst == zero && self.sgst == zero;
        let exempt = self.cgst == zero && self.sgst == zero && self.igst == zero;
        if intra || inter || exempt {
            Ok(())
        } else {
            Err(CoreError::InvalidRate(format!(
                "inconsistent GST components: cgst={}, sgst={}, igst={}",
                self.cgst, self.sgst, self.igst
            )))
        }
    }
}

/// Calculate the GST split for a taxable value.
///
/// `recipient_state` absent or equal to `supplier_state` means intra-state.
/// The combined tax is rounded to paise once, then halved exactly, so the
/// CGST/SGST halves always agree and always sum to the rounded total.
pub fn calculate_gst(
    taxable_value: &BigDecimal,
    rate: &BigDecimal,
    supplier_state: &str,
    recipient_state: Option<&str>,
) -> CoreResult<TaxBreakdown> {
    let intra = match recipient_state {
        Some(state) => state == supplier_state,
        None => true,
    };
    calculate_split(taxable_value, rate, intra)
}

/// Calculate the GST split deciding intra/inter-state from GSTIN prefixes.
/// A missing GSTIN on either side defaults to intra-state.
pub fn calculate_gst_from_gstins(
    taxable_value: &BigDecimal,
    rate: &BigDecimal,
    supplier_gstin: Option<&str>,
    recipient_gstin: Option<&str>,
) -> CoreResult<TaxBreakdown> {
    calculate_split(
        taxable_value,
        rate,
        is_same_state(supplier_gstin, recipient_gstin),
    )
}

fn calculate_split(
    taxable_value: &BigDecimal,
    rate: &BigDecimal,
    intra_state: bool,
) -> CoreResult<TaxBreakdown> {
    if *taxable_value < BigDecimal::from(0) {
        return Err(CoreError::Validation(format!(
            "taxable value cannot be negative, got {taxable_value}"
        )));
    }
    if !is_valid_rate(rate) {
        return Err(CoreError::InvalidRate(format!(
            "{rate} is not a GST slab rate (allowed: 0, 0.25, 3, 5, 12, 18, 28)"
        )));
    }

    let gst_amount = round_money(&(taxable_value * rate / BigDecimal::from(100)));
    let zero = BigDecimal::from(0);

    let (cgst, sgst, igst) = if intra_state {
        let half = &gst_amount / BigDecimal::from(2);
        (half.clone(), half, zero)
    } else {
        (zero.clone(), zero, gst_amount.clone())
    };

    let total_tax = &cgst + &sgst + &igst;
    let total = taxable_value + &total_tax;

    Ok(TaxBreakdown {
        taxable_value: taxable_value.clone(),
        rate: rate.clone(),
        cgst,
        sgst,
        igst,
        total_tax,
        total,
    })
}

/// Derive the breakdown from a tax-inclusive total (reverse calculation),
/// used when an operator enters the gross invoice amount.
pub fn reverse_calculate_gst(
    total_amount: &BigDecimal,
    rate: &BigDecimal,
    supplier_state: &str,
    recipient_state: Option<&str>,
) -> CoreResult<TaxBreakdown> {
    validate_positive_amount(total_amount, "total amount")?;
    if !is_valid_rate(rate) {
        return Err(CoreError::InvalidRate(format!(
            "{rate} is not a GST slab rate (allowed: 0, 0.25, 3, 5, 12, 18, 28)"
        )));
    }
    let divisor = BigDecimal::from(100) + rate;
    let taxable = round_money(&(total_amount * BigDecimal::from(100) / divisor));
    calculate_gst(&taxable, rate, supplier_state, recipient_state)
}
