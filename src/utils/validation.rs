//! Identifier and amount validation

use bigdecimal::BigDecimal;

use crate::types::{CoreError, CoreResult};

/// Validate a GSTIN: 15 characters, two-digit state code, PAN body,
/// entity digit, check characters (e.g. 27AAAAA0000A1Z5).
pub fn validate_gstin(gstin: &str) -> bool {
    let chars: Vec<char> = gstin.chars().collect();
    if chars.len() != 15 {
        return false;
    }
    let digits = |r: std::ops::Range<usize>| chars[r].iter().all(|c| c.is_ascii_digit());
    let uppers = |r: std::ops::Range<usize>| chars[r].iter().all(|c| c.is_ascii_uppercase());
    digits(0..2)
        && uppers(2..7)
        && digits(7..11)
        && chars[11].is_ascii_uppercase()
        && (chars[12].is_ascii_uppercase() || chars[12].is_ascii_digit())
        && chars[13] == 'Z'
        && (chars[14].is_ascii_uppercase() || chars[14].is_ascii_digit())
}

/// Validate a PAN: AAAAA0000A
pub fn validate_pan(pan: &str) -> bool {
    let chars: Vec<char> = pan.chars().collect();
    chars.len() == 10
        && chars[0..5].iter().all(|c| c.is_ascii_uppercase())
        && chars[5..9].iter().all(|c| c.is_ascii_digit())
        && chars[9].is_ascii_uppercase()
}

/// Extract the two-digit state code prefix from a GSTIN
pub fn state_code_from_gstin(gstin: &str) -> Option<&str> {
    if validate_gstin(gstin) {
        Some(&gstin[0..2])
    } else {
        None
    }
}

/// Whether two GSTINs belong to the same state. A missing or malformed
/// GSTIN on either side defaults to intra-state, matching how unregistered
/// local parties are billed. Scanner-supplied strings may hold arbitrary
/// bytes, so the prefix is taken with a checked slice.
pub fn is_same_state(gstin_a: Option<&str>, gstin_b: Option<&str>) -> bool {
    match (
        gstin_a.and_then(|a| a.get(0..2)),
        gstin_b.and_then(|b| b.get(0..2)),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Reject zero or negative monetary amounts before anything is persisted
pub fn validate_positive_amount(amount: &BigDecimal, what: &str) -> CoreResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(CoreError::Validation(format!(
            "{what} must be positive, got {amount}"
        )))
    } else {
        Ok(())
    }
}

/// Reject blank party/ledger names
pub fn validate_name(name: &str, what: &str) -> CoreResult<()> {
    if name.trim().is_empty() {
        Err(CoreError::Validation(format!("{what} cannot be empty")))
    } else {
        Ok(())
    }
}
