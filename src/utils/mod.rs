//! Shared helpers: financial-year arithmetic, identifier validation,
//! currency formatting

pub mod currency;
pub mod period;
pub mod validation;

pub use currency::format_indian_currency;
pub use period::{financial_year, parse_flexible_date, quarter};
pub use validation::{
    is_same_state, state_code_from_gstin, validate_gstin, validate_pan, validate_positive_amount,
};
