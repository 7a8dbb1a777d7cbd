//! GST and TDS computation

pub mod gst;
pub mod tds;

pub use gst::{calculate_gst, calculate_gst_from_gstins, reverse_calculate_gst, TaxBreakdown};
pub use tds::{
    calculate_tds, check_threshold, section_table, PayeeType, TdsCalc, TdsSection,
    ThresholdCheck,
};
