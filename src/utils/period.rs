//! Indian financial-year and quarter helpers.
//!
//! The financial year runs April 1 to March 31 and is labeled "YYYY-YY",
//! e.g. 2025-26. Quarters follow the FY: Q1 = Apr-Jun, Q2 = Jul-Sep,
//! Q3 = Oct-Dec, Q4 = Jan-Mar.

use chrono::{Datelike, NaiveDate};

/// Financial year label for a date, e.g. "2025-26"
pub fn financial_year(date: NaiveDate) -> String {
    let (start, end) = if date.month() >= 4 {
        (date.year(), date.year() + 1)
    } else {
        (date.year() - 1, date.year())
    };
    format!("{}-{:02}", start, end % 100)
}

/// Financial-year quarter for a date
pub fn quarter(date: NaiveDate) -> &'static str {
    match date.month() {
        4..=6 => "Q1",
        7..=9 => "Q2",
        10..=12 => "Q3",
        _ => "Q4",
    }
}

/// First day of the financial year containing `date`
pub fn financial_year_start(date: NaiveDate) -> NaiveDate {
    let year = if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    };
    // April 1 always exists
    NaiveDate::from_ymd_opt(year, 4, 1).unwrap_or(date)
}

/// Parse a date from the formats bank statements and operators actually use:
/// DD-MM-YYYY, DD/MM/YYYY, DD.MM.YYYY and ISO YYYY-MM-DD.
pub fn parse_flexible_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in ["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

/// Format a date the Indian way, DD-MM-YYYY
pub fn format_date_indian(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Format a date for the external ledger wire format, YYYYMMDD
pub fn format_date_wire(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_financial_year_boundaries() {
        assert_eq!(financial_year(d(2025, 4, 1)), "2025-26");
        assert_eq!(financial_year(d(2026, 3, 31)), "2025-26");
        assert_eq!(financial_year(d(2026, 4, 1)), "2026-27");
        assert_eq!(financial_year(d(2025, 1, 15)), "2024-25");
    }

    #[test]
    fn test_century_rollover_label() {
        assert_eq!(financial_year(d(2099, 6, 1)), "2099-00");
    }

    #[test]
    fn test_quarters() {
        assert_eq!(quarter(d(2025, 4, 1)), "Q1");
        assert_eq!(quarter(d(2025, 6, 30)), "Q1");
        assert_eq!(quarter(d(2025, 7, 1)), "Q2");
        assert_eq!(quarter(d(2025, 10, 5)), "Q3");
        assert_eq!(quarter(d(2026, 1, 1)), "Q4");
        assert_eq!(quarter(d(2026, 3, 31)), "Q4");
    }

    #[test]
    fn test_parse_flexible_date() {
        let expected = d(2025, 8, 30);
        assert_eq!(parse_flexible_date("30-08-2025"), Some(expected));
        assert_eq!(parse_flexible_date("30/08/2025"), Some(expected));
        assert_eq!(parse_flexible_date("2025-08-30"), Some(expected));
        assert_eq!(parse_flexible_date("not a date"), None);
    }

    #[test]
    fn test_wire_date_format() {
        assert_eq!(format_date_wire(d(2025, 8, 30)), "20250830");
        assert_eq!(format_date_indian(d(2025, 8, 30)), "30-08-2025");
    }
}
