//! Local transaction store implementations

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub(crate) fn format_invoice(prefix: &str, financial_year: &str, sequence: u32) -> String {
    format!("{prefix}/{financial_year}/{sequence:03}")
}

/// Extract the trailing sequence from a reference in `PREFIX/FY/NNN` form,
/// if it belongs to the given scope.
pub(crate) fn parse_invoice_sequence(
    reference: &str,
    prefix: &str,
    financial_year: &str,
) -> Option<u32> {
    let scope = format!("{prefix}/{financial_year}/");
    reference.strip_prefix(&scope)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_invoice_zero_padding() {
        assert_eq!(format_invoice("INV", "2025-26", 1), "INV/2025-26/001");
        assert_eq!(format_invoice("INV", "2025-26", 42), "INV/2025-26/042");
        assert_eq!(format_invoice("INV", "2025-26", 1234), "INV/2025-26/1234");
    }

    #[test]
    fn test_parse_invoice_sequence() {
        assert_eq!(
            parse_invoice_sequence("INV/2025-26/007", "INV", "2025-26"),
            Some(7)
        );
        assert_eq!(
            parse_invoice_sequence("INV/2024-25/007", "INV", "2025-26"),
            None
        );
        assert_eq!(parse_invoice_sequence("PB-991", "INV", "2025-26"), None);
    }
}
