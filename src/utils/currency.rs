//! Indian-style currency formatting for operator-facing messages

use bigdecimal::BigDecimal;

use crate::types::round_money;

/// Format an amount in the Indian grouping style: last three digits, then
/// groups of two, e.g. ₹12,34,567.00.
pub fn format_indian_currency(amount: &BigDecimal) -> String {
    let rounded = round_money(&amount.abs());
    let text = rounded.to_string();
    let (int_part, dec_part) = match text.split_once('.') {
        Some((i, d)) => (i.to_string(), format!("{d:0<2}")),
        None => (text, "00".to_string()),
    };

    let grouped = if int_part.len() <= 3 {
        int_part
    } else {
        let (head, tail) = int_part.split_at(int_part.len() - 3);
        let mut parts = Vec::new();
        let head_chars: Vec<char> = head.chars().collect();
        let mut idx = head_chars.len();
        while idx > 0 {
            let start = idx.saturating_sub(2);
            parts.push(head_chars[start..idx].iter().collect::<String>());
            idx = start;
        }
        parts.reverse();
        format!("{},{}", parts.join(","), tail)
    };

    let sign = if *amount < BigDecimal::from(0) { "-" } else { "" };
    format!("{sign}₹{grouped}.{dec_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_small_amounts() {
        assert_eq!(format_indian_currency(&BigDecimal::from(0)), "₹0.00");
        assert_eq!(format_indian_currency(&BigDecimal::from(999)), "₹999.00");
    }

    #[test]
    fn test_lakh_grouping() {
        assert_eq!(
            format_indian_currency(&BigDecimal::from(123456)),
            "₹1,23,456.00"
        );
        assert_eq!(
            format_indian_currency(&BigDecimal::from(12345678)),
            "₹1,23,45,678.00"
        );
    }

    #[test]
    fn test_negative_and_decimals() {
        assert_eq!(
            format_indian_currency(&BigDecimal::from_str("-30000.5").unwrap()),
            "-₹30,000.50"
        );
    }
}
