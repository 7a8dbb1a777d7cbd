//! TDS (Tax Deducted at Source) computation by statutory section
//!
//! The section table carries the deduction rate per payee type and the two
//! statutory thresholds: a single-payment threshold and a financial-year
//! aggregate threshold. Threshold checks aggregate prior payments to the same
//! payee through the local store.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::traits::TransactionStore;
use crate::types::{round_money, CoreError, CoreResult};
use crate::utils::currency::format_indian_currency;
use crate::utils::period::financial_year;
use crate::utils::validation::validate_positive_amount;

/// Whether the payee is assessed as an individual/HUF or a company; some
/// sections deduct at different rates for the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayeeType {
    Individual,
    Company,
}

/// One row of the statutory TDS section table. Rates are in basis points
/// (1% = 100) so the table stays integer-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TdsSection {
    pub section: &'static str,
    pub description: &'static str,
    pub rate_individual_bp: i64,
    pub rate_company_bp: i64,
    pub threshold_single: i64,
    pub threshold_aggregate: i64,
}

impl TdsSection {
    /// Applicable rate in percent for a payee type
    pub fn rate_percent(&self, payee_type: PayeeType) -> BigDecimal {
        let bp = match payee_type {
            PayeeType::Individual => self.rate_individual_bp,
            PayeeType::Company => self.rate_company_bp,
        };
        BigDecimal::from(bp) / BigDecimal::from(100)
    }
}

/// The statutory section table
pub fn section_table() -> &'static [TdsSection] {
    const SECTIONS: [TdsSection; 13] = [
        TdsSection {
            section: "194C",
            description: "Payment to contractors",
            rate_individual_bp: 100,
            rate_company_bp: 200,
            threshold_single: 30_000,
            threshold_aggregate: 100_000,
        },
        TdsSection {
            section: "194J",
            description: "Professional or technical services",
            rate_individual_bp: 1_000,
            rate_company_bp: 1_000,
            threshold_single: 30_000,
            threshold_aggregate: 30_000,
        },
        TdsSection {
            section: "194H",
            description: "Commission or brokerage",
            rate_individual_bp: 500,
            rate_company_bp: 500,
            threshold_single: 15_000,
            threshold_aggregate: 15_000,
        },
        TdsSection {
            section: "194I",
            description: "Rent",
            rate_individual_bp: 1_000,
            rate_company_bp: 1_000,
            threshold_single: 240_000,
            threshold_aggregate: 240_000,
        },
        TdsSection {
            section: "194IA",
            description: "Payment for purchase of immovable property",
            rate_individual_bp: 100,
            rate_company_bp: 100,
            threshold_single: 5_000_000,
            threshold_aggregate: 5_000_000,
        },
        TdsSection {
            section: "194IB",
            description: "Payment of rent by individuals/HUF",
            rate_individual_bp: 500,
            rate_company_bp: 500,
            threshold_single: 50_000,
            threshold_aggregate: 600_000,
        },
        TdsSection {
            section: "194A",
            description: "Interest other than on securities",
            rate_individual_bp: 1_000,
            rate_company_bp: 1_000,
            threshold_single: 40_000,
            threshold_aggregate: 40_000,
        },
        TdsSection {
            section: "194B",
            description: "Winnings from lottery or crossword puzzle",
            rate_individual_bp: 3_000,
            rate_company_bp: 3_000,
            threshold_single: 10_000,
            threshold_aggregate: 10_000,
        },
        TdsSection {
            section: "194D",
            description: "Insurance commission",
            rate_individual_bp: 500,
            rate_company_bp: 1_000,
            threshold_single: 15_000,
            threshold_aggregate: 15_000,
        },
        TdsSection {
            section: "194M",
            description: "Payment to contractors by non-filers",
            rate_individual_bp: 500,
            rate_company_bp: 500,
            threshold_single: 50_000_000,
            threshold_aggregate: 50_000_000,
        },
        TdsSection {
            section: "194N",
            description: "Cash withdrawal exceeding specified limit",
            rate_individual_bp: 200,
            rate_company_bp: 200,
            threshold_single: 10_000_000,
            threshold_aggregate: 10_000_000,
        },
        TdsSection {
            section: "194O",
            description: "Payment for e-commerce transactions",
            rate_individual_bp: 100,
            rate_company_bp: 100,
            threshold_single: 500_000,
            threshold_aggregate: 500_000,
        },
        TdsSection {
            section: "194Q",
            description: "Payment for purchase of goods",
            rate_individual_bp: 10,
            rate_company_bp: 10,
            threshold_single: 5_000_000,
            threshold_aggregate: 5_000_000,
        },
    ];
    &SECTIONS
}

/// Look up a section by code
pub fn lookup_section(section: &str) -> CoreResult<&'static TdsSection> {
    section_table()
        .iter()
        .find(|s| s.section == section)
        .ok_or_else(|| CoreError::UnknownSection(section.to_string()))
}

/// Computed TDS for one payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TdsCalc {
    pub section: String,
    pub description: String,
    pub payment_amount: BigDecimal,
    /// Applied rate in percent
    pub rate: BigDecimal,
    pub tds_amount: BigDecimal,
    /// payment_amount - tds_amount
    pub net_payable: BigDecimal,
    pub threshold_single: i64,
    pub threshold_aggregate: i64,
}

/// Calculate TDS for a payment under a section
pub fn calculate_tds(
    section: &str,
    payment_amount: &BigDecimal,
    payee_type: PayeeType,
) -> CoreResult<TdsCalc> {
    validate_positive_amount(payment_amount, "payment amount")?;
    let entry = lookup_section(section)?;

    let rate = entry.rate_percent(payee_type);
    let tds_amount = round_money(&(payment_amount * &rate / BigDecimal::from(100)));
    let net_payable = payment_amount - &tds_amount;

    Ok(TdsCalc {
        section: entry.section.to_string(),
        description: entry.description.to_string(),
        payment_amount: payment_amount.clone(),
        rate,
        tds_amount,
        net_payable,
        threshold_single: entry.threshold_single,
        threshold_aggregate: entry.threshold_aggregate,
    })
}

/// Result of a threshold check for a prospective payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCheck {
    pub section: String,
    pub tds_applicable: bool,
    /// Which threshold triggered, for operator display; empty if none
    pub reason: String,
    pub prior_aggregate: BigDecimal,
    pub new_aggregate: BigDecimal,
    pub threshold_single: i64,
    pub threshold_aggregate: i64,
}

/// Whether TDS applies to a prospective payment, considering both the
/// single-payment threshold and the financial-year aggregate for the payee.
pub async fn check_threshold<S: TransactionStore + ?Sized>(
    store: &S,
    section: &str,
    payee_pan: &str,
    new_payment: &BigDecimal,
    on_date: NaiveDate,
) -> CoreResult<ThresholdCheck> {
    let entry = lookup_section(section)?;
    let fy = financial_year(on_date);

    let prior_aggregate = store
        .sum_payments_to_payee(section, payee_pan, &fy)
        .await?;
    let new_aggregate = &prior_aggregate + new_payment;

    let single = BigDecimal::from(entry.threshold_single);
    let aggregate = BigDecimal::from(entry.threshold_aggregate);

    let (tds_applicable, reason) = if *new_payment >= single {
        (
            true,
            format!(
                "Single payment threshold ({}) crossed",
                format_indian_currency(&single)
            ),
        )
    } else if new_aggregate >= aggregate {
        (
            true,
            format!(
                "Aggregate threshold ({}) crossed",
                format_indian_currency(&aggregate)
            ),
        )
    } else {
        (false, String::new())
    };

    Ok(ThresholdCheck {
        section: entry.section.to_string(),
        tds_applicable,
        reason,
        prior_aggregate,
        new_aggregate,
        threshold_single: entry.threshold_single,
        threshold_aggregate: entry.threshold_aggregate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_contractor_payment_individual() {
        let calc = calculate_tds("194C", &dec("50000"), PayeeType::Individual).unwrap();
        assert_eq!(calc.rate, dec("1"));
        assert_eq!(calc.tds_amount, dec("500.00"));
        assert_eq!(calc.net_payable, dec("49500.00"));
    }

    #[test]
    fn test_contractor_payment_company_rate() {
        let calc = calculate_tds("194C", &dec("50000"), PayeeType::Company).unwrap();
        assert_eq!(calc.rate, dec("2"));
        assert_eq!(calc.tds_amount, dec("1000.00"));
    }

    #[test]
    fn test_fractional_rate_section() {
        // 194Q deducts at 0.1%
        let calc = calculate_tds("194Q", &dec("6000000"), PayeeType::Company).unwrap();
        assert_eq!(calc.rate, dec("0.1"));
        assert_eq!(calc.tds_amount, dec("6000.00"));
    }

    #[test]
    fn test_unknown_section() {
        let err = calculate_tds("999X", &dec("1000"), PayeeType::Individual).unwrap_err();
        assert!(matches!(err, CoreError::UnknownSection(_)));
    }

    #[test]
    fn test_non_positive_payment_rejected() {
        assert!(calculate_tds("194C", &dec("0"), PayeeType::Individual).is_err());
    }

    #[test]
    fn test_section_table_lookup() {
        let entry = lookup_section("194J").unwrap();
        assert_eq!(entry.threshold_single, 30_000);
        assert_eq!(entry.threshold_aggregate, 30_000);
    }
}
