use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::{monthly_payment, MAX_TERM_YEARS};
use crate::rates::resolve_rate;
use crate::{types::*, LoanOfferError, LoanOfferResult};

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermOutcome {
    /// Payment already fits the capacity at the requested term.
    Unchanged,
    /// Term was lengthened until the payment fit.
    Extended,
    /// Even the longest term leaves the payment above capacity.
    Infeasible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermAdjustment {
    pub requested_term_years: u32,
    pub term_years: u32,
    pub extension_years: u32,
    /// Payment at `term_years`.
    pub payment: Money,
    pub affordable_payment: Money,
    pub outcome: TermOutcome,
}

impl TermAdjustment {
    pub fn is_feasible(&self) -> bool {
        self.outcome != TermOutcome::Infeasible
    }

    pub fn term_changed(&self) -> bool {
        self.term_years != self.requested_term_years
    }

    /// Amount by which the payment still exceeds capacity (zero when it fits).
    pub fn shortfall(&self) -> Money {
        (self.payment - self.affordable_payment).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordabilityInput {
    pub principal: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_rate: Option<Rate>,
    pub term_years: u32,
    /// Highest monthly payment the borrower can sustain.
    pub affordable_payment: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lengthen the term one year at a time until `payment` fits within
/// `affordable_payment`, stopping at [`MAX_TERM_YEARS`].
///
/// `payment` must be the payment at `term_years`; it is returned unchanged
/// when it already fits.
pub fn adjust_term(
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
    payment: Money,
    affordable_payment: Money,
) -> LoanOfferResult<TermAdjustment> {
    if affordable_payment < Decimal::ZERO {
        return Err(LoanOfferError::InvalidInput {
            field: "affordable_payment".into(),
            reason: "Affordable payment cannot be negative.".into(),
        });
    }
    if term_years == 0 || term_years > MAX_TERM_YEARS {
        return Err(LoanOfferError::InvalidInput {
            field: "term_years".into(),
            reason: format!("Term must be between 1 and {MAX_TERM_YEARS} years."),
        });
    }

    let mut term = term_years;
    let mut current = payment;

    // Payment falls strictly as the term grows, so this ends within the cap.
    while current > affordable_payment && term < MAX_TERM_YEARS {
        term += 1;
        current = monthly_payment(principal, annual_rate, term)?;
        debug!("term extended to {term} years, payment {current}");
    }

    let outcome = if current > affordable_payment {
        warn!(
            "payment {current} at {MAX_TERM_YEARS} years exceeds capacity {affordable_payment}"
        );
        TermOutcome::Infeasible
    } else if term != term_years {
        TermOutcome::Extended
    } else {
        TermOutcome::Unchanged
    };

    Ok(TermAdjustment {
        requested_term_years: term_years,
        term_years: term,
        extension_years: term - term_years,
        payment: current,
        affordable_payment,
        outcome,
    })
}

pub fn calculate_term_adjustment(
    input: &AffordabilityInput,
) -> LoanOfferResult<ComputationOutput<TermAdjustment>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let annual_rate = resolve_rate(input.principal, input.annual_rate)?;
    let payment = monthly_payment(input.principal, annual_rate, input.term_years)?;
    let adjustment = adjust_term(
        input.principal,
        annual_rate,
        input.term_years,
        payment,
        input.affordable_payment,
    )?;

    warnings.extend(adjustment_warnings(&adjustment));

    let assumptions = serde_json::json!({
        "annual_rate": annual_rate.to_string(),
        "max_term_years": MAX_TERM_YEARS,
        "step_years": 1,
    });

    Ok(with_metadata(
        "Term extension against stated repayment capacity",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        adjustment,
    ))
}

pub(crate) fn adjustment_warnings(adjustment: &TermAdjustment) -> Vec<String> {
    match adjustment.outcome {
        TermOutcome::Unchanged => Vec::new(),
        TermOutcome::Extended => vec![format!(
            "Term extended by {} years to {} years so the payment fits the stated capacity.",
            adjustment.extension_years, adjustment.term_years
        )],
        TermOutcome::Infeasible => vec![format!(
            "Payment of {} at {} years still exceeds the stated capacity of {}; this is not a valid offer.",
            adjustment.payment.round_dp(2),
            adjustment.term_years,
            adjustment.affordable_payment.round_dp(2)
        )],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payment_at(years: u32) -> Money {
        monthly_payment(dec!(20000), dec!(0.068), years).unwrap()
    }

    #[test]
    fn test_fits_already() {
        let payment = payment_at(5);
        let adj = adjust_term(dec!(20000), dec!(0.068), 5, payment, payment).unwrap();
        assert_eq!(adj.outcome, TermOutcome::Unchanged);
        assert_eq!(adj.term_years, 5);
        assert_eq!(adj.payment, payment);
        assert!(!adj.term_changed());
    }

    #[test]
    fn test_extends_to_first_fitting_term() {
        let payment = payment_at(5);
        // Capacity sits between the 7- and 8-year payments
        let capacity = (payment_at(7) + payment_at(8)) / dec!(2);
        let adj = adjust_term(dec!(20000), dec!(0.068), 5, payment, capacity).unwrap();
        assert_eq!(adj.outcome, TermOutcome::Extended);
        assert_eq!(adj.term_years, 8);
        assert_eq!(adj.extension_years, 3);
        assert!(adj.payment <= capacity);
        assert_eq!(adj.payment, payment_at(8));
    }

    #[test]
    fn test_infeasible_stops_at_cap() {
        let payment = payment_at(5);
        let capacity = payment_at(30) - dec!(1);
        let adj = adjust_term(dec!(20000), dec!(0.068), 5, payment, capacity).unwrap();
        assert_eq!(adj.outcome, TermOutcome::Infeasible);
        assert_eq!(adj.term_years, MAX_TERM_YEARS);
        assert!(!adj.is_feasible());
        assert!((adj.shortfall() - dec!(1)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_exact_thirty_year_payment_is_feasible() {
        let payment = payment_at(5);
        let adj = adjust_term(dec!(20000), dec!(0.068), 5, payment, payment_at(30)).unwrap();
        assert_eq!(adj.outcome, TermOutcome::Extended);
        assert_eq!(adj.term_years, 30);
    }

    #[test]
    fn test_negative_capacity_rejected() {
        let err = adjust_term(dec!(20000), dec!(0.068), 5, payment_at(5), dec!(-1)).unwrap_err();
        match err {
            LoanOfferError::InvalidInput { field, .. } => assert_eq!(field, "affordable_payment"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_enveloped_extension_warns() {
        let input = AffordabilityInput {
            principal: dec!(20000),
            annual_rate: None,
            term_years: 5,
            affordable_payment: dec!(250),
        };
        let out = calculate_term_adjustment(&input).unwrap();
        assert_eq!(out.result.outcome, TermOutcome::Extended);
        assert_eq!(out.warnings.len(), 1);
    }
}
