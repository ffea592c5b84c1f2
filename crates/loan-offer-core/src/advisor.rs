//! Comparison of the computed payment against the borrower's desired payment.
//!
//! The branch taken is a deterministic function of the sign of
//! `desired - computed`. Motivational phrases are optional and chosen by an
//! injected random source, so quotes stay reproducible unless a caller opts in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::monthly_payment;
use crate::rates::resolve_rate;
use crate::{types::*, LoanOfferError, LoanOfferResult};

#[cfg(feature = "motivation")]
use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOutcome {
    /// Computed payment is cheaper than desired.
    BelowDesired,
    /// Computed payment exceeds what the borrower wanted.
    AboveDesired,
    MatchesDesired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentComparison {
    pub computed_payment: Money,
    pub desired_payment: Money,
    /// desired - computed
    pub difference: Money,
    pub magnitude: Money,
    pub outcome: ComparisonOutcome,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
}

/// Phrases offered alongside a payment that undercuts the desired one.
pub const MOTIVATIONS: [&str; 5] = [
    "A great opportunity to save over the long run!",
    "With this payment you are well on your way to a secure future!",
    "This sounds like a decision that pays off!",
    "This loan takes you a big step closer to your goal!",
    "Good news: your payment fits your goals perfectly!",
];

pub fn compare_payment(computed_payment: Money, desired_payment: Money) -> PaymentComparison {
    let difference = desired_payment - computed_payment;
    let magnitude = difference.abs();

    let outcome = if difference > Decimal::ZERO {
        ComparisonOutcome::BelowDesired
    } else if difference < Decimal::ZERO {
        ComparisonOutcome::AboveDesired
    } else {
        ComparisonOutcome::MatchesDesired
    };

    PaymentComparison {
        computed_payment,
        desired_payment,
        difference,
        magnitude,
        outcome,
        message: comparison_message(outcome, computed_payment, magnitude),
        motivation: None,
    }
}

fn comparison_message(outcome: ComparisonOutcome, computed: Money, magnitude: Money) -> String {
    let computed = computed.round_dp(2);
    let magnitude = magnitude.round_dp(2);
    match outcome {
        ComparisonOutcome::BelowDesired => format!(
            "Your desired payment is {magnitude} higher than the actual payment of {computed}."
        ),
        ComparisonOutcome::AboveDesired => format!(
            "The actual payment of {computed} is {magnitude} above your desired payment; \
             a longer term or a smaller amount can close the gap."
        ),
        ComparisonOutcome::MatchesDesired => {
            format!("The actual payment of {computed} matches your desired payment exactly.")
        }
    }
}

#[cfg(feature = "motivation")]
pub fn pick_motivation<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    MOTIVATIONS[rng.gen_range(0..MOTIVATIONS.len())]
}

/// Deterministic phrase for a given seed.
#[cfg(feature = "motivation")]
pub fn motivation_for_seed(seed: u64) -> &'static str {
    let mut rng = StdRng::seed_from_u64(seed);
    pick_motivation(&mut rng)
}

// ---------------------------------------------------------------------------
// Enveloped entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonInput {
    pub principal: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_rate: Option<Rate>,
    pub term_years: u32,
    pub desired_payment: Money,
}

pub fn calculate_comparison(
    input: &ComparisonInput,
) -> LoanOfferResult<ComputationOutput<PaymentComparison>> {
    let start = Instant::now();
    if input.desired_payment < Decimal::ZERO {
        return Err(LoanOfferError::InvalidInput {
            field: "desired_payment".into(),
            reason: "Desired payment cannot be negative.".into(),
        });
    }

    let annual_rate = resolve_rate(input.principal, input.annual_rate)?;
    let payment = monthly_payment(input.principal, annual_rate, input.term_years)?;
    let comparison = compare_payment(payment, input.desired_payment);

    let assumptions = serde_json::json!({
        "annual_rate": annual_rate.to_string(),
        "term_years": input.term_years,
    });

    Ok(with_metadata(
        "Desired vs computed payment",
        &assumptions,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        comparison,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cheaper_than_desired() {
        let c = compare_payment(dec!(197.07), dec!(250));
        assert_eq!(c.outcome, ComparisonOutcome::BelowDesired);
        assert_eq!(c.difference, dec!(52.93));
        assert_eq!(c.magnitude, dec!(52.93));
        assert!(c.message.contains("52.93"));
    }

    #[test]
    fn test_more_than_desired() {
        let c = compare_payment(dec!(197.07), dec!(150));
        assert_eq!(c.outcome, ComparisonOutcome::AboveDesired);
        assert_eq!(c.difference, dec!(-47.07));
        assert_eq!(c.magnitude, dec!(47.07));
        assert!(c.message.contains("47.07"));
    }

    #[test]
    fn test_exact_match() {
        let c = compare_payment(dec!(200), dec!(200.00));
        assert_eq!(c.outcome, ComparisonOutcome::MatchesDesired);
        assert_eq!(c.magnitude, Decimal::ZERO);
    }

    #[test]
    fn test_enveloped_comparison() {
        let input = ComparisonInput {
            principal: dec!(3000),
            annual_rate: None,
            term_years: 2,
            desired_payment: dec!(100),
        };
        let out = calculate_comparison(&input).unwrap();
        assert_eq!(out.result.outcome, ComparisonOutcome::AboveDesired);
    }

    #[cfg(feature = "motivation")]
    #[test]
    fn test_seeded_motivation_is_reproducible() {
        let a = motivation_for_seed(42);
        let b = motivation_for_seed(42);
        assert_eq!(a, b);
        assert!(MOTIVATIONS.contains(&a));
    }

    #[cfg(feature = "motivation")]
    #[test]
    fn test_every_seed_yields_known_phrase() {
        for seed in 0..50 {
            assert!(MOTIVATIONS.contains(&motivation_for_seed(seed)));
        }
    }
}
