use log::{info, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::advisor::{compare_payment, PaymentComparison};
use crate::affordability::{adjust_term, adjustment_warnings, TermAdjustment};
use crate::amortization::annuity::{first_months_amortization_rates, monthly_amortization_rate};
use crate::amortization::{build_schedule, monthly_payment, remaining_balance, AmortizationSchedule, MAX_TERM_YEARS};
use crate::rates::{rate_for, MAX_PRINCIPAL, MIN_PRINCIPAL};
use crate::surcharge::{with_insurance, INSURANCE_SURCHARGE_RATE};
use crate::{types::*, LoanOfferError, LoanOfferResult};

/// Longest term a borrower may request; only the affordability check goes
/// beyond it.
pub const MAX_REQUESTED_TERM_YEARS: u32 = 20;

/// Rate-lock periods on offer, in years.
pub const RATE_LOCK_OPTIONS: [u32; 2] = [5, 10];

/// Number of leading months whose amortization rate is reported.
const FIRST_MONTHS_REPORTED: u32 = 3;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRequest {
    pub principal: Money,
    pub term_years: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_lock_years: Option<u32>,
    /// Payment the borrower would like to see.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_payment: Option<Money>,
    /// Highest payment the borrower can sustain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affordable_payment: Option<Money>,
    #[serde(default)]
    pub insurance_selected: bool,
    /// Opt-in seed for the motivational phrase; none is attached without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivation_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanQuote {
    pub principal: Money,
    pub annual_rate: Rate,
    /// Level payment without insurance.
    pub payment: Money,
    pub payment_with_insurance: Money,
    pub insurance_selected: bool,
    /// Payment actually due: with insurance when selected.
    pub payment_due: Money,
    /// Principal share of the first payment, in percent of the principal.
    pub initial_principal_share_pct: Decimal,
    pub first_months_amortization_pct: Vec<Decimal>,
    /// Amortization rate in the first month of each year.
    pub yearly_amortization_pct: Vec<Decimal>,
    pub total_interest: Money,
    /// Principal plus total interest.
    pub total_cost: Money,
    pub requested_term_years: u32,
    pub effective_term_years: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_lock_years: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_balance_at_rate_lock: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_adjustment: Option<TermAdjustment>,
    /// False when the payment exceeds capacity even at the maximum term.
    pub feasible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<PaymentComparison>,
    pub schedule: AmortizationSchedule,
}

impl LoanQuote {
    /// Reject a quote that could not be brought within the stated capacity.
    pub fn ensure_feasible(&self) -> LoanOfferResult<()> {
        if self.feasible {
            return Ok(());
        }
        let capacity = self
            .term_adjustment
            .as_ref()
            .map(|a| a.affordable_payment)
            .unwrap_or(Decimal::ZERO);
        Err(LoanOfferError::InfeasibleAffordability {
            capacity,
            payment_at_cap: self.payment,
            max_term_years: MAX_TERM_YEARS,
        })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Price a loan request end to end: rate lookup, annuity payment, term
/// extension against capacity, schedule, surcharge and desired-payment
/// comparison.
///
/// An infeasible request still yields a quote at the maximum term, flagged
/// with `feasible == false` and a warning.
pub fn quote(request: &LoanRequest) -> LoanOfferResult<ComputationOutput<LoanQuote>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_request(request)?;

    let principal = request.principal;
    let annual_rate = rate_for(principal)?;
    let mut payment = monthly_payment(principal, annual_rate, request.term_years)?;

    // -- Affordability --------------------------------------------------------
    let term_adjustment = match request.affordable_payment {
        Some(capacity) => {
            let adj = adjust_term(principal, annual_rate, request.term_years, payment, capacity)?;
            payment = adj.payment;
            warnings.extend(adjustment_warnings(&adj));
            Some(adj)
        }
        None => None,
    };
    let effective_term = term_adjustment
        .as_ref()
        .map(|a| a.term_years)
        .unwrap_or(request.term_years);
    let feasible = term_adjustment.as_ref().map_or(true, |a| a.is_feasible());
    if !feasible {
        warn!("quote for {principal} flagged infeasible at {effective_term} years");
    }

    // -- Schedule and totals --------------------------------------------------
    let schedule = build_schedule(principal, annual_rate, effective_term, payment)?;
    let total_interest = schedule.total_interest();
    let total_cost = principal + total_interest;

    let initial_principal_share_pct =
        monthly_amortization_rate(principal, annual_rate, effective_term, payment, 1)?;
    let first_months_amortization_pct =
        first_months_amortization_rates(principal, annual_rate, payment, FIRST_MONTHS_REPORTED)?;
    let yearly_amortization_pct = schedule
        .year_start_periods()
        .iter()
        .map(|p| p.principal / principal * dec!(100))
        .collect();

    let remaining_balance_at_rate_lock = match request.rate_lock_years {
        Some(years) => Some(remaining_balance(principal, annual_rate, effective_term, years)?),
        None => None,
    };

    // -- Surcharge and comparison ---------------------------------------------
    let payment_with_insurance = with_insurance(payment, principal);
    let payment_due = if request.insurance_selected {
        payment_with_insurance
    } else {
        payment
    };

    let mut comparison = request.desired_payment.map(|d| compare_payment(payment, d));
    attach_motivation(request, comparison.as_mut());

    let output = LoanQuote {
        principal,
        annual_rate,
        payment,
        payment_with_insurance,
        insurance_selected: request.insurance_selected,
        payment_due,
        initial_principal_share_pct,
        first_months_amortization_pct,
        yearly_amortization_pct,
        total_interest,
        total_cost,
        requested_term_years: request.term_years,
        effective_term_years: effective_term,
        rate_lock_years: request.rate_lock_years,
        remaining_balance_at_rate_lock,
        term_adjustment,
        feasible,
        comparison,
        schedule,
    };

    info!(
        "quoted {principal} at {annual_rate} over {effective_term} years: payment {}",
        payment.round_dp(2)
    );

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "rate_source": "rate_table",
        "compounding": "monthly",
        "insurance_surcharge_rate": INSURANCE_SURCHARGE_RATE.to_string(),
        "max_term_years": MAX_TERM_YEARS,
        "rounding": "none",
    });

    Ok(with_metadata(
        "Annuity loan quote (fixed rate, monthly compounding)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

#[cfg(feature = "motivation")]
fn attach_motivation(request: &LoanRequest, comparison: Option<&mut PaymentComparison>) {
    use crate::advisor::{motivation_for_seed, ComparisonOutcome};

    if let (Some(seed), Some(c)) = (request.motivation_seed, comparison) {
        if c.outcome == ComparisonOutcome::BelowDesired {
            c.motivation = Some(motivation_for_seed(seed).to_string());
        }
    }
}

#[cfg(not(feature = "motivation"))]
fn attach_motivation(_request: &LoanRequest, _comparison: Option<&mut PaymentComparison>) {}

fn validate_request(request: &LoanRequest) -> LoanOfferResult<()> {
    if request.principal <= Decimal::ZERO {
        return Err(LoanOfferError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be positive.".into(),
        });
    }
    if request.principal < MIN_PRINCIPAL || request.principal > MAX_PRINCIPAL {
        return Err(LoanOfferError::UnsupportedPrincipal {
            principal: request.principal,
        });
    }
    if request.term_years == 0 || request.term_years > MAX_REQUESTED_TERM_YEARS {
        return Err(LoanOfferError::InvalidInput {
            field: "term_years".into(),
            reason: format!("Term must be between 1 and {MAX_REQUESTED_TERM_YEARS} years."),
        });
    }
    if let Some(lock) = request.rate_lock_years {
        if !RATE_LOCK_OPTIONS.contains(&lock) {
            return Err(LoanOfferError::InvalidInput {
                field: "rate_lock_years".into(),
                reason: "Rate lock must be 5 or 10 years.".into(),
            });
        }
        if lock > request.term_years {
            return Err(LoanOfferError::InvalidInput {
                field: "rate_lock_years".into(),
                reason: format!(
                    "Rate lock ({lock} years) cannot exceed the term ({} years).",
                    request.term_years
                ),
            });
        }
    }
    if let Some(desired) = request.desired_payment {
        if desired < Decimal::ZERO {
            return Err(LoanOfferError::InvalidInput {
                field: "desired_payment".into(),
                reason: "Desired payment cannot be negative.".into(),
            });
        }
    }
    if let Some(capacity) = request.affordable_payment {
        if capacity < Decimal::ZERO {
            return Err(LoanOfferError::InvalidInput {
                field: "affordable_payment".into(),
                reason: "Affordable payment cannot be negative.".into(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
