use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::rates::resolve_rate;
use crate::types::*;
use crate::{LoanOfferError, LoanOfferResult};

pub const MONTHS_PER_YEAR: u32 = 12;

/// Longest term the engine will price, in years.
pub const MAX_TERM_YEARS: u32 = 30;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    pub principal: Money,
    /// Annual nominal rate. Priced from the rate table when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_rate: Option<Rate>,
    pub term_years: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutput {
    pub annual_rate: Rate,
    pub monthly_rate: Rate,
    pub periods: u32,
    pub payment: Money,
    /// payment x periods
    pub total_paid: Money,
    pub total_interest: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceInput {
    pub principal: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_rate: Option<Rate>,
    pub term_years: u32,
    /// Years already paid, typically the rate-lock period.
    pub elapsed_years: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceOutput {
    pub annual_rate: Rate,
    pub payment: Money,
    pub elapsed_periods: u32,
    pub remaining_balance: Money,
    pub principal_repaid: Money,
    /// Share of the original principal still outstanding, in percent.
    pub remaining_pct: Decimal,
}

// ---------------------------------------------------------------------------
// Core formulas
// ---------------------------------------------------------------------------

/// Level monthly payment that fully amortizes `principal` over `term_years`.
///
/// payment = P * r * (1+r)^n / ((1+r)^n - 1), with r = annual_rate / 12 and
/// n = term_years * 12. A zero rate degenerates to P / n.
pub fn monthly_payment(principal: Money, annual_rate: Rate, term_years: u32) -> LoanOfferResult<Money> {
    validate_loan_terms(principal, annual_rate, term_years)?;

    let n = periods_for(term_years);
    let r = monthly_rate(annual_rate);

    if r.is_zero() {
        return Ok(principal / Decimal::from(n));
    }

    let factor = growth_factor(r, n)?;
    let denom = factor - Decimal::ONE;
    if denom.is_zero() {
        return Err(LoanOfferError::DivisionByZero {
            context: "annuity factor".into(),
        });
    }

    let scaled = checked_mul(checked_mul(principal, r, "principal")?, factor, "annual_rate")?;
    checked_div(scaled, denom, "annuity factor")
}

/// Outstanding balance after `elapsed_years` of scheduled payments, via the
/// closed form P * ((1+r)^n - (1+r)^m) / ((1+r)^n - 1).
pub fn remaining_balance(
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
    elapsed_years: u32,
) -> LoanOfferResult<Money> {
    if elapsed_years > term_years {
        return Err(LoanOfferError::InvalidInput {
            field: "elapsed_years".into(),
            reason: format!("Elapsed years ({elapsed_years}) cannot exceed the term ({term_years})."),
        });
    }
    remaining_balance_after_periods(principal, annual_rate, term_years, periods_for(elapsed_years))
}

/// Month-granular form of [`remaining_balance`].
pub fn remaining_balance_after_periods(
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
    elapsed_periods: u32,
) -> LoanOfferResult<Money> {
    validate_loan_terms(principal, annual_rate, term_years)?;

    let n = periods_for(term_years);
    if elapsed_periods > n {
        return Err(LoanOfferError::InvalidInput {
            field: "elapsed_periods".into(),
            reason: format!("Elapsed periods ({elapsed_periods}) cannot exceed {n}."),
        });
    }

    let r = monthly_rate(annual_rate);
    if r.is_zero() {
        let outstanding = checked_mul(principal, Decimal::from(n - elapsed_periods), "principal")?;
        return checked_div(outstanding, Decimal::from(n), "remaining balance");
    }

    let factor_n = growth_factor(r, n)?;
    let factor_m = growth_factor(r, elapsed_periods)?;
    let denom = factor_n - Decimal::ONE;
    if denom.is_zero() {
        return Err(LoanOfferError::DivisionByZero {
            context: "remaining balance annuity factor".into(),
        });
    }

    let scaled = checked_mul(principal, factor_n - factor_m, "principal")?;
    checked_div(scaled, denom, "remaining balance annuity factor")
}

/// Principal repaid in period `period_index` (1-based, at most
/// `term_years * 12`) as a percentage of the original principal.
pub fn monthly_amortization_rate(
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
    payment: Money,
    period_index: u32,
) -> LoanOfferResult<Decimal> {
    validate_loan_terms(principal, annual_rate, term_years)?;
    let n = periods_for(term_years);
    if period_index == 0 || period_index > n {
        return Err(LoanOfferError::InvalidInput {
            field: "period_index".into(),
            reason: format!("Period index must be between 1 and {n}."),
        });
    }
    let rates = first_months_amortization_rates(principal, annual_rate, payment, period_index)?;
    rates.last().copied().ok_or_else(|| LoanOfferError::InvalidInput {
        field: "period_index".into(),
        reason: "No period to report.".into(),
    })
}

/// Amortization percentages for the first `months` periods, at most 360.
pub fn first_months_amortization_rates(
    principal: Money,
    annual_rate: Rate,
    payment: Money,
    months: u32,
) -> LoanOfferResult<Vec<Decimal>> {
    if principal <= Decimal::ZERO {
        return Err(LoanOfferError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be positive.".into(),
        });
    }
    if annual_rate < Decimal::ZERO {
        return Err(LoanOfferError::InvalidInput {
            field: "annual_rate".into(),
            reason: "Annual rate cannot be negative.".into(),
        });
    }
    if payment <= Decimal::ZERO {
        return Err(LoanOfferError::InvalidInput {
            field: "payment".into(),
            reason: "Payment must be positive.".into(),
        });
    }

    let max_months = periods_for(MAX_TERM_YEARS);
    if months > max_months {
        return Err(LoanOfferError::InvalidInput {
            field: "months".into(),
            reason: format!("At most {max_months} months can be reported."),
        });
    }

    let r = monthly_rate(annual_rate);
    let mut balance = principal;
    let mut rates = Vec::with_capacity(months as usize);
    for _ in 0..months {
        let interest = checked_mul(balance, r, "annual_rate")?;
        let repaid = checked_sub(payment, interest, "payment")?;
        balance = checked_sub(balance, repaid, "payment")?;
        let share = checked_div(repaid, principal, "amortization rate")?;
        rates.push(checked_mul(share, dec!(100), "payment")?);
    }
    Ok(rates)
}

// ---------------------------------------------------------------------------
// Enveloped entry points
// ---------------------------------------------------------------------------

pub fn calculate_payment(input: &PaymentInput) -> LoanOfferResult<ComputationOutput<PaymentOutput>> {
    let start = Instant::now();
    let annual_rate = resolve_rate(input.principal, input.annual_rate)?;
    let payment = monthly_payment(input.principal, annual_rate, input.term_years)?;

    let periods = periods_for(input.term_years);
    let total_paid = checked_mul(payment, Decimal::from(periods), "principal")?;
    let output = PaymentOutput {
        annual_rate,
        monthly_rate: monthly_rate(annual_rate),
        periods,
        payment,
        total_paid,
        total_interest: total_paid - input.principal,
    };

    let assumptions = serde_json::json!({
        "rate_source": if input.annual_rate.is_some() { "explicit" } else { "rate_table" },
        "compounding": "monthly",
    });

    Ok(with_metadata(
        "Annuity payment (fixed rate, monthly compounding)",
        &assumptions,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        output,
    ))
}

pub fn calculate_remaining_balance(
    input: &BalanceInput,
) -> LoanOfferResult<ComputationOutput<BalanceOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let annual_rate = resolve_rate(input.principal, input.annual_rate)?;
    let payment = monthly_payment(input.principal, annual_rate, input.term_years)?;
    let balance = remaining_balance(input.principal, annual_rate, input.term_years, input.elapsed_years)?;

    if input.elapsed_years == input.term_years {
        warnings.push("Elapsed period equals the full term; the loan is fully repaid.".into());
    }

    let output = BalanceOutput {
        annual_rate,
        payment,
        elapsed_periods: periods_for(input.elapsed_years),
        remaining_balance: balance,
        principal_repaid: input.principal - balance,
        remaining_pct: checked_div(balance, input.principal, "remaining share")? * dec!(100),
    };

    let assumptions = serde_json::json!({
        "method": "closed_form",
        "term_years": input.term_years,
    });

    Ok(with_metadata(
        "Remaining balance (closed-form annuity identity)",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

pub(crate) fn monthly_rate(annual_rate: Rate) -> Rate {
    annual_rate / Decimal::from(MONTHS_PER_YEAR)
}

pub(crate) fn periods_for(years: u32) -> u32 {
    years * MONTHS_PER_YEAR
}

fn growth_factor(r: Rate, periods: u32) -> LoanOfferResult<Decimal> {
    (Decimal::ONE + r)
        .checked_powu(u64::from(periods))
        .ok_or_else(|| LoanOfferError::InvalidInput {
            field: "annual_rate".into(),
            reason: format!("Growth factor overflows over {periods} periods."),
        })
}

/// `a * b`, with overflow reported against the input `field` that drove it.
pub(crate) fn checked_mul(a: Decimal, b: Decimal, field: &str) -> LoanOfferResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| LoanOfferError::InvalidInput {
        field: field.into(),
        reason: "Value too large; the computation overflows.".into(),
    })
}

pub(crate) fn checked_sub(a: Decimal, b: Decimal, field: &str) -> LoanOfferResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| LoanOfferError::InvalidInput {
        field: field.into(),
        reason: "Value too large; the computation overflows.".into(),
    })
}

pub(crate) fn checked_div(a: Decimal, b: Decimal, context: &str) -> LoanOfferResult<Decimal> {
    if b.is_zero() {
        return Err(LoanOfferError::DivisionByZero {
            context: context.into(),
        });
    }
    a.checked_div(b).ok_or_else(|| LoanOfferError::InvalidInput {
        field: context.into(),
        reason: "Quotient overflows.".into(),
    })
}

pub(crate) fn validate_loan_terms(principal: Money, annual_rate: Rate, term_years: u32) -> LoanOfferResult<()> {
    if principal <= Decimal::ZERO {
        return Err(LoanOfferError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be positive.".into(),
        });
    }
    if annual_rate < Decimal::ZERO {
        return Err(LoanOfferError::InvalidInput {
            field: "annual_rate".into(),
            reason: "Annual rate cannot be negative.".into(),
        });
    }
    if term_years == 0 || term_years > MAX_TERM_YEARS {
        return Err(LoanOfferError::InvalidInput {
            field: "term_years".into(),
            reason: format!("Term must be between 1 and {MAX_TERM_YEARS} years."),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reference_payment() {
        let payment = monthly_payment(dec!(10000), dec!(0.068), 5).unwrap();
        // 10000 * 0.005667 * 1.4028 / 0.4028 ≈ 197.07
        assert!((payment - dec!(197.07)).abs() < dec!(0.01), "payment = {payment}");
    }

    #[test]
    fn test_small_loan_payment() {
        let payment = monthly_payment(dec!(3000), dec!(0.095), 2).unwrap();
        assert!((payment - dec!(137.74)).abs() < dec!(0.01), "payment = {payment}");
    }

    #[test]
    fn test_zero_rate_is_simple_average() {
        let payment = monthly_payment(dec!(12000), Decimal::ZERO, 5).unwrap();
        assert_eq!(payment, dec!(200));
    }

    #[test]
    fn test_longer_term_lowers_payment() {
        let mut last = monthly_payment(dec!(20000), dec!(0.068), 1).unwrap();
        for years in 2..=MAX_TERM_YEARS {
            let next = monthly_payment(dec!(20000), dec!(0.068), years).unwrap();
            assert!(next < last, "payment rose at {years} years");
            last = next;
        }
    }

    #[test]
    fn test_rejects_bad_terms() {
        for (p, r, t, field) in [
            (dec!(0), dec!(0.05), 5, "principal"),
            (dec!(-100), dec!(0.05), 5, "principal"),
            (dec!(1000), dec!(-0.01), 5, "annual_rate"),
            (dec!(1000), dec!(0.05), 0, "term_years"),
            (dec!(1000), dec!(0.05), 31, "term_years"),
        ] {
            match monthly_payment(p, r, t).unwrap_err() {
                LoanOfferError::InvalidInput { field: f, .. } => assert_eq!(f, field),
                other => panic!("Expected InvalidInput, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_remaining_balance_endpoints() {
        let start = remaining_balance(dec!(10000), dec!(0.068), 10, 0).unwrap();
        assert!((start - dec!(10000)).abs() < dec!(0.000001));
        let end = remaining_balance(dec!(10000), dec!(0.068), 10, 10).unwrap();
        assert!(end.abs() < dec!(0.000001));
    }

    #[test]
    fn test_remaining_balance_zero_rate_is_linear() {
        let balance = remaining_balance(dec!(12000), Decimal::ZERO, 10, 5).unwrap();
        assert_eq!(balance, dec!(6000));
    }

    #[test]
    fn test_remaining_balance_elapsed_past_term() {
        let err = remaining_balance(dec!(10000), dec!(0.068), 5, 10).unwrap_err();
        match err {
            LoanOfferError::InvalidInput { field, .. } => assert_eq!(field, "elapsed_years"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_first_period_amortization_rate() {
        let payment = monthly_payment(dec!(10000), dec!(0.068), 5).unwrap();
        let pct = monthly_amortization_rate(dec!(10000), dec!(0.068), 5, payment, 1).unwrap();
        // (197.07 - 56.67) / 10000 * 100 ≈ 1.404
        let expected = (payment - dec!(10000) * dec!(0.068) / dec!(12)) / dec!(100);
        assert!((pct - expected).abs() < dec!(0.0000001));
        assert!((pct - dec!(1.404)).abs() < dec!(0.001));
    }

    #[test]
    fn test_amortization_rates_increase() {
        let payment = monthly_payment(dec!(5000), dec!(0.079), 3).unwrap();
        let rates = first_months_amortization_rates(dec!(5000), dec!(0.079), payment, 3).unwrap();
        assert_eq!(rates.len(), 3);
        assert!(rates[0] < rates[1] && rates[1] < rates[2]);
    }

    #[test]
    fn test_amortization_rate_period_zero_rejected() {
        let err = monthly_amortization_rate(dec!(5000), dec!(0.079), 3, dec!(150), 0).unwrap_err();
        assert!(matches!(err, LoanOfferError::InvalidInput { .. }));
    }

    #[test]
    fn test_amortization_rate_past_term_rejected() {
        let payment = monthly_payment(dec!(4000), dec!(0.095), 3).unwrap();
        let last = monthly_amortization_rate(dec!(4000), dec!(0.095), 3, payment, 36);
        assert!(last.is_ok());
        match monthly_amortization_rate(dec!(4000), dec!(0.095), 3, payment, 100).unwrap_err() {
            LoanOfferError::InvalidInput { field, .. } => assert_eq!(field, "period_index"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
        match monthly_amortization_rate(dec!(4000), dec!(0.095), 3, payment, 37).unwrap_err() {
            LoanOfferError::InvalidInput { field, .. } => assert_eq!(field, "period_index"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_first_months_capped_at_longest_term() {
        let err = first_months_amortization_rates(dec!(5000), dec!(0.079), dec!(150), u32::MAX)
            .unwrap_err();
        match err {
            LoanOfferError::InvalidInput { field, .. } => assert_eq!(field, "months"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
        let full = first_months_amortization_rates(dec!(5000), dec!(0.079), dec!(150), 360).unwrap();
        assert_eq!(full.len(), 360);
    }

    #[test]
    fn test_extreme_rate_returns_error() {
        // 240 % a year: (1.2)^360 still fits a Decimal, P * r * (1.2)^360 does not.
        assert!(monthly_payment(dec!(10000), dec!(2.4), 30).is_err());
        assert!(remaining_balance(dec!(10000), dec!(2.4), 30, 5).is_err());
        let input = PaymentInput {
            principal: dec!(10000),
            annual_rate: Some(dec!(2.4)),
            term_years: 30,
        };
        assert!(calculate_payment(&input).is_err());
        // Past the Decimal range of the growth factor itself.
        assert!(monthly_payment(dec!(10000), dec!(5), 30).is_err());
    }

    #[test]
    fn test_huge_principal_at_zero_rate_returns_error() {
        let err = remaining_balance(Decimal::MAX, Decimal::ZERO, 30, 1).unwrap_err();
        assert!(matches!(err, LoanOfferError::InvalidInput { .. }));
    }

    #[test]
    fn test_calculate_payment_uses_rate_table() {
        let input = PaymentInput {
            principal: dec!(7500),
            annual_rate: None,
            term_years: 4,
        };
        let out = calculate_payment(&input).unwrap();
        assert_eq!(out.result.annual_rate, dec!(0.079));
        assert_eq!(out.result.periods, 48);
        assert_eq!(out.result.total_interest, out.result.total_paid - dec!(7500));
    }

    #[test]
    fn test_calculate_balance_full_term_warns() {
        let input = BalanceInput {
            principal: dec!(20000),
            annual_rate: None,
            term_years: 10,
            elapsed_years: 10,
        };
        let out = calculate_remaining_balance(&input).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.result.remaining_pct.abs() < dec!(0.0001));
    }
}
