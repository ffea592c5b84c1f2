use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::annuity::{
    checked_mul, checked_sub, monthly_payment, monthly_rate, periods_for, validate_loan_terms,
    MONTHS_PER_YEAR,
};
use crate::rates::resolve_rate;
use crate::types::*;
use crate::{LoanOfferError, LoanOfferResult};

/// One monthly payment split into its interest and principal parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// 1-based period number.
    pub index: u32,
    pub interest: Money,
    pub principal: Money,
    /// Balance after this period's payment.
    pub remaining_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_years: u32,
    pub payment: Money,
    pub periods: Vec<Period>,
}

impl AmortizationSchedule {
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// The first `count` periods (fewer if the schedule is shorter).
    pub fn first_periods(&self, count: usize) -> &[Period] {
        &self.periods[..count.min(self.periods.len())]
    }

    /// The periods covering the first `years` years.
    pub fn years(&self, years: u32) -> &[Period] {
        self.first_periods(periods_for(years) as usize)
    }

    /// First period of every year: 1, 13, 25, ...
    pub fn year_start_periods(&self) -> Vec<&Period> {
        self.periods
            .iter()
            .step_by(MONTHS_PER_YEAR as usize)
            .collect()
    }

    pub fn total_interest(&self) -> Money {
        self.periods.iter().map(|p| p.interest).sum()
    }

    pub fn total_principal(&self) -> Money {
        self.periods.iter().map(|p| p.principal).sum()
    }

    pub fn total_paid(&self) -> Money {
        self.payment * Decimal::from(self.periods.len() as u64)
    }

    /// Running balance after `elapsed` periods; `Some(principal)` for zero.
    pub fn balance_after(&self, elapsed: usize) -> Option<Money> {
        if elapsed == 0 {
            return Some(self.principal);
        }
        self.periods.get(elapsed - 1).map(|p| p.remaining_balance)
    }

    pub fn final_balance(&self) -> Money {
        self.periods
            .last()
            .map(|p| p.remaining_balance)
            .unwrap_or(self.principal)
    }
}

/// Walk the loan month by month: interest accrues on the running balance and
/// the rest of the payment reduces it. No per-period rounding is applied, so
/// the final balance may drift from zero by a tiny amount.
pub fn build_schedule(
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
    payment: Money,
) -> LoanOfferResult<AmortizationSchedule> {
    validate_loan_terms(principal, annual_rate, term_years)?;
    if payment <= Decimal::ZERO {
        return Err(LoanOfferError::InvalidInput {
            field: "payment".into(),
            reason: "Payment must be positive.".into(),
        });
    }

    let r = monthly_rate(annual_rate);
    let n = periods_for(term_years);
    let mut balance = principal;
    let mut periods = Vec::with_capacity(n as usize);

    for index in 1..=n {
        let interest = checked_mul(balance, r, "annual_rate")?;
        let repaid = checked_sub(payment, interest, "payment")?;
        balance = checked_sub(balance, repaid, "payment")?;
        periods.push(Period {
            index,
            interest,
            principal: repaid,
            remaining_balance: balance,
        });
    }

    Ok(AmortizationSchedule {
        principal,
        annual_rate,
        term_years,
        payment,
        periods,
    })
}

// ---------------------------------------------------------------------------
// Enveloped entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub principal: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_rate: Option<Rate>,
    pub term_years: u32,
    /// Only return the first N months.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub months: Option<u32>,
    /// Only return the first N years. Ignored when `months` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub annual_rate: Rate,
    pub payment: Money,
    pub total_periods: u32,
    pub total_interest: Money,
    pub total_principal: Money,
    pub final_balance: Money,
    /// The requested slice of the schedule.
    pub periods: Vec<Period>,
}

pub fn calculate_schedule(input: &ScheduleInput) -> LoanOfferResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let annual_rate = resolve_rate(input.principal, input.annual_rate)?;
    let payment = monthly_payment(input.principal, annual_rate, input.term_years)?;
    let schedule = build_schedule(input.principal, annual_rate, input.term_years, payment)?;

    let slice = match (input.months, input.years) {
        (Some(m), _) => schedule.first_periods(m as usize),
        (None, Some(y)) => schedule.years(y),
        (None, None) => &schedule.periods[..],
    };
    if slice.len() < schedule.len() {
        warnings.push(format!(
            "Showing {} of {} periods; totals cover the full term.",
            slice.len(),
            schedule.len()
        ));
    }

    let output = ScheduleOutput {
        annual_rate,
        payment,
        total_periods: schedule.len() as u32,
        total_interest: schedule.total_interest(),
        total_principal: schedule.total_principal(),
        final_balance: schedule.final_balance(),
        periods: slice.to_vec(),
    };

    let assumptions = serde_json::json!({
        "rounding": "none",
        "compounding": "monthly",
    });

    Ok(with_metadata(
        "Amortization schedule (iterative interest/principal split)",
        &assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn five_year_schedule() -> AmortizationSchedule {
        let payment = monthly_payment(dec!(10000), dec!(0.068), 5).unwrap();
        build_schedule(dec!(10000), dec!(0.068), 5, payment).unwrap()
    }

    #[test]
    fn test_schedule_length() {
        let s = five_year_schedule();
        assert_eq!(s.len(), 60);
        assert_eq!(s.periods[0].index, 1);
        assert_eq!(s.periods[59].index, 60);
    }

    #[test]
    fn test_each_period_sums_to_payment() {
        let s = five_year_schedule();
        for p in &s.periods {
            assert!((p.interest + p.principal - s.payment).abs() < dec!(0.0000001));
        }
    }

    #[test]
    fn test_fully_amortizes() {
        let s = five_year_schedule();
        assert!(s.final_balance().abs() < dec!(0.000001));
        assert!((s.total_principal() - dec!(10000)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_total_interest() {
        let s = five_year_schedule();
        // 60 * 197.0697 - 10000 ≈ 1824.18
        assert!((s.total_interest() - dec!(1824.18)).abs() < dec!(0.01));
    }

    #[test]
    fn test_interest_declines_principal_grows() {
        let s = five_year_schedule();
        for pair in s.periods.windows(2) {
            assert!(pair[1].interest < pair[0].interest);
            assert!(pair[1].principal > pair[0].principal);
        }
    }

    #[test]
    fn test_slices() {
        let s = five_year_schedule();
        assert_eq!(s.first_periods(12).len(), 12);
        assert_eq!(s.years(3).len(), 36);
        assert_eq!(s.first_periods(500).len(), 60);
        let starts: Vec<u32> = s.year_start_periods().iter().map(|p| p.index).collect();
        assert_eq!(starts, vec![1, 13, 25, 37, 49]);
    }

    #[test]
    fn test_balance_after() {
        let s = five_year_schedule();
        assert_eq!(s.balance_after(0), Some(dec!(10000)));
        assert_eq!(s.balance_after(1), Some(s.periods[0].remaining_balance));
        assert_eq!(s.balance_after(61), None);
    }

    #[test]
    fn test_zero_payment_rejected() {
        let err = build_schedule(dec!(10000), dec!(0.068), 5, Decimal::ZERO).unwrap_err();
        match err {
            LoanOfferError::InvalidInput { field, .. } => assert_eq!(field, "payment"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_overflowing_schedule_returns_error() {
        let err = build_schedule(dec!(10000), dec!(12), 5, Decimal::MAX).unwrap_err();
        assert!(matches!(err, LoanOfferError::InvalidInput { .. }));

        let input = ScheduleInput {
            principal: dec!(10000),
            annual_rate: Some(dec!(2.4)),
            term_years: 30,
            months: None,
            years: None,
        };
        assert!(calculate_schedule(&input).is_err());
    }

    #[test]
    fn test_calculate_schedule_slice_by_years() {
        let input = ScheduleInput {
            principal: dec!(10000),
            annual_rate: None,
            term_years: 5,
            months: None,
            years: Some(3),
        };
        let out = calculate_schedule(&input).unwrap();
        assert_eq!(out.result.periods.len(), 36);
        assert_eq!(out.result.total_periods, 60);
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_calculate_schedule_months_win_over_years() {
        let input = ScheduleInput {
            principal: dec!(10000),
            annual_rate: None,
            term_years: 5,
            months: Some(12),
            years: Some(3),
        };
        let out = calculate_schedule(&input).unwrap();
        assert_eq!(out.result.periods.len(), 12);
    }
}
