use clap::Args;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;

use loan_offer_core::advisor::{self, ComparisonInput};
use loan_offer_core::affordability::{self, AffordabilityInput};
use loan_offer_core::amortization::annuity::{self, BalanceInput, PaymentInput};
use loan_offer_core::amortization::schedule::{self, ScheduleInput};
use loan_offer_core::quote::{self, LoanRequest};
use loan_offer_core::rates;

use crate::input;

/// Arguments for a full loan quote
#[derive(Args)]
pub struct QuoteArgs {
    /// Path to a JSON/YAML request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Principal to borrow (2,500 to 50,000)
    #[arg(long, alias = "amount")]
    pub principal: Option<Decimal>,

    /// Requested term in years (1 to 20)
    #[arg(long, alias = "term")]
    pub term_years: Option<u32>,

    /// Rate-lock period in years (5 or 10)
    #[arg(long)]
    pub rate_lock_years: Option<u32>,

    /// Payment the borrower would like to see
    #[arg(long)]
    pub desired_payment: Option<Decimal>,

    /// Highest monthly payment the borrower can sustain
    #[arg(long, alias = "capacity")]
    pub affordable_payment: Option<Decimal>,

    /// Add payment-protection insurance
    #[arg(long)]
    pub insurance: bool,

    /// Seed for the motivational phrase
    #[arg(long)]
    pub motivation_seed: Option<u64>,

    /// Keep the full amortization schedule in the output
    #[arg(long)]
    pub include_schedule: bool,

    /// Fail instead of returning a quote flagged infeasible
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for a bracket rate lookup
#[derive(Args)]
pub struct RateArgs {
    /// Principal to price
    #[arg(long, alias = "amount")]
    pub principal: Decimal,
}

/// Arguments for the monthly payment
#[derive(Args)]
pub struct PaymentArgs {
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long, alias = "amount")]
    pub principal: Option<Decimal>,

    /// Annual rate as a decimal (0.068 = 6.8%); defaults to the bracket rate
    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    #[arg(long, alias = "term")]
    pub term_years: Option<u32>,
}

/// Arguments for the amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long, alias = "amount")]
    pub principal: Option<Decimal>,

    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    #[arg(long, alias = "term")]
    pub term_years: Option<u32>,

    /// Only show the first N months
    #[arg(long)]
    pub months: Option<u32>,

    /// Only show the first N years
    #[arg(long)]
    pub years: Option<u32>,
}

/// Arguments for the remaining balance
#[derive(Args)]
pub struct BalanceArgs {
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long, alias = "amount")]
    pub principal: Option<Decimal>,

    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    #[arg(long, alias = "term")]
    pub term_years: Option<u32>,

    /// Years already paid, typically the rate-lock period
    #[arg(long, alias = "rate-lock-years")]
    pub elapsed_years: Option<u32>,
}

/// Arguments for the affordability check
#[derive(Args)]
pub struct AffordabilityArgs {
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long, alias = "amount")]
    pub principal: Option<Decimal>,

    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    #[arg(long, alias = "term")]
    pub term_years: Option<u32>,

    #[arg(long, alias = "capacity")]
    pub affordable_payment: Option<Decimal>,
}

/// Arguments for the desired-payment comparison
#[derive(Args)]
pub struct CompareArgs {
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long, alias = "amount")]
    pub principal: Option<Decimal>,

    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    #[arg(long, alias = "term")]
    pub term_years: Option<u32>,

    #[arg(long)]
    pub desired_payment: Option<Decimal>,
}

/// Load a typed request from `--input`, piped stdin, or fall back to flags.
fn load<T, F>(path: &Option<String>, from_flags: F) -> Result<T, Box<dyn std::error::Error>>
where
    T: DeserializeOwned,
    F: FnOnce() -> Result<T, Box<dyn std::error::Error>>,
{
    if let Some(path) = path {
        input::file::read_request(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        from_flags()
    }
}

pub fn run_quote(args: QuoteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: LoanRequest = load(&args.input, || {
        Ok(LoanRequest {
            principal: args.principal
                .ok_or("--principal is required (or provide --input)")?,
            term_years: args.term_years
                .ok_or("--term-years is required (or provide --input)")?,
            rate_lock_years: args.rate_lock_years,
            desired_payment: args.desired_payment,
            affordable_payment: args.affordable_payment,
            insurance_selected: args.insurance,
            motivation_seed: args.motivation_seed,
        })
    })?;

    let result = quote::quote(&request)?;
    if args.strict {
        result.result.ensure_feasible()?;
    }

    let mut value = serde_json::to_value(result)?;
    if !args.include_schedule {
        if let Some(Value::Object(res)) = value.get_mut("result") {
            res.remove("schedule");
        }
    }
    Ok(value)
}

pub fn run_rate(args: RateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let annual_rate = rates::rate_for(args.principal)?;
    let bracket = rates::brackets()
        .iter()
        .find(|b| b.contains(args.principal))
        .ok_or("no bracket for principal")?;

    Ok(serde_json::json!({
        "result": {
            "principal": args.principal,
            "annual_rate": annual_rate,
            "annual_rate_pct": annual_rate * Decimal::ONE_HUNDRED,
            "bracket_lower_bound": bracket.lower_bound,
            "bracket_upper_bound": bracket.upper_bound,
            "upper_inclusive": bracket.upper_inclusive,
        },
        "methodology": "Fixed principal brackets",
        "warnings": [],
    }))
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let payment_input: PaymentInput = load(&args.input, || {
        Ok(PaymentInput {
            principal: args.principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate: args.annual_rate,
            term_years: args.term_years
                .ok_or("--term-years is required (or provide --input)")?,
        })
    })?;
    let result = annuity::calculate_payment(&payment_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: ScheduleInput = load(&args.input, || {
        Ok(ScheduleInput {
            principal: args.principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate: args.annual_rate,
            term_years: args.term_years
                .ok_or("--term-years is required (or provide --input)")?,
            months: args.months,
            years: args.years,
        })
    })?;
    let result = schedule::calculate_schedule(&schedule_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_balance(args: BalanceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let balance_input: BalanceInput = load(&args.input, || {
        Ok(BalanceInput {
            principal: args.principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate: args.annual_rate,
            term_years: args.term_years
                .ok_or("--term-years is required (or provide --input)")?,
            elapsed_years: args.elapsed_years
                .ok_or("--elapsed-years is required (or provide --input)")?,
        })
    })?;
    let result = annuity::calculate_remaining_balance(&balance_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_affordability(args: AffordabilityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let afford_input: AffordabilityInput = load(&args.input, || {
        Ok(AffordabilityInput {
            principal: args.principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate: args.annual_rate,
            term_years: args.term_years
                .ok_or("--term-years is required (or provide --input)")?,
            affordable_payment: args.affordable_payment
                .ok_or("--affordable-payment is required (or provide --input)")?,
        })
    })?;
    let result = affordability::calculate_term_adjustment(&afford_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let compare_input: ComparisonInput = load(&args.input, || {
        Ok(ComparisonInput {
            principal: args.principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate: args.annual_rate,
            term_years: args.term_years
                .ok_or("--term-years is required (or provide --input)")?,
            desired_payment: args.desired_payment
                .ok_or("--desired-payment is required (or provide --input)")?,
        })
    })?;
    let result = advisor::calculate_comparison(&compare_input)?;
    Ok(serde_json::to_value(result)?)
}
