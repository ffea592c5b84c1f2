use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

#[napi]
pub fn quote(request_json: String) -> NapiResult<String> {
    let request: loan_offer_core::quote::LoanRequest =
        serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let output = loan_offer_core::quote::quote(&request).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Rate table
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RateLookupInput {
    principal: Decimal,
}

/// Returns the annual rate as a decimal string, or null outside every bracket.
#[napi]
pub fn lookup_rate(input_json: String) -> NapiResult<String> {
    let input: RateLookupInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let rate = loan_offer_core::rates::lookup_rate(input.principal);
    serde_json::to_string(&rate).map_err(to_napi_error)
}

#[napi]
pub fn rate_brackets() -> NapiResult<String> {
    serde_json::to_string(loan_offer_core::rates::brackets()).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Amortization engine
// ---------------------------------------------------------------------------

#[napi]
pub fn monthly_payment(input_json: String) -> NapiResult<String> {
    let input: loan_offer_core::amortization::annuity::PaymentInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_offer_core::amortization::annuity::calculate_payment(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let input: loan_offer_core::amortization::schedule::ScheduleInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_offer_core::amortization::schedule::calculate_schedule(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn remaining_balance(input_json: String) -> NapiResult<String> {
    let input: loan_offer_core::amortization::annuity::BalanceInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_offer_core::amortization::annuity::calculate_remaining_balance(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Affordability and comparison
// ---------------------------------------------------------------------------

#[napi]
pub fn adjust_term(input_json: String) -> NapiResult<String> {
    let input: loan_offer_core::affordability::AffordabilityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_offer_core::affordability::calculate_term_adjustment(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_payment(input_json: String) -> NapiResult<String> {
    let input: loan_offer_core::advisor::ComparisonInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        loan_offer_core::advisor::calculate_comparison(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
