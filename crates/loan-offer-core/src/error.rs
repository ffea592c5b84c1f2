use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanOfferError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Unsupported principal: {principal} is outside every rate bracket (2500 to 50000)")]
    UnsupportedPrincipal { principal: Decimal },

    #[error("Infeasible affordability: payment of {payment_at_cap} at {max_term_years} years still exceeds capacity of {capacity}")]
    InfeasibleAffordability {
        capacity: Decimal,
        payment_at_cap: Decimal,
        max_term_years: u32,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for LoanOfferError {
    fn from(e: serde_json::Error) -> Self {
        LoanOfferError::SerializationError(e.to_string())
    }
}
