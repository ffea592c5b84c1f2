pub mod error;
pub mod types;

pub mod affordability;
pub mod amortization;
pub mod rates;
pub mod surcharge;

pub mod advisor;
pub mod quote;

pub use error::LoanOfferError;
pub use types::*;

/// Standard result type for all loan-offer operations
pub type LoanOfferResult<T> = Result<T, LoanOfferError>;
