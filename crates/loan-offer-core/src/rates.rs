use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};
use crate::{LoanOfferError, LoanOfferResult};

/// A principal range priced at a single annual nominal rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBracket {
    /// Inclusive lower bound.
    pub lower_bound: Money,
    pub upper_bound: Money,
    /// Only the top bracket includes its upper bound.
    pub upper_inclusive: bool,
    pub annual_rate: Rate,
}

impl RateBracket {
    pub fn contains(&self, principal: Money) -> bool {
        if principal < self.lower_bound {
            return false;
        }
        if self.upper_inclusive {
            principal <= self.upper_bound
        } else {
            principal < self.upper_bound
        }
    }
}

/// Smallest principal any bracket accepts.
pub const MIN_PRINCIPAL: Money = dec!(2500);

/// Largest principal any bracket accepts.
pub const MAX_PRINCIPAL: Money = dec!(50000);

// Ordered, non-overlapping, covering [2500, 50000].
const RATE_TABLE: [RateBracket; 3] = [
    RateBracket {
        lower_bound: dec!(2500),
        upper_bound: dec!(5000),
        upper_inclusive: false,
        annual_rate: dec!(0.095),
    },
    RateBracket {
        lower_bound: dec!(5000),
        upper_bound: dec!(10000),
        upper_inclusive: false,
        annual_rate: dec!(0.079),
    },
    RateBracket {
        lower_bound: dec!(10000),
        upper_bound: dec!(50000),
        upper_inclusive: true,
        annual_rate: dec!(0.068),
    },
];

/// The fixed pricing brackets, lowest first.
pub fn brackets() -> &'static [RateBracket] {
    &RATE_TABLE
}

/// Step-function lookup of the annual rate for a principal.
/// Returns `None` outside [2500, 50000].
pub fn lookup_rate(principal: Money) -> Option<Rate> {
    RATE_TABLE
        .iter()
        .find(|b| b.contains(principal))
        .map(|b| b.annual_rate)
}

/// Fallible form of [`lookup_rate`] used by the quote pipeline.
pub fn rate_for(principal: Money) -> LoanOfferResult<Rate> {
    lookup_rate(principal).ok_or(LoanOfferError::UnsupportedPrincipal { principal })
}

/// Use an explicit rate when given, otherwise price from the table.
pub fn resolve_rate(principal: Money, explicit: Option<Rate>) -> LoanOfferResult<Rate> {
    match explicit {
        Some(rate) => Ok(rate),
        None => rate_for(principal),
    }
}
