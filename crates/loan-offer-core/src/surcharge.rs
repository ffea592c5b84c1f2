use rust_decimal_macros::dec;

use crate::types::{Money, Rate};

/// Monthly payment-protection insurance charge per unit of principal.
pub const INSURANCE_SURCHARGE_RATE: Rate = dec!(0.00273);

/// Flat monthly insurance charge for a loan of `principal`.
pub fn insurance_surcharge(principal: Money) -> Money {
    principal * INSURANCE_SURCHARGE_RATE
}

/// Monthly payment including payment-protection insurance. The surcharge is
/// added on top and never folded into the amortization schedule.
pub fn with_insurance(payment: Money, principal: Money) -> Money {
    payment + insurance_surcharge(principal)
}
