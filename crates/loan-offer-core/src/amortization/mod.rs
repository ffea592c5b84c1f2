pub mod annuity;
pub mod schedule;

pub use annuity::{monthly_payment, remaining_balance, MAX_TERM_YEARS, MONTHS_PER_YEAR};
pub use schedule::{build_schedule, AmortizationSchedule, Period};
