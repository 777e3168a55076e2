//! Cancellation policy calculations.

mod penalty;

pub use penalty::{refund_quote, RefundQuote, EARLY_PENALTY_PERCENT, LATE_PENALTY_PERCENT};
