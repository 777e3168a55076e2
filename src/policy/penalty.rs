use crate::error::ConflictReason;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Penalty applied when more than one hour remains before departure.
pub const EARLY_PENALTY_PERCENT: i64 = 10;

/// Penalty applied within the final hour before departure.
pub const LATE_PENALTY_PERCENT: i64 = 50;

/// Breakdown of a cancellation refund. All amounts are integer minor
/// currency units; the penalty is truncated, never rounded.
#[derive(Debug, Clone, Serialize)]
pub struct RefundQuote {
    pub unit_price: i64,
    pub hours_to_departure: f64,
    pub penalty_percent: i64,
    pub penalty_amount: i64,
    pub refund_amount: i64,
}

/// Compute the penalty and refund for cancelling at `reference`.
///
/// `reference` is the instant the cancellation is measured from: "now" for a
/// self-service cancellation or quote, the request submission instant for an
/// admin-approved one. A departure at or before the reference instant is a
/// conflict; no cancellation may be computed for it.
pub fn refund_quote(
    unit_price: i64,
    departure_at: DateTime<Utc>,
    reference: DateTime<Utc>,
) -> Result<RefundQuote, ConflictReason> {
    if departure_at <= reference {
        return Err(ConflictReason::DeparturePassed);
    }

    let hours_to_departure = (departure_at - reference).num_seconds() as f64 / 3600.0;
    let penalty_percent = if hours_to_departure > 1.0 {
        EARLY_PENALTY_PERCENT
    } else {
        LATE_PENALTY_PERCENT
    };

    // Integer division truncates toward zero; operands are non-negative.
    let penalty_amount = unit_price * penalty_percent / 100;
    let refund_amount = unit_price - penalty_amount;

    Ok(RefundQuote {
        unit_price,
        hours_to_departure,
        penalty_percent,
        penalty_amount,
        refund_amount,
    })
}
