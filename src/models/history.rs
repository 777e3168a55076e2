use crate::models::PaymentOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "history_operation", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryOperation {
    Buy,
    Cancel,
}

/// Append-only audit row, one per state transition. BUY entries carry the
/// payment outcome; CANCEL entries carry who performed the cancellation
/// (the holder, or the approving admin).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistoryEntry {
    pub history_id: Uuid,
    pub reservation_id: Uuid,
    pub username: String,
    pub operation: HistoryOperation,
    pub outcome: Option<PaymentOutcome>,
    pub cancelled_by: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn buy(
        reservation_id: Uuid,
        username: &str,
        outcome: PaymentOutcome,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            history_id: Uuid::new_v4(),
            reservation_id,
            username: username.to_string(),
            operation: HistoryOperation::Buy,
            outcome: Some(outcome),
            cancelled_by: None,
            recorded_at,
        }
    }

    pub fn cancel(
        reservation_id: Uuid,
        username: &str,
        cancelled_by: &str,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            history_id: Uuid::new_v4(),
            reservation_id,
            username: username.to_string(),
            operation: HistoryOperation::Cancel,
            outcome: None,
            cancelled_by: Some(cancelled_by.to_string()),
            recorded_at,
        }
    }
}
