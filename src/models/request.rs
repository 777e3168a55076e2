use crate::error::ConflictReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_subject", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestSubject {
    Cancel,
    ChangeDate,
}

/// A holder's request for admin-mediated cancellation or date change.
///
/// `submitted_at` pins the penalty computation for an approved CANCEL, so a
/// slow admin queue never penalizes the buyer for the processing delay.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CancellationRequest {
    pub request_id: Uuid,
    pub reservation_id: Uuid,
    pub username: String,
    pub subject: RequestSubject,
    pub body: String,
    pub submitted_at: DateTime<Utc>,
    pub checked: bool,
    pub accepted: Option<bool>,
    pub checked_by: Option<String>,
}

impl CancellationRequest {
    pub fn new(
        reservation_id: Uuid,
        username: &str,
        subject: RequestSubject,
        body: &str,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            reservation_id,
            username: username.to_string(),
            subject,
            body: body.to_string(),
            submitted_at,
            checked: false,
            accepted: None,
            checked_by: None,
        }
    }

    /// A request may only be decided once.
    pub fn check_pending(&self) -> Result<(), ConflictReason> {
        if self.checked {
            return Err(ConflictReason::RequestProcessed);
        }
        Ok(())
    }

    pub fn decide(&mut self, accepted: bool, admin: &str) {
        self.checked = true;
        self.accepted = Some(accepted);
        self.checked_by = Some(admin.to_string());
    }
}
