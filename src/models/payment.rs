use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Wallet,
    CreditCard,
    Cryptocurrency,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Wallet => "WALLET",
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::Cryptocurrency => "CRYPTOCURRENCY",
        }
    }

    /// Wallet payments resolve against the balance under lock; every other
    /// method carries an externally-asserted outcome.
    pub fn outcome_is_asserted(&self) -> bool {
        !matches!(self, PaymentMethod::Wallet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_outcome", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Successful,
    Unsuccessful,
}

impl PaymentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentOutcome::Successful => "SUCCESSFUL",
            PaymentOutcome::Unsuccessful => "UNSUCCESSFUL",
        }
    }

    pub fn is_successful(&self) -> bool {
        *self == PaymentOutcome::Successful
    }
}

/// Append-only payment attempt record. One row is written per settlement
/// attempt, successful or not, inside the settling transaction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub reservation_id: Uuid,
    pub username: String,
    pub amount: i64,
    pub outcome: PaymentOutcome,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        reservation_id: Uuid,
        username: &str,
        amount: i64,
        outcome: PaymentOutcome,
        method: PaymentMethod,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            payment_id: Uuid::new_v4(),
            reservation_id,
            username: username.to_string(),
            amount,
            outcome,
            method,
            paid_at,
        }
    }
}
