use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Admin,
}

/// User account. The wallet balance is held in minor currency units and is
/// only mutated inside the same locked transaction as the payment or refund
/// it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub username: String,
    pub role: UserRole,
    pub wallet_balance: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: &str, role: UserRole, wallet_balance: i64, now: DateTime<Utc>) -> Self {
        Self {
            username: username.to_string(),
            role,
            wallet_balance,
            created_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
