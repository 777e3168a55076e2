use crate::database::DatabaseError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Conflict outcomes of the reservation state machine.
///
/// Every conflict detected inside a locked transaction maps to one of these
/// reasons so callers can tell a retryable outcome (another seat may free up)
/// from a terminal one (the departure already passed). `code()` is the stable
/// machine-readable identifier; the display string is the human message.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    #[error("ticket is currently inactive")]
    TicketInactive,

    #[error("departure time has already passed")]
    DeparturePassed,

    #[error("no remaining capacity for this ticket")]
    SoldOut,

    #[error("seat is not available for reservation")]
    SeatUnavailable,

    #[error("temporary hold not found or expired; reserve the seat again")]
    HoldExpired,

    #[error("reservation is not in a payable state")]
    NotTemporary,

    #[error("reservation is not in a cancellable state")]
    NotReserved,

    #[error("request has already been processed")]
    RequestProcessed,
}

impl ConflictReason {
    /// Stable reason code, safe to expose to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ConflictReason::TicketInactive => "ticket_inactive",
            ConflictReason::DeparturePassed => "departure_passed",
            ConflictReason::SoldOut => "sold_out",
            ConflictReason::SeatUnavailable => "seat_unavailable",
            ConflictReason::HoldExpired => "hold_expired",
            ConflictReason::NotTemporary => "not_temporary",
            ConflictReason::NotReserved => "not_reserved",
            ConflictReason::RequestProcessed => "request_processed",
        }
    }
}

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database errors
    #[error("SQL error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors, rejected before any lock is taken
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Ownership or role violations
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Wrong state for the requested transition
    #[error("Conflict ({code}): {reason}", code = .0.code(), reason = .0)]
    Conflict(#[from] ConflictReason),

    /// Hold cache errors
    #[error("Hold cache error: {0}")]
    Cache(#[from] CacheError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Check if error is a conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }

    /// Check if error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Forbidden(_) => 403,
            AppError::Validation(_) => 400,
            AppError::Conflict(_) => 409,
            AppError::Cache(CacheError::Unavailable(_)) => 503,
            AppError::Config(_) => 500,
            AppError::Database(_) | AppError::Sqlx(_) => 500,
            _ => 500,
        }
    }
}

/// Errors surfaced by a `SeatStore` unit of work.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Precondition failed under lock; the transaction rolled back cleanly.
    #[error("conflict: {0}")]
    Conflict(ConflictReason),

    /// Row addressed by the operation does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The acting identity does not own the row or lacks the required role
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Transient infrastructure failure; the operation may be retried
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A guarded write affected zero rows. Treated as a bug signal, never
    /// retried.
    #[error("store corrupted: {0}")]
    Corrupted(String),
}

impl StoreError {
    /// Transient failures are the only store errors worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<ConflictReason> for StoreError {
    fn from(reason: ConflictReason) -> Self {
        StoreError::Conflict(reason)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => AppError::Conflict(reason),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Forbidden(msg) => AppError::Forbidden(msg),
            StoreError::Unavailable(msg) => AppError::Message(format!("store unavailable: {}", msg)),
            StoreError::Corrupted(msg) => AppError::Message(format!("store corrupted: {}", msg)),
        }
    }
}

/// Hold cache errors. The cache is never authoritative, so these are either
/// transient connectivity failures or corrupted snapshots.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("corrupted cache entry: {0}")]
    Corrupted(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::Database(db_err) => {
                // Check for common PostgreSQL error codes
                let code = db_err.code().map(|c| c.to_string());
                if code.as_deref() == Some("23505") {
                    // Unique violation
                    RepositoryError::Duplicate(db_err.message().to_string())
                } else if code.as_deref() == Some("23503") || code.as_deref() == Some("23514") {
                    // Foreign key / check constraint violation
                    RepositoryError::ConstraintViolation(db_err.message().to_string())
                } else {
                    RepositoryError::Query(err)
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => StoreError::NotFound(msg),
            RepositoryError::Query(e) => StoreError::Unavailable(e.to_string()),
            RepositoryError::Duplicate(msg) => StoreError::Corrupted(format!("duplicate: {}", msg)),
            RepositoryError::ConstraintViolation(msg) => StoreError::Corrupted(msg),
        }
    }
}

impl From<SqlxError> for StoreError {
    fn from(err: SqlxError) -> Self {
        RepositoryError::from(err).into()
    }
}
