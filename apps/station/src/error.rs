//! # API Error Type
//!
//! Unified error type for station commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Station                            │
//! │                                                                         │
//! │  Command Function: Result<T, ApiError>                                 │
//! │         │                                                               │
//! │         ├── Engine rejects? ── CoreError::InsufficientStock ──┐        │
//! │         │                                                     │        │
//! │         ├── Store fails? ───── DbError::QueryFailed("...") ───┤        │
//! │         │                      (logged, generic message)      │        │
//! │         │                                                     ▼        │
//! │         │                                                 ApiError     │
//! │         │                                          { code, message }   │
//! │         ▼                                                               │
//! │  Success ──────────────────────────────────────────────────────────►   │
//! │                                                                         │
//! │  {                                                                      │
//! │    "code": "INSUFFICIENT_STOCK",                                        │
//! │    "message": "Insufficient stock in tank T-02: available 45 L, ..."   │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use fuelstation_core::{CoreError, ErrorKind};
use fuelstation_db::DbError;
use serde::Serialize;

/// API error returned from station commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "CREDIT_LIMIT_EXCEEDED",
///   "message": "Credit limit exceeded for customer c-7: limit Rs. 50,000.00, ..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed, nothing was changed
    ValidationError,

    /// A sale would take a tank below zero
    InsufficientStock,

    /// A delivery would overflow a tank
    CapacityExceeded,

    /// Shift already open, not open, or closed out of order
    ShiftState,

    /// A credit sale would pass the customer's limit
    CreditLimitExceeded,

    /// Lost a compare-and-swap race too many times, or a duplicate
    Conflict,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                if field.starts_with("shifts.operator_id") {
                    ApiError::new(
                        ErrorCode::ShiftState,
                        "Operator already has an open shift",
                    )
                } else {
                    ApiError::new(
                        ErrorCode::Conflict,
                        format!("{} '{}' already exists", field, value),
                    )
                }
            }
            DbError::VersionConflict { entity, id, .. } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} {} was changed by another terminal, try again", entity, id),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::Invalid { reason, .. } => ApiError::validation(reason),
            DbError::ShiftNotOpen { shift_id } => ApiError::new(
                ErrorCode::ShiftState,
                format!("Shift {} is not open", shift_id),
            ),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Decode { column, reason } => {
                tracing::error!(%column, %reason, "Stored value failed to decode");
                ApiError::new(ErrorCode::DatabaseError, "Stored data is corrupt")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts engine errors to API errors. The engine's message already
/// names the entity and the attempted values, so it is passed through.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match err.kind() {
            ErrorKind::InvalidInput | ErrorKind::InvalidAmount => ErrorCode::ValidationError,
            ErrorKind::InsufficientStock => ErrorCode::InsufficientStock,
            ErrorKind::CapacityExceeded => ErrorCode::CapacityExceeded,
            ErrorKind::ShiftAlreadyOpen
            | ErrorKind::ShiftNotOpen
            | ErrorKind::InvalidTimestamps => ErrorCode::ShiftState,
            ErrorKind::CreditLimitExceeded => ErrorCode::CreditLimitExceeded,
        };
        ApiError::new(code, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
