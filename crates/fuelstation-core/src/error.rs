//! # Error Types
//!
//! Domain-specific error types for fuelstation-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fuelstation-core errors (this file)                                   │
//! │  ├── CoreError        - Engine rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  fuelstation-db errors (separate crate)                                │
//! │  └── DbError          - Store failures, stale versions                 │
//! │                                                                         │
//! │  station app errors                                                    │
//! │  └── ApiError         - What the caller sees (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError ← DbError               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (tank id, attempted values)
//! 3. Errors are enum variants, never String
//! 4. Every engine call either returns a fully-valid result or one of these

use serde::Serialize;
use thiserror::Error;

use crate::money::{Litres, Money};

// =============================================================================
// Core Error
// =============================================================================

/// Calculation engine errors.
///
/// None of these are fatal to the process. The orchestration layer decides
/// whether to retry, surface to the operator, or abort a batch.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoreError {
    /// Malformed or out-of-range argument. Always rejected before any mutation.
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// A sale would take a tank below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Operator enters 60 L on nozzle 3
    ///      │
    ///      ▼
    /// Tank T-02 holds 45 L
    ///      │
    ///      ▼
    /// InsufficientStock { tank_id: "T-02", available: 45, requested: 60 }
    ///      │
    ///      ▼
    /// Sale rejected, stock untouched (never clamped)
    /// ```
    #[error("Insufficient stock in tank {tank_id}: available {available}, requested {requested}")]
    InsufficientStock {
        tank_id: String,
        available: Litres,
        requested: Litres,
    },

    /// A delivery would overflow the tank.
    #[error(
        "Tank {tank_id} capacity exceeded: capacity {capacity}, current {current}, requested {requested}"
    )]
    CapacityExceeded {
        tank_id: String,
        capacity: Litres,
        current: Litres,
        requested: Litres,
    },

    /// The operator already holds an open shift.
    #[error("Operator {operator_id} already has open shift {shift_id}")]
    ShiftAlreadyOpen {
        operator_id: String,
        shift_id: String,
    },

    /// The shift was already closed. Closed shifts are immutable.
    #[error("Shift {shift_id} is not open")]
    ShiftNotOpen { shift_id: String },

    /// The operator has no open shift to attach work to.
    #[error("Operator {operator_id} has no open shift")]
    NoOpenShift { operator_id: String },

    /// Temporal ordering violation (close before open, inverted period).
    #[error("Invalid timestamps: {reason}")]
    InvalidTimestamps { reason: String },

    /// A credit sale would push the customer past their limit.
    #[error(
        "Credit limit exceeded for customer {customer_id}: limit {credit_limit}, outstanding {outstanding}, requested {requested}"
    )]
    CreditLimitExceeded {
        customer_id: String,
        credit_limit: Money,
        outstanding: Money,
        requested: Money,
    },

    /// Payment amount is zero or negative.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Error kinds, independent of the variant carrying the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    InsufficientStock,
    CapacityExceeded,
    ShiftAlreadyOpen,
    ShiftNotOpen,
    InvalidTimestamps,
    CreditLimitExceeded,
    InvalidAmount,
}

impl CoreError {
    /// Shorthand for [`CoreError::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CoreError::InvalidTimestamps`].
    pub fn invalid_timestamps(reason: impl Into<String>) -> Self {
        CoreError::InvalidTimestamps {
            reason: reason.into(),
        }
    }

    /// Maps the variant onto its error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidInput { .. } | CoreError::Validation(_) => ErrorKind::InvalidInput,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            CoreError::ShiftAlreadyOpen { .. } => ErrorKind::ShiftAlreadyOpen,
            CoreError::ShiftNotOpen { .. } | CoreError::NoOpenShift { .. } => {
                ErrorKind::ShiftNotOpen
            }
            CoreError::InvalidTimestamps { .. } => ErrorKind::InvalidTimestamps,
            CoreError::CreditLimitExceeded { .. } => ErrorKind::CreditLimitExceeded,
            CoreError::InvalidAmount { .. } => ErrorKind::InvalidAmount,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised once at the store/deserialization boundary or before an engine
/// runs, never from deep inside a calculation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value is outside its allowed range.
    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: String, reason: String },

    /// Invalid format (e.g., phone number, UUID, stored enum).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
