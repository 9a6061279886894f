//! # Error Types
//!
//! Domain-specific error types for pedidos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  pedidos-core errors (this file)                                    │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  pedidos-db errors (separate crate)                                 │
//! │  └── DbError          - Database operation failures                 │
//! │                                                                     │
//! │  pedidos-engine errors                                              │
//! │  └── EngineError      - What callers see (status-code mapped)       │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → DbError → EngineError          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::state::OrderAction;
use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. They are caught by the engine
/// and translated into caller-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A lifecycle action was requested in a state where it is not legal.
    ///
    /// ## When This Occurs
    /// - Cancelling an order that is still REGISTERED
    /// - Packing an order that is already DELIVERED
    /// - Editing anything that is not REGISTERED
    ///
    /// The message names the current state and the state the action needs,
    /// so an operator can see exactly why the request was refused.
    #[error("cannot {action} an order in {current} state (requires {required})")]
    InvalidTransition {
        current: OrderStatus,
        action: OrderAction,
        required: OrderStatus,
    },

    /// Payment amount is invalid (negative or not a finite number).
    #[error("invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input does not meet requirements. Used for early
/// validation before any business logic or database work runs. Messages are
/// surfaced verbatim to the caller (4xx), so they stay human-readable.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format (document number, phone, etc.).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Destination fields do not satisfy the agency-type rules.
    #[error("{0}")]
    Destination(String),

    /// The submitted item list is unusable.
    #[error("invalid items: {0}")]
    InvalidItems(String),

    /// The deposit exceeds the order total (hard error at creation).
    #[error("deposit cannot exceed the order total")]
    DepositExceedsTotal,

    /// A reason note was required for this operation but missing.
    #[error("a reason note is required: {context}")]
    MissingNote { context: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message_names_states() {
        let err = CoreError::InvalidTransition {
            current: OrderStatus::Registered,
            action: OrderAction::Cancel,
            required: OrderStatus::Packed,
        };
        assert_eq!(
            err.to_string(),
            "cannot cancel an order in REGISTERED state (requires PACKED)"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "nombre_completo".to_string(),
        };
        assert_eq!(err.to_string(), "nombre_completo is required");

        let err = ValidationError::MissingNote {
            context: "payment differs from outstanding balance".to_string(),
        };
        assert!(err.to_string().contains("reason note"));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::DepositExceedsTotal;
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
