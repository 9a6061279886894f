//! # Engine Error Types
//!
//! The single error surface callers of the lifecycle service see. Domain
//! and storage errors are folded into it and mapped to an HTTP-style
//! status code, so an embedding app can translate 1:1.
//!
//! ## Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Validation        → 400   caller input broke a format rule         │
//! │  NotFound          → 404   the referenced entity does not exist     │
//! │  Conflict          → 409   illegal transition / lost a race         │
//! │  Store             → 500   the database failed                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use pedidos_core::{CoreError, ValidationError};
use pedidos_db::DbError;

/// Errors returned by the order lifecycle service.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller input failed a validation rule. Message is caller-safe.
    #[error("{0}")]
    Validation(String),

    /// The referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// The operation is not legal in the order's current state, or a
    /// concurrent transition won the guarded write.
    #[error("{0}")]
    Conflict(String),

    /// The storage layer failed.
    #[error("storage error: {0}")]
    Store(#[from] DbError),
}

impl EngineError {
    /// HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::Validation(_) => 400,
            EngineError::NotFound { .. } => 404,
            EngineError::Conflict(_) => 409,
            EngineError::Store(_) => 500,
        }
    }

    pub(crate) fn order_not_found(id: i64) -> Self {
        EngineError::NotFound {
            entity: "order".to_string(),
            id: id.to_string(),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTransition { .. } => EngineError::Conflict(err.to_string()),
            CoreError::InvalidPaymentAmount { .. } => EngineError::Validation(err.to_string()),
            CoreError::Validation(v) => EngineError::Validation(v.to_string()),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

/// Convenience type alias for Results with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
