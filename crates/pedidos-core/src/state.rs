//! # Order Lifecycle State Machine
//!
//! Owns the legality of status transitions. The persistence layer enforces
//! the same precondition again with a guarded UPDATE, so a concurrent
//! transition that slips past the read loses at write time.
//!
//! ## Transition Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │   REGISTERED ──pack──────► PACKED ──pay──────► DELIVERED (terminal) │
//! │     │  ▲  │                  │                                      │
//! │     │  │  └──edit (self)     ├──cancel───────► CANCELLED (terminal) │
//! │     │  │                     │                                      │
//! │     │  └─────return──────────┘       (return and cancel require     │
//! │     │                                 a reason note)                │
//! │     └──delete───► DELETED (terminal)                                │
//! │                                                                     │
//! │   Anything else → InvalidTransition                                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Edit is modeled as a self-transition: it is legal only while REGISTERED
//! and leaves the status unchanged, which lets the same table answer "may I
//! edit?" and produce the same error shape as every other illegal request.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::OrderStatus;

// =============================================================================
// Order Action
// =============================================================================

/// A lifecycle action requested against an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    /// REGISTERED → PACKED.
    Pack,
    /// PACKED → REGISTERED (reversal, reason note required).
    Return,
    /// PACKED → CANCELLED (reason note required).
    Cancel,
    /// REGISTERED → DELETED (soft delete, reason note required).
    Delete,
    /// PACKED → DELIVERED via a payment.
    Deliver,
    /// REGISTERED → REGISTERED (modification).
    Edit,
}

impl OrderAction {
    /// The state an order must currently be in for this action.
    pub const fn required_state(&self) -> OrderStatus {
        match self {
            OrderAction::Pack | OrderAction::Delete | OrderAction::Edit => OrderStatus::Registered,
            OrderAction::Return | OrderAction::Cancel | OrderAction::Deliver => OrderStatus::Packed,
        }
    }

    /// Whether this action unconditionally requires a reason note.
    ///
    /// Deliver is conditional (a note is needed only when the payment differs
    /// from the outstanding balance) and is handled at the payment site.
    pub const fn requires_note(&self) -> bool {
        matches!(
            self,
            OrderAction::Return | OrderAction::Cancel | OrderAction::Delete | OrderAction::Edit
        )
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderAction::Pack => "pack",
            OrderAction::Return => "return",
            OrderAction::Cancel => "cancel",
            OrderAction::Delete => "delete",
            OrderAction::Deliver => "deliver",
            OrderAction::Edit => "edit",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Transition Function
// =============================================================================

/// Returns the status an order moves to when `action` is applied in
/// `current`, or [`CoreError::InvalidTransition`] naming the current state,
/// the requested action and the state it would need.
pub fn next_status(current: OrderStatus, action: OrderAction) -> CoreResult<OrderStatus> {
    use OrderAction::*;
    use OrderStatus::*;

    match (current, action) {
        (Registered, Pack) => Ok(Packed),
        (Registered, Delete) => Ok(Deleted),
        (Registered, Edit) => Ok(Registered),
        (Packed, Return) => Ok(Registered),
        (Packed, Cancel) => Ok(Cancelled),
        (Packed, Deliver) => Ok(Delivered),
        _ => Err(CoreError::InvalidTransition {
            current,
            action,
            required: action.required_state(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
