//! # pedidos-core: Pure Business Logic for the Order Lifecycle Engine
//!
//! This crate is the heart of the system. It contains the order state
//! machine, the financial calculator and all boundary validation as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Pedidos Architecture                           │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                pedidos-engine (OrderService)                │   │
//! │  │   create, edit, pack, return, cancel, delete, pay, reports  │   │
//! │  └─────────────────────────────┬───────────────────────────────┘   │
//! │                                │                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────┐   │
//! │  │               ★ pedidos-core (THIS CRATE) ★                 │   │
//! │  │                                                             │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌───────┐ │   │
//! │  │  │  types  │ │  money  │ │ finance │ │  state  │ │ valid │ │   │
//! │  │  │ Order   │ │  Money  │ │ Totals  │ │ actions │ │ rules │ │   │
//! │  │  │ Customer│ │  cents  │ │ pending │ │ table   │ │ checks│ │   │
//! │  │  └─────────┘ └─────────┘ └─────────┘ └─────────┘ └───────┘ │   │
//! │  │                                                             │   │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS         │   │
//! │  └─────────────────────────────┬───────────────────────────────┘   │
//! │                                │                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────┐   │
//! │  │                  pedidos-db (Database Layer)                │   │
//! │  │          SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, Customer, OrderItem, enums)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`finance`] - Subtotal / discount / total / outstanding balance math
//! - [`state`] - Order lifecycle state machine
//! - [`validation`] - Boundary validation rules
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, always
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64)
//! 4. **Explicit Errors**: errors are typed enums, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod finance;
pub mod money;
pub mod state;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use state::OrderAction;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items allowed on a single order.
///
/// ## Business Reason
/// Prevents runaway submissions and keeps reconciliation bounded.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g. typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Tolerance, in cents, when comparing a payment against the outstanding
/// balance. With integer cents a sub-cent tolerance means the amounts must
/// match exactly; any one-cent difference requires a reason note.
pub const PAYMENT_TOLERANCE_CENTS: i64 = 0;
