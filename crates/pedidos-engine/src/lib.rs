//! # pedidos-engine: Order Lifecycle Service
//!
//! Orchestrates the order lifecycle over pedidos-core (pure rules) and
//! pedidos-db (SQLite persistence). An embedding app constructs one
//! [`OrderService`] and calls its operations; every response is a
//! serializable view and every error maps to an HTTP-style status code.
//!
//! ## Module Organization
//!
//! - [`service`] - The [`OrderService`] facade
//! - [`request`] - Deserializable operation payloads
//! - [`response`] - Serializable views and the response envelope
//! - [`error`] - The caller-facing error surface
//! - [`telemetry`] - Tracing subscriber setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pedidos_db::{Database, DbConfig};
//! use pedidos_engine::{telemetry, OrderService};
//!
//! telemetry::init_tracing();
//! let db = Database::new(DbConfig::new("./pedidos.db")).await?;
//! let service = OrderService::new(db);
//!
//! let detail = service.create_order(request).await?;
//! service.pack_order(detail.id, Default::default()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod request;
pub mod response;
pub mod service;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{EngineError, EngineResult};
pub use request::{
    ActionRequest, ActorRef, CreateOrderRequest, CustomerInput, DestinationInput, DiscountInput,
    EditOrderRequest, ItemInput, ListOrdersRequest, PayRequest, ReportRequest,
};
pub use response::{
    ApiEnvelope, AuditView, CustomerView, ItemView, KpiView, OrderDetail, OrderSummary,
    ReportRowView, TopProductView,
};
pub use service::OrderService;
