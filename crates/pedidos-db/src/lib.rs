//! # pedidos-db: Database Layer for the Order Lifecycle Engine
//!
//! SQLite storage behind repository seams, one per entity, so the state
//! machine has a single place to reach for each table instead of ad-hoc
//! queries scattered across handlers.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories (customer, order, audit, user, report)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pedidos_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./pedidos.db")).await?;
//! let customer = db
//!     .customers()
//!     .resolve(DocumentType::Dni, "12345678", "Ana Quispe", None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::audit::AuditRepository;
pub use repository::customer::CustomerRepository;
pub use repository::order::{OrderListRow, OrderRepository};
pub use repository::report::{ReportFilter, ReportRepository, ReportRow, StatusKpi, TopProduct};
pub use repository::user::UserRepository;
