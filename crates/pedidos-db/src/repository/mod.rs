//! # Repository Module
//!
//! One repository per entity, mirroring the data model:
//!
//! - [`customer::CustomerRepository`] - customer directory with idempotent
//!   resolve and uniqueness-race recovery
//! - [`order::OrderRepository`] - order rows, line items and the line-item
//!   reconciler; guarded status updates
//! - [`audit::AuditRepository`] - append-only audit trail
//! - [`user::UserRepository`] - actor handle resolution
//! - [`report::ReportRepository`] - read-only aggregates
//!
//! Methods that must run inside an enclosing transaction take a
//! `&mut SqliteConnection` executor; everything else runs on the pool.

pub mod audit;
pub mod customer;
pub mod order;
pub mod report;
pub mod user;
