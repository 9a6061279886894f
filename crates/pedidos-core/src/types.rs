//! # Domain Types
//!
//! Core domain types for the order lifecycle engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐             │
//! │  │   Customer   │   │    Order     │   │  OrderItem   │             │
//! │  │ ──────────── │   │ ──────────── │   │ ──────────── │             │
//! │  │ doc_type     │   │ customer_id  │   │ product_id?  │             │
//! │  │ doc_number   │   │ destination  │   │ name         │             │
//! │  │ full_name    │   │ total_cents  │   │ quantity     │             │
//! │  │ phone?       │   │ status       │   │ valid flag   │             │
//! │  └──────────────┘   └──────────────┘   └──────────────┘             │
//! │                                                                     │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐             │
//! │  │ DocumentType │   │ OrderStatus  │   │  AgencyType  │             │
//! │  │ DNI CE OTHER │   │ REGISTERED.. │   │ SHALOM OLVA..│             │
//! │  └──────────────┘   └──────────────┘   └──────────────┘             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Domain vocabularies are tagged enums, validated once at the boundary by
//! serde / sqlx decoding rather than case-normalized at every call site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Document Type
// =============================================================================

/// Identity document types accepted for customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    /// Documento Nacional de Identidad: exactly 8 digits.
    Dni,
    /// Carné de Extranjería: 1 to 12 alphanumerics.
    Ce,
    /// Any other document: free-form, non-empty.
    Other,
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentType::Dni => "DNI",
            DocumentType::Ce => "CE",
            DocumentType::Other => "OTHER",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Agency Type
// =============================================================================

/// Delivery agency for the order destination.
///
/// The meaning of the single free-text destination field depends on this:
/// agency branch name for SHALOM, street address for OLVA and FLORES, and
/// both are collected for OTHER (the address is what gets stored).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum AgencyType {
    Shalom,
    Olva,
    Flores,
    Other,
}

impl fmt::Display for AgencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgencyType::Shalom => "SHALOM",
            AgencyType::Olva => "OLVA",
            AgencyType::Flores => "FLORES",
            AgencyType::Other => "OTHER",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
///
/// Orders are never physically deleted: `Deleted` is a status value, and the
/// full history of items and audit rows survives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Order captured; the only state where edits are allowed.
    Registered,
    /// Order packed for shipment.
    Packed,
    /// Order delivered (terminal). Reached through Pay, even partially paid.
    Delivered,
    /// Order cancelled after packing (terminal).
    Cancelled,
    /// Order soft-deleted while registered (terminal).
    Deleted,
}

impl OrderStatus {
    /// Terminal states accept no further lifecycle actions.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Deleted
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Registered => "REGISTERED",
            OrderStatus::Packed => "PACKED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Deleted => "DELETED",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Audit Kind
// =============================================================================

/// Event-kind vocabulary for the audit trail.
///
/// Labels keep the operational Spanish vocabulary the reporting side and the
/// operators already know. Stored as free-form text but always written from
/// this fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditKind {
    Registered,
    Packed,
    ReturnedToPacking,
    Cancelled,
    Delivered,
    Deleted,
    Modified,
}

impl AuditKind {
    /// The label written to the audit log.
    pub const fn label(&self) -> &'static str {
        match self {
            AuditKind::Registered => "REGISTRADO",
            AuditKind::Packed => "EMBALADO",
            AuditKind::ReturnedToPacking => "REGRESO A EMBALAR",
            AuditKind::Cancelled => "CANCELACION",
            AuditKind::Delivered => "ENTREGADO",
            AuditKind::Deleted => "ELIMINACION",
            AuditKind::Modified => "MODIFICACION",
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer record, unique per (doc_type, doc_number).
///
/// Created on first reference, mutated only when name or phone diverges from
/// a new submission, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    pub doc_type: DocumentType,
    pub doc_number: String,
    pub full_name: String,
    /// International format: `+` followed by 10 to 15 digits.
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order
// =============================================================================

/// An order row. Owns exactly one customer reference at a time, reassignable
/// only while REGISTERED.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    pub agency_type: AgencyType,
    /// Agency branch name (SHALOM) or street address (everything else).
    pub agency_or_address: Option<String>,
    pub department: String,
    pub province: String,
    pub district: String,
    pub total_cents: i64,
    pub discount_cents: i64,
    /// Cumulative amount paid ("abono").
    pub paid_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }
}

// =============================================================================
// Order Line Item
// =============================================================================

/// A line item belonging to exactly one order.
///
/// Items are never physically deleted after order creation. Removal during an
/// edit flips `valid` to false, preserving history; only `valid = true` rows
/// participate in totals and in top-product aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    /// Catalog reference; None for manual/free-text items.
    pub product_id: Option<i64>,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub is_manual: bool,
    pub valid: bool,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Audit Event
// =============================================================================

/// An append-only audit trail row ("registro"). Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditEvent {
    pub id: i64,
    pub order_id: i64,
    /// Acting user; nullable because the trail outlives user rows.
    pub user_id: Option<String>,
    /// One of the [`AuditKind`] labels.
    pub kind: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// An operator able to act on orders. Referenced by audit rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Destination
// =============================================================================

/// Delivery destination descriptor ("destino").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub agency_type: AgencyType,
    /// Agency branch name; required for SHALOM and OTHER.
    pub agency_name: Option<String>,
    /// Street address; required for OLVA, FLORES and OTHER.
    pub address: Option<String>,
    pub department: String,
    pub province: String,
    pub district: String,
}

impl Destination {
    /// The value persisted in the single free-text destination column:
    /// branch name for SHALOM, street address for everything else.
    pub fn storage_value(&self) -> Option<String> {
        let v = match self.agency_type {
            AgencyType::Shalom => self.agency_name.as_deref(),
            _ => self.address.as_deref(),
        };
        v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }
}

// =============================================================================
// Desired Item (reconciliation / creation input)
// =============================================================================

/// A caller-submitted line item, already validated and converted to cents.
///
/// This is the "desired" shape the reconciler matches against stored rows,
/// and the set the financial calculator derives totals from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItemInput {
    pub product_id: Option<i64>,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub is_manual: bool,
}

impl OrderItemInput {
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Discount policy applied to an order's subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Discount {
    /// Flat amount, clamped to `[0, subtotal]` when applied.
    Amount(Money),
    /// Percentage in basis points, clamped to `[0, 10000]` ( = 0%..100%).
    Percent(u32),
}

impl Discount {
    /// Builds a percent discount from a caller-supplied percentage value,
    /// clamping out-of-range input (negative, > 100) instead of rejecting it.
    pub fn percent_from_value(value: f64) -> Self {
        let clamped = value.clamp(0.0, 100.0);
        Discount::Percent((clamped * 100.0).round() as u32)
    }

    /// Builds an amount discount from a caller-supplied decimal value,
    /// flooring negatives at zero.
    pub fn amount_from_value(value: f64) -> Self {
        Discount::Amount(Money::from_decimal(value.max(0.0)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_uses_uppercase() {
        let json = serde_json::to_string(&OrderStatus::Registered).unwrap();
        assert_eq!(json, "\"REGISTERED\"");
        let back: OrderStatus = serde_json::from_str("\"PACKED\"").unwrap();
        assert_eq!(back, OrderStatus::Packed);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStatus::Registered.is_terminal());
        assert!(!OrderStatus::Packed.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Deleted.is_terminal());
    }

    #[test]
    fn test_audit_labels_match_vocabulary() {
        assert_eq!(AuditKind::Registered.label(), "REGISTRADO");
        assert_eq!(AuditKind::ReturnedToPacking.label(), "REGRESO A EMBALAR");
        assert_eq!(AuditKind::Modified.label(), "MODIFICACION");
        assert_eq!(AuditKind::Delivered.label(), "ENTREGADO");
    }

    #[test]
    fn test_destination_storage_value() {
        let shalom = Destination {
            agency_type: AgencyType::Shalom,
            agency_name: Some(" Shalom Arequipa ".to_string()),
            address: Some("never used".to_string()),
            department: "AREQUIPA".to_string(),
            province: "AREQUIPA".to_string(),
            district: "CERCADO".to_string(),
        };
        assert_eq!(shalom.storage_value().as_deref(), Some("Shalom Arequipa"));

        let olva = Destination {
            agency_type: AgencyType::Olva,
            agency_name: None,
            address: Some("Av. Siempre Viva 742".to_string()),
            ..shalom.clone()
        };
        assert_eq!(olva.storage_value().as_deref(), Some("Av. Siempre Viva 742"));

        // OTHER stores the address side even though both fields are collected.
        let other = Destination {
            agency_type: AgencyType::Other,
            agency_name: Some("Agencia X".to_string()),
            address: Some("Calle 1".to_string()),
            ..shalom
        };
        assert_eq!(other.storage_value().as_deref(), Some("Calle 1"));
    }

    #[test]
    fn test_discount_constructors_clamp() {
        assert_eq!(Discount::percent_from_value(150.0), Discount::Percent(10000));
        assert_eq!(Discount::percent_from_value(-3.0), Discount::Percent(0));
        assert_eq!(Discount::percent_from_value(8.25), Discount::Percent(825));
        assert_eq!(
            Discount::amount_from_value(-10.0),
            Discount::Amount(Money::zero())
        );
    }

    #[test]
    fn test_item_line_total() {
        let item = OrderItemInput {
            product_id: None,
            name: "Box A".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(1000),
            is_manual: true,
        };
        assert_eq!(item.line_total().cents(), 2000);
    }
}
