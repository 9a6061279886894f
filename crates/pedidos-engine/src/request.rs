//! # Request Types
//!
//! Deserializable payloads accepted by the lifecycle service. Field names
//! are camelCase on the wire. Monetary amounts arrive as decimal numbers
//! and are converted to integer cents exactly once, here, at the boundary.

use serde::Deserialize;

use pedidos_core::{
    AgencyType, Destination, Discount, DocumentType, Money, OrderItemInput, OrderStatus,
};
use pedidos_db::ReportFilter;

// =============================================================================
// Customer
// =============================================================================

/// Customer identity submitted with an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub doc_type: DocumentType,
    pub doc_number: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

// =============================================================================
// Destination
// =============================================================================

/// Delivery destination submitted with an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationInput {
    pub agency_type: AgencyType,
    #[serde(default)]
    pub agency_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub department: String,
    pub province: String,
    pub district: String,
}

impl DestinationInput {
    pub fn into_destination(self) -> Destination {
        Destination {
            agency_type: self.agency_type,
            agency_name: self.agency_name,
            address: self.address,
            department: self.department,
            province: self.province,
            district: self.district,
        }
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// One desired line item. `unitPrice` is decimal currency.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    #[serde(default)]
    pub product_id: Option<i64>,
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
    #[serde(default)]
    pub is_manual: bool,
}

impl ItemInput {
    pub fn into_core(self) -> OrderItemInput {
        // A row without a catalog reference is manual by definition.
        let is_manual = self.is_manual || self.product_id.is_none();
        OrderItemInput {
            product_id: self.product_id,
            name: self.name,
            quantity: self.quantity,
            unit_price: Money::from_decimal(self.unit_price),
            is_manual,
        }
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Discount submitted with an order: a flat amount or a percentage.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum DiscountInput {
    Percent(f64),
    Amount(f64),
}

impl DiscountInput {
    pub fn into_core(self) -> Discount {
        match self {
            DiscountInput::Percent(v) => Discount::percent_from_value(v),
            DiscountInput::Amount(v) => Discount::amount_from_value(v),
        }
    }
}

// =============================================================================
// Actor
// =============================================================================

/// Reference to the acting operator, by id or by username handle.
/// When both are present the id wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

// =============================================================================
// Operations
// =============================================================================

/// Payload for order creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer: CustomerInput,
    pub destination: DestinationInput,
    pub items: Vec<ItemInput>,
    #[serde(default)]
    pub discount: Option<DiscountInput>,
    /// Up-front deposit ("abono"), decimal currency.
    #[serde(default)]
    pub deposit: Option<f64>,
    #[serde(default)]
    pub actor: Option<ActorRef>,
}

/// Payload for editing a REGISTERED order. Every section is optional and
/// applies only when present: a deposit-only or destination-only edit
/// leaves the other sections untouched. When items ARE resubmitted the
/// financial snapshot is recomputed over them, so a discount left out of
/// an item edit resets to zero.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOrderRequest {
    #[serde(default)]
    pub customer: Option<CustomerInput>,
    #[serde(default)]
    pub destination: Option<DestinationInput>,
    #[serde(default)]
    pub items: Option<Vec<ItemInput>>,
    /// Considered only together with resubmitted items.
    #[serde(default)]
    pub discount: Option<DiscountInput>,
    /// Replacement deposit; absent keeps the amount on record.
    #[serde(default)]
    pub deposit: Option<f64>,
    /// Mandatory reason note.
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub actor: Option<ActorRef>,
}

/// Payload for pack / return / cancel / delete.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub actor: Option<ActorRef>,
}

/// Payload for recording a payment and delivering the order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    /// Decimal currency; must be >= 0.
    pub amount: f64,
    /// Required when the amount differs from the outstanding balance.
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub actor: Option<ActorRef>,
}

/// Query for the order listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersRequest {
    /// Defaults to REGISTERED.
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Query for the filtered report listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub agency_type: Option<AgencyType>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub until: Option<chrono::DateTime<chrono::Utc>>,
}

impl ReportRequest {
    pub fn into_filter(self) -> ReportFilter {
        ReportFilter {
            status: self.status,
            agency_type: self.agency_type,
            department: self.department,
            province: self.province,
            district: self.district,
            from: self.from,
            until: self.until,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
