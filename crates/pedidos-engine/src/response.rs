//! # Response Types
//!
//! Serializable views the lifecycle service returns. Monetary amounts go
//! back out as decimal currency; inside the engine everything is integer
//! cents.
//!
//! Outstanding balances are SIGNED here (an overpaid order shows a
//! negative balance in listing and detail). The report surface floors
//! them at zero instead.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pedidos_core::finance::outstanding;
use pedidos_core::{
    AgencyType, AuditEvent, Customer, Money, Order, OrderItem, OrderStatus,
};
use pedidos_db::{OrderListRow, ReportRow, StatusKpi, TopProduct};

// =============================================================================
// Envelope
// =============================================================================

/// Uniform response envelope for embedding apps.
#[derive(Debug, Clone, Serialize)]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn success(data: T) -> Self {
        ApiEnvelope {
            ok: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ApiEnvelope {
            ok: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    pub id: i64,
    pub doc_type: String,
    pub doc_number: String,
    pub full_name: String,
    pub phone: Option<String>,
}

impl From<Customer> for CustomerView {
    fn from(c: Customer) -> Self {
        CustomerView {
            id: c.id,
            doc_type: c.doc_type.to_string(),
            doc_number: c.doc_number,
            full_name: c.full_name,
            phone: c.phone,
        }
    }
}

// =============================================================================
// Order Listing
// =============================================================================

/// One row of the order listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: i64,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub agency_type: AgencyType,
    pub agency_or_address: Option<String>,
    pub department: String,
    pub province: String,
    pub district: String,
    pub total: f64,
    pub paid: f64,
    /// Signed: negative when overpaid.
    pub pending: f64,
    pub created_at: DateTime<Utc>,
}

impl From<OrderListRow> for OrderSummary {
    fn from(row: OrderListRow) -> Self {
        let total = Money::from_cents(row.total_cents);
        let paid = Money::from_cents(row.paid_cents);
        OrderSummary {
            id: row.id,
            status: row.status,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            agency_type: row.agency_type,
            agency_or_address: row.agency_or_address,
            department: row.department,
            province: row.province,
            district: row.district,
            total: total.as_decimal(),
            paid: paid.as_decimal(),
            pending: outstanding(total, paid).as_decimal(),
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Order Detail
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    pub id: i64,
    pub product_id: Option<i64>,
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub line_total: f64,
    pub is_manual: bool,
    pub valid: bool,
}

impl From<OrderItem> for ItemView {
    fn from(item: OrderItem) -> Self {
        ItemView {
            id: item.id,
            product_id: item.product_id,
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price().as_decimal(),
            line_total: item.line_total().as_decimal(),
            is_manual: item.is_manual,
            valid: item.valid,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditView {
    pub id: i64,
    pub kind: String,
    pub user_id: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditEvent> for AuditView {
    fn from(e: AuditEvent) -> Self {
        AuditView {
            id: e.id,
            kind: e.kind,
            user_id: e.user_id,
            note: e.note,
            created_at: e.created_at,
        }
    }
}

/// Full order view: joined customer, every line item (valid and invalid,
/// insertion order) and the audit trail newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: i64,
    pub status: OrderStatus,
    pub customer: CustomerView,
    pub agency_type: AgencyType,
    pub agency_or_address: Option<String>,
    pub department: String,
    pub province: String,
    pub district: String,
    pub items: Vec<ItemView>,
    /// Sum of valid line items, before discount.
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
    pub paid: f64,
    /// Signed: negative when overpaid.
    pub pending: f64,
    pub audit: Vec<AuditView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDetail {
    pub fn assemble(
        order: Order,
        customer: Customer,
        items: Vec<OrderItem>,
        audit: Vec<AuditEvent>,
    ) -> Self {
        let subtotal = items
            .iter()
            .filter(|i| i.valid)
            .fold(Money::zero(), |acc, i| acc + i.line_total());
        let pending = outstanding(order.total(), order.paid());

        OrderDetail {
            id: order.id,
            status: order.status,
            customer: customer.into(),
            agency_type: order.agency_type,
            agency_or_address: order.agency_or_address,
            department: order.department,
            province: order.province,
            district: order.district,
            items: items.into_iter().map(ItemView::from).collect(),
            subtotal: subtotal.as_decimal(),
            discount: Money::from_cents(order.discount_cents).as_decimal(),
            total: Money::from_cents(order.total_cents).as_decimal(),
            paid: Money::from_cents(order.paid_cents).as_decimal(),
            pending: pending.as_decimal(),
            audit: audit.into_iter().map(AuditView::from).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiView {
    pub status: OrderStatus,
    pub orders: i64,
    pub paid: f64,
}

impl From<StatusKpi> for KpiView {
    fn from(k: StatusKpi) -> Self {
        KpiView {
            status: k.status,
            orders: k.orders,
            paid: Money::from_cents(k.paid_cents).as_decimal(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProductView {
    pub name: String,
    pub total_quantity: i64,
    pub total: f64,
}

impl From<TopProduct> for TopProductView {
    fn from(p: TopProduct) -> Self {
        TopProductView {
            name: p.name,
            total_quantity: p.total_quantity,
            total: Money::from_cents(p.total_cents).as_decimal(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRowView {
    pub id: i64,
    pub status: OrderStatus,
    pub customer_name: String,
    pub agency_type: AgencyType,
    pub department: String,
    pub province: String,
    pub district: String,
    pub total: f64,
    pub paid: f64,
    /// Floored at zero on the report surface.
    pub pending: f64,
    pub created_at: DateTime<Utc>,
}

impl From<ReportRow> for ReportRowView {
    fn from(r: ReportRow) -> Self {
        ReportRowView {
            id: r.id,
            status: r.status,
            customer_name: r.customer_name,
            agency_type: r.agency_type,
            department: r.department,
            province: r.province,
            district: r.district,
            total: Money::from_cents(r.total_cents).as_decimal(),
            paid: Money::from_cents(r.paid_cents).as_decimal(),
            pending: Money::from_cents(r.pending_cents).as_decimal(),
            created_at: r.created_at,
        }
    }
}
