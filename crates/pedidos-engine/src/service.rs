//! # Order Lifecycle Service
//!
//! The one facade embedding apps talk to. Every operation follows the
//! same shape: validate at the boundary, consult the pure state machine,
//! write through the repositories, append an audit event.
//!
//! ## Operation Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        OrderService                                 │
//! │                                                                     │
//! │  create_order   validate → resolve customer → tx(order + items)     │
//! │  edit_order     note → REGISTERED? → tx(update + reconcile)         │
//! │  pack/return/                                                       │
//! │  cancel/delete  state table → guarded UPDATE                        │
//! │  pay_order      tx(read → balance rule → paid + DELIVERED)          │
//! │  list/detail    read-only views                                     │
//! │  kpis/reports   read-only aggregates                                │
//! │                                                                     │
//! │  Every mutating operation carries a resolvable actor; the audit     │
//! │  row is attributed to it. Audit writes are best-effort: a failed    │
//! │  append is logged and the operation still succeeds.                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Customer resolution runs OUTSIDE the order transaction on purpose: the
//! uniqueness-race recovery inside [`pedidos_db::CustomerRepository`] needs
//! to observe the winning insert, which a snapshot transaction would hide.

use tracing::{info, warn};

use pedidos_core::finance::{compute_totals, outstanding};
use pedidos_core::state::next_status;
use pedidos_core::validation::{
    validate_customer, validate_destination, validate_document, validate_items, validate_note,
};
use pedidos_core::{
    AuditKind, CoreError, Destination, DocumentType, Money, OrderAction, OrderItemInput,
    OrderStatus, ValidationError, PAYMENT_TOLERANCE_CENTS,
};
use pedidos_db::{Database, DbError};

use crate::error::{EngineError, EngineResult};
use crate::request::{
    ActionRequest, ActorRef, CreateOrderRequest, CustomerInput, DiscountInput, EditOrderRequest,
    ItemInput, ListOrdersRequest, PayRequest, ReportRequest,
};
use crate::response::{
    CustomerView, KpiView, OrderDetail, OrderSummary, ReportRowView, TopProductView,
};

/// Default page size for the order listing.
const DEFAULT_LIST_LIMIT: i64 = 50;
/// Hard cap on the order listing page size.
const MAX_LIST_LIMIT: i64 = 200;
/// Default length of the top-products ranking.
const DEFAULT_TOP_LIMIT: i64 = 10;

/// The order lifecycle service.
#[derive(Debug, Clone)]
pub struct OrderService {
    db: Database,
}

impl OrderService {
    /// Creates a service over an initialized database.
    pub fn new(db: Database) -> Self {
        OrderService { db }
    }

    /// The underlying database, for embedding apps that need direct reads.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Registers a new order.
    ///
    /// Validates customer, destination and items, computes the financial
    /// snapshot, resolves the customer, then writes the order row and its
    /// line items in one transaction. A deposit larger than the order total
    /// is refused at creation time.
    pub async fn create_order(&self, req: CreateOrderRequest) -> EngineResult<OrderDetail> {
        let actor = self.resolve_actor(req.actor.as_ref()).await?;

        validate_customer(
            req.customer.doc_type,
            &req.customer.doc_number,
            &req.customer.full_name,
            req.customer.phone.as_deref(),
        )?;

        let destination = req.destination.into_destination();
        validate_destination(&destination)?;

        let items: Vec<OrderItemInput> = req.items.into_iter().map(ItemInput::into_core).collect();
        validate_items(&items)?;

        let discount = req.discount.map(DiscountInput::into_core);
        let totals = compute_totals(&items, discount);

        let deposit = parse_amount(req.deposit.unwrap_or(0.0), "deposit")?;
        if deposit.cents() > totals.total.cents() {
            return Err(ValidationError::DepositExceedsTotal.into());
        }

        let customer = self.resolve_customer(&req.customer).await?;

        let orders = self.db.orders();
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        let order_id = orders
            .insert_order(&mut tx, customer.id, &destination, totals, deposit)
            .await?;
        orders.insert_items(&mut tx, order_id, &items).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(order_id, customer_id = customer.id, total = %totals.total, "Order registered");
        self.record_audit(order_id, &actor, AuditKind::Registered, None)
            .await;

        self.order_detail(order_id).await
    }

    // =========================================================================
    // Modification
    // =========================================================================

    /// Edits a REGISTERED order. Each section of the request is applied
    /// only when present: a deposit-only or destination-only edit leaves
    /// the other sections untouched.
    ///
    /// When items ARE resubmitted, the financial snapshot is recomputed
    /// over them, so a discount not resubmitted alongside them resets to
    /// zero, and the stored rows go through reconciliation (which revives
    /// removed-then-re-added rows instead of duplicating them). A
    /// resubmitted deposit replaces the recorded one without the
    /// creation-time total cap: later adjustments may legitimately exceed
    /// the total.
    pub async fn edit_order(&self, id: i64, req: EditOrderRequest) -> EngineResult<OrderDetail> {
        let note = validate_note(req.note.as_deref(), "order modification")?;
        let actor = self.resolve_actor(req.actor.as_ref()).await?;

        let order = self
            .db
            .orders()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::order_not_found(id))?;
        next_status(order.status, OrderAction::Edit)?;

        let customer_id = match &req.customer {
            Some(customer) => {
                validate_customer(
                    customer.doc_type,
                    &customer.doc_number,
                    &customer.full_name,
                    customer.phone.as_deref(),
                )?;
                self.resolve_customer(customer).await?.id
            }
            None => order.customer_id,
        };

        let destination = match req.destination {
            Some(input) => {
                let destination = input.into_destination();
                validate_destination(&destination)?;
                Some(destination)
            }
            None => None,
        };

        let items = match req.items {
            Some(raw) => {
                let items: Vec<OrderItemInput> =
                    raw.into_iter().map(ItemInput::into_core).collect();
                validate_items(&items)?;
                Some(items)
            }
            None => None,
        };

        // Totals move only with the items they derive from.
        let (total, discount) = match items.as_deref() {
            Some(items) => {
                let totals = compute_totals(items, req.discount.map(DiscountInput::into_core));
                (totals.total, totals.discount)
            }
            None => (order.total(), Money::from_cents(order.discount_cents)),
        };

        let paid = match req.deposit {
            Some(value) => parse_amount(value, "deposit")?,
            None => order.paid(),
        };

        let merged = MergedDestination::from_parts(destination.as_ref(), &order);

        let orders = self.db.orders();
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let update = orders
            .update_registered(
                &mut tx,
                id,
                customer_id,
                merged.agency_type,
                merged.agency_or_address.as_deref(),
                &merged.department,
                &merged.province,
                &merged.district,
                total,
                discount,
                paid,
            )
            .await;
        match update {
            Ok(()) => {}
            // We saw REGISTERED above; a missed guard means another
            // transition won in between.
            Err(DbError::NotFound { .. }) => {
                return Err(EngineError::Conflict(format!(
                    "order {id} left REGISTERED while the edit was in flight"
                )));
            }
            Err(err) => return Err(err.into()),
        }

        if let Some(items) = &items {
            orders.reconcile_items(&mut tx, id, items).await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(order_id = id, total = %total, "Order modified");
        self.record_audit(id, &actor, AuditKind::Modified, Some(&note))
            .await;

        self.order_detail(id).await
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// REGISTERED → PACKED. No note required.
    pub async fn pack_order(&self, id: i64, req: ActionRequest) -> EngineResult<OrderDetail> {
        self.apply_action(id, OrderAction::Pack, AuditKind::Packed, req, "packing")
            .await
    }

    /// PACKED → REGISTERED. Reason note required.
    pub async fn return_order(&self, id: i64, req: ActionRequest) -> EngineResult<OrderDetail> {
        self.apply_action(
            id,
            OrderAction::Return,
            AuditKind::ReturnedToPacking,
            req,
            "returning to packing",
        )
        .await
    }

    /// PACKED → CANCELLED. Reason note required.
    pub async fn cancel_order(&self, id: i64, req: ActionRequest) -> EngineResult<OrderDetail> {
        self.apply_action(
            id,
            OrderAction::Cancel,
            AuditKind::Cancelled,
            req,
            "cancellation",
        )
        .await
    }

    /// REGISTERED → DELETED. Soft delete, reason note required. The row
    /// and its audit trail stay queryable.
    pub async fn delete_order(&self, id: i64, req: ActionRequest) -> EngineResult<OrderDetail> {
        self.apply_action(id, OrderAction::Delete, AuditKind::Deleted, req, "deletion")
            .await
    }

    async fn apply_action(
        &self,
        id: i64,
        action: OrderAction,
        kind: AuditKind,
        req: ActionRequest,
        context: &str,
    ) -> EngineResult<OrderDetail> {
        let note = if action.requires_note() {
            Some(validate_note(req.note.as_deref(), context)?)
        } else {
            req.note
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
        };

        let actor = self.resolve_actor(req.actor.as_ref()).await?;

        let order = self
            .db
            .orders()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::order_not_found(id))?;
        let target = next_status(order.status, action)?;

        let moved = self.db.orders().transition(id, order.status, target).await?;
        if !moved {
            return Err(EngineError::Conflict(format!(
                "order {id} changed state concurrently, {action} not applied"
            )));
        }

        info!(order_id = id, from = %order.status, to = %target, "Order transitioned");
        self.record_audit(id, &actor, kind, note.as_deref()).await;

        self.order_detail(id).await
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Records a payment against a PACKED order and delivers it.
    ///
    /// Payments accumulate on top of any deposit. When the amount differs
    /// from the outstanding balance by more than the tolerance, a reason
    /// note is mandatory; the order transitions to DELIVERED either way,
    /// including partial and excess payments.
    pub async fn pay_order(&self, id: i64, req: PayRequest) -> EngineResult<OrderDetail> {
        if !req.amount.is_finite() || req.amount < 0.0 {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "amount must be a non-negative number".to_string(),
            }
            .into());
        }
        let amount = Money::from_decimal(req.amount);

        let actor = self.resolve_actor(req.actor.as_ref()).await?;

        let orders = self.db.orders();
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let order = orders
            .get_by_id_tx(&mut tx, id)
            .await?
            .ok_or_else(|| EngineError::order_not_found(id))?;
        next_status(order.status, OrderAction::Deliver)?;

        let due = outstanding(order.total(), order.paid());
        let matches_balance = (amount.cents() - due.cents()).abs() <= PAYMENT_TOLERANCE_CENTS;
        let note = if matches_balance {
            req.note
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
        } else {
            Some(validate_note(
                req.note.as_deref(),
                "payment differs from the outstanding balance",
            )?)
        };

        let new_paid = order.paid() + amount;
        let applied = orders.apply_payment(&mut tx, id, new_paid).await?;
        if !applied {
            return Err(EngineError::Conflict(format!(
                "order {id} left PACKED while the payment was in flight"
            )));
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(order_id = id, amount = %amount, paid = %new_paid, "Order delivered");
        self.record_audit(id, &actor, AuditKind::Delivered, note.as_deref())
            .await;

        self.order_detail(id).await
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Lists orders by status (default REGISTERED), newest first.
    pub async fn list_orders(&self, req: ListOrdersRequest) -> EngineResult<Vec<OrderSummary>> {
        let status = req.status.unwrap_or(OrderStatus::Registered);
        let limit = req.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let offset = req.offset.unwrap_or(0).max(0);

        let rows = self.db.orders().list(status, limit, offset).await?;
        Ok(rows.into_iter().map(OrderSummary::from).collect())
    }

    /// Full order view: customer, every line item (valid and invalid, in
    /// insertion order) and the audit trail newest first.
    pub async fn order_detail(&self, id: i64) -> EngineResult<OrderDetail> {
        let order = self
            .db
            .orders()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::order_not_found(id))?;
        let customer = self
            .db
            .customers()
            .get_by_id(order.customer_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "customer".to_string(),
                id: order.customer_id.to_string(),
            })?;
        let items = self.db.orders().items_for_order(id).await?;
        let audit = self.db.audit().list_for_order(id).await?;

        Ok(OrderDetail::assemble(order, customer, items, audit))
    }

    /// Looks up a customer by document identity.
    pub async fn find_customer(
        &self,
        doc_type: DocumentType,
        doc_number: &str,
    ) -> EngineResult<Option<CustomerView>> {
        validate_document(doc_type, doc_number)?;
        let customer = self
            .db
            .customers()
            .find_by_document(doc_type, doc_number.trim())
            .await?;
        Ok(customer.map(CustomerView::from))
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Order count and collected amount per status.
    pub async fn kpis(&self) -> EngineResult<Vec<KpiView>> {
        let rows = self.db.reports().kpis().await?;
        Ok(rows.into_iter().map(KpiView::from).collect())
    }

    /// Products ranked by quantity moved, valid line items only.
    pub async fn top_products(&self, limit: Option<i64>) -> EngineResult<Vec<TopProductView>> {
        let limit = limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, 50);
        let rows = self.db.reports().top_products(limit).await?;
        Ok(rows.into_iter().map(TopProductView::from).collect())
    }

    /// Filtered report listing, newest first, balances floored at zero.
    pub async fn report(&self, req: ReportRequest) -> EngineResult<Vec<ReportRowView>> {
        let rows = self.db.reports().report_rows(&req.into_filter()).await?;
        Ok(rows.into_iter().map(ReportRowView::from).collect())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Resolves the mandatory actor of a mutating operation to a user id.
    /// A missing reference or one naming no stored user is a validation
    /// failure: every lifecycle mutation must be attributable.
    async fn resolve_actor(&self, actor: Option<&ActorRef>) -> EngineResult<String> {
        let Some(actor) = actor else {
            return Err(EngineError::Validation(
                "an acting user is required".to_string(),
            ));
        };

        if let Some(id) = actor.id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let user = self
                .db
                .users()
                .get_by_id(id)
                .await?
                .ok_or_else(|| EngineError::Validation(format!("unknown user: {id}")))?;
            return Ok(user.id);
        }

        if let Some(username) = actor
            .username
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let user = self
                .db
                .users()
                .get_by_username(username)
                .await?
                .ok_or_else(|| EngineError::Validation(format!("unknown user: {username}")))?;
            return Ok(user.id);
        }

        Err(EngineError::Validation(
            "an acting user is required".to_string(),
        ))
    }

    async fn resolve_customer(
        &self,
        customer: &CustomerInput,
    ) -> EngineResult<pedidos_core::Customer> {
        Ok(self
            .db
            .customers()
            .resolve(
                customer.doc_type,
                customer.doc_number.trim(),
                customer.full_name.trim(),
                customer.phone.as_deref().map(str::trim),
            )
            .await?)
    }

    /// Best-effort audit append. The lifecycle operation has already
    /// committed; a failed trail write is logged, never surfaced.
    async fn record_audit(&self, order_id: i64, user_id: &str, kind: AuditKind, note: Option<&str>) {
        if let Err(err) = self
            .db
            .audit()
            .record(order_id, Some(user_id), kind.label(), note)
            .await
        {
            warn!(order_id, kind = kind.label(), %err, "Audit append failed, continuing");
        }
    }
}

/// Editable destination fields, merged from an optional resubmission and
/// the stored row.
struct MergedDestination {
    agency_type: pedidos_core::AgencyType,
    agency_or_address: Option<String>,
    department: String,
    province: String,
    district: String,
}

impl MergedDestination {
    fn from_parts(resubmitted: Option<&Destination>, stored: &pedidos_core::Order) -> Self {
        match resubmitted {
            Some(d) => MergedDestination {
                agency_type: d.agency_type,
                agency_or_address: d.storage_value(),
                department: d.department.trim().to_string(),
                province: d.province.trim().to_string(),
                district: d.district.trim().to_string(),
            },
            None => MergedDestination {
                agency_type: stored.agency_type,
                agency_or_address: stored.agency_or_address.clone(),
                department: stored.department.clone(),
                province: stored.province.clone(),
                district: stored.district.clone(),
            },
        }
    }
}

fn parse_amount(value: f64, field: &str) -> EngineResult<Money> {
    if !value.is_finite() || value < 0.0 {
        return Err(EngineError::Validation(format!(
            "{field} must be a non-negative amount"
        )));
    }
    Ok(Money::from_decimal(value))
}

// =============================================================================
// Integration Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::DestinationInput;
    use pedidos_core::AgencyType;
    use pedidos_db::DbConfig;

    /// Service with one seeded operator every mutation acts as.
    async fn service() -> OrderService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().insert("mrojas", "OPERADOR").await.unwrap();
        OrderService::new(db)
    }

    fn actor() -> Option<ActorRef> {
        Some(ActorRef {
            id: None,
            username: Some("mrojas".to_string()),
        })
    }

    fn customer(doc: &str) -> CustomerInput {
        CustomerInput {
            doc_type: DocumentType::Dni,
            doc_number: doc.to_string(),
            full_name: "Ana Quispe".to_string(),
            phone: Some("+51987654321".to_string()),
        }
    }

    fn shalom() -> DestinationInput {
        DestinationInput {
            agency_type: AgencyType::Shalom,
            agency_name: Some("Sucursal Centro".to_string()),
            address: None,
            department: "LIMA".to_string(),
            province: "LIMA".to_string(),
            district: "MIRAFLORES".to_string(),
        }
    }

    fn item(name: &str, qty: i64, price: f64) -> ItemInput {
        ItemInput {
            product_id: None,
            name: name.to_string(),
            quantity: qty,
            unit_price: price,
            is_manual: true,
        }
    }

    fn create_req(doc: &str, items: Vec<ItemInput>) -> CreateOrderRequest {
        CreateOrderRequest {
            customer: customer(doc),
            destination: shalom(),
            items,
            discount: None,
            deposit: None,
            actor: actor(),
        }
    }

    fn items_edit(items: Vec<ItemInput>, note: &str) -> EditOrderRequest {
        EditOrderRequest {
            items: Some(items),
            note: Some(note.to_string()),
            actor: actor(),
            ..Default::default()
        }
    }

    fn note_req(note: &str) -> ActionRequest {
        ActionRequest {
            note: Some(note.to_string()),
            actor: actor(),
        }
    }

    fn pack_req() -> ActionRequest {
        ActionRequest {
            note: None,
            actor: actor(),
        }
    }

    fn pay_req(amount: f64, note: Option<&str>) -> PayRequest {
        PayRequest {
            amount,
            note: note.map(String::from),
            actor: actor(),
        }
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_order_full_flow() {
        let svc = service().await;

        let detail = svc
            .create_order(CreateOrderRequest {
                discount: Some(DiscountInput::Percent(10.0)),
                deposit: Some(5.0),
                ..create_req("12345678", vec![item("Caja grande", 2, 10.5), item("Cinta", 1, 3.0)])
            })
            .await
            .unwrap();

        assert_eq!(detail.status, OrderStatus::Registered);
        assert_eq!(detail.subtotal, 24.0);
        assert_eq!(detail.discount, 2.4);
        assert_eq!(detail.total, 21.6);
        assert_eq!(detail.paid, 5.0);
        assert_eq!(detail.pending, 16.6);
        assert_eq!(detail.customer.full_name, "Ana Quispe");

        // Creation leaves one audit event behind, attributed to the actor.
        assert_eq!(detail.audit.len(), 1);
        assert_eq!(detail.audit[0].kind, "REGISTRADO");
        assert!(detail.audit[0].user_id.is_some());
    }

    #[tokio::test]
    async fn test_create_repeat_customer_reuses_row() {
        let svc = service().await;

        let first = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();
        let second = svc
            .create_order(create_req("12345678", vec![item("Box B", 1, 20.0)]))
            .await
            .unwrap();

        assert_eq!(first.customer.id, second.customer.id);
    }

    #[tokio::test]
    async fn test_create_rejects_deposit_over_total() {
        let svc = service().await;

        let err = svc
            .create_order(CreateOrderRequest {
                deposit: Some(100.0),
                ..create_req("12345678", vec![item("Box A", 1, 10.0)])
            })
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("deposit"));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_destination() {
        let svc = service().await;

        let mut req = create_req("12345678", vec![item("Box A", 1, 10.0)]);
        req.destination.agency_name = None;

        let err = svc.create_order(req).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("SHALOM"));
    }

    #[tokio::test]
    async fn test_mutations_require_an_actor() {
        let svc = service().await;

        // No actor at all: refused before any write.
        let mut req = create_req("12345678", vec![item("Box A", 1, 10.0)]);
        req.actor = None;
        let err = svc.create_order(req).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("acting user"));

        // A handle naming no stored user is equally a validation failure.
        let mut req = create_req("12345678", vec![item("Box A", 1, 10.0)]);
        req.actor = Some(ActorRef {
            id: None,
            username: Some("nadie".to_string()),
        });
        let err = svc.create_order(req).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("nadie"));

        let list = svc.list_orders(ListOrdersRequest::default()).await.unwrap();
        assert!(list.is_empty());

        // Transitions enforce the same rule.
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();
        let err = svc
            .pack_order(order.id, ActionRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_create_attributes_audit_to_actor() {
        let svc = service().await;
        let user = svc.db.users().get_by_username("mrojas").await.unwrap().unwrap();

        let detail = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();

        assert_eq!(detail.audit[0].user_id.as_deref(), Some(user.id.as_str()));
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_happy_path_register_pack_deliver() {
        let svc = service().await;

        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 2, 10.0)]))
            .await
            .unwrap();

        let packed = svc.pack_order(order.id, pack_req()).await.unwrap();
        assert_eq!(packed.status, OrderStatus::Packed);

        let delivered = svc.pay_order(order.id, pay_req(20.0, None)).await.unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert_eq!(delivered.paid, 20.0);
        assert_eq!(delivered.pending, 0.0);

        let kinds: Vec<&str> = delivered.audit.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, ["ENTREGADO", "EMBALADO", "REGISTRADO"]);
    }

    #[tokio::test]
    async fn test_cancel_requires_note() {
        let svc = service().await;
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();
        svc.pack_order(order.id, pack_req()).await.unwrap();

        let err = svc.cancel_order(order.id, pack_req()).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let cancelled = svc
            .cancel_order(order.id, note_req("cliente desistió"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.audit[0].kind, "CANCELACION");
        assert_eq!(cancelled.audit[0].note.as_deref(), Some("cliente desistió"));
    }

    #[tokio::test]
    async fn test_return_then_repack() {
        let svc = service().await;
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();

        svc.pack_order(order.id, pack_req()).await.unwrap();
        let returned = svc
            .return_order(order.id, note_req("faltó stock"))
            .await
            .unwrap();
        assert_eq!(returned.status, OrderStatus::Registered);

        let repacked = svc.pack_order(order.id, pack_req()).await.unwrap();
        assert_eq!(repacked.status, OrderStatus::Packed);

        let kinds: Vec<&str> = repacked.audit.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, ["EMBALADO", "REGRESO A EMBALAR", "EMBALADO", "REGISTRADO"]);
    }

    #[tokio::test]
    async fn test_delete_is_soft() {
        let svc = service().await;
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();

        let deleted = svc
            .delete_order(order.id, note_req("pedido duplicado"))
            .await
            .unwrap();
        assert_eq!(deleted.status, OrderStatus::Deleted);

        // Still queryable, with the full trail.
        let detail = svc.order_detail(order.id).await.unwrap();
        assert_eq!(detail.status, OrderStatus::Deleted);
        assert_eq!(detail.audit[0].kind, "ELIMINACION");
    }

    #[tokio::test]
    async fn test_illegal_transitions_are_conflicts() {
        let svc = service().await;
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();

        // Cancel while still REGISTERED.
        let err = svc.cancel_order(order.id, note_req("x")).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert!(err.to_string().contains("REGISTERED"));
        assert!(err.to_string().contains("PACKED"));

        // Terminal states accept nothing further.
        svc.pack_order(order.id, pack_req()).await.unwrap();
        svc.pay_order(order.id, pay_req(10.0, None)).await.unwrap();
        let err = svc.pack_order(order.id, pack_req()).await.unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let svc = service().await;
        let err = svc.order_detail(999).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    // -------------------------------------------------------------------------
    // Payment
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_partial_payment_needs_note_and_still_delivers() {
        let svc = service().await;
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 50.0)]))
            .await
            .unwrap();
        svc.pack_order(order.id, pack_req()).await.unwrap();

        let err = svc.pay_order(order.id, pay_req(30.0, None)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("reason note"));

        let delivered = svc
            .pay_order(order.id, pay_req(30.0, Some("pagará el saldo al recoger")))
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert_eq!(delivered.pending, 20.0);
    }

    #[tokio::test]
    async fn test_payment_accumulates_on_deposit() {
        let svc = service().await;
        let order = svc
            .create_order(CreateOrderRequest {
                deposit: Some(15.0),
                ..create_req("12345678", vec![item("Box A", 1, 50.0)])
            })
            .await
            .unwrap();
        svc.pack_order(order.id, pack_req()).await.unwrap();

        // 35.00 exactly settles the balance: no note needed.
        let delivered = svc.pay_order(order.id, pay_req(35.0, None)).await.unwrap();
        assert_eq!(delivered.paid, 50.0);
        assert_eq!(delivered.pending, 0.0);
    }

    #[tokio::test]
    async fn test_overpayment_shows_signed_pending() {
        let svc = service().await;
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();
        svc.pack_order(order.id, pack_req()).await.unwrap();

        let delivered = svc
            .pay_order(order.id, pay_req(12.0, Some("propina")))
            .await
            .unwrap();
        assert_eq!(delivered.pending, -2.0);

        // The report surface floors it.
        let rows = svc.report(ReportRequest::default()).await.unwrap();
        assert_eq!(rows[0].pending, 0.0);
    }

    #[tokio::test]
    async fn test_negative_payment_rejected() {
        let svc = service().await;
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();
        svc.pack_order(order.id, pack_req()).await.unwrap();

        let err = svc.pay_order(order.id, pay_req(-1.0, None)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_edit_requires_note_and_registered_state() {
        let svc = service().await;
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();

        let mut req = items_edit(vec![item("Box A", 2, 10.0)], "x");
        req.note = None;
        let err = svc.edit_order(order.id, req).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        svc.pack_order(order.id, pack_req()).await.unwrap();
        let err = svc
            .edit_order(order.id, items_edit(vec![item("Box A", 2, 10.0)], "más cajas"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_edit_reconciles_and_recomputes() {
        let svc = service().await;
        let order = svc
            .create_order(CreateOrderRequest {
                discount: Some(DiscountInput::Amount(5.0)),
                ..create_req("12345678", vec![item("Box A", 2, 10.0), item("Box B", 1, 4.0)])
            })
            .await
            .unwrap();
        assert_eq!(order.total, 19.0);

        // Drop Box B, bump Box A; discount not resubmitted with the items
        // resets to zero.
        let edited = svc
            .edit_order(order.id, items_edit(vec![item("Box A", 3, 10.0)], "ajuste"))
            .await
            .unwrap();

        assert_eq!(edited.discount, 0.0);
        assert_eq!(edited.total, 30.0);
        assert_eq!(edited.items.len(), 2, "Box B invalidated, not deleted");
        let box_b = edited.items.iter().find(|i| i.name == "Box B").unwrap();
        assert!(!box_b.valid);
        assert_eq!(edited.subtotal, 30.0, "invalid rows excluded from subtotal");
        assert_eq!(edited.audit[0].kind, "MODIFICACION");
        assert_eq!(edited.audit[0].note.as_deref(), Some("ajuste"));
    }

    #[tokio::test]
    async fn test_edit_deposit_only_leaves_items_and_totals_untouched() {
        let svc = service().await;
        let order = svc
            .create_order(CreateOrderRequest {
                discount: Some(DiscountInput::Amount(5.0)),
                deposit: Some(5.0),
                ..create_req("12345678", vec![item("Box A", 2, 10.0)])
            })
            .await
            .unwrap();
        assert_eq!(order.total, 15.0);

        let edited = svc
            .edit_order(
                order.id,
                EditOrderRequest {
                    deposit: Some(10.0),
                    note: Some("solo ajusta abono".to_string()),
                    actor: actor(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.paid, 10.0);
        // Untouched sections survive, discount included.
        assert_eq!(edited.total, 15.0);
        assert_eq!(edited.discount, 5.0);
        assert_eq!(edited.items.len(), 1);
        assert!(edited.items[0].valid);
        assert_eq!(edited.audit[0].kind, "MODIFICACION");
    }

    #[tokio::test]
    async fn test_edit_destination_only() {
        let svc = service().await;
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();

        let edited = svc
            .edit_order(
                order.id,
                EditOrderRequest {
                    destination: Some(DestinationInput {
                        agency_type: AgencyType::Olva,
                        agency_name: None,
                        address: Some("Av. Lima 123".to_string()),
                        department: "LIMA".to_string(),
                        province: "LIMA".to_string(),
                        district: "LINCE".to_string(),
                    }),
                    note: Some("nueva agencia".to_string()),
                    actor: actor(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.agency_type, AgencyType::Olva);
        assert_eq!(edited.agency_or_address.as_deref(), Some("Av. Lima 123"));
        assert_eq!(edited.district, "LINCE");
        // Items and money untouched.
        assert_eq!(edited.total, 10.0);
        assert_eq!(edited.customer.id, order.customer.id);
    }

    #[tokio::test]
    async fn test_edit_deposit_may_exceed_total() {
        let svc = service().await;
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 50.0)]))
            .await
            .unwrap();

        // The creation-time cap does not apply to later adjustments.
        let edited = svc
            .edit_order(
                order.id,
                EditOrderRequest {
                    deposit: Some(60.0),
                    note: Some("pago adelantado de más".to_string()),
                    actor: actor(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.paid, 60.0);
        assert_eq!(edited.pending, -10.0);
    }

    #[tokio::test]
    async fn test_edit_replaces_deposit_only_when_submitted() {
        let svc = service().await;
        let order = svc
            .create_order(CreateOrderRequest {
                deposit: Some(5.0),
                ..create_req("12345678", vec![item("Box A", 1, 50.0)])
            })
            .await
            .unwrap();

        let kept = svc
            .edit_order(order.id, items_edit(vec![item("Box A", 2, 50.0)], "más"))
            .await
            .unwrap();
        assert_eq!(kept.paid, 5.0);

        let replaced = svc
            .edit_order(
                order.id,
                EditOrderRequest {
                    deposit: Some(20.0),
                    note: Some("abono mayor".to_string()),
                    actor: actor(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(replaced.paid, 20.0);
    }

    #[tokio::test]
    async fn test_edit_can_reassign_customer() {
        let svc = service().await;
        let order = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();

        let mut new_customer = customer("87654321");
        new_customer.full_name = "Luis Rojas".to_string();
        let edited = svc
            .edit_order(
                order.id,
                EditOrderRequest {
                    customer: Some(new_customer),
                    note: Some("cliente corregido".to_string()),
                    actor: actor(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_ne!(edited.customer.id, order.customer.id);
        assert_eq!(edited.customer.full_name, "Luis Rojas");
        // The rest of the order is untouched.
        assert_eq!(edited.total, 10.0);
        assert_eq!(edited.items.len(), 1);
    }

    // -------------------------------------------------------------------------
    // Views & Reports
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_defaults_to_registered() {
        let svc = service().await;
        let a = svc
            .create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();
        let b = svc
            .create_order(create_req("87654321", vec![item("Box B", 1, 20.0)]))
            .await
            .unwrap();
        svc.pack_order(a.id, pack_req()).await.unwrap();

        let listed = svc.list_orders(ListOrdersRequest::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, b.id);

        let packed = svc
            .list_orders(ListOrdersRequest {
                status: Some(OrderStatus::Packed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].id, a.id);
    }

    #[tokio::test]
    async fn test_find_customer_by_document() {
        let svc = service().await;
        svc.create_order(create_req("12345678", vec![item("Box A", 1, 10.0)]))
            .await
            .unwrap();

        let found = svc
            .find_customer(DocumentType::Dni, "12345678")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.full_name, "Ana Quispe");

        assert!(svc
            .find_customer(DocumentType::Dni, "99999999")
            .await
            .unwrap()
            .is_none());

        let err = svc.find_customer(DocumentType::Dni, "123").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_kpis_and_top_products() {
        let svc = service().await;
        let a = svc
            .create_order(create_req("12345678", vec![item("Caja grande", 3, 10.0)]))
            .await
            .unwrap();
        svc.create_order(create_req("87654321", vec![item("Caja chica", 1, 5.0)]))
            .await
            .unwrap();
        svc.pack_order(a.id, pack_req()).await.unwrap();
        svc.pay_order(a.id, pay_req(30.0, None)).await.unwrap();

        let kpis = svc.kpis().await.unwrap();
        let delivered = kpis.iter().find(|k| k.status == OrderStatus::Delivered).unwrap();
        assert_eq!(delivered.orders, 1);
        assert_eq!(delivered.paid, 30.0);

        let top = svc.top_products(None).await.unwrap();
        assert_eq!(top[0].name, "Caja grande");
        assert_eq!(top[0].total_quantity, 3);
    }
}
