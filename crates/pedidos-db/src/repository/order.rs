//! # Order Repository
//!
//! Database operations for orders and their line items.
//!
//! ## Concurrency Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Every compound operation (create, edit, pay) runs inside ONE       │
//! │  transaction opened by the lifecycle service. Methods that take     │
//! │  a &mut SqliteConnection participate in it.                         │
//! │                                                                     │
//! │  Every status write is guarded:                                     │
//! │      UPDATE orders SET status = <to> WHERE id = ? AND status = <from>│
//! │  and rows_affected is checked. Two concurrent transitions can both  │
//! │  pass the read precondition, but only one guard matches; the loser  │
//! │  sees rows_affected = 0 and reports the conflict.                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line items are never deleted. Reconciliation flips the `valid` flag and
//! revives previously-removed rows instead of inserting duplicates.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use pedidos_core::finance::Totals;
use pedidos_core::{
    AgencyType, Destination, Money, Order, OrderItem, OrderItemInput, OrderStatus,
};

/// One row of the order listing, with the owning customer joined in.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct OrderListRow {
    pub id: i64,
    pub status: OrderStatus,
    pub agency_type: AgencyType,
    pub agency_or_address: Option<String>,
    pub department: String,
    pub province: String,
    pub district: String,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub created_at: chrono::DateTime<Utc>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
}

/// Repository for order and line-item operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an order by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(SELECT_ORDER)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets an order by id inside an enclosing transaction.
    pub async fn get_by_id_tx(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(SELECT_ORDER)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(order)
    }

    /// All line items for an order, valid and invalid alike, in insertion
    /// (id) order. The reconciler needs the invalid ones for reactivation.
    pub async fn items_for_order(&self, order_id: i64) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(SELECT_ITEMS)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn items_for_order_tx(
        &self,
        conn: &mut SqliteConnection,
        order_id: i64,
    ) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(SELECT_ITEMS)
            .bind(order_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(items)
    }

    /// Lists orders by status, newest first, with range pagination.
    pub async fn list(
        &self,
        status: OrderStatus,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<OrderListRow>> {
        let rows = sqlx::query_as::<_, OrderListRow>(
            r#"
            SELECT
                o.id, o.status, o.agency_type, o.agency_or_address,
                o.department, o.province, o.district,
                o.total_cents, o.paid_cents, o.created_at,
                c.full_name AS customer_name, c.phone AS customer_phone
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE o.status = ?1
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Inserts the order row. Part of the create transaction.
    pub async fn insert_order(
        &self,
        conn: &mut SqliteConnection,
        customer_id: i64,
        destination: &Destination,
        totals: Totals,
        paid: Money,
    ) -> DbResult<i64> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                customer_id, agency_type, agency_or_address,
                department, province, district,
                total_cents, discount_cents, paid_cents,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            "#,
        )
        .bind(customer_id)
        .bind(destination.agency_type)
        .bind(destination.storage_value())
        .bind(destination.department.trim())
        .bind(destination.province.trim())
        .bind(destination.district.trim())
        .bind(totals.total.cents())
        .bind(totals.discount.cents())
        .bind(paid.cents())
        .bind(OrderStatus::Registered)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let order_id = result.last_insert_rowid();
        debug!(order_id, total = %totals.total, "Inserted order");
        Ok(order_id)
    }

    /// Inserts the initial line items. Part of the create transaction: a
    /// failure here rolls the order row back with it.
    pub async fn insert_items(
        &self,
        conn: &mut SqliteConnection,
        order_id: i64,
        items: &[OrderItemInput],
    ) -> DbResult<()> {
        let now = Utc::now();

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, product_id, name, quantity,
                    unit_price_cents, is_manual, valid, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
                "#,
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(item.name.trim())
            .bind(item.quantity)
            .bind(item.unit_price.cents())
            .bind(item.is_manual)
            .bind(now)
            .execute(&mut *conn)
            .await?;
        }

        debug!(order_id, count = items.len(), "Inserted line items");
        Ok(())
    }

    // =========================================================================
    // Line-Item Reconciliation
    // =========================================================================

    /// Reconciles the stored line items of an order against a desired set.
    /// Invoked only on edit of a REGISTERED order, inside the edit
    /// transaction.
    ///
    /// ## Algorithm
    /// For each desired item, the first stored row (insertion order) that
    /// matches wins:
    /// - by product reference, when both sides carry one
    /// - otherwise by case-sensitive trimmed name equality on manual rows
    ///
    /// Matched rows are updated in place (quantity, unit price) and forced
    /// `valid = true`, which is how a removed-then-re-added item is revived
    /// without a duplicate row. Unmatched desired items are inserted.
    /// Stored rows no desired item claimed are invalidated, never deleted.
    pub async fn reconcile_items(
        &self,
        conn: &mut SqliteConnection,
        order_id: i64,
        desired: &[OrderItemInput],
    ) -> DbResult<()> {
        let stored = self.items_for_order_tx(conn, order_id).await?;

        let mut kept: Vec<i64> = Vec::new();
        let now = Utc::now();

        for want in desired {
            let matched = stored.iter().find(|have| {
                match (have.product_id, want.product_id) {
                    (Some(h), Some(w)) => h == w,
                    (None, _) => have.name.trim() == want.name.trim(),
                    _ => false,
                }
            });

            match matched {
                Some(row) => {
                    sqlx::query(
                        r#"
                        UPDATE order_items
                        SET quantity = ?2, unit_price_cents = ?3, valid = 1
                        WHERE id = ?1
                        "#,
                    )
                    .bind(row.id)
                    .bind(want.quantity)
                    .bind(want.unit_price.cents())
                    .execute(&mut *conn)
                    .await?;
                    kept.push(row.id);
                }
                None => {
                    sqlx::query(
                        r#"
                        INSERT INTO order_items (
                            order_id, product_id, name, quantity,
                            unit_price_cents, is_manual, valid, created_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
                        "#,
                    )
                    .bind(order_id)
                    .bind(want.product_id)
                    .bind(want.name.trim())
                    .bind(want.quantity)
                    .bind(want.unit_price.cents())
                    .bind(want.is_manual)
                    .bind(now)
                    .execute(&mut *conn)
                    .await?;
                }
            }
        }

        // Invalidate what the desired set no longer contains.
        let mut invalidated = 0u32;
        for row in &stored {
            if !kept.contains(&row.id) {
                sqlx::query("UPDATE order_items SET valid = 0 WHERE id = ?1")
                    .bind(row.id)
                    .execute(&mut *conn)
                    .await?;
                invalidated += 1;
            }
        }

        debug!(
            order_id,
            desired = desired.len(),
            kept = kept.len(),
            invalidated,
            "Reconciled line items"
        );
        Ok(())
    }

    // =========================================================================
    // Updates and Transitions
    // =========================================================================

    /// Writes the merged editable fields of an order, guarded on REGISTERED.
    /// Part of the edit transaction.
    ///
    /// Returns `NotFound` when the guard misses; the service distinguishes
    /// missing vs. concurrently-transitioned from its earlier read.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_registered(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        customer_id: i64,
        agency_type: AgencyType,
        agency_or_address: Option<&str>,
        department: &str,
        province: &str,
        district: &str,
        total: Money,
        discount: Money,
        paid: Money,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                customer_id = ?2,
                agency_type = ?3,
                agency_or_address = ?4,
                department = ?5,
                province = ?6,
                district = ?7,
                total_cents = ?8,
                discount_cents = ?9,
                paid_cents = ?10,
                updated_at = ?11
            WHERE id = ?1 AND status = 'REGISTERED'
            "#,
        )
        .bind(id)
        .bind(customer_id)
        .bind(agency_type)
        .bind(agency_or_address)
        .bind(department)
        .bind(province)
        .bind(district)
        .bind(total.cents())
        .bind(discount.cents())
        .bind(paid.cents())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (REGISTERED)", id));
        }

        Ok(())
    }

    /// Guarded status transition. Returns whether the guard matched.
    pub async fn transition(
        &self,
        id: i64,
        from: OrderStatus,
        to: OrderStatus,
    ) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a payment and delivers the order in one guarded statement.
    /// Part of the pay transaction. Payments accumulate: `new_paid` is the
    /// previous amount plus the payment, computed by the service from the
    /// row it read in the same transaction.
    pub async fn apply_payment(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        new_paid: Money,
    ) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders SET paid_cents = ?2, status = 'DELIVERED', updated_at = ?3
            WHERE id = ?1 AND status = 'PACKED'
            "#,
        )
        .bind(id)
        .bind(new_paid.cents())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

const SELECT_ORDER: &str = r#"
    SELECT id, customer_id, agency_type, agency_or_address,
           department, province, district,
           total_cents, discount_cents, paid_cents,
           status, created_at, updated_at
    FROM orders
    WHERE id = ?1
"#;

const SELECT_ITEMS: &str = r#"
    SELECT id, order_id, product_id, name, quantity,
           unit_price_cents, is_manual, valid, created_at
    FROM order_items
    WHERE order_id = ?1
    ORDER BY id ASC
"#;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use pedidos_core::finance::compute_totals;
    use pedidos_core::DocumentType;

    fn item(name: &str, qty: i64, price_cents: i64) -> OrderItemInput {
        OrderItemInput {
            product_id: None,
            name: name.to_string(),
            quantity: qty,
            unit_price: Money::from_cents(price_cents),
            is_manual: true,
        }
    }

    fn destination() -> Destination {
        Destination {
            agency_type: AgencyType::Shalom,
            agency_name: Some("Sucursal Centro".to_string()),
            address: None,
            department: "LIMA".to_string(),
            province: "LIMA".to_string(),
            district: "MIRAFLORES".to_string(),
        }
    }

    async fn seed_order(db: &Database, items: &[OrderItemInput]) -> i64 {
        let customer = db
            .customers()
            .resolve(DocumentType::Dni, "12345678", "Ana Quispe", None)
            .await
            .unwrap();

        let totals = compute_totals(items, None);
        let mut tx = db.pool().begin().await.unwrap();
        let order_id = db
            .orders()
            .insert_order(&mut tx, customer.id, &destination(), totals, Money::zero())
            .await
            .unwrap();
        db.orders().insert_items(&mut tx, order_id, items).await.unwrap();
        tx.commit().await.unwrap();
        order_id
    }

    async fn reconcile(db: &Database, order_id: i64, desired: &[OrderItemInput]) {
        let mut tx = db.pool().begin().await.unwrap();
        db.orders()
            .reconcile_items(&mut tx, order_id, desired)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_and_fetch_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order_id = seed_order(&db, &[item("Box A", 2, 1000)]).await;

        let order = db.orders().get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Registered);
        assert_eq!(order.total_cents, 2000);
        assert_eq!(order.agency_or_address.as_deref(), Some("Sucursal Centro"));

        let items = db.orders().items_for_order(order_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].valid);
    }

    #[tokio::test]
    async fn test_reconcile_same_set_leaves_rows_unchanged() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let set = [item("Box A", 2, 1000), item("Box B", 1, 500)];
        let order_id = seed_order(&db, &set).await;

        reconcile(&db, order_id, &set).await;
        reconcile(&db, order_id, &set).await;

        let items = db.orders().items_for_order(order_id).await.unwrap();
        assert_eq!(items.len(), 2, "no duplicate rows");
        assert!(items.iter().all(|i| i.valid));
    }

    #[tokio::test]
    async fn test_reconcile_removal_then_readd_revives_original_row() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order_id = seed_order(&db, &[item("Box A", 2, 1000), item("Box B", 1, 500)]).await;

        let original: Vec<i64> = db
            .orders()
            .items_for_order(order_id)
            .await
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();

        // Remove Box B…
        reconcile(&db, order_id, &[item("Box A", 2, 1000)]).await;
        let after_removal = db.orders().items_for_order(order_id).await.unwrap();
        assert_eq!(after_removal.len(), 2, "invalidated, not deleted");
        let box_b = after_removal.iter().find(|i| i.name == "Box B").unwrap();
        assert!(!box_b.valid);

        // …then re-add it with a new quantity.
        reconcile(&db, order_id, &[item("Box A", 2, 1000), item("Box B", 3, 500)]).await;
        let revived = db.orders().items_for_order(order_id).await.unwrap();
        assert_eq!(revived.len(), 2, "revived the original row");
        let box_b = revived.iter().find(|i| i.name == "Box B").unwrap();
        assert!(box_b.valid);
        assert_eq!(box_b.quantity, 3);
        assert!(original.contains(&box_b.id));
    }

    #[tokio::test]
    async fn test_reconcile_matches_by_product_reference() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        // Seed a catalog product so the FK holds.
        let now = Utc::now();
        sqlx::query("INSERT INTO products (name, price_cents, created_at) VALUES (?1, ?2, ?3)")
            .bind("Caja madera")
            .bind(2500)
            .bind(now)
            .execute(db.pool())
            .await
            .unwrap();

        let catalog_item = OrderItemInput {
            product_id: Some(1),
            name: "Caja madera".to_string(),
            quantity: 1,
            unit_price: Money::from_cents(2500),
            is_manual: false,
        };
        let order_id = seed_order(&db, std::slice::from_ref(&catalog_item)).await;

        // Same product, renamed and repriced: must update, not insert.
        let renamed = OrderItemInput {
            name: "Caja de madera grande".to_string(),
            quantity: 4,
            unit_price: Money::from_cents(2600),
            ..catalog_item
        };
        reconcile(&db, order_id, &[renamed]).await;

        let items = db.orders().items_for_order(order_id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 4);
        assert_eq!(items[0].unit_price_cents, 2600);
        // Stored name is the original snapshot; matching was by reference.
        assert_eq!(items[0].name, "Caja madera");
    }

    #[tokio::test]
    async fn test_guarded_transition() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order_id = seed_order(&db, &[item("Box A", 1, 1000)]).await;

        let moved = db
            .orders()
            .transition(order_id, OrderStatus::Registered, OrderStatus::Packed)
            .await
            .unwrap();
        assert!(moved);

        // Second identical transition loses the guard.
        let moved_again = db
            .orders()
            .transition(order_id, OrderStatus::Registered, OrderStatus::Packed)
            .await
            .unwrap();
        assert!(!moved_again);

        let order = db.orders().get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Packed);
    }

    #[tokio::test]
    async fn test_apply_payment_guards_on_packed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order_id = seed_order(&db, &[item("Box A", 1, 1500)]).await;

        // Still REGISTERED: the payment guard must miss.
        let mut tx = db.pool().begin().await.unwrap();
        let paid = db
            .orders()
            .apply_payment(&mut tx, order_id, Money::from_cents(1500))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert!(!paid);

        db.orders()
            .transition(order_id, OrderStatus::Registered, OrderStatus::Packed)
            .await
            .unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let paid = db
            .orders()
            .apply_payment(&mut tx, order_id, Money::from_cents(1500))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert!(paid);

        let order = db.orders().get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.paid_cents, 1500);
    }

    #[tokio::test]
    async fn test_list_filters_by_status_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = seed_order(&db, &[item("Box A", 1, 1000)]).await;
        let second = seed_order(&db, &[item("Box B", 1, 2000)]).await;

        db.orders()
            .transition(first, OrderStatus::Registered, OrderStatus::Packed)
            .await
            .unwrap();

        let registered = db.orders().list(OrderStatus::Registered, 50, 0).await.unwrap();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].id, second);
        assert_eq!(registered[0].customer_name, "Ana Quispe");

        let packed = db.orders().list(OrderStatus::Packed, 50, 0).await.unwrap();
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].id, first);
    }
}
