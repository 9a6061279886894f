//! # Audit Repository
//!
//! Append-only trail of order lifecycle events. Rows are never updated or
//! deleted; `list_for_order` returns them newest first for the detail view.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use pedidos_core::AuditEvent;

/// Repository for audit trail operations.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends one event. Callers decide what to do when this fails; the
    /// lifecycle service logs and carries on.
    pub async fn record(
        &self,
        order_id: i64,
        user_id: Option<&str>,
        kind: &str,
        note: Option<&str>,
    ) -> DbResult<i64> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (order_id, user_id, kind, note, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(order_id)
        .bind(user_id)
        .bind(kind)
        .bind(note)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(order_id, kind, "Recorded audit event");
        Ok(id)
    }

    /// Full trail for an order, newest first.
    pub async fn list_for_order(&self, order_id: i64) -> DbResult<Vec<AuditEvent>> {
        let events = sqlx::query_as::<_, AuditEvent>(
            r#"
            SELECT id, order_id, user_id, kind, note, created_at
            FROM audit_log
            WHERE order_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use pedidos_core::finance::compute_totals;
    use pedidos_core::{
        AgencyType, AuditKind, Destination, DocumentType, Money, OrderItemInput,
    };

    async fn seed_order(db: &Database) -> i64 {
        let customer = db
            .customers()
            .resolve(DocumentType::Dni, "87654321", "Luis Rojas", None)
            .await
            .unwrap();

        let items = [OrderItemInput {
            product_id: None,
            name: "Box A".to_string(),
            quantity: 1,
            unit_price: Money::from_cents(1000),
            is_manual: true,
        }];
        let destination = Destination {
            agency_type: AgencyType::Olva,
            agency_name: None,
            address: Some("Av. Arequipa 123".to_string()),
            department: "LIMA".to_string(),
            province: "LIMA".to_string(),
            district: "LINCE".to_string(),
        };

        let totals = compute_totals(&items, None);
        let mut tx = db.pool().begin().await.unwrap();
        let id = db
            .orders()
            .insert_order(&mut tx, customer.id, &destination, totals, Money::zero())
            .await
            .unwrap();
        db.orders().insert_items(&mut tx, id, &items).await.unwrap();
        tx.commit().await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_record_and_list_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order_id = seed_order(&db).await;

        db.audit()
            .record(order_id, None, AuditKind::Registered.label(), None)
            .await
            .unwrap();
        db.audit()
            .record(order_id, None, AuditKind::Packed.label(), None)
            .await
            .unwrap();
        db.audit()
            .record(order_id, None, AuditKind::Cancelled.label(), Some("cliente desistió"))
            .await
            .unwrap();

        let trail = db.audit().list_for_order(order_id).await.unwrap();
        assert_eq!(trail.len(), 3);
        assert_eq!(trail[0].kind, "CANCELACION");
        assert_eq!(trail[0].note.as_deref(), Some("cliente desistió"));
        assert_eq!(trail[2].kind, "REGISTRADO");
    }

    #[tokio::test]
    async fn test_record_without_actor() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let order_id = seed_order(&db).await;

        db.audit()
            .record(order_id, None, AuditKind::Registered.label(), None)
            .await
            .unwrap();

        let trail = db.audit().list_for_order(order_id).await.unwrap();
        assert_eq!(trail[0].user_id, None);
    }
}
