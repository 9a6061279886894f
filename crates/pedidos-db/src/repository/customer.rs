//! # Customer Repository
//!
//! The customer directory: resolves a (document type, document number) pair
//! to a unique customer row.
//!
//! ## Resolve Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  resolve(doc_type, doc_number, name, phone)                         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SELECT by (doc_type, doc_number)                                   │
//! │       │                                                             │
//! │       ├── found ──► update only divergent fields ──► Customer       │
//! │       │             (identical resubmission is a no-op)             │
//! │       │                                                             │
//! │       └── absent ──► INSERT                                         │
//! │                        │                                            │
//! │                        ├── ok ──► Customer                          │
//! │                        │                                            │
//! │                        └── UNIQUE violation (lost a race)           │
//! │                              │                                      │
//! │                              ▼                                      │
//! │                            re-SELECT ──► update-if-divergent        │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concurrent first-time creation of the same customer is resolved through
//! the UNIQUE constraint, not locking: creation conflicts are rare and the
//! compensating re-read is cheap. The violation never reaches the caller.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use pedidos_core::{Customer, DocumentType};

/// Repository for customer directory operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, doc_type, doc_number, full_name, phone, created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Finds a customer by the unique (doc_type, doc_number) pair.
    pub async fn find_by_document(
        &self,
        doc_type: DocumentType,
        doc_number: &str,
    ) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, doc_type, doc_number, full_name, phone, created_at, updated_at
            FROM customers
            WHERE doc_type = ?1 AND doc_number = ?2
            "#,
        )
        .bind(doc_type)
        .bind(doc_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Resolves a customer: create on first sight, update only divergent
    /// fields, no-op when nothing changed. Safe under concurrent first-time
    /// creation of the same pair (see the module docs).
    ///
    /// Input is expected to be validated and trimmed by the caller.
    pub async fn resolve(
        &self,
        doc_type: DocumentType,
        doc_number: &str,
        full_name: &str,
        phone: Option<&str>,
    ) -> DbResult<Customer> {
        if let Some(existing) = self.find_by_document(doc_type, doc_number).await? {
            return self.update_if_divergent(existing, full_name, phone).await;
        }

        match self.insert(doc_type, doc_number, full_name, phone).await {
            Ok(created) => Ok(created),
            // Lost a creation race: the row exists now. Re-fetch and fall
            // through to the divergence check instead of surfacing the
            // violation.
            Err(err) if err.is_unique_violation() => {
                debug!(doc_number, "customer insert lost uniqueness race, re-fetching");
                let existing = self
                    .find_by_document(doc_type, doc_number)
                    .await?
                    .ok_or_else(|| {
                        DbError::Internal(
                            "uniqueness violation reported but row not visible".to_string(),
                        )
                    })?;
                self.update_if_divergent(existing, full_name, phone).await
            }
            Err(err) => Err(err),
        }
    }

    async fn insert(
        &self,
        doc_type: DocumentType,
        doc_number: &str,
        full_name: &str,
        phone: Option<&str>,
    ) -> DbResult<Customer> {
        debug!(%doc_type, doc_number, "Inserting customer");
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO customers (doc_type, doc_number, full_name, phone, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(doc_type)
        .bind(doc_number)
        .bind(full_name)
        .bind(phone)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Customer {
            id: result.last_insert_rowid(),
            doc_type,
            doc_number: doc_number.to_string(),
            full_name: full_name.to_string(),
            phone: phone.map(String::from),
            created_at: now,
            updated_at: now,
        })
    }

    /// Updates name/phone only when they differ from the stored row.
    /// Identical resubmission returns the stored row untouched.
    async fn update_if_divergent(
        &self,
        existing: Customer,
        full_name: &str,
        phone: Option<&str>,
    ) -> DbResult<Customer> {
        let same_name = existing.full_name.trim() == full_name;
        let same_phone = existing.phone.as_deref() == phone;

        if same_name && same_phone {
            return Ok(existing);
        }

        debug!(customer_id = existing.id, "Customer contact details diverged, updating");
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE customers
            SET full_name = ?2, phone = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(existing.id)
        .bind(full_name)
        .bind(phone)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Customer {
            full_name: full_name.to_string(),
            phone: phone.map(String::from),
            updated_at: now,
            ..existing
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use pedidos_core::DocumentType;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_resolve_creates_on_first_sight() {
        let db = test_db().await;
        let repo = db.customers();

        let c = repo
            .resolve(DocumentType::Dni, "12345678", "Ana Quispe", Some("+51987654321"))
            .await
            .unwrap();

        assert_eq!(c.doc_number, "12345678");
        assert_eq!(c.full_name, "Ana Quispe");
        assert_eq!(c.phone.as_deref(), Some("+51987654321"));
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let db = test_db().await;
        let repo = db.customers();

        let first = repo
            .resolve(DocumentType::Dni, "12345678", "Ana Quispe", None)
            .await
            .unwrap();
        let second = repo
            .resolve(DocumentType::Dni, "12345678", "Ana Quispe", None)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.updated_at, second.updated_at); // no mutation

        // Still exactly one row.
        let found = repo
            .find_by_document(DocumentType::Dni, "12345678")
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_resolve_updates_only_divergent_fields() {
        let db = test_db().await;
        let repo = db.customers();

        let first = repo
            .resolve(DocumentType::Ce, "CE001", "Ana Quispe", None)
            .await
            .unwrap();
        let updated = repo
            .resolve(DocumentType::Ce, "CE001", "Ana Quispe Mamani", Some("+51911223344"))
            .await
            .unwrap();

        assert_eq!(updated.id, first.id);
        assert_eq!(updated.full_name, "Ana Quispe Mamani");
        assert_eq!(updated.phone.as_deref(), Some("+51911223344"));

        let stored = repo.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(stored.full_name, "Ana Quispe Mamani");
    }

    #[tokio::test]
    async fn test_resolve_recovers_from_lost_insert_race() {
        let db = test_db().await;
        let repo = db.customers();

        // Simulate the race: the row appears between the existence check and
        // the insert. Driving insert() directly reproduces the second half.
        repo.resolve(DocumentType::Dni, "87654321", "Jose Flores", None)
            .await
            .unwrap();

        let err = repo
            .insert(DocumentType::Dni, "87654321", "Jose Flores", None)
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());

        // resolve() must swallow that violation and return the single row.
        let recovered = repo
            .resolve(DocumentType::Dni, "87654321", "Jose Flores", Some("+51900000000"))
            .await
            .unwrap();
        assert_eq!(recovered.phone.as_deref(), Some("+51900000000"));
    }

    #[tokio::test]
    async fn test_distinct_doc_types_are_distinct_customers() {
        let db = test_db().await;
        let repo = db.customers();

        let a = repo
            .resolve(DocumentType::Dni, "11112222", "Uno", None)
            .await
            .unwrap();
        let b = repo
            .resolve(DocumentType::Other, "11112222", "Dos", None)
            .await
            .unwrap();

        assert_ne!(a.id, b.id);
    }
}
