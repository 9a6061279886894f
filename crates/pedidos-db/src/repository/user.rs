//! # User Repository
//!
//! Operator lookup for audit attribution. Actor references arrive either as
//! an opaque id or as a username handle; both resolve through here.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;
use pedidos_core::User;

/// Repository for user operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a user by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, role, created_at FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by username.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, role, created_at FROM users WHERE username = ?1",
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Inserts an operator with a generated id.
    pub async fn insert(&self, username: &str, role: &str) -> DbResult<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query("INSERT INTO users (id, username, role, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&id)
            .bind(username.trim())
            .bind(role)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(User {
            id,
            username: username.trim().to_string(),
            role: role.to_string(),
            created_at: now,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
