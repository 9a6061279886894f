//! # Report Repository
//!
//! Read-only aggregate queries over the order book: status KPIs, top
//! products by moved quantity, and the filtered report listing.
//!
//! Reports never mutate state and only valid line items count toward
//! product rankings. Outstanding balances are floored at zero here; the
//! signed balance lives in the detail view.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::DbResult;
use pedidos_core::{AgencyType, OrderStatus};

/// Aggregate figures for one order status.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct StatusKpi {
    pub status: OrderStatus,
    pub orders: i64,
    pub paid_cents: i64,
}

/// One ranked product in the top-products report.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct TopProduct {
    pub name: String,
    pub total_quantity: i64,
    pub total_cents: i64,
}

/// One row of the filtered report listing.
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct ReportRow {
    pub id: i64,
    pub status: OrderStatus,
    pub agency_type: AgencyType,
    pub department: String,
    pub province: String,
    pub district: String,
    pub total_cents: i64,
    pub paid_cents: i64,
    /// Floored at zero: overpayments report as settled, not negative.
    pub pending_cents: i64,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
}

/// Filters accepted by [`ReportRepository::report_rows`]. All optional;
/// an empty filter returns the whole book.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub status: Option<OrderStatus>,
    pub agency_type: Option<AgencyType>,
    pub department: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// Repository for reporting queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Order count and collected amount per status.
    pub async fn kpis(&self) -> DbResult<Vec<StatusKpi>> {
        let rows = sqlx::query_as::<_, StatusKpi>(
            r#"
            SELECT status, COUNT(*) AS orders, COALESCE(SUM(paid_cents), 0) AS paid_cents
            FROM orders
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Products ranked by total quantity across valid line items. Manual
    /// items participate under their free-text name.
    pub async fn top_products(&self, limit: i64) -> DbResult<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                name,
                SUM(quantity) AS total_quantity,
                SUM(quantity * unit_price_cents) AS total_cents
            FROM order_items
            WHERE valid = 1
            GROUP BY name
            ORDER BY total_quantity DESC, name ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Filtered order listing for reports, newest first.
    pub async fn report_rows(&self, filter: &ReportFilter) -> DbResult<Vec<ReportRow>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT
                o.id, o.status, o.agency_type,
                o.department, o.province, o.district,
                o.total_cents, o.paid_cents,
                MAX(o.total_cents - o.paid_cents, 0) AS pending_cents,
                o.created_at,
                c.full_name AS customer_name
            FROM orders o
            JOIN customers c ON c.id = o.customer_id
            WHERE 1 = 1
            "#,
        );

        if let Some(status) = filter.status {
            qb.push(" AND o.status = ").push_bind(status);
        }
        if let Some(agency) = filter.agency_type {
            qb.push(" AND o.agency_type = ").push_bind(agency);
        }
        if let Some(department) = &filter.department {
            qb.push(" AND o.department = ").push_bind(department.trim().to_string());
        }
        if let Some(province) = &filter.province {
            qb.push(" AND o.province = ").push_bind(province.trim().to_string());
        }
        if let Some(district) = &filter.district {
            qb.push(" AND o.district = ").push_bind(district.trim().to_string());
        }
        if let Some(from) = filter.from {
            qb.push(" AND o.created_at >= ").push_bind(from);
        }
        if let Some(until) = filter.until {
            qb.push(" AND o.created_at <= ").push_bind(until);
        }

        qb.push(" ORDER BY o.created_at DESC, o.id DESC");

        let rows = qb.build_query_as::<ReportRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
