//! Repository implementations for database access.
//!
//! [`repository`] defines the storage traits. Each remaining file implements them for one
//! table, twice: against PostgreSQL on [`PgStore`](crate::db::PgStore) and as a
//! [`MemoryRecord`](crate::db::memory::MemoryRecord) for the in-memory backend. Keeping both
//! next to each other makes it easy to see that they enforce the same rules.
//!
//! # Available Repositories
//!
//! - [`accounts`], [`transactions`]: Accounting, with balances kept in step with transactions
//! - [`boms`], [`purchases`]: Manufacturing
//! - [`vendors`]: Shop vendors
//! - [`projects`]: Projects
//! - [`telegram`]: Telegram chat links
//! - [`users`], [`companies`]: Tenants and their members
//! - [`audit_logs`]: Audit trail
//! - [`reports`]: Cross-table read models
//!
//! # Usage
//!
//! ```ignore
//! use maamul::db::handlers::{Store, TenantRepository};
//!
//! async fn example(store: &dyn Store, company_id: CompanyId, filter: &AccountFilter) -> Result<()> {
//!     let (accounts, total) = TenantRepository::<Account>::list(store, company_id, filter).await?;
//!     Ok(())
//! }
//! ```

use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, postgres::PgRow};

use crate::api::models::pagination::Pagination;
use crate::db::errors::Result;

pub mod accounts;
pub mod audit_logs;
pub mod boms;
pub mod companies;
pub mod projects;
pub mod purchases;
pub mod reports;
pub mod repository;
pub mod telegram;
pub mod transactions;
pub mod users;
pub mod vendors;

pub use repository::{AuditLogRepository, CompanyRepository, ReportRepository, Store, TenantRepository, UserRepository};

/// Run a filtered, paginated listing: a COUNT over the whole filter, then one page of rows,
/// newest first.
///
/// `push_filters` appends the WHERE clause and is called once per query.
pub(crate) async fn fetch_page<T, F>(
    pool: &PgPool,
    table: &str,
    pagination: &Pagination,
    push_filters: F,
) -> Result<(Vec<T>, i64)>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    F: Fn(&mut QueryBuilder<'static, Postgres>),
{
    let mut count = QueryBuilder::new(format!("SELECT COUNT(*) FROM {table}"));
    push_filters(&mut count);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let (skip, limit) = pagination.params();
    let mut query = QueryBuilder::new(format!("SELECT * FROM {table}"));
    push_filters(&mut query);
    query
        .push(" ORDER BY created_at DESC, id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(skip);
    let rows = query.build_query_as::<T>().fetch_all(pool).await?;

    Ok((rows, total))
}
