//! Database repository for the audit trail.

use sqlx::{Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    PgStore,
    errors::Result,
    handlers::{fetch_page, repository::AuditLogRepository},
    models::audit_logs::{AuditLog, AuditLogCreate, AuditLogFilter},
};
use crate::types::{CompanyId, abbrev_uuid};

fn push_filters(query: &mut QueryBuilder<'static, Postgres>, company_id: CompanyId, filter: &AuditLogFilter) {
    query.push(" WHERE company_id = ").push_bind(company_id);
    if let Some(entity) = &filter.entity {
        query.push(" AND entity = ").push_bind(entity.clone());
    }
    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(action) = filter.action {
        query.push(" AND action = ").push_bind(action);
    }
}

#[async_trait::async_trait]
impl AuditLogRepository for PgStore {
    #[instrument(skip(self, entry), fields(company_id = %abbrev_uuid(&entry.company_id), entity = %entry.entity), err)]
    async fn record_audit(&self, entry: &AuditLogCreate) -> Result<AuditLog> {
        let log = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (id, company_id, user_id, action, entity, entity_id, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.company_id)
        .bind(entry.user_id)
        .bind(entry.action)
        .bind(&entry.entity)
        .bind(entry.entity_id)
        .bind(&entry.details)
        .fetch_one(self.pool())
        .await?;
        Ok(log)
    }

    #[instrument(skip(self, filter), fields(company_id = %abbrev_uuid(&company_id)), err)]
    async fn list_audit_logs(&self, company_id: CompanyId, filter: &AuditLogFilter) -> Result<(Vec<AuditLog>, i64)> {
        fetch_page(self.pool(), "audit_logs", &filter.pagination, |query| {
            push_filters(query, company_id, filter)
        })
        .await
    }
}
