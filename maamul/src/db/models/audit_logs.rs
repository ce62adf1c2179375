//! Audit trail of mutations and sign-ins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::models::pagination::Pagination;
use crate::types::{CompanyId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub user_id: Option<UserId>,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuditLogCreate {
    pub company_id: CompanyId,
    pub user_id: Option<UserId>,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogFilter {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub entity: Option<String>,
    pub user_id: Option<UserId>,
    pub action: Option<AuditAction>,
}
