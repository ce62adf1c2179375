//! Audit trail: recording entries and listing them for administrators.

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::get,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    AppState,
    api::{models::pagination::PaginatedResponse, response::ApiResponse},
    auth::permissions::{Admins, Authorized},
    db::{
        handlers::AuditLogRepository,
        models::audit_logs::{AuditAction, AuditLog, AuditLogCreate, AuditLogFilter},
    },
    errors::Result,
    types::{CompanyId, UserId},
};

/// Write an audit entry. Failures are logged and swallowed so they never fail the request
/// that triggered them.
pub async fn record(
    state: &AppState,
    company_id: CompanyId,
    user_id: Option<UserId>,
    action: AuditAction,
    entity: &str,
    entity_id: Option<Uuid>,
    details: Option<serde_json::Value>,
) {
    let entry = AuditLogCreate {
        company_id,
        user_id,
        action,
        entity: entity.to_string(),
        entity_id,
        details,
    };
    if let Err(e) = state.store.record_audit(&entry).await {
        warn!(entity, ?action, "Failed to write audit log entry: {e:#}");
    }
}

/// `GET /api/audit-logs`, newest first
#[tracing::instrument(skip_all)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Authorized(session, ..): Authorized<Admins>,
    query: std::result::Result<Query<AuditLogFilter>, QueryRejection>,
) -> Result<ApiResponse<PaginatedResponse<AuditLog>>> {
    let Query(filter) = query?;
    let (items, total) = state.store.list_audit_logs(session.company_id, &filter).await?;
    Ok(ApiResponse::ok(
        "Audit logs fetched",
        PaginatedResponse::new(items, total, &filter.pagination),
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/audit-logs", get(list_audit_logs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::test_utils::{auth_cookie, create_test_app, create_test_company, create_test_user};
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    #[test_log::test(tokio::test)]
    async fn test_mutations_are_audited_per_company() {
        let (server, state) = create_test_app().await;
        let acme = create_test_company(&state, "Acme").await;
        let globex = create_test_company(&state, "Globex").await;
        let acme_admin = create_test_user(&state, Some(acme.id), Role::Admin).await;
        let globex_admin = create_test_user(&state, Some(globex.id), Role::Admin).await;

        let (name, value) = auth_cookie(&state, &acme_admin);
        server
            .post("/api/shop/vendors")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Steel Co"}))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .get("/api/audit-logs?entity=shop_vendors")
            .add_header(name, value)
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"]["total_count"], 1);
        assert_eq!(body["data"]["items"][0]["action"], "CREATE");
        assert_eq!(body["data"]["items"][0]["user_id"], json!(acme_admin.id));

        let (name, value) = auth_cookie(&state, &globex_admin);
        let response = server.get("/api/audit-logs").add_header(name, value).await;
        let body: Value = response.json();
        assert_eq!(body["data"]["total_count"], 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_audit_logs_are_admin_only() {
        let (server, state) = create_test_app().await;
        let company = create_test_company(&state, "Acme").await;
        let manager = create_test_user(&state, Some(company.id), Role::Manager).await;

        let (name, value) = auth_cookie(&state, &manager);
        let response = server.get("/api/audit-logs").add_header(name, value).await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }
}
