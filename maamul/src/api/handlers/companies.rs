//! The caller's company: `/api/company`.

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    routing::get,
};

use crate::{
    AppState,
    api::{
        handlers::{audit_logs, tenant::require_text},
        response::ApiResponse,
    },
    auth::permissions::{Admins, Authorized, Members},
    db::{
        handlers::CompanyRepository,
        models::{
            audit_logs::AuditAction,
            companies::{Company, CompanyUpdate},
        },
    },
    errors::{Error, Result},
    types::CompanyId,
};

fn company_not_found(id: CompanyId) -> Error {
    Error::NotFound {
        resource: "Company".to_string(),
        id: id.to_string(),
    }
}

/// `GET /api/company`
#[tracing::instrument(skip_all)]
pub async fn get_company(
    State(state): State<AppState>,
    Authorized(session, ..): Authorized<Members>,
) -> Result<ApiResponse<Company>> {
    let company = state
        .store
        .get_company(session.company_id)
        .await?
        .ok_or_else(|| company_not_found(session.company_id))?;
    Ok(ApiResponse::ok("Company fetched", company))
}

/// `PATCH /api/company`
#[tracing::instrument(skip_all)]
pub async fn update_company(
    State(state): State<AppState>,
    Authorized(session, ..): Authorized<Admins>,
    body: std::result::Result<Json<CompanyUpdate>, JsonRejection>,
) -> Result<ApiResponse<Company>> {
    let Json(request) = body?;
    if let Some(name) = &request.name {
        require_text(name, "name")?;
    }

    let company = state
        .store
        .update_company(session.company_id, &request)
        .await?
        .ok_or_else(|| company_not_found(session.company_id))?;

    audit_logs::record(
        &state,
        session.company_id,
        Some(session.user_id),
        AuditAction::Update,
        "companies",
        Some(company.id),
        serde_json::to_value(&request).ok(),
    )
    .await;

    Ok(ApiResponse::ok("Company updated", company))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/company", get(get_company).patch(update_company))
}
