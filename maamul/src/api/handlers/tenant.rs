//! Generic CRUD over company-owned resources.
//!
//! Every tenant resource gets the same five routes under its base path:
//!
//! | Method | Path | Gate |
//! | --- | --- | --- |
//! | GET | `{base}` | any member |
//! | POST | `{base}` | [`TenantResource::CREATE_ROLES`] |
//! | GET | `{base}/{id}` | any member |
//! | PATCH | `{base}/{id}` | [`TenantResource::UPDATE_ROLES`] |
//! | DELETE | `{base}/{id}` | [`TenantResource::DELETE_ROLES`] |
//!
//! Each handler resolves the session's company and performs exactly one storage operation
//! scoped to it. Ids owned by another company produce the same 404 as ids that do not exist.

use axum::{
    Router,
    extract::{
        Json, Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    routing::get,
};
use uuid::Uuid;

use crate::{
    AppState,
    api::{
        handlers::audit_logs,
        models::{pagination::PaginatedResponse, users::Role},
        response::ApiResponse,
    },
    auth::{
        current_user::TenantSession,
        permissions::{ADMINS, MANAGERS},
    },
    db::{
        handlers::{Store, TenantRepository},
        models::{ListFilter, TenantScoped, audit_logs::AuditAction},
    },
    errors::{Error, Result},
    types::Operation,
};

/// HTTP surface of a [`TenantScoped`] record.
pub trait TenantResource: TenantScoped {
    const BASE_PATH: &'static str;

    const CREATE_ROLES: &'static [Role] = MANAGERS;
    const UPDATE_ROLES: &'static [Role] = MANAGERS;
    const DELETE_ROLES: &'static [Role] = ADMINS;

    /// Business rules on a create payload, checked before touching storage
    fn validate_create(_request: &Self::Create) -> Result<()> {
        Ok(())
    }

    fn validate_update(_request: &Self::Update) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn bad_request(message: impl Into<String>) -> Error {
    Error::BadRequest { message: message.into() }
}

/// Reject empty or whitespace-only text.
pub(crate) fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(bad_request(format!("{field} is required")));
    }
    Ok(())
}

/// Require a `local@domain.tld` shaped address.
pub(crate) fn validate_email(email: &str) -> Result<()> {
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(bad_request("A valid email address is required")),
    }
}

fn not_found<T: TenantResource>(id: Uuid) -> Error {
    Error::NotFound {
        resource: T::RESOURCE.to_string(),
        id: id.to_string(),
    }
}

#[tracing::instrument(skip_all, fields(resource = T::TABLE))]
pub async fn list<T>(
    State(state): State<AppState>,
    session: TenantSession,
    query: std::result::Result<Query<T::Filter>, QueryRejection>,
) -> Result<ApiResponse<PaginatedResponse<T>>>
where
    T: TenantResource,
    dyn Store: TenantRepository<T>,
{
    let Query(filter) = query?;
    let (items, total) = TenantRepository::<T>::list(state.store.as_ref(), session.company_id, &filter).await?;
    Ok(ApiResponse::ok(
        format!("{} list fetched", T::RESOURCE),
        PaginatedResponse::new(items, total, filter.pagination()),
    ))
}

#[tracing::instrument(skip_all, fields(resource = T::TABLE))]
pub async fn get_one<T>(
    State(state): State<AppState>,
    session: TenantSession,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<T>>
where
    T: TenantResource,
    dyn Store: TenantRepository<T>,
{
    let Path(id) = path?;
    let item = TenantRepository::<T>::get(state.store.as_ref(), session.company_id, id)
        .await?
        .ok_or_else(|| not_found::<T>(id))?;
    Ok(ApiResponse::ok(format!("{} fetched", T::RESOURCE), item))
}

#[tracing::instrument(skip_all, fields(resource = T::TABLE))]
pub async fn create<T>(
    State(state): State<AppState>,
    session: TenantSession,
    body: std::result::Result<Json<T::Create>, JsonRejection>,
) -> Result<ApiResponse<T>>
where
    T: TenantResource,
    dyn Store: TenantRepository<T>,
{
    session.require_role(T::CREATE_ROLES, Operation::Create, T::TABLE)?;
    let Json(request) = body?;
    T::validate_create(&request)?;

    let item = TenantRepository::<T>::create(state.store.as_ref(), session.company_id, &request).await?;

    audit_logs::record(
        &state,
        session.company_id,
        Some(session.user_id),
        AuditAction::Create,
        T::TABLE,
        Some(item.id()),
        serde_json::to_value(&request).ok(),
    )
    .await;

    Ok(ApiResponse::created(format!("{} created", T::RESOURCE), item))
}

#[tracing::instrument(skip_all, fields(resource = T::TABLE))]
pub async fn update<T>(
    State(state): State<AppState>,
    session: TenantSession,
    path: std::result::Result<Path<Uuid>, PathRejection>,
    body: std::result::Result<Json<T::Update>, JsonRejection>,
) -> Result<ApiResponse<T>>
where
    T: TenantResource,
    dyn Store: TenantRepository<T>,
{
    session.require_role(T::UPDATE_ROLES, Operation::Update, T::TABLE)?;
    let Path(id) = path?;
    let Json(request) = body?;
    T::validate_update(&request)?;

    let item = TenantRepository::<T>::update(state.store.as_ref(), session.company_id, id, &request)
        .await?
        .ok_or_else(|| not_found::<T>(id))?;

    audit_logs::record(
        &state,
        session.company_id,
        Some(session.user_id),
        AuditAction::Update,
        T::TABLE,
        Some(id),
        serde_json::to_value(&request).ok(),
    )
    .await;

    Ok(ApiResponse::ok(format!("{} updated", T::RESOURCE), item))
}

#[tracing::instrument(skip_all, fields(resource = T::TABLE))]
pub async fn delete<T>(
    State(state): State<AppState>,
    session: TenantSession,
    path: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<ApiResponse<()>>
where
    T: TenantResource,
    dyn Store: TenantRepository<T>,
{
    session.require_role(T::DELETE_ROLES, Operation::Delete, T::TABLE)?;
    let Path(id) = path?;

    if !TenantRepository::<T>::delete(state.store.as_ref(), session.company_id, id).await? {
        return Err(not_found::<T>(id));
    }

    audit_logs::record(
        &state,
        session.company_id,
        Some(session.user_id),
        AuditAction::Delete,
        T::TABLE,
        Some(id),
        None,
    )
    .await;

    Ok(ApiResponse::message(format!("{} deleted", T::RESOURCE)))
}

/// The five CRUD routes for `T` under [`TenantResource::BASE_PATH`].
pub fn routes<T>() -> Router<AppState>
where
    T: TenantResource,
    dyn Store: TenantRepository<T>,
{
    Router::new()
        .route(T::BASE_PATH, get(list::<T>).post(create::<T>))
        .route(
            &format!("{}/{{id}}", T::BASE_PATH),
            get(get_one::<T>).patch(update::<T>).delete(delete::<T>),
        )
}
