//! Company members: `/api/users`.
//!
//! Administrators and managers can browse members; only administrators add, change or remove
//! them. New users always join the administrator's company.

use axum::{
    Router,
    extract::{
        Json, Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    routing::get,
};

use crate::{
    AppState,
    api::{
        handlers::{
            audit_logs,
            tenant::{require_text, validate_email},
        },
        models::{
            pagination::PaginatedResponse,
            users::{ListUsersQuery, Role, UserCreate, UserResponse, UserUpdate},
        },
        response::ApiResponse,
    },
    auth::{
        password,
        permissions::{Admins, Authorized, Managers},
    },
    db::{
        handlers::UserRepository,
        models::{
            audit_logs::AuditAction,
            users::{UserCreateDBRequest, UserFilter, UserUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    types::UserId,
};

const ENTITY: &str = "users";

fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

/// `GET /api/users`
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Authorized(session, ..): Authorized<Managers>,
    query: std::result::Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<ApiResponse<PaginatedResponse<UserResponse>>> {
    let Query(query) = query?;
    let (skip, limit) = query.pagination.params();
    let filter = UserFilter {
        skip,
        limit,
        search: query.search.clone(),
        role: query.role,
    };
    let (users, total) = state.store.list_users(session.company_id, &filter).await?;
    Ok(ApiResponse::ok(
        "Users fetched",
        PaginatedResponse::new(users.into_iter().map(UserResponse::from).collect(), total, &query.pagination),
    ))
}

/// `GET /api/users/{id}`
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    Authorized(session, ..): Authorized<Managers>,
    path: std::result::Result<Path<UserId>, PathRejection>,
) -> Result<ApiResponse<UserResponse>> {
    let Path(id) = path?;
    let user = state
        .store
        .get_user(id)
        .await?
        .filter(|user| user.company_id == Some(session.company_id))
        .ok_or_else(|| user_not_found(id))?;
    Ok(ApiResponse::ok("User fetched", UserResponse::from(user)))
}

/// `POST /api/users`
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    Authorized(session, ..): Authorized<Admins>,
    body: std::result::Result<Json<UserCreate>, JsonRejection>,
) -> Result<ApiResponse<UserResponse>> {
    let Json(request) = body?;
    require_text(&request.name, "name")?;
    validate_email(&request.email)?;
    state.config.auth.password.check_length(&request.password)?;

    let password_hash = password::hash_password(request.password, state.config.auth.password.argon2_params()).await?;
    let user = state
        .store
        .create_user(&UserCreateDBRequest {
            company_id: Some(session.company_id),
            email: request.email,
            name: request.name.trim().to_string(),
            role: request.role,
            password_hash: Some(password_hash),
        })
        .await?;

    audit_logs::record(
        &state,
        session.company_id,
        Some(session.user_id),
        AuditAction::Create,
        ENTITY,
        Some(user.id),
        Some(serde_json::json!({ "email": user.email, "role": user.role })),
    )
    .await;

    Ok(ApiResponse::created("User created", UserResponse::from(user)))
}

/// `PATCH /api/users/{id}`
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    Authorized(session, ..): Authorized<Admins>,
    path: std::result::Result<Path<UserId>, PathRejection>,
    body: std::result::Result<Json<UserUpdate>, JsonRejection>,
) -> Result<ApiResponse<UserResponse>> {
    let Path(id) = path?;
    let Json(request) = body?;
    if let Some(name) = &request.name {
        require_text(name, "name")?;
    }
    if id == session.user_id && request.role.is_some_and(|role| role != Role::Admin) {
        return Err(Error::BadRequest {
            message: "You cannot remove your own administrator role".to_string(),
        });
    }

    let update = UserUpdateDBRequest {
        name: request.name.as_ref().map(|name| name.trim().to_string()),
        role: request.role,
    };
    let user = state
        .store
        .update_user(session.company_id, id, &update)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    audit_logs::record(
        &state,
        session.company_id,
        Some(session.user_id),
        AuditAction::Update,
        ENTITY,
        Some(id),
        serde_json::to_value(&request).ok(),
    )
    .await;

    Ok(ApiResponse::ok("User updated", UserResponse::from(user)))
}

/// `DELETE /api/users/{id}`
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    Authorized(session, ..): Authorized<Admins>,
    path: std::result::Result<Path<UserId>, PathRejection>,
) -> Result<ApiResponse<()>> {
    let Path(id) = path?;
    if id == session.user_id {
        return Err(Error::BadRequest {
            message: "You cannot delete your own account".to_string(),
        });
    }
    if !state.store.delete_user(session.company_id, id).await? {
        return Err(user_not_found(id));
    }

    audit_logs::record(
        &state,
        session.company_id,
        Some(session.user_id),
        AuditAction::Delete,
        ENTITY,
        Some(id),
        None,
    )
    .await;

    Ok(ApiResponse::message("User deleted"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", get(get_user).patch(update_user).delete(delete_user))
}
