//! Authentication endpoints: registration, login, logout, current user, password change.

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    routing::{get, post},
};
use tracing::{info, instrument};

use crate::{
    AppState,
    api::{
        handlers::{
            audit_logs,
            tenant::{require_text, validate_email},
        },
        models::{
            auth::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, WithSessionCookie},
            users::{Role, UserResponse},
        },
        response::ApiResponse,
    },
    auth::{
        current_user::{ClientIp, CurrentSession},
        password, session,
    },
    db::{
        handlers::{CompanyRepository, UserRepository},
        models::{
            audit_logs::AuditAction,
            companies::CompanyCreate,
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    errors::{Error, Result},
    types::abbrev_uuid,
};

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

/// Issue a session for `user` and build the `{ user, company }` payload.
async fn start_session(state: &AppState, user: UserDBResponse) -> Result<(String, AuthResponse)> {
    let current = CurrentSession {
        id: user.id,
        company_id: user.company_id,
        role: user.role,
        email: user.email.clone(),
    };
    let token = session::create_session_token(&current, &state.config)?;
    let company = match user.company_id {
        Some(company_id) => state.store.get_company(company_id).await?,
        None => None,
    };
    Ok((
        session::session_cookie(&token, &state.config),
        AuthResponse {
            user: UserResponse::from(user),
            company,
        },
    ))
}

/// `POST /api/auth/register`: create a company and its administrator, then sign in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<WithSessionCookie<AuthResponse>> {
    if !state.config.auth.allow_registration {
        return Err(Error::BadRequest {
            message: "Registration is disabled".to_string(),
        });
    }
    let Json(request) = body?;
    require_text(&request.company_name, "company_name")?;
    require_text(&request.name, "name")?;
    validate_email(&request.email)?;
    state.config.auth.password.check_length(&request.password)?;

    let password_hash =
        password::hash_password(request.password.clone(), state.config.auth.password.argon2_params()).await?;

    let company = CompanyCreate {
        name: request.company_name.trim().to_string(),
        phone: request.company_phone,
        address: request.company_address,
    };
    let admin = UserCreateDBRequest {
        company_id: None,
        email: request.email,
        name: request.name.trim().to_string(),
        role: Role::Admin,
        password_hash: Some(password_hash),
    };
    let (company, user) = state.store.create_company_with_admin(&company, &admin).await?;
    info!(company_id = %abbrev_uuid(&company.id), "Registered company '{}'", company.name);
    metrics::counter!("maamul_registrations_total").increment(1);

    audit_logs::record(
        &state,
        company.id,
        Some(user.id),
        AuditAction::Create,
        "companies",
        Some(company.id),
        None,
    )
    .await;

    let (cookie, payload) = start_session(&state, user).await?;
    Ok(WithSessionCookie {
        cookie,
        response: ApiResponse::created("Registration successful", payload),
    })
}

/// `POST /api/auth/login`
///
/// Every attempt counts towards the per-address limit, including successful ones.
#[instrument(skip_all, fields(client_ip = %client_ip.0))]
pub async fn login(
    State(state): State<AppState>,
    client_ip: ClientIp,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<WithSessionCookie<AuthResponse>> {
    if let Some(limiter) = &state.limiters.login {
        limiter.check(&client_ip.0)?;
    }
    let Json(request) = body?;

    let user = state
        .store
        .get_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid_credentials)?;
    let hash = user.password_hash.clone().ok_or_else(invalid_credentials)?;

    if !password::verify_password(request.password, hash).await? {
        metrics::counter!("maamul_logins_total", "outcome" => "failure").increment(1);
        return Err(invalid_credentials());
    }
    metrics::counter!("maamul_logins_total", "outcome" => "success").increment(1);

    state.store.record_login(user.id).await?;
    if let Some(company_id) = user.company_id {
        audit_logs::record(
            &state,
            company_id,
            Some(user.id),
            AuditAction::Login,
            "users",
            Some(user.id),
            Some(serde_json::json!({ "ip": client_ip.0 })),
        )
        .await;
    }

    let (cookie, payload) = start_session(&state, user).await?;
    Ok(WithSessionCookie {
        cookie,
        response: ApiResponse::ok("Login successful", payload),
    })
}

/// `POST /api/auth/logout`
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> WithSessionCookie<()> {
    WithSessionCookie {
        cookie: session::clear_session_cookie(&state.config),
        response: ApiResponse::message("Logged out"),
    }
}

/// `GET /api/auth/me`
#[instrument(skip_all)]
pub async fn me(State(state): State<AppState>, current: CurrentSession) -> Result<ApiResponse<AuthResponse>> {
    let user = state
        .store
        .get_user(current.id)
        .await?
        .ok_or(Error::Unauthenticated { message: None })?;
    let company = match user.company_id {
        Some(company_id) => state.store.get_company(company_id).await?,
        None => None,
    };
    Ok(ApiResponse::ok(
        "Current user fetched",
        AuthResponse {
            user: UserResponse::from(user),
            company,
        },
    ))
}

/// `POST /api/auth/password`: change the caller's own password.
#[instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentSession,
    body: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<ApiResponse<()>> {
    let Json(request) = body?;
    state.config.auth.password.check_length(&request.new_password)?;

    let user = state
        .store
        .get_user(current.id)
        .await?
        .ok_or(Error::Unauthenticated { message: None })?;
    let current_hash = user.password_hash.ok_or_else(|| Error::BadRequest {
        message: "No password is set for this account".to_string(),
    })?;
    if !password::verify_password(request.current_password, current_hash).await? {
        return Err(Error::Unauthenticated {
            message: Some("Current password is incorrect".to_string()),
        });
    }

    let new_hash =
        password::hash_password(request.new_password, state.config.auth.password.argon2_params()).await?;
    state.store.set_password_hash(user.id, &new_hash).await?;
    info!(user_id = %abbrev_uuid(&user.id), "Password changed");

    Ok(ApiResponse::message("Password changed"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/password", post(change_password))
}
