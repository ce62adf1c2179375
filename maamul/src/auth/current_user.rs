//! Request extractors that resolve who is calling.
//!
//! - [`CurrentSession`]: any signed-in user (cookie or `Authorization: Bearer <session token>`)
//! - [`TenantSession`]: a signed-in user that belongs to a company; everything tenant-scoped
//!   hangs off this
//! - [`ClientIp`]: best-effort client address, used as the login rate-limit key

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::{
    AppState,
    api::models::users::Role,
    auth::{permissions, session},
    config::Config,
    db::handlers::UserRepository,
    errors::{Error, Result},
    types::{CompanyId, Operation, UserId, abbrev_uuid},
};

/// An authenticated user, whatever their tenancy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentSession {
    pub id: UserId,
    pub company_id: Option<CompanyId>,
    pub role: Role,
    pub email: String,
}

/// An authenticated user acting inside their company. Every tenant-scoped query is filtered by
/// `company_id`.
#[derive(Debug, Clone)]
pub struct TenantSession {
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub role: Role,
    pub email: String,
}

impl TenantSession {
    /// Reject with 403 unless the session's role is one of `allowed`.
    pub fn require_role(&self, allowed: &[Role], action: Operation, resource: &str) -> Result<()> {
        if permissions::role_allowed(self.role, allowed) {
            Ok(())
        } else {
            Err(Error::InsufficientPermissions {
                action,
                resource: resource.to_string(),
            })
        }
    }
}

impl TryFrom<CurrentSession> for TenantSession {
    type Error = Error;

    fn try_from(session: CurrentSession) -> Result<Self> {
        let company_id = session.company_id.ok_or_else(|| Error::Unauthenticated {
            message: Some("Unauthorized".to_string()),
        })?;
        Ok(Self {
            user_id: session.id,
            company_id,
            role: session.role,
            email: session.email,
        })
    }
}

/// Extract session from the JWT session cookie if present and valid
/// Returns:
/// - None: No usable session cookie present
/// - Some(Ok(session)): Valid JWT found and verified
/// - Some(Err(error)): Cookie header present but unreadable
fn try_cookie_session(parts: &Parts, config: &Config) -> Option<Result<CurrentSession>> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };
    let cookie_name = &config.auth.session.cookie_name;

    for cookie in cookie_str.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=')
            && name == cookie_name
        {
            // Expired or tampered cookies are expected; keep looking rather than failing
            match session::verify_session_token(value, config) {
                Ok(session) => return Some(Ok(session)),
                Err(e) => trace!("Ignoring invalid session cookie: {e}"),
            }
        }
    }
    None
}

/// Extract session from an `Authorization: Bearer` header carrying a session token
/// Returns:
/// - None: No Authorization header or not a Bearer token
/// - Some(Ok(session)): Valid token
/// - Some(Err(error)): Bearer token present but invalid
fn try_bearer_session(parts: &Parts, config: &Config) -> Option<Result<CurrentSession>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    let token = auth_str.strip_prefix("Bearer ")?;
    Some(session::verify_session_token(token.trim(), config))
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let claimed = match try_cookie_session(parts, &state.config) {
            Some(result) => result?,
            None => match try_bearer_session(parts, &state.config) {
                Some(result) => result?,
                None => {
                    trace!("No session credentials found in request");
                    return Err(Error::Unauthenticated { message: None });
                }
            },
        };

        // Tokens outlive role changes and deletions; the stored user is authoritative
        let Some(user) = state.store.get_user(claimed.id).await? else {
            debug!("Session refers to deleted user {}", abbrev_uuid(&claimed.id));
            return Err(Error::Unauthenticated { message: None });
        };

        Ok(CurrentSession {
            id: user.id,
            company_id: user.company_id,
            role: user.role,
            email: user.email,
        })
    }
}

impl FromRequestParts<AppState> for TenantSession {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let session = CurrentSession::from_request_parts(parts, state).await?;
        TenantSession::try_from(session)
    }
}

/// Client address used to key login throttling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    fn from_forwarded_headers(parts: &Parts) -> Option<String> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return Some(ip.to_string());
        }

        parts
            .headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        if state.config.auth.login_rate_limit.trust_forwarded_headers
            && let Some(ip) = Self::from_forwarded_headers(parts)
        {
            return Ok(ClientIp(ip));
        }

        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ClientIp(ip))
    }
}
