//! Role gates.
//!
//! Routes that need a fixed role set take [`Authorized<R>`] instead of a bare
//! [`TenantSession`]; the extractor rejects with 403 before the handler runs:
//!
//! ```ignore
//! async fn list_audit_logs(Authorized(session, ..): Authorized<Admins>) { ... }
//! ```
//!
//! Tenant resources with per-operation rules call [`TenantSession::require_role`] instead.

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{Method, request::Parts},
};

use crate::{
    AppState,
    api::models::users::Role,
    auth::current_user::TenantSession,
    errors::{Error, Result},
    types::Operation,
};

pub const ADMINS: &[Role] = &[Role::Admin];
pub const MANAGERS: &[Role] = &[Role::Admin, Role::Manager];
pub const MEMBERS: &[Role] = &[Role::Admin, Role::Manager, Role::Staff];

pub fn role_allowed(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

/// A fixed set of roles usable as a type parameter.
pub trait RoleSet: Send + Sync + 'static {
    const ROLES: &'static [Role];
}

/// ADMIN only.
pub struct Admins;
/// ADMIN or MANAGER.
pub struct Managers;
/// Any role.
pub struct Members;

impl RoleSet for Admins {
    const ROLES: &'static [Role] = ADMINS;
}

impl RoleSet for Managers {
    const ROLES: &'static [Role] = MANAGERS;
}

impl RoleSet for Members {
    const ROLES: &'static [Role] = MEMBERS;
}

/// A tenant session whose role is in `R`.
pub struct Authorized<R: RoleSet>(pub TenantSession, pub PhantomData<R>);

fn operation_for(method: &Method) -> Operation {
    match *method {
        Method::POST => Operation::Create,
        Method::PUT | Method::PATCH => Operation::Update,
        Method::DELETE => Operation::Delete,
        _ => Operation::Read,
    }
}

impl<R: RoleSet> FromRequestParts<AppState> for Authorized<R> {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let session = TenantSession::from_request_parts(parts, state).await?;
        session.require_role(R::ROLES, operation_for(&parts.method), parts.uri.path())?;
        Ok(Authorized(session, PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_sets() {
        assert!(role_allowed(Role::Admin, ADMINS));
        assert!(!role_allowed(Role::Manager, ADMINS));
        assert!(role_allowed(Role::Manager, MANAGERS));
        assert!(!role_allowed(Role::Staff, MANAGERS));
        assert!(role_allowed(Role::Staff, MEMBERS));
    }

    #[test]
    fn test_operation_for_method() {
        assert_eq!(operation_for(&Method::GET), Operation::Read);
        assert_eq!(operation_for(&Method::POST), Operation::Create);
        assert_eq!(operation_for(&Method::PATCH), Operation::Update);
        assert_eq!(operation_for(&Method::DELETE), Operation::Delete);
    }
}
