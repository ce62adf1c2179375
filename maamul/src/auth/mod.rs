//! Authentication and authorization.
//!
//! # Sessions
//!
//! Users sign in at `/api/auth/login` with email and password. The server answers with a signed
//! JWT in an HTTP-only cookie (`maamul_session` by default). The same token is accepted as
//! `Authorization: Bearer <token>` for non-browser clients. Every request re-reads the user from
//! the store, so role changes and deletions take effect immediately.
//!
//! # Tenancy
//!
//! A session resolves to `{ user_id, company_id, role }`. Handlers that touch company data take a
//! [`current_user::TenantSession`], which rejects sessions without a company with 401. All store
//! calls are then scoped by that company id.
//!
//! # Roles
//!
//! `ADMIN`, `MANAGER` and `STAFF`. See [`permissions`] for the role gates (403 on mismatch).
//!
//! # Modules
//!
//! - [`current_user`]: extractors for the calling user and client address
//! - [`password`]: Argon2id hashing
//! - [`permissions`]: role sets and the `Authorized<R>` extractor
//! - [`session`]: JWT creation/verification and cookie formatting
//! - [`two_factor`]: 2FA and device-trust hooks

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
pub mod two_factor;
