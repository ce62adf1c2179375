//! API request and response data models.
//!
//! Tenant resources are served straight from their database records (see
//! [`crate::db::models`]); the types here cover payloads that differ from storage: users without
//! password hashes, authentication exchanges, pagination and reports.
//!
//! - [`auth`]: Login, registration and password change payloads
//! - [`pagination`]: `skip`/`limit` query parameters and the paginated list wrapper
//! - [`reports`]: Debt report
//! - [`users`]: Roles and user payloads

pub mod auth;
pub mod pagination;
pub mod reports;
pub mod users;
