//! Database record types.
//!
//! Tenant-owned records implement [`TenantScoped`], which ties each record type to its create,
//! update and filter payloads. The storage traits in [`crate::db::handlers`] and the generic API
//! handlers are written once against this trait.

use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::api::models::pagination::Pagination;
use crate::types::CompanyId;

pub mod accounts;
pub mod audit_logs;
pub mod boms;
pub mod companies;
pub mod projects;
pub mod purchases;
pub mod telegram;
pub mod transactions;
pub mod users;
pub mod vendors;

/// Query parameters for listing a tenant resource.
pub trait ListFilter {
    fn pagination(&self) -> &Pagination;
}

/// A record that belongs to exactly one company.
pub trait TenantScoped: Serialize + Clone + Send + Sync + Unpin + 'static {
    /// Human-readable name used in messages, e.g. "Account"
    const RESOURCE: &'static str;
    /// Table name, also used as the audit-log entity name
    const TABLE: &'static str;

    type Create: DeserializeOwned + Serialize + Send + Sync + 'static;
    type Update: DeserializeOwned + Serialize + Send + Sync + 'static;
    type Filter: ListFilter + DeserializeOwned + Send + Sync + 'static;

    fn id(&self) -> Uuid;
    fn company_id(&self) -> CompanyId;
}

/// Case-insensitive substring match used by in-memory filtering.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// `%needle%` for ILIKE, with LIKE wildcards escaped.
pub(crate) fn ilike_pattern(needle: &str) -> String {
    let escaped = needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}
