//! Storage traits.
//!
//! A repository is the data access layer for one table. Every backend implements the same set
//! of repositories, and [`Store`] bundles them so request handlers can hold a single
//! `Arc<dyn Store>` without caring whether rows live in PostgreSQL or in memory.
//!
//! Tenant-owned tables share one generic trait, [`TenantRepository`]. Every method takes the
//! caller's company id and never sees rows belonging to another company: a lookup for an id
//! owned by a different company behaves exactly like a lookup for an id that does not exist.

use uuid::Uuid;

use crate::db::errors::Result;
use crate::db::models::{
    TenantScoped,
    accounts::Account,
    audit_logs::{AuditLog, AuditLogCreate, AuditLogFilter},
    boms::BillOfMaterial,
    companies::{Company, CompanyCreate, CompanyUpdate},
    projects::Project,
    purchases::MaterialPurchase,
    telegram::TelegramUserLink,
    transactions::Transaction,
    users::{UserCreateDBRequest, UserDBResponse, UserFilter, UserUpdateDBRequest},
    vendors::ShopVendor,
};
use crate::types::{CompanyId, UserId};

/// CRUD over a table of company-owned records.
#[async_trait::async_trait]
pub trait TenantRepository<T: TenantScoped> {
    /// Insert a new record owned by `company_id`
    async fn create(&self, company_id: CompanyId, request: &T::Create) -> Result<T>;

    /// Fetch one record, `None` if absent or owned by another company
    async fn get(&self, company_id: CompanyId, id: Uuid) -> Result<Option<T>>;

    /// One page of records plus the total number matching the filter
    async fn list(&self, company_id: CompanyId, filter: &T::Filter) -> Result<(Vec<T>, i64)>;

    /// Apply a partial update; absent fields are left as they are
    async fn update(&self, company_id: CompanyId, id: Uuid, request: &T::Update) -> Result<Option<T>>;

    /// Returns whether a row was deleted
    async fn delete(&self, company_id: CompanyId, id: Uuid) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait CompanyRepository {
    async fn get_company(&self, id: CompanyId) -> Result<Option<Company>>;

    async fn update_company(&self, id: CompanyId, request: &CompanyUpdate) -> Result<Option<Company>>;

    /// Create a company and its first administrator atomically.
    ///
    /// The admin request's `company_id` is ignored and replaced by the new company's id.
    async fn create_company_with_admin(
        &self,
        company: &CompanyCreate,
        admin: &UserCreateDBRequest,
    ) -> Result<(Company, UserDBResponse)>;
}

#[async_trait::async_trait]
pub trait UserRepository {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse>;

    /// Lookup across all companies, used when resolving a session
    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>>;

    /// Case-insensitive lookup across all companies
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>>;

    async fn list_users(&self, company_id: CompanyId, filter: &UserFilter) -> Result<(Vec<UserDBResponse>, i64)>;

    async fn update_user(
        &self,
        company_id: CompanyId,
        id: UserId,
        request: &UserUpdateDBRequest,
    ) -> Result<Option<UserDBResponse>>;

    async fn delete_user(&self, company_id: CompanyId, id: UserId) -> Result<bool>;

    /// Stamp `last_login_at` with the current time
    async fn record_login(&self, id: UserId) -> Result<()>;

    /// Returns whether the user existed
    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait AuditLogRepository {
    async fn record_audit(&self, entry: &AuditLogCreate) -> Result<AuditLog>;

    async fn list_audit_logs(&self, company_id: CompanyId, filter: &AuditLogFilter) -> Result<(Vec<AuditLog>, i64)>;
}

/// Read-only queries that span several tables.
#[async_trait::async_trait]
pub trait ReportRepository {
    /// Every purchase with `amount_paid < total_amount`
    async fn unpaid_purchases(&self, company_id: CompanyId) -> Result<Vec<MaterialPurchase>>;

    async fn vendors_by_ids(&self, company_id: CompanyId, ids: &[Uuid]) -> Result<Vec<ShopVendor>>;
}

/// Everything the application needs from a storage backend.
#[async_trait::async_trait]
pub trait Store:
    TenantRepository<Account>
    + TenantRepository<Transaction>
    + TenantRepository<BillOfMaterial>
    + TenantRepository<MaterialPurchase>
    + TenantRepository<ShopVendor>
    + TenantRepository<Project>
    + TenantRepository<TelegramUserLink>
    + CompanyRepository
    + UserRepository
    + AuditLogRepository
    + ReportRepository
    + Send
    + Sync
{
    /// Cheap round trip used by health checks
    async fn ping(&self) -> Result<()>;
}
