//! In-memory storage backend.
//!
//! Used by tests and by `database.type: memory` deployments. It enforces the same tenancy,
//! uniqueness and reference rules as the PostgreSQL schema and reports violations through the
//! same [`DbError`] variants, so handlers behave identically on either backend.
//!
//! All tables sit behind one [`parking_lot::RwLock`]. Every operation takes the lock once,
//! does its work synchronously and releases it before returning.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::db::errors::{DbError, Result};
use crate::db::handlers::repository::{
    AuditLogRepository, CompanyRepository, ReportRepository, Store, TenantRepository, UserRepository,
};
use crate::db::models::{
    ListFilter, TenantScoped, contains_ci,
    accounts::Account,
    audit_logs::{AuditLog, AuditLogCreate, AuditLogFilter},
    boms::BillOfMaterial,
    companies::{Company, CompanyCreate, CompanyUpdate},
    projects::Project,
    purchases::MaterialPurchase,
    telegram::TelegramUserLink,
    transactions::Transaction,
    users::{UserCreateDBRequest, UserDBResponse, UserFilter, UserUpdateDBRequest, normalize_email},
    vendors::ShopVendor,
};
use crate::types::{CompanyId, UserId};

#[derive(Debug, Default)]
pub(crate) struct MemoryTables {
    pub companies: HashMap<CompanyId, Company>,
    pub users: HashMap<UserId, UserDBResponse>,
    pub accounts: HashMap<Uuid, Account>,
    pub transactions: HashMap<Uuid, Transaction>,
    pub boms: HashMap<Uuid, BillOfMaterial>,
    pub purchases: HashMap<Uuid, MaterialPurchase>,
    pub vendors: HashMap<Uuid, ShopVendor>,
    pub projects: HashMap<Uuid, Project>,
    pub telegram_links: HashMap<Uuid, TelegramUserLink>,
    pub audit_logs: Vec<AuditLog>,
}

impl MemoryTables {
    /// Fails like a composite foreign key would when `id` is not a row of `company_id`.
    pub(crate) fn require<T: MemoryRecord>(
        &self,
        company_id: CompanyId,
        id: Uuid,
        table: &str,
        constraint: &str,
    ) -> Result<()> {
        match T::table(self).get(&id) {
            Some(row) if row.company_id() == company_id => Ok(()),
            _ => Err(DbError::missing_reference(table, constraint)),
        }
    }

    pub(crate) fn require_user(&self, company_id: CompanyId, id: UserId, table: &str, constraint: &str) -> Result<()> {
        match self.users.get(&id) {
            Some(user) if user.company_id == Some(company_id) => Ok(()),
            _ => Err(DbError::missing_reference(table, constraint)),
        }
    }
}

/// Per-table behaviour the generic in-memory repository needs.
///
/// `build` and `apply` see the tables read-only and must validate everything that can fail.
/// The `on_*` hooks run after validation and may not fail.
pub(crate) trait MemoryRecord: TenantScoped {
    fn table(tables: &MemoryTables) -> &HashMap<Uuid, Self>;
    fn table_mut(tables: &mut MemoryTables) -> &mut HashMap<Uuid, Self>;

    fn created_at(&self) -> DateTime<Utc>;

    fn build(tables: &MemoryTables, company_id: CompanyId, request: &Self::Create, now: DateTime<Utc>)
    -> Result<Self>;

    fn apply(tables: &MemoryTables, current: &Self, request: &Self::Update, now: DateTime<Utc>) -> Result<Self>;

    fn matches(&self, filter: &Self::Filter) -> bool;

    fn on_insert(&self, _tables: &mut MemoryTables) {}

    /// Refuse the delete while other rows still point at this one
    fn before_delete(&self, _tables: &MemoryTables) -> Result<()> {
        Ok(())
    }

    fn on_delete(&self, _tables: &mut MemoryTables) {}
}

fn page<T: Clone>(mut rows: Vec<T>, skip: i64, limit: i64) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let skip = usize::try_from(skip).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    let items = rows.drain(..).skip(skip).take(limit).collect();
    (items, total)
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<MemoryTables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl<T: MemoryRecord> TenantRepository<T> for MemoryStore {
    async fn create(&self, company_id: CompanyId, request: &T::Create) -> Result<T> {
        let mut tables = self.tables.write();
        let row = T::build(&tables, company_id, request, Utc::now())?;
        row.on_insert(&mut tables);
        T::table_mut(&mut tables).insert(row.id(), row.clone());
        Ok(row)
    }

    async fn get(&self, company_id: CompanyId, id: Uuid) -> Result<Option<T>> {
        let tables = self.tables.read();
        Ok(T::table(&tables).get(&id).filter(|row| row.company_id() == company_id).cloned())
    }

    async fn list(&self, company_id: CompanyId, filter: &T::Filter) -> Result<(Vec<T>, i64)> {
        let tables = self.tables.read();
        let mut rows: Vec<T> = T::table(&tables)
            .values()
            .filter(|row| row.company_id() == company_id && row.matches(filter))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| a.id().cmp(&b.id())));
        let pagination = filter.pagination();
        Ok(page(rows, pagination.skip(), pagination.limit()))
    }

    async fn update(&self, company_id: CompanyId, id: Uuid, request: &T::Update) -> Result<Option<T>> {
        let mut tables = self.tables.write();
        let Some(current) = T::table(&tables).get(&id).filter(|row| row.company_id() == company_id) else {
            return Ok(None);
        };
        let updated = T::apply(&tables, current, request, Utc::now())?;
        T::table_mut(&mut tables).insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete(&self, company_id: CompanyId, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write();
        let Some(current) = T::table(&tables).get(&id).filter(|row| row.company_id() == company_id).cloned() else {
            return Ok(false);
        };
        current.before_delete(&tables)?;
        T::table_mut(&mut tables).remove(&id);
        current.on_delete(&mut tables);
        Ok(true)
    }
}

fn email_taken(tables: &MemoryTables, email: &str, except: Option<UserId>) -> bool {
    tables
        .users
        .values()
        .any(|user| user.email == email && Some(user.id) != except)
}

fn insert_user(tables: &mut MemoryTables, request: &UserCreateDBRequest, now: DateTime<Utc>) -> Result<UserDBResponse> {
    let email = normalize_email(&request.email);
    if email_taken(tables, &email, None) {
        return Err(DbError::unique("users", "users_email_key"));
    }
    if let Some(company_id) = request.company_id
        && !tables.companies.contains_key(&company_id)
    {
        return Err(DbError::missing_reference("users", "users_company_id_fkey"));
    }
    let user = UserDBResponse {
        id: Uuid::new_v4(),
        company_id: request.company_id,
        email,
        name: request.name.clone(),
        role: request.role,
        password_hash: request.password_hash.clone(),
        last_login_at: None,
        created_at: now,
        updated_at: now,
    };
    tables.users.insert(user.id, user.clone());
    Ok(user)
}

#[async_trait::async_trait]
impl CompanyRepository for MemoryStore {
    async fn get_company(&self, id: CompanyId) -> Result<Option<Company>> {
        Ok(self.tables.read().companies.get(&id).cloned())
    }

    async fn update_company(&self, id: CompanyId, request: &CompanyUpdate) -> Result<Option<Company>> {
        let mut tables = self.tables.write();
        let Some(company) = tables.companies.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &request.name {
            company.name = name.clone();
        }
        if let Some(phone) = &request.phone {
            company.phone = Some(phone.clone());
        }
        if let Some(address) = &request.address {
            company.address = Some(address.clone());
        }
        company.updated_at = Utc::now();
        Ok(Some(company.clone()))
    }

    async fn create_company_with_admin(
        &self,
        company: &CompanyCreate,
        admin: &UserCreateDBRequest,
    ) -> Result<(Company, UserDBResponse)> {
        let mut tables = self.tables.write();
        let now = Utc::now();
        // Check before inserting anything so a duplicate email leaves no orphan company
        if email_taken(&tables, &normalize_email(&admin.email), None) {
            return Err(DbError::unique("users", "users_email_key"));
        }
        let company = Company {
            id: Uuid::new_v4(),
            name: company.name.clone(),
            phone: company.phone.clone(),
            address: company.address.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.companies.insert(company.id, company.clone());
        let request = UserCreateDBRequest {
            company_id: Some(company.id),
            ..admin.clone()
        };
        let user = insert_user(&mut tables, &request, now)?;
        Ok((company, user))
    }
}

#[async_trait::async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, request: &UserCreateDBRequest) -> Result<UserDBResponse> {
        insert_user(&mut self.tables.write(), request, Utc::now())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserDBResponse>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserDBResponse>> {
        let email = normalize_email(email);
        Ok(self.tables.read().users.values().find(|user| user.email == email).cloned())
    }

    async fn list_users(&self, company_id: CompanyId, filter: &UserFilter) -> Result<(Vec<UserDBResponse>, i64)> {
        let tables = self.tables.read();
        let mut users: Vec<UserDBResponse> = tables
            .users
            .values()
            .filter(|user| user.company_id == Some(company_id))
            .filter(|user| filter.role.is_none_or(|role| user.role == role))
            .filter(|user| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|search| contains_ci(&user.name, search) || contains_ci(&user.email, search))
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(page(users, filter.skip, filter.limit))
    }

    async fn update_user(
        &self,
        company_id: CompanyId,
        id: UserId,
        request: &UserUpdateDBRequest,
    ) -> Result<Option<UserDBResponse>> {
        let mut tables = self.tables.write();
        let Some(user) = tables.users.get_mut(&id).filter(|user| user.company_id == Some(company_id)) else {
            return Ok(None);
        };
        if let Some(name) = &request.name {
            user.name = name.clone();
        }
        if let Some(role) = request.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, company_id: CompanyId, id: UserId) -> Result<bool> {
        let mut tables = self.tables.write();
        if !tables.users.get(&id).is_some_and(|user| user.company_id == Some(company_id)) {
            return Ok(false);
        }
        tables.users.remove(&id);
        tables.telegram_links.retain(|_, link| link.user_id != id);
        for entry in tables.audit_logs.iter_mut().filter(|entry| entry.user_id == Some(id)) {
            entry.user_id = None;
        }
        Ok(true)
    }

    async fn record_login(&self, id: UserId) -> Result<()> {
        if let Some(user) = self.tables.write().users.get_mut(&id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool> {
        let mut tables = self.tables.write();
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(false);
        };
        user.password_hash = Some(password_hash.to_string());
        user.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait::async_trait]
impl AuditLogRepository for MemoryStore {
    async fn record_audit(&self, entry: &AuditLogCreate) -> Result<AuditLog> {
        let log = AuditLog {
            id: Uuid::new_v4(),
            company_id: entry.company_id,
            user_id: entry.user_id,
            action: entry.action,
            entity: entry.entity.clone(),
            entity_id: entry.entity_id,
            details: entry.details.clone(),
            created_at: Utc::now(),
        };
        self.tables.write().audit_logs.push(log.clone());
        Ok(log)
    }

    async fn list_audit_logs(&self, company_id: CompanyId, filter: &AuditLogFilter) -> Result<(Vec<AuditLog>, i64)> {
        let tables = self.tables.read();
        // Appended in order, so reversing gives newest first
        let logs: Vec<AuditLog> = tables
            .audit_logs
            .iter()
            .rev()
            .filter(|log| log.company_id == company_id)
            .filter(|log| filter.entity.as_deref().is_none_or(|entity| log.entity == entity))
            .filter(|log| filter.user_id.is_none_or(|user_id| log.user_id == Some(user_id)))
            .filter(|log| filter.action.is_none_or(|action| log.action == action))
            .cloned()
            .collect();
        Ok(page(logs, filter.pagination.skip(), filter.pagination.limit()))
    }
}

#[async_trait::async_trait]
impl ReportRepository for MemoryStore {
    async fn unpaid_purchases(&self, company_id: CompanyId) -> Result<Vec<MaterialPurchase>> {
        let tables = self.tables.read();
        let mut purchases: Vec<MaterialPurchase> = tables
            .purchases
            .values()
            .filter(|purchase| purchase.company_id == company_id && purchase.amount_paid < purchase.total_amount)
            .cloned()
            .collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(purchases)
    }

    async fn vendors_by_ids(&self, company_id: CompanyId, ids: &[Uuid]) -> Result<Vec<ShopVendor>> {
        let tables = self.tables.read();
        Ok(ids
            .iter()
            .filter_map(|id| tables.vendors.get(id))
            .filter(|vendor| vendor.company_id == company_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
