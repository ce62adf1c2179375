//! Database repository for shop vendors.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    PgStore,
    errors::{DbError, Result},
    handlers::{fetch_page, repository::TenantRepository},
    memory::{MemoryRecord, MemoryTables},
    models::{
        contains_ci, ilike_pattern,
        vendors::{ShopVendor, ShopVendorCreate, ShopVendorFilter, ShopVendorUpdate},
    },
};
use crate::types::{CompanyId, abbrev_uuid};

fn push_filters(query: &mut QueryBuilder<'static, Postgres>, company_id: CompanyId, filter: &ShopVendorFilter) {
    query.push(" WHERE company_id = ").push_bind(company_id);
    if let Some(search) = &filter.search {
        let pattern = ilike_pattern(search);
        query
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait::async_trait]
impl TenantRepository<ShopVendor> for PgStore {
    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&company_id), name = %request.name), err)]
    async fn create(&self, company_id: CompanyId, request: &ShopVendorCreate) -> Result<ShopVendor> {
        let vendor = sqlx::query_as::<_, ShopVendor>(
            r#"
            INSERT INTO shop_vendors (id, company_id, name, phone, email, address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(&request.name)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(&request.address)
        .bind(&request.notes)
        .fetch_one(self.pool())
        .await?;
        Ok(vendor)
    }

    #[instrument(skip(self), fields(vendor_id = %abbrev_uuid(&id)), err)]
    async fn get(&self, company_id: CompanyId, id: Uuid) -> Result<Option<ShopVendor>> {
        let vendor = sqlx::query_as::<_, ShopVendor>("SELECT * FROM shop_vendors WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(vendor)
    }

    #[instrument(skip(self, filter), fields(company_id = %abbrev_uuid(&company_id)), err)]
    async fn list(&self, company_id: CompanyId, filter: &ShopVendorFilter) -> Result<(Vec<ShopVendor>, i64)> {
        fetch_page(self.pool(), "shop_vendors", &filter.pagination, |query| {
            push_filters(query, company_id, filter)
        })
        .await
    }

    #[instrument(skip(self, request), fields(vendor_id = %abbrev_uuid(&id)), err)]
    async fn update(&self, company_id: CompanyId, id: Uuid, request: &ShopVendorUpdate) -> Result<Option<ShopVendor>> {
        let vendor = sqlx::query_as::<_, ShopVendor>(
            r#"
            UPDATE shop_vendors SET
                name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                address = COALESCE($6, address),
                notes = COALESCE($7, notes),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(&request.name)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(&request.address)
        .bind(&request.notes)
        .fetch_optional(self.pool())
        .await?;
        Ok(vendor)
    }

    #[instrument(skip(self), fields(vendor_id = %abbrev_uuid(&id)), err)]
    async fn delete(&self, company_id: CompanyId, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shop_vendors WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl MemoryRecord for ShopVendor {
    fn table(tables: &MemoryTables) -> &std::collections::HashMap<Uuid, Self> {
        &tables.vendors
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut std::collections::HashMap<Uuid, Self> {
        &mut tables.vendors
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn build(_tables: &MemoryTables, company_id: CompanyId, request: &ShopVendorCreate, now: DateTime<Utc>) -> Result<Self> {
        Ok(ShopVendor {
            id: Uuid::new_v4(),
            company_id,
            name: request.name.clone(),
            phone: request.phone.clone(),
            email: request.email.clone(),
            address: request.address.clone(),
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(_tables: &MemoryTables, current: &Self, request: &ShopVendorUpdate, now: DateTime<Utc>) -> Result<Self> {
        Ok(ShopVendor {
            name: request.name.clone().unwrap_or_else(|| current.name.clone()),
            phone: request.phone.clone().or_else(|| current.phone.clone()),
            email: request.email.clone().or_else(|| current.email.clone()),
            address: request.address.clone().or_else(|| current.address.clone()),
            notes: request.notes.clone().or_else(|| current.notes.clone()),
            updated_at: now,
            ..current.clone()
        })
    }

    fn matches(&self, filter: &ShopVendorFilter) -> bool {
        filter.search.as_deref().is_none_or(|search| {
            contains_ci(&self.name, search)
                || self.phone.as_deref().is_some_and(|phone| contains_ci(phone, search))
                || self.email.as_deref().is_some_and(|email| contains_ci(email, search))
        })
    }

    fn before_delete(&self, tables: &MemoryTables) -> Result<()> {
        if tables.purchases.values().any(|purchase| purchase.vendor_id == Some(self.id)) {
            return Err(DbError::still_referenced(
                "shop_vendors",
                "material_purchases_vendor_fkey",
                "material_purchases",
            ));
        }
        Ok(())
    }
}
