//! Database repository for bills of materials.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder, types::Json};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    PgStore,
    errors::{DbError, Result},
    handlers::{fetch_page, repository::TenantRepository},
    memory::{MemoryRecord, MemoryTables},
    models::{
        contains_ci, ilike_pattern,
        boms::{BillOfMaterial, BillOfMaterialCreate, BillOfMaterialFilter, BillOfMaterialUpdate, BomItem, total_cost},
    },
};
use crate::types::{CompanyId, abbrev_uuid};

const TABLE: &str = "bills_of_materials";

/// Totals that overflow are refused like the `total_cost` check constraint would.
fn checked_total(items: &[BomItem]) -> Result<Decimal> {
    total_cost(items).ok_or_else(|| DbError::check(TABLE, "bills_of_materials_total_cost_check"))
}

fn push_filters(query: &mut QueryBuilder<'static, Postgres>, company_id: CompanyId, filter: &BillOfMaterialFilter) {
    query.push(" WHERE company_id = ").push_bind(company_id);
    if let Some(search) = &filter.search {
        query.push(" AND product_name ILIKE ").push_bind(ilike_pattern(search));
    }
}

#[async_trait::async_trait]
impl TenantRepository<BillOfMaterial> for PgStore {
    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&company_id), items = request.items.len()), err)]
    async fn create(&self, company_id: CompanyId, request: &BillOfMaterialCreate) -> Result<BillOfMaterial> {
        let total_cost = checked_total(&request.items)?;
        let bom = sqlx::query_as::<_, BillOfMaterial>(
            r#"
            INSERT INTO bills_of_materials (id, company_id, product_name, items, total_cost, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(&request.product_name)
        .bind(Json(&request.items))
        .bind(total_cost)
        .bind(&request.notes)
        .fetch_one(self.pool())
        .await?;
        Ok(bom)
    }

    #[instrument(skip(self), fields(bom_id = %abbrev_uuid(&id)), err)]
    async fn get(&self, company_id: CompanyId, id: Uuid) -> Result<Option<BillOfMaterial>> {
        let bom =
            sqlx::query_as::<_, BillOfMaterial>("SELECT * FROM bills_of_materials WHERE id = $1 AND company_id = $2")
                .bind(id)
                .bind(company_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(bom)
    }

    #[instrument(skip(self, filter), fields(company_id = %abbrev_uuid(&company_id)), err)]
    async fn list(&self, company_id: CompanyId, filter: &BillOfMaterialFilter) -> Result<(Vec<BillOfMaterial>, i64)> {
        fetch_page(self.pool(), TABLE, &filter.pagination, |query| {
            push_filters(query, company_id, filter)
        })
        .await
    }

    #[instrument(skip(self, request), fields(bom_id = %abbrev_uuid(&id)), err)]
    async fn update(
        &self,
        company_id: CompanyId,
        id: Uuid,
        request: &BillOfMaterialUpdate,
    ) -> Result<Option<BillOfMaterial>> {
        // Replacing the items recomputes the total; otherwise both stay as they are
        let total_cost = request.items.as_deref().map(checked_total).transpose()?;
        let bom = sqlx::query_as::<_, BillOfMaterial>(
            r#"
            UPDATE bills_of_materials SET
                product_name = COALESCE($3, product_name),
                items = COALESCE($4, items),
                total_cost = COALESCE($5, total_cost),
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(&request.product_name)
        .bind(request.items.as_ref().map(Json))
        .bind(total_cost)
        .bind(&request.notes)
        .fetch_optional(self.pool())
        .await?;
        Ok(bom)
    }

    #[instrument(skip(self), fields(bom_id = %abbrev_uuid(&id)), err)]
    async fn delete(&self, company_id: CompanyId, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bills_of_materials WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl MemoryRecord for BillOfMaterial {
    fn table(tables: &MemoryTables) -> &std::collections::HashMap<Uuid, Self> {
        &tables.boms
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut std::collections::HashMap<Uuid, Self> {
        &mut tables.boms
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn build(
        _tables: &MemoryTables,
        company_id: CompanyId,
        request: &BillOfMaterialCreate,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(BillOfMaterial {
            id: Uuid::new_v4(),
            company_id,
            product_name: request.product_name.clone(),
            items: Json(request.items.clone()),
            total_cost: checked_total(&request.items)?,
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(
        _tables: &MemoryTables,
        current: &Self,
        request: &BillOfMaterialUpdate,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut updated = current.clone();
        if let Some(product_name) = &request.product_name {
            updated.product_name = product_name.clone();
        }
        if let Some(items) = &request.items {
            updated.total_cost = checked_total(items)?;
            updated.items = Json(items.clone());
        }
        if let Some(notes) = &request.notes {
            updated.notes = Some(notes.clone());
        }
        updated.updated_at = now;
        Ok(updated)
    }

    fn matches(&self, filter: &BillOfMaterialFilter) -> bool {
        filter
            .search
            .as_deref()
            .is_none_or(|search| contains_ci(&self.product_name, search))
    }
}
