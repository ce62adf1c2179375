//! Database repository for material purchases.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    PgStore,
    errors::{DbError, Result},
    handlers::{fetch_page, repository::TenantRepository},
    memory::{MemoryRecord, MemoryTables},
    models::{
        purchases::{MaterialPurchase, MaterialPurchaseCreate, MaterialPurchaseFilter, MaterialPurchaseUpdate},
        vendors::ShopVendor,
    },
};
use crate::types::{CompanyId, abbrev_uuid};

const TABLE: &str = "material_purchases";

fn checked_total(request: &MaterialPurchaseCreate) -> Result<Decimal> {
    request
        .total_amount()
        .ok_or_else(|| DbError::check(TABLE, "material_purchases_total_check"))
}

fn push_filters(query: &mut QueryBuilder<'static, Postgres>, company_id: CompanyId, filter: &MaterialPurchaseFilter) {
    query.push(" WHERE company_id = ").push_bind(company_id);
    if let Some(vendor_id) = filter.vendor_id {
        query.push(" AND vendor_id = ").push_bind(vendor_id);
    }
    if filter.unpaid_only == Some(true) {
        query.push(" AND amount_paid < total_amount");
    }
}

#[async_trait::async_trait]
impl TenantRepository<MaterialPurchase> for PgStore {
    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&company_id), material = %request.material_name), err)]
    async fn create(&self, company_id: CompanyId, request: &MaterialPurchaseCreate) -> Result<MaterialPurchase> {
        let total_amount = checked_total(request)?;
        let purchase = sqlx::query_as::<_, MaterialPurchase>(
            r#"
            INSERT INTO material_purchases
                (id, company_id, vendor_id, material_name, quantity, unit_price, total_amount, amount_paid, purchase_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, CURRENT_DATE), $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(request.vendor_id)
        .bind(&request.material_name)
        .bind(request.quantity)
        .bind(request.unit_price)
        .bind(total_amount)
        .bind(request.amount_paid)
        .bind(request.purchase_date)
        .bind(&request.notes)
        .fetch_one(self.pool())
        .await?;
        Ok(purchase)
    }

    #[instrument(skip(self), fields(purchase_id = %abbrev_uuid(&id)), err)]
    async fn get(&self, company_id: CompanyId, id: Uuid) -> Result<Option<MaterialPurchase>> {
        let purchase =
            sqlx::query_as::<_, MaterialPurchase>("SELECT * FROM material_purchases WHERE id = $1 AND company_id = $2")
                .bind(id)
                .bind(company_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(purchase)
    }

    #[instrument(skip(self, filter), fields(company_id = %abbrev_uuid(&company_id)), err)]
    async fn list(&self, company_id: CompanyId, filter: &MaterialPurchaseFilter) -> Result<(Vec<MaterialPurchase>, i64)> {
        fetch_page(self.pool(), TABLE, &filter.pagination, |query| {
            push_filters(query, company_id, filter)
        })
        .await
    }

    #[instrument(skip(self, request), fields(purchase_id = %abbrev_uuid(&id)), err)]
    async fn update(
        &self,
        company_id: CompanyId,
        id: Uuid,
        request: &MaterialPurchaseUpdate,
    ) -> Result<Option<MaterialPurchase>> {
        let purchase = sqlx::query_as::<_, MaterialPurchase>(
            r#"
            UPDATE material_purchases SET
                material_name = COALESCE($3, material_name),
                amount_paid = COALESCE($4, amount_paid),
                purchase_date = COALESCE($5, purchase_date),
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(&request.material_name)
        .bind(request.amount_paid)
        .bind(request.purchase_date)
        .bind(&request.notes)
        .fetch_optional(self.pool())
        .await?;
        Ok(purchase)
    }

    #[instrument(skip(self), fields(purchase_id = %abbrev_uuid(&id)), err)]
    async fn delete(&self, company_id: CompanyId, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM material_purchases WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn check_paid(amount_paid: Decimal, total_amount: Decimal) -> Result<()> {
    if amount_paid < Decimal::ZERO || amount_paid > total_amount {
        return Err(DbError::check(TABLE, "material_purchases_paid_check"));
    }
    Ok(())
}

impl MemoryRecord for MaterialPurchase {
    fn table(tables: &MemoryTables) -> &std::collections::HashMap<Uuid, Self> {
        &tables.purchases
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut std::collections::HashMap<Uuid, Self> {
        &mut tables.purchases
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn build(
        tables: &MemoryTables,
        company_id: CompanyId,
        request: &MaterialPurchaseCreate,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if request.quantity <= Decimal::ZERO {
            return Err(DbError::check(TABLE, "material_purchases_quantity_check"));
        }
        if request.unit_price < Decimal::ZERO {
            return Err(DbError::check(TABLE, "material_purchases_unit_price_check"));
        }
        let total_amount = checked_total(request)?;
        check_paid(request.amount_paid, total_amount)?;
        if let Some(vendor_id) = request.vendor_id {
            tables.require::<ShopVendor>(company_id, vendor_id, TABLE, "material_purchases_vendor_fkey")?;
        }
        Ok(MaterialPurchase {
            id: Uuid::new_v4(),
            company_id,
            vendor_id: request.vendor_id,
            material_name: request.material_name.clone(),
            quantity: request.quantity,
            unit_price: request.unit_price,
            total_amount,
            amount_paid: request.amount_paid,
            purchase_date: request.purchase_date.unwrap_or_else(|| now.date_naive()),
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(
        _tables: &MemoryTables,
        current: &Self,
        request: &MaterialPurchaseUpdate,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let amount_paid = request.amount_paid.unwrap_or(current.amount_paid);
        check_paid(amount_paid, current.total_amount)?;
        Ok(MaterialPurchase {
            material_name: request
                .material_name
                .clone()
                .unwrap_or_else(|| current.material_name.clone()),
            amount_paid,
            purchase_date: request.purchase_date.unwrap_or(current.purchase_date),
            notes: request.notes.clone().or_else(|| current.notes.clone()),
            updated_at: now,
            ..current.clone()
        })
    }

    fn matches(&self, filter: &MaterialPurchaseFilter) -> bool {
        filter.vendor_id.is_none_or(|id| self.vendor_id == Some(id))
            && (filter.unpaid_only != Some(true) || self.outstanding() > Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::vendors::ShopVendorCreate;
    use crate::test_utils::seed_company;
    use chrono::NaiveDate;
    use sqlx::PgPool;

    fn purchase(quantity: Decimal, unit_price: Decimal, amount_paid: Decimal) -> MaterialPurchaseCreate {
        MaterialPurchaseCreate {
            vendor_id: None,
            material_name: "Steel sheet".to_string(),
            quantity,
            unit_price,
            amount_paid,
            purchase_date: NaiveDate::from_ymd_opt(2025, 2, 14),
            notes: Some("First batch".to_string()),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_total_is_stored_and_paid_amount_is_bounded(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, _) = seed_company(&store, "Acme").await;

        let created = TenantRepository::<MaterialPurchase>::create(
            &store,
            acme.id,
            &purchase(Decimal::from(10), Decimal::new(1250, 2), Decimal::from(25)),
        )
        .await
        .unwrap();
        assert_eq!(created.total_amount, Decimal::from(125));
        assert_eq!(created.outstanding(), Decimal::from(100));

        let overpay = MaterialPurchaseUpdate {
            amount_paid: Some(Decimal::new(12501, 2)),
            ..Default::default()
        };
        let err = TenantRepository::<MaterialPurchase>::update(&store, acme.id, created.id, &overpay)
            .await
            .unwrap_err();
        match err {
            DbError::CheckViolation { constraint, .. } => {
                assert_eq!(constraint.as_deref(), Some("material_purchases_paid_check"))
            }
            other => panic!("expected check violation, got {other:?}"),
        }

        let settle = MaterialPurchaseUpdate {
            amount_paid: Some(Decimal::from(125)),
            ..Default::default()
        };
        let updated = TenantRepository::<MaterialPurchase>::update(&store, acme.id, created.id, &settle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.amount_paid, Decimal::from(125));
        assert_eq!(updated.material_name, "Steel sheet");
        assert_eq!(updated.notes.as_deref(), Some("First batch"));
        assert_eq!(updated.purchase_date, created.purchase_date);

        let unpaid = MaterialPurchaseFilter {
            unpaid_only: Some(true),
            ..Default::default()
        };
        let (_, total) = TenantRepository::<MaterialPurchase>::list(&store, acme.id, &unpaid).await.unwrap();
        assert_eq!(total, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_overflowing_total_is_refused(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, _) = seed_company(&store, "Acme").await;

        let err = TenantRepository::<MaterialPurchase>::create(
            &store,
            acme.id,
            &purchase(Decimal::MAX, Decimal::TWO, Decimal::ZERO),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }), "got {err:?}");

        let (_, total) = TenantRepository::<MaterialPurchase>::list(&store, acme.id, &MaterialPurchaseFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_vendor_scoping(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, _) = seed_company(&store, "Acme").await;
        let (globex, _) = seed_company(&store, "Globex").await;
        let vendor = ShopVendorCreate {
            name: "Globex Supplies".to_string(),
            phone: None,
            email: None,
            address: None,
            notes: None,
        };
        let globex_vendor = TenantRepository::<ShopVendor>::create(&store, globex.id, &vendor).await.unwrap();
        let acme_vendor = TenantRepository::<ShopVendor>::create(&store, acme.id, &vendor).await.unwrap();

        let request = MaterialPurchaseCreate {
            vendor_id: Some(globex_vendor.id),
            ..purchase(Decimal::ONE, Decimal::ONE, Decimal::ZERO)
        };
        let err = TenantRepository::<MaterialPurchase>::create(&store, acme.id, &request).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }), "got {err:?}");

        let request = MaterialPurchaseCreate {
            vendor_id: Some(acme_vendor.id),
            ..purchase(Decimal::ONE, Decimal::ONE, Decimal::ZERO)
        };
        let created = TenantRepository::<MaterialPurchase>::create(&store, acme.id, &request).await.unwrap();
        TenantRepository::<MaterialPurchase>::create(&store, acme.id, &purchase(Decimal::ONE, Decimal::ONE, Decimal::ZERO))
            .await
            .unwrap();

        let by_vendor = MaterialPurchaseFilter {
            vendor_id: Some(acme_vendor.id),
            ..Default::default()
        };
        let (items, total) = TenantRepository::<MaterialPurchase>::list(&store, acme.id, &by_vendor).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, created.id);

        assert!(
            TenantRepository::<MaterialPurchase>::get(&store, globex.id, created.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(!TenantRepository::<MaterialPurchase>::delete(&store, globex.id, created.id).await.unwrap());
        assert!(TenantRepository::<MaterialPurchase>::delete(&store, acme.id, created.id).await.unwrap());
    }
}
