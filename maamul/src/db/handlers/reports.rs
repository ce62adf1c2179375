//! Read models that span several tables, plus the health check round trip.

use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    PgStore,
    errors::Result,
    handlers::repository::{ReportRepository, Store},
    models::{purchases::MaterialPurchase, vendors::ShopVendor},
};
use crate::types::{CompanyId, abbrev_uuid};

#[async_trait::async_trait]
impl ReportRepository for PgStore {
    #[instrument(skip(self), fields(company_id = %abbrev_uuid(&company_id)), err)]
    async fn unpaid_purchases(&self, company_id: CompanyId) -> Result<Vec<MaterialPurchase>> {
        let purchases = sqlx::query_as::<_, MaterialPurchase>(
            r#"
            SELECT * FROM material_purchases
            WHERE company_id = $1 AND amount_paid < total_amount
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(company_id)
        .fetch_all(self.pool())
        .await?;
        Ok(purchases)
    }

    #[instrument(skip(self, ids), fields(company_id = %abbrev_uuid(&company_id), count = ids.len()), err)]
    async fn vendors_by_ids(&self, company_id: CompanyId, ids: &[Uuid]) -> Result<Vec<ShopVendor>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let vendors =
            sqlx::query_as::<_, ShopVendor>("SELECT * FROM shop_vendors WHERE company_id = $1 AND id = ANY($2)")
                .bind(company_id)
                .bind(ids)
                .fetch_all(self.pool())
                .await?;
        Ok(vendors)
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        handlers::TenantRepository,
        models::{purchases::MaterialPurchaseCreate, vendors::ShopVendorCreate},
    };
    use crate::test_utils::seed_company;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    fn purchase(vendor_id: Option<Uuid>, amount_paid: Decimal) -> MaterialPurchaseCreate {
        MaterialPurchaseCreate {
            vendor_id,
            material_name: "Timber".to_string(),
            quantity: Decimal::from(5),
            unit_price: Decimal::from(20),
            amount_paid,
            purchase_date: None,
            notes: None,
        }
    }

    fn vendor(name: &str) -> ShopVendorCreate {
        ShopVendorCreate {
            name: name.to_string(),
            phone: None,
            email: None,
            address: None,
            notes: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_unpaid_purchases_skip_settled_and_foreign_rows(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, _) = seed_company(&store, "Acme").await;
        let (globex, _) = seed_company(&store, "Globex").await;

        let open = TenantRepository::<MaterialPurchase>::create(&store, acme.id, &purchase(None, Decimal::from(40)))
            .await
            .unwrap();
        TenantRepository::<MaterialPurchase>::create(&store, acme.id, &purchase(None, Decimal::from(100)))
            .await
            .unwrap();
        TenantRepository::<MaterialPurchase>::create(&store, globex.id, &purchase(None, Decimal::ZERO))
            .await
            .unwrap();

        let unpaid = store.unpaid_purchases(acme.id).await.unwrap();
        assert_eq!(unpaid.len(), 1);
        assert_eq!(unpaid[0].id, open.id);
        assert_eq!(unpaid[0].outstanding(), Decimal::from(60));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_vendors_by_ids_is_company_scoped(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, _) = seed_company(&store, "Acme").await;
        let (globex, _) = seed_company(&store, "Globex").await;
        let mine = TenantRepository::<ShopVendor>::create(&store, acme.id, &vendor("Timber Co")).await.unwrap();
        let theirs = TenantRepository::<ShopVendor>::create(&store, globex.id, &vendor("Steel Co")).await.unwrap();

        let found = store.vendors_by_ids(acme.id, &[mine.id, theirs.id]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Timber Co");

        assert!(store.vendors_by_ids(acme.id, &[]).await.unwrap().is_empty());
        store.ping().await.unwrap();
    }
}
