//! Database repository for companies.

use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    PgStore,
    errors::Result,
    handlers::{repository::CompanyRepository, users::insert_user},
    models::{
        companies::{Company, CompanyCreate, CompanyUpdate},
        users::{UserCreateDBRequest, UserDBResponse},
    },
};
use crate::types::{CompanyId, abbrev_uuid};

#[async_trait::async_trait]
impl CompanyRepository for PgStore {
    #[instrument(skip(self), fields(company_id = %abbrev_uuid(&id)), err)]
    async fn get_company(&self, id: CompanyId) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(company)
    }

    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&id)), err)]
    async fn update_company(&self, id: CompanyId, request: &CompanyUpdate) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.phone)
        .bind(&request.address)
        .fetch_optional(self.pool())
        .await?;
        Ok(company)
    }

    #[instrument(skip(self, company, admin), fields(company = %company.name, admin = %admin.email), err)]
    async fn create_company_with_admin(
        &self,
        company: &CompanyCreate,
        admin: &UserCreateDBRequest,
    ) -> Result<(Company, UserDBResponse)> {
        let mut tx = self.pool().begin().await?;

        let company = sqlx::query_as::<_, Company>(
            "INSERT INTO companies (id, name, phone, address) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&company.name)
        .bind(&company.phone)
        .bind(&company.address)
        .fetch_one(&mut *tx)
        .await?;

        let admin = UserCreateDBRequest {
            company_id: Some(company.id),
            ..admin.clone()
        };
        let user = insert_user(&mut *tx, &admin).await?;

        tx.commit().await?;
        Ok((company, user))
    }
}
