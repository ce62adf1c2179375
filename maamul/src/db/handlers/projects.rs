//! Database repository for projects.

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
        contains_ci, ilike_pattern,
        projects::{Project, ProjectCreate, ProjectFilter, ProjectUpdate, dates_ordered},
    },
};
use crate::types::{CompanyId, abbrev_uuid};

fn push_filters(query: &mut QueryBuilder<'static, Postgres>, company_id: CompanyId, filter: &ProjectFilter) {
    query.push(" WHERE company_id = ").push_bind(company_id);
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(search) = &filter.search {
        query.push(" AND name ILIKE ").push_bind(ilike_pattern(search));
    }
}

#[async_trait::async_trait]
impl TenantRepository<Project> for PgStore {
    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&company_id), name = %request.name), err)]
    async fn create(&self, company_id: CompanyId, request: &ProjectCreate) -> Result<Project> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, company_id, name, description, status, budget, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.status)
        .bind(request.budget)
        .bind(request.start_date)
        .bind(request.end_date)
        .fetch_one(self.pool())
        .await?;
        Ok(project)
    }

    #[instrument(skip(self), fields(project_id = %abbrev_uuid(&id)), err)]
    async fn get(&self, company_id: CompanyId, id: Uuid) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(project)
    }

    #[instrument(skip(self, filter), fields(company_id = %abbrev_uuid(&company_id)), err)]
    async fn list(&self, company_id: CompanyId, filter: &ProjectFilter) -> Result<(Vec<Project>, i64)> {
        fetch_page(self.pool(), "projects", &filter.pagination, |query| {
            push_filters(query, company_id, filter)
        })
        .await
    }

    #[instrument(skip(self, request), fields(project_id = %abbrev_uuid(&id)), err)]
    async fn update(&self, company_id: CompanyId, id: Uuid, request: &ProjectUpdate) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                status = COALESCE($5, status),
                budget = COALESCE($6, budget),
                start_date = COALESCE($7, start_date),
                end_date = COALESCE($8, end_date),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.status)
        .bind(request.budget)
        .bind(request.start_date)
        .bind(request.end_date)
        .fetch_optional(self.pool())
        .await?;
        Ok(project)
    }

    #[instrument(skip(self), fields(project_id = %abbrev_uuid(&id)), err)]
    async fn delete(&self, company_id: CompanyId, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn check_project(project: &Project) -> Result<()> {
    if project.budget.is_some_and(|budget| budget < Decimal::ZERO) {
        return Err(DbError::check("projects", "projects_budget_check"));
    }
    if !dates_ordered(project.start_date, project.end_date) {
        return Err(DbError::check("projects", "projects_dates_check"));
    }
    Ok(())
}

impl MemoryRecord for Project {
    fn table(tables: &MemoryTables) -> &std::collections::HashMap<Uuid, Self> {
        &tables.projects
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut std::collections::HashMap<Uuid, Self> {
        &mut tables.projects
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn build(_tables: &MemoryTables, company_id: CompanyId, request: &ProjectCreate, now: DateTime<Utc>) -> Result<Self> {
        let project = Project {
            id: Uuid::new_v4(),
            company_id,
            name: request.name.clone(),
            description: request.description.clone(),
            status: request.status,
            budget: request.budget,
            start_date: request.start_date,
            end_date: request.end_date,
            created_at: now,
            updated_at: now,
        };
        check_project(&project)?;
        Ok(project)
    }

    fn apply(_tables: &MemoryTables, current: &Self, request: &ProjectUpdate, now: DateTime<Utc>) -> Result<Self> {
        let project = Project {
            name: request.name.clone().unwrap_or_else(|| current.name.clone()),
            description: request.description.clone().or_else(|| current.description.clone()),
            status: request.status.unwrap_or(current.status),
            budget: request.budget.or(current.budget),
            start_date: request.start_date.or(current.start_date),
            end_date: request.end_date.or(current.end_date),
            updated_at: now,
            ..current.clone()
        };
        check_project(&project)?;
        Ok(project)
    }

    fn matches(&self, filter: &ProjectFilter) -> bool {
        filter.status.is_none_or(|status| self.status == status)
            && filter.search.as_deref().is_none_or(|search| contains_ci(&self.name, search))
    }

    fn before_delete(&self, tables: &MemoryTables) -> Result<()> {
        if tables.transactions.values().any(|tx| tx.project_id == Some(self.id)) {
            return Err(DbError::still_referenced("projects", "transactions_project_fkey", "transactions"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        accounts::{Account, AccountCreate, AccountType},
        projects::ProjectStatus,
        transactions::{Transaction, TransactionCreate, TransactionKind},
    };
    use crate::test_utils::seed_company;
    use chrono::NaiveDate;
    use sqlx::PgPool;

    fn project(name: &str, start_date: Option<NaiveDate>) -> ProjectCreate {
        ProjectCreate {
            name: name.to_string(),
            description: Some("Replace the warehouse roof".to_string()),
            status: ProjectStatus::Planned,
            budget: Some(Decimal::from(5000)),
            start_date,
            end_date: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_dates_are_checked_against_stored_row(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, _) = seed_company(&store, "Acme").await;
        let created = TenantRepository::<Project>::create(&store, acme.id, &project("Roof", NaiveDate::from_ymd_opt(2025, 6, 1)))
            .await
            .unwrap();

        let early_end = ProjectUpdate {
            end_date: NaiveDate::from_ymd_opt(2025, 5, 1),
            ..Default::default()
        };
        let err = TenantRepository::<Project>::update(&store, acme.id, created.id, &early_end)
            .await
            .unwrap_err();
        match err {
            DbError::CheckViolation { constraint, .. } => assert_eq!(constraint.as_deref(), Some("projects_dates_check")),
            other => panic!("expected check violation, got {other:?}"),
        }

        let unchanged = TenantRepository::<Project>::get(&store, acme.id, created.id).await.unwrap().unwrap();
        assert_eq!(unchanged.end_date, None);

        let update = ProjectUpdate {
            status: Some(ProjectStatus::Active),
            end_date: NaiveDate::from_ymd_opt(2025, 9, 30),
            ..Default::default()
        };
        let updated = TenantRepository::<Project>::update(&store, acme.id, created.id, &update)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ProjectStatus::Active);
        assert_eq!(updated.start_date, created.start_date);
        assert_eq!(updated.budget, Some(Decimal::from(5000)));
        assert_eq!(updated.description, created.description);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_project_with_transactions_cannot_be_deleted(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, _) = seed_company(&store, "Acme").await;
        let (globex, _) = seed_company(&store, "Globex").await;
        let roof = TenantRepository::<Project>::create(&store, acme.id, &project("Roof", None)).await.unwrap();
        let account = AccountCreate {
            name: "Main".to_string(),
            account_type: AccountType::Cash,
            currency: "USD".to_string(),
            opening_balance: Decimal::ZERO,
            description: None,
        };
        let account = TenantRepository::<Account>::create(&store, acme.id, &account).await.unwrap();
        let expense = TransactionCreate {
            account_id: account.id,
            project_id: Some(roof.id),
            kind: TransactionKind::Expense,
            amount: Decimal::from(40),
            category: None,
            description: None,
            transaction_date: None,
        };
        TenantRepository::<Transaction>::create(&store, acme.id, &expense).await.unwrap();

        assert!(!TenantRepository::<Project>::delete(&store, globex.id, roof.id).await.unwrap());
        let err = TenantRepository::<Project>::delete(&store, acme.id, roof.id).await.unwrap_err();
        match err {
            DbError::ForeignKeyViolation { constraint, .. } => {
                assert_eq!(constraint.as_deref(), Some("transactions_project_fkey"))
            }
            other => panic!("expected foreign key violation, got {other:?}"),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_by_status(pool: PgPool) {
        let store = PgStore::new(pool);
        let (acme, _) = seed_company(&store, "Acme").await;
        TenantRepository::<Project>::create(&store, acme.id, &project("Roof", None)).await.unwrap();
        let active = ProjectCreate {
            status: ProjectStatus::Active,
            ..project("Fence", None)
        };
        TenantRepository::<Project>::create(&store, acme.id, &active).await.unwrap();

        let filter = ProjectFilter {
            status: Some(ProjectStatus::Active),
            ..Default::default()
        };
        let (items, total) = TenantRepository::<Project>::list(&store, acme.id, &filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].name, "Fence");
    }
}
