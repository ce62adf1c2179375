//! Database repository for accounts.

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
        accounts::{Account, AccountCreate, AccountFilter, AccountUpdate},
    },
};
use crate::types::{CompanyId, abbrev_uuid};

const NAME_KEY: &str = "accounts_company_name_key";

fn push_filters(query: &mut QueryBuilder<'static, Postgres>, company_id: CompanyId, filter: &AccountFilter) {
    query.push(" WHERE company_id = ").push_bind(company_id);
    if let Some(account_type) = filter.account_type {
        query.push(" AND account_type = ").push_bind(account_type);
    }
    if let Some(search) = &filter.search {
        query.push(" AND name ILIKE ").push_bind(ilike_pattern(search));
    }
}

#[async_trait::async_trait]
impl TenantRepository<Account> for PgStore {
    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&company_id), name = %request.name), err)]
    async fn create(&self, company_id: CompanyId, request: &AccountCreate) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, company_id, name, account_type, currency, balance, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(&request.name)
        .bind(request.account_type)
        .bind(&request.currency)
        .bind(request.opening_balance)
        .bind(&request.description)
        .fetch_one(self.pool())
        .await?;

        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn get(&self, company_id: CompanyId, id: Uuid) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(account)
    }

    #[instrument(skip(self, filter), fields(company_id = %abbrev_uuid(&company_id)), err)]
    async fn list(&self, company_id: CompanyId, filter: &AccountFilter) -> Result<(Vec<Account>, i64)> {
        fetch_page(self.pool(), "accounts", &filter.pagination, |query| {
            push_filters(query, company_id, filter)
        })
        .await
    }

    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn update(&self, company_id: CompanyId, id: Uuid, request: &AccountUpdate) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts SET
                name = COALESCE($3, name),
                account_type = COALESCE($4, account_type),
                description = COALESCE($5, description),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(&request.name)
        .bind(request.account_type)
        .bind(&request.description)
        .fetch_optional(self.pool())
        .await?;
        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn delete(&self, company_id: CompanyId, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn name_taken(tables: &MemoryTables, company_id: CompanyId, name: &str, except: Option<Uuid>) -> bool {
    tables
        .accounts
        .values()
        .any(|account| account.company_id == company_id && account.name == name && Some(account.id) != except)
}

impl MemoryRecord for Account {
    fn table(tables: &MemoryTables) -> &std::collections::HashMap<Uuid, Self> {
        &tables.accounts
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut std::collections::HashMap<Uuid, Self> {
        &mut tables.accounts
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn build(tables: &MemoryTables, company_id: CompanyId, request: &AccountCreate, now: DateTime<Utc>) -> Result<Self> {
        if name_taken(tables, company_id, &request.name, None) {
            return Err(DbError::unique("accounts", NAME_KEY));
        }
        Ok(Account {
            id: Uuid::new_v4(),
            company_id,
            name: request.name.clone(),
            account_type: request.account_type,
            currency: request.currency.clone(),
            balance: request.opening_balance,
            description: request.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(tables: &MemoryTables, current: &Self, request: &AccountUpdate, now: DateTime<Utc>) -> Result<Self> {
        if let Some(name) = &request.name
            && name_taken(tables, current.company_id, name, Some(current.id))
        {
            return Err(DbError::unique("accounts", NAME_KEY));
        }
        Ok(Account {
            name: request.name.clone().unwrap_or_else(|| current.name.clone()),
            account_type: request.account_type.unwrap_or(current.account_type),
            description: request.description.clone().or_else(|| current.description.clone()),
            updated_at: now,
            ..current.clone()
        })
    }

    fn matches(&self, filter: &AccountFilter) -> bool {
        filter.account_type.is_none_or(|account_type| self.account_type == account_type)
            && filter.search.as_deref().is_none_or(|search| contains_ci(&self.name, search))
    }

    fn before_delete(&self, tables: &MemoryTables) -> Result<()> {
        if tables.transactions.values().any(|tx| tx.account_id == self.id) {
            return Err(DbError::still_referenced("accounts", "transactions_account_fkey", "transactions"));
        }
        Ok(())
    }
}
