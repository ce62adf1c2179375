//! Database repository for transactions.
//!
//! Creating or deleting a transaction moves its account's balance in the same database
//! transaction, so `balance` always equals the opening balance plus the signed sum of the
//! account's transactions.

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
        accounts::Account,
        projects::Project,
        transactions::{Transaction, TransactionCreate, TransactionFilter, TransactionUpdate},
    },
};
use crate::types::{CompanyId, abbrev_uuid};

const BALANCE_CHECK: &str = "accounts_balance_range_check";

/// Refuse a balance change that would take the account outside the range of [`Decimal`].
fn check_balance_change(tables: &MemoryTables, account_id: Uuid, change: Decimal) -> Result<()> {
    match tables.accounts.get(&account_id) {
        Some(account) if account.balance.checked_add(change).is_none() => Err(DbError::check("accounts", BALANCE_CHECK)),
        _ => Ok(()),
    }
}

fn move_balance(tables: &mut MemoryTables, account_id: Uuid, change: Decimal, at: DateTime<Utc>) {
    if let Some(account) = tables.accounts.get_mut(&account_id)
        && let Some(balance) = account.balance.checked_add(change)
    {
        account.balance = balance;
        account.updated_at = at;
    }
}

fn push_filters(query: &mut QueryBuilder<'static, Postgres>, company_id: CompanyId, filter: &TransactionFilter) {
    query.push(" WHERE company_id = ").push_bind(company_id);
    if let Some(account_id) = filter.account_id {
        query.push(" AND account_id = ").push_bind(account_id);
    }
    if let Some(project_id) = filter.project_id {
        query.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(kind) = filter.kind {
        query.push(" AND kind = ").push_bind(kind);
    }
    if let Some(from) = filter.from {
        query.push(" AND transaction_date >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        query.push(" AND transaction_date <= ").push_bind(to);
    }
}

#[async_trait::async_trait]
impl TenantRepository<Transaction> for PgStore {
    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&company_id), account_id = %abbrev_uuid(&request.account_id)), err)]
    async fn create(&self, company_id: CompanyId, request: &TransactionCreate) -> Result<Transaction> {
        let mut tx = self.pool().begin().await?;

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (id, company_id, account_id, project_id, kind, amount, category, description, transaction_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, CURRENT_DATE))
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(request.account_id)
        .bind(request.project_id)
        .bind(request.kind)
        .bind(request.amount)
        .bind(&request.category)
        .bind(&request.description)
        .bind(request.transaction_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE accounts SET balance = balance + $1, updated_at = NOW() WHERE id = $2 AND company_id = $3")
            .bind(transaction.balance_effect())
            .bind(transaction.account_id)
            .bind(company_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(transaction)
    }

    #[instrument(skip(self), fields(transaction_id = %abbrev_uuid(&id)), err)]
    async fn get(&self, company_id: CompanyId, id: Uuid) -> Result<Option<Transaction>> {
        let transaction =
            sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1 AND company_id = $2")
                .bind(id)
                .bind(company_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(transaction)
    }

    #[instrument(skip(self, filter), fields(company_id = %abbrev_uuid(&company_id)), err)]
    async fn list(&self, company_id: CompanyId, filter: &TransactionFilter) -> Result<(Vec<Transaction>, i64)> {
        fetch_page(self.pool(), "transactions", &filter.pagination, |query| {
            push_filters(query, company_id, filter)
        })
        .await
    }

    #[instrument(skip(self, request), fields(transaction_id = %abbrev_uuid(&id)), err)]
    async fn update(&self, company_id: CompanyId, id: Uuid, request: &TransactionUpdate) -> Result<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET
                category = COALESCE($3, category),
                description = COALESCE($4, description),
                transaction_date = COALESCE($5, transaction_date),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(&request.category)
        .bind(&request.description)
        .bind(request.transaction_date)
        .fetch_optional(self.pool())
        .await?;
        Ok(transaction)
    }

    #[instrument(skip(self), fields(transaction_id = %abbrev_uuid(&id)), err)]
    async fn delete(&self, company_id: CompanyId, id: Uuid) -> Result<bool> {
        let mut tx = self.pool().begin().await?;

        let deleted = sqlx::query_as::<_, Transaction>(
            "DELETE FROM transactions WHERE id = $1 AND company_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(deleted) = deleted else {
            return Ok(false);
        };

        sqlx::query("UPDATE accounts SET balance = balance - $1, updated_at = NOW() WHERE id = $2 AND company_id = $3")
            .bind(deleted.balance_effect())
            .bind(deleted.account_id)
            .bind(company_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

impl MemoryRecord for Transaction {
    fn table(tables: &MemoryTables) -> &std::collections::HashMap<Uuid, Self> {
        &tables.transactions
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut std::collections::HashMap<Uuid, Self> {
        &mut tables.transactions
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn build(
        tables: &MemoryTables,
        company_id: CompanyId,
        request: &TransactionCreate,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if request.amount <= Decimal::ZERO {
            return Err(DbError::check("transactions", "transactions_amount_check"));
        }
        tables.require::<Account>(company_id, request.account_id, "transactions", "transactions_account_fkey")?;
        if let Some(project_id) = request.project_id {
            tables.require::<Project>(company_id, project_id, "transactions", "transactions_project_fkey")?;
        }
        check_balance_change(tables, request.account_id, request.kind.signed(request.amount))?;
        Ok(Transaction {
            id: Uuid::new_v4(),
            company_id,
            account_id: request.account_id,
            project_id: request.project_id,
            kind: request.kind,
            amount: request.amount,
            category: request.category.clone(),
            description: request.description.clone(),
            transaction_date: request.transaction_date.unwrap_or_else(|| now.date_naive()),
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(_tables: &MemoryTables, current: &Self, request: &TransactionUpdate, now: DateTime<Utc>) -> Result<Self> {
        Ok(Transaction {
            category: request.category.clone().or_else(|| current.category.clone()),
            description: request.description.clone().or_else(|| current.description.clone()),
            transaction_date: request.transaction_date.unwrap_or(current.transaction_date),
            updated_at: now,
            ..current.clone()
        })
    }

    fn matches(&self, filter: &TransactionFilter) -> bool {
        filter.account_id.is_none_or(|id| self.account_id == id)
            && filter.project_id.is_none_or(|id| self.project_id == Some(id))
            && filter.kind.is_none_or(|kind| self.kind == kind)
            && filter.from.is_none_or(|from| self.transaction_date >= from)
            && filter.to.is_none_or(|to| self.transaction_date <= to)
    }

    fn on_insert(&self, tables: &mut MemoryTables) {
        move_balance(tables, self.account_id, self.balance_effect(), self.created_at);
    }

    fn before_delete(&self, tables: &MemoryTables) -> Result<()> {
        check_balance_change(tables, self.account_id, -self.balance_effect())
    }

    fn on_delete(&self, tables: &mut MemoryTables) {
        move_balance(tables, self.account_id, -self.balance_effect(), Utc::now());
    }
}
