//! Database repository for Telegram user links.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    PgStore,
    errors::{DbError, Result},
    handlers::{fetch_page, repository::TenantRepository},
    memory::{MemoryRecord, MemoryTables},
    models::telegram::{TelegramUserLink, TelegramUserLinkCreate, TelegramUserLinkFilter, TelegramUserLinkUpdate},
};
use crate::types::{CompanyId, abbrev_uuid};

const TABLE: &str = "telegram_user_links";
const CHAT_KEY: &str = "telegram_user_links_chat_key";

fn push_filters(query: &mut QueryBuilder<'static, Postgres>, company_id: CompanyId, filter: &TelegramUserLinkFilter) {
    query.push(" WHERE company_id = ").push_bind(company_id);
    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(chat_id) = filter.chat_id {
        query.push(" AND telegram_chat_id = ").push_bind(chat_id);
    }
}

#[async_trait::async_trait]
impl TenantRepository<TelegramUserLink> for PgStore {
    #[instrument(skip(self, request), fields(company_id = %abbrev_uuid(&company_id), user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&self, company_id: CompanyId, request: &TelegramUserLinkCreate) -> Result<TelegramUserLink> {
        let link = sqlx::query_as::<_, TelegramUserLink>(
            r#"
            INSERT INTO telegram_user_links (id, company_id, user_id, telegram_chat_id, telegram_username)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(request.user_id)
        .bind(request.telegram_chat_id)
        .bind(&request.telegram_username)
        .fetch_one(self.pool())
        .await?;
        Ok(link)
    }

    #[instrument(skip(self), fields(link_id = %abbrev_uuid(&id)), err)]
    async fn get(&self, company_id: CompanyId, id: Uuid) -> Result<Option<TelegramUserLink>> {
        let link =
            sqlx::query_as::<_, TelegramUserLink>("SELECT * FROM telegram_user_links WHERE id = $1 AND company_id = $2")
                .bind(id)
                .bind(company_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(link)
    }

    #[instrument(skip(self, filter), fields(company_id = %abbrev_uuid(&company_id)), err)]
    async fn list(&self, company_id: CompanyId, filter: &TelegramUserLinkFilter) -> Result<(Vec<TelegramUserLink>, i64)> {
        fetch_page(self.pool(), TABLE, &filter.pagination, |query| {
            push_filters(query, company_id, filter)
        })
        .await
    }

    #[instrument(skip(self, request), fields(link_id = %abbrev_uuid(&id)), err)]
    async fn update(
        &self,
        company_id: CompanyId,
        id: Uuid,
        request: &TelegramUserLinkUpdate,
    ) -> Result<Option<TelegramUserLink>> {
        let link = sqlx::query_as::<_, TelegramUserLink>(
            r#"
            UPDATE telegram_user_links SET
                telegram_chat_id = COALESCE($3, telegram_chat_id),
                telegram_username = COALESCE($4, telegram_username),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(company_id)
        .bind(request.telegram_chat_id)
        .bind(&request.telegram_username)
        .fetch_optional(self.pool())
        .await?;
        Ok(link)
    }

    #[instrument(skip(self), fields(link_id = %abbrev_uuid(&id)), err)]
    async fn delete(&self, company_id: CompanyId, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM telegram_user_links WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn chat_taken(tables: &MemoryTables, chat_id: i64, except: Option<Uuid>) -> bool {
    tables
        .telegram_links
        .values()
        .any(|link| link.telegram_chat_id == chat_id && Some(link.id) != except)
}

impl MemoryRecord for TelegramUserLink {
    fn table(tables: &MemoryTables) -> &std::collections::HashMap<Uuid, Self> {
        &tables.telegram_links
    }

    fn table_mut(tables: &mut MemoryTables) -> &mut std::collections::HashMap<Uuid, Self> {
        &mut tables.telegram_links
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn build(
        tables: &MemoryTables,
        company_id: CompanyId,
        request: &TelegramUserLinkCreate,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        tables.require_user(company_id, request.user_id, TABLE, "telegram_user_links_user_fkey")?;
        if chat_taken(tables, request.telegram_chat_id, None) {
            return Err(DbError::unique(TABLE, CHAT_KEY));
        }
        Ok(TelegramUserLink {
            id: Uuid::new_v4(),
            company_id,
            user_id: request.user_id,
            telegram_chat_id: request.telegram_chat_id,
            telegram_username: request.telegram_username.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn apply(
        tables: &MemoryTables,
        current: &Self,
        request: &TelegramUserLinkUpdate,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if let Some(chat_id) = request.telegram_chat_id
            && chat_taken(tables, chat_id, Some(current.id))
        {
            return Err(DbError::unique(TABLE, CHAT_KEY));
        }
        Ok(TelegramUserLink {
            telegram_chat_id: request.telegram_chat_id.unwrap_or(current.telegram_chat_id),
            telegram_username: request
                .telegram_username
                .clone()
                .or_else(|| current.telegram_username.clone()),
            updated_at: now,
            ..current.clone()
        })
    }

    fn matches(&self, filter: &TelegramUserLinkFilter) -> bool {
        filter.user_id.is_none_or(|user_id| self.user_id == user_id)
            && filter.chat_id.is_none_or(|chat_id| self.telegram_chat_id == chat_id)
    }
}
