//! Links between company users and the Telegram chats the bot talks to them in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use sqlx::FromRow;
use uuid::Uuid;

use super::{ListFilter, TenantScoped};
use crate::api::models::pagination::Pagination;
use crate::types::{CompanyId, UserId};

/// A chat id is linked to at most one user across all companies.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TelegramUserLink {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub telegram_chat_id: i64,
    pub telegram_username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUserLinkCreate {
    pub user_id: UserId,
    pub telegram_chat_id: i64,
    pub telegram_username: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramUserLinkUpdate {
    pub telegram_chat_id: Option<i64>,
    pub telegram_username: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramUserLinkFilter {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub user_id: Option<UserId>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub chat_id: Option<i64>,
}

impl ListFilter for TelegramUserLinkFilter {
    fn pagination(&self) -> &Pagination {
        &self.pagination
    }
}

impl TenantScoped for TelegramUserLink {
    const RESOURCE: &'static str = "Telegram link";
    const TABLE: &'static str = "telegram_user_links";

    type Create = TelegramUserLinkCreate;
    type Update = TelegramUserLinkUpdate;
    type Filter = TelegramUserLinkFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn company_id(&self) -> CompanyId {
        self.company_id
    }
}
