//! Money accounts (cash boxes, bank accounts, mobile money wallets).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{ListFilter, TenantScoped};
use crate::api::models::pagination::Pagination;
use crate::types::CompanyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Cash,
    Bank,
    MobileMoney,
    Credit,
}

/// `balance` is maintained by transaction writes and is never set directly after creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub name: String,
    pub account_type: AccountType,
    pub currency: String,
    pub balance: Decimal,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCreate {
    pub name: String,
    pub account_type: AccountType,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub opening_balance: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountFilter {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub account_type: Option<AccountType>,
    /// Substring match on name
    pub search: Option<String>,
}

impl ListFilter for AccountFilter {
    fn pagination(&self) -> &Pagination {
        &self.pagination
    }
}

impl TenantScoped for Account {
    const RESOURCE: &'static str = "Account";
    const TABLE: &'static str = "accounts";

    type Create = AccountCreate;
    type Update = AccountUpdate;
    type Filter = AccountFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn company_id(&self) -> CompanyId {
        self.company_id
    }
}
