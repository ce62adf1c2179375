//! Income and expense entries against an account.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{ListFilter, TenantScoped};
use crate::api::models::pagination::Pagination;
use crate::types::CompanyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// The change this kind of entry makes to an account balance.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TransactionKind::Income => amount,
            TransactionKind::Expense => -amount,
        }
    }
}

/// Account, kind and amount are fixed at creation; the balance effect is undone on delete.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub account_id: Uuid,
    pub project_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: Option<String>,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn balance_effect(&self) -> Decimal {
        self.kind.signed(self.amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCreate {
    pub account_id: Uuid,
    pub project_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub category: Option<String>,
    pub description: Option<String>,
    /// Defaults to today (UTC)
    pub transaction_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub category: Option<String>,
    pub description: Option<String>,
    pub transaction_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub account_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    /// Inclusive lower bound on `transaction_date`
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on `transaction_date`
    pub to: Option<NaiveDate>,
}

impl ListFilter for TransactionFilter {
    fn pagination(&self) -> &Pagination {
        &self.pagination
    }
}

impl TenantScoped for Transaction {
    const RESOURCE: &'static str = "Transaction";
    const TABLE: &'static str = "transactions";

    type Create = TransactionCreate;
    type Update = TransactionUpdate;
    type Filter = TransactionFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn company_id(&self) -> CompanyId {
        self.company_id
    }
}
