//! Raw-material purchases, optionally on credit from a shop vendor.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use sqlx::FromRow;
use uuid::Uuid;

use super::{ListFilter, TenantScoped};
use crate::api::models::pagination::Pagination;
use crate::types::CompanyId;

/// `total_amount` is `quantity * unit_price`, computed on insert and never edited.
/// `amount_paid` stays within `0..=total_amount`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MaterialPurchase {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub vendor_id: Option<Uuid>,
    pub material_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaterialPurchase {
    pub fn outstanding(&self) -> Decimal {
        self.total_amount - self.amount_paid
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialPurchaseCreate {
    pub vendor_id: Option<Uuid>,
    pub material_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub amount_paid: Decimal,
    /// Defaults to today (UTC)
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl MaterialPurchaseCreate {
    /// `None` when `quantity * unit_price` does not fit in a [`Decimal`].
    pub fn total_amount(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_price)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialPurchaseUpdate {
    pub material_name: Option<String>,
    pub amount_paid: Option<Decimal>,
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialPurchaseFilter {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub vendor_id: Option<Uuid>,
    /// Only purchases with an outstanding balance
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub unpaid_only: Option<bool>,
}

impl ListFilter for MaterialPurchaseFilter {
    fn pagination(&self) -> &Pagination {
        &self.pagination
    }
}

impl TenantScoped for MaterialPurchase {
    const RESOURCE: &'static str = "Material purchase";
    const TABLE: &'static str = "material_purchases";

    type Create = MaterialPurchaseCreate;
    type Update = MaterialPurchaseUpdate;
    type Filter = MaterialPurchaseFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn company_id(&self) -> CompanyId {
        self.company_id
    }
}
