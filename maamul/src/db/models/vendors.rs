//! Shop vendors the company buys materials from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{ListFilter, TenantScoped};
use crate::api::models::pagination::Pagination;
use crate::types::CompanyId;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShopVendor {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopVendorCreate {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopVendorUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShopVendorFilter {
    #[serde(flatten)]
    pub pagination: Pagination,
    /// Substring match on name, phone or email
    pub search: Option<String>,
}

impl ListFilter for ShopVendorFilter {
    fn pagination(&self) -> &Pagination {
        &self.pagination
    }
}

impl TenantScoped for ShopVendor {
    const RESOURCE: &'static str = "Vendor";
    const TABLE: &'static str = "shop_vendors";

    type Create = ShopVendorCreate;
    type Update = ShopVendorUpdate;
    type Filter = ShopVendorFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn company_id(&self) -> CompanyId {
        self.company_id
    }
}
