//! Bills of materials: what goes into a finished product and what it costs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

use super::{ListFilter, TenantScoped};
use crate::api::models::pagination::Pagination;
use crate::types::CompanyId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomItem {
    pub material_name: String,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub unit_cost: Decimal,
}

impl BomItem {
    pub fn line_cost(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_cost)
    }
}

/// Sum of line costs. Stored alongside the items and recomputed whenever they change.
///
/// `None` if any line or the running total overflows.
pub fn total_cost(items: &[BomItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.line_cost()?))
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BillOfMaterial {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub product_name: String,
    pub items: Json<Vec<BomItem>>,
    pub total_cost: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillOfMaterialCreate {
    pub product_name: String,
    pub items: Vec<BomItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillOfMaterialUpdate {
    pub product_name: Option<String>,
    pub items: Option<Vec<BomItem>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillOfMaterialFilter {
    #[serde(flatten)]
    pub pagination: Pagination,
    /// Substring match on product name
    pub search: Option<String>,
}

impl ListFilter for BillOfMaterialFilter {
    fn pagination(&self) -> &Pagination {
        &self.pagination
    }
}

impl TenantScoped for BillOfMaterial {
    const RESOURCE: &'static str = "Bill of materials";
    const TABLE: &'static str = "bills_of_materials";

    type Create = BillOfMaterialCreate;
    type Update = BillOfMaterialUpdate;
    type Filter = BillOfMaterialFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn company_id(&self) -> CompanyId {
        self.company_id
    }
}
