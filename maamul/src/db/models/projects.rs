//! Projects that transactions can be booked against.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{ListFilter, TenantScoped};
use crate::api::models::pagination::Pagination;
use crate::types::CompanyId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Planned,
    Active,
    OnHold,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub budget: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCreate {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    pub budget: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub budget: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFilter {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub status: Option<ProjectStatus>,
    /// Substring match on name
    pub search: Option<String>,
}

impl ListFilter for ProjectFilter {
    fn pagination(&self) -> &Pagination {
        &self.pagination
    }
}

/// A project may not end before it starts. Open-ended ranges are fine.
pub fn dates_ordered(start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => end >= start,
        _ => true,
    }
}

impl TenantScoped for Project {
    const RESOURCE: &'static str = "Project";
    const TABLE: &'static str = "projects";

    type Create = ProjectCreate;
    type Update = ProjectUpdate;
    type Filter = ProjectFilter;

    fn id(&self) -> Uuid {
        self.id
    }

    fn company_id(&self) -> CompanyId {
        self.company_id
    }
}
