//! HTTP request handlers for all API endpoints.
//!
//! Each handler:
//! - resolves the caller through an extractor ([`TenantSession`](crate::auth::current_user::TenantSession)
//!   or [`Authorized`](crate::auth::permissions::Authorized)),
//! - performs one storage operation scoped to the caller's company,
//! - wraps the result in the [`ApiResponse`](crate::api::response::ApiResponse) envelope.
//!
//! # Handler Modules
//!
//! - [`auth`]: Registration, login, logout, current user, password change
//! - [`two_factor`]: Two-factor and device-trust endpoints
//! - [`companies`]: The caller's company profile
//! - [`users`]: Company members
//! - [`tenant`]: Generic CRUD, instantiated for every business resource below
//! - [`accounts`], [`transactions`], [`boms`], [`purchases`], [`vendors`], [`projects`],
//!   [`telegram`]: Per-resource routes, role gates and validation
//! - [`audit_logs`]: Audit trail
//! - [`reports`]: Debt report
//! - [`site`]: `robots.txt` and health check
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which converts to the failure envelope with the
//! matching HTTP status.

use axum::Router;

use crate::AppState;
use crate::db::models::{
    accounts::Account, boms::BillOfMaterial, projects::Project, purchases::MaterialPurchase,
    telegram::TelegramUserLink, transactions::Transaction, vendors::ShopVendor,
};

pub mod accounts;
pub mod audit_logs;
pub mod auth;
pub mod boms;
pub mod companies;
pub mod projects;
pub mod purchases;
pub mod reports;
pub mod site;
pub mod telegram;
pub mod tenant;
pub mod transactions;
pub mod two_factor;
pub mod users;
pub mod vendors;

/// CRUD routes for every tenant resource.
pub fn tenant_routes() -> Router<AppState> {
    Router::new()
        .merge(tenant::routes::<Account>())
        .merge(tenant::routes::<Transaction>())
        .merge(tenant::routes::<BillOfMaterial>())
        .merge(tenant::routes::<MaterialPurchase>())
        .merge(tenant::routes::<ShopVendor>())
        .merge(tenant::routes::<Project>())
        .merge(tenant::routes::<TelegramUserLink>())
}
