//! Reports: `/api/reports/*`.

use std::collections::HashMap;

use axum::{
    Router,
    extract::{RawQuery, State},
    response::Redirect,
    routing::get,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    AppState,
    api::{
        models::reports::{DebtReport, VendorDebt},
        response::ApiResponse,
    },
    auth::permissions::{Authorized, Managers},
    db::{
        handlers::ReportRepository,
        models::{purchases::MaterialPurchase, vendors::ShopVendor},
    },
    errors::{Error, Result},
};

/// Name shown for purchases recorded without a vendor.
pub const UNASSIGNED_VENDOR: &str = "Unassigned";

/// Group outstanding purchase balances by vendor, largest debt first.
///
/// Fails when a sum leaves the range of [`Decimal`].
pub fn summarize_debts(purchases: &[MaterialPurchase], vendors: &[ShopVendor]) -> Result<DebtReport> {
    let overflow = || Error::Internal {
        operation: "sum outstanding purchase balances".to_string(),
    };
    let names: HashMap<Uuid, &str> = vendors.iter().map(|vendor| (vendor.id, vendor.name.as_str())).collect();

    let mut by_vendor: HashMap<Option<Uuid>, VendorDebt> = HashMap::new();
    for purchase in purchases.iter().filter(|purchase| purchase.outstanding() > Decimal::ZERO) {
        let entry = by_vendor.entry(purchase.vendor_id).or_insert_with(|| VendorDebt {
            vendor_id: purchase.vendor_id,
            vendor_name: purchase
                .vendor_id
                .and_then(|id| names.get(&id).copied())
                .unwrap_or(UNASSIGNED_VENDOR)
                .to_string(),
            purchase_count: 0,
            outstanding: Decimal::ZERO,
        });
        entry.purchase_count += 1;
        entry.outstanding = entry
            .outstanding
            .checked_add(purchase.outstanding())
            .ok_or_else(overflow)?;
    }

    let mut vendors: Vec<VendorDebt> = by_vendor.into_values().collect();
    vendors.sort_by(|a, b| {
        b.outstanding
            .cmp(&a.outstanding)
            .then_with(|| a.vendor_name.cmp(&b.vendor_name))
    });
    let total_outstanding = vendors
        .iter()
        .try_fold(Decimal::ZERO, |total, vendor| total.checked_add(vendor.outstanding))
        .ok_or_else(overflow)?;

    Ok(DebtReport {
        vendors,
        total_outstanding,
    })
}

/// `GET /api/reports/debts`
#[tracing::instrument(skip_all)]
pub async fn debts(
    State(state): State<AppState>,
    Authorized(session, ..): Authorized<Managers>,
) -> Result<ApiResponse<DebtReport>> {
    let purchases = state.store.unpaid_purchases(session.company_id).await?;

    let mut vendor_ids: Vec<Uuid> = purchases.iter().filter_map(|purchase| purchase.vendor_id).collect();
    vendor_ids.sort_unstable();
    vendor_ids.dedup();
    let vendors = state.store.vendors_by_ids(session.company_id, &vendor_ids).await?;

    Ok(ApiResponse::ok("Debt report generated", summarize_debts(&purchases, &vendors)?))
}

/// `GET /api/accounting/reports/debts`: old location of the debt report.
pub async fn legacy_debts(RawQuery(query): RawQuery) -> Redirect {
    match query {
        Some(query) if !query.is_empty() => Redirect::temporary(&format!("/api/reports/debts?{query}")),
        _ => Redirect::temporary("/api/reports/debts"),
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports/debts", get(debts))
        .route("/api/accounting/reports/debts", get(legacy_debts))
}
