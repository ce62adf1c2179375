//! API response models for reports.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outstanding payables towards one vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorDebt {
    /// `None` for purchases recorded without a vendor
    pub vendor_id: Option<Uuid>,
    pub vendor_name: String,
    pub purchase_count: usize,
    pub outstanding: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtReport {
    /// Sorted by `outstanding`, largest first
    pub vendors: Vec<VendorDebt>,
    pub total_outstanding: Decimal,
}
