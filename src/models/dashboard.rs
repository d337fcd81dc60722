//! Read-only aggregates for dashboards and change detection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}

/// Admin dashboard headline numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: i64,
    pub vendors: i64,
    pub products: i64,
    pub orders: i64,
    pub pending_orders: i64,
    pub revenue: Decimal,
}

/// Earnings position of one vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorSummary {
    pub vendor_id: String,
    pub product_count: i64,
    pub order_count: i64,
    pub gross_sales: Decimal,
    pub commission: Decimal,
    pub net_earnings: Decimal,
    pub paid_out: Decimal,
    pub pending_payouts: Decimal,
    pub balance: Decimal,
}
