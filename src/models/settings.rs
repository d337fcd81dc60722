//! Store-wide settings (a single record).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    pub store_name: String,
    /// ISO 4217 code.
    pub currency: String,
    /// Percent applied to the discounted subtotal.
    pub tax_rate: Decimal,
    /// Percent of vendor sales retained by the marketplace.
    pub commission_rate: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_shipping_threshold: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_email: Option<String>,
    pub updated_at: String,
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    #[serde(default)]
    pub commission_rate: Option<Decimal>,
    #[serde(default)]
    pub free_shipping_threshold: Option<Decimal>,
    #[serde(default)]
    pub support_email: Option<String>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}
