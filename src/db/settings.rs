use sqlx::Row;

use super::repository::{
    check_version, concurrent_modification, decimal_col, now_rfc3339, opt_decimal_col, Repository,
};
use crate::errors::AppError;
use crate::models::{StoreSettings, UpdateSettingsRequest};

impl Repository {
    /// The store settings row (seeded by migrations).
    pub async fn get_settings(&self) -> Result<StoreSettings, AppError> {
        let row = sqlx::query(
            "SELECT store_name, currency, tax_rate, commission_rate, free_shipping_threshold, support_email, updated_at, version FROM store_settings WHERE id = 1"
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Internal("Store settings row is missing".to_string()))?;
        Ok(settings_from_row(&row))
    }

    /// Update store settings with optimistic concurrency control.
    pub async fn update_settings(
        &self,
        request: &UpdateSettingsRequest,
    ) -> Result<StoreSettings, AppError> {
        let existing = self.get_settings().await?;
        check_version(request.expected_version, existing.version)?;

        let updated = StoreSettings {
            store_name: request
                .store_name
                .as_ref()
                .map(|n| n.trim().to_string())
                .unwrap_or(existing.store_name),
            currency: request
                .currency
                .as_ref()
                .map(|c| c.trim().to_uppercase())
                .unwrap_or(existing.currency),
            tax_rate: request.tax_rate.unwrap_or(existing.tax_rate),
            commission_rate: request.commission_rate.unwrap_or(existing.commission_rate),
            free_shipping_threshold: request
                .free_shipping_threshold
                .or(existing.free_shipping_threshold),
            support_email: request.support_email.clone().or(existing.support_email),
            updated_at: now_rfc3339(),
            version: existing.version + 1,
        };

        let result = sqlx::query(
            "UPDATE store_settings SET store_name = ?, currency = ?, tax_rate = ?, commission_rate = ?, free_shipping_threshold = ?, support_email = ?, updated_at = ?, version = ? WHERE id = 1 AND version = ?"
        )
        .bind(&updated.store_name)
        .bind(&updated.currency)
        .bind(updated.tax_rate.to_string())
        .bind(updated.commission_rate.to_string())
        .bind(updated.free_shipping_threshold.map(|d| d.to_string()))
        .bind(&updated.support_email)
        .bind(&updated.updated_at)
        .bind(updated.version)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_settings().await?;
            return Err(concurrent_modification(Some(current.version)));
        }

        self.increment_revision().await?;
        Ok(updated)
    }
}

fn settings_from_row(row: &sqlx::sqlite::SqliteRow) -> StoreSettings {
    StoreSettings {
        store_name: row.get("store_name"),
        currency: row.get("currency"),
        tax_rate: decimal_col(row, "tax_rate"),
        commission_rate: decimal_col(row, "commission_rate"),
        free_shipping_threshold: opt_decimal_col(row, "free_shipping_threshold"),
        support_email: row.get("support_email"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
