use sqlx::Row;

use super::repository::{
    bool_col, check_version, concurrent_modification, decimal_col, new_id, now_rfc3339, Repository,
};
use crate::errors::AppError;
use crate::models::{CreateShippingMethodRequest, ShippingMethod, UpdateShippingMethodRequest};

const SHIPPING_COLUMNS: &str =
    "id, name, description, price, estimated_days, is_active, updated_at, version";

impl Repository {
    /// List shipping methods, cheapest first.
    pub async fn list_shipping_methods(
        &self,
        active_only: bool,
    ) -> Result<Vec<ShippingMethod>, AppError> {
        let sql = format!(
            "SELECT {} FROM shipping_methods WHERE (?1 = 0 OR is_active = 1)",
            SHIPPING_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(active_only as i32)
            .fetch_all(&self.pool)
            .await?;

        // Prices are stored as text, so order numerically here.
        let mut methods: Vec<ShippingMethod> = rows.iter().map(shipping_from_row).collect();
        methods.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.name.cmp(&b.name)));
        Ok(methods)
    }

    pub async fn get_shipping_method(&self, id: &str) -> Result<Option<ShippingMethod>, AppError> {
        let sql = format!("SELECT {} FROM shipping_methods WHERE id = ?", SHIPPING_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(shipping_from_row))
    }

    pub async fn create_shipping_method(
        &self,
        request: &CreateShippingMethodRequest,
    ) -> Result<ShippingMethod, AppError> {
        let id = new_id();
        let now = now_rfc3339();

        sqlx::query(
            "INSERT INTO shipping_methods (id, name, description, price, estimated_days, is_active, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, 1)"
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(request.price.to_string())
        .bind(request.estimated_days)
        .bind(request.is_active as i32)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(ShippingMethod {
            id,
            name: request.name.trim().to_string(),
            description: request.description.clone(),
            price: request.price,
            estimated_days: request.estimated_days,
            is_active: request.is_active,
            updated_at: now,
            version: 1,
        })
    }

    pub async fn update_shipping_method(
        &self,
        id: &str,
        request: &UpdateShippingMethodRequest,
    ) -> Result<ShippingMethod, AppError> {
        let existing = self
            .get_shipping_method(id)
            .await?
            .ok_or_else(|| AppError::not_found("Shipping method", id))?;
        check_version(request.expected_version, existing.version)?;

        let updated = ShippingMethod {
            id: existing.id.clone(),
            name: request
                .name
                .as_ref()
                .map(|n| n.trim().to_string())
                .unwrap_or(existing.name),
            description: request.description.clone().or(existing.description),
            price: request.price.unwrap_or(existing.price),
            estimated_days: request.estimated_days.or(existing.estimated_days),
            is_active: request.is_active.unwrap_or(existing.is_active),
            updated_at: now_rfc3339(),
            version: existing.version + 1,
        };

        let result = sqlx::query(
            "UPDATE shipping_methods SET name = ?, description = ?, price = ?, estimated_days = ?, is_active = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?"
        )
        .bind(&updated.name)
        .bind(&updated.description)
        .bind(updated.price.to_string())
        .bind(updated.estimated_days)
        .bind(updated.is_active as i32)
        .bind(&updated.updated_at)
        .bind(updated.version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_shipping_method(id).await?;
            return Err(concurrent_modification(current.map(|m| m.version)));
        }

        self.increment_revision().await?;
        Ok(updated)
    }

    pub async fn delete_shipping_method(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM shipping_methods WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Shipping method", id));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

fn shipping_from_row(row: &sqlx::sqlite::SqliteRow) -> ShippingMethod {
    ShippingMethod {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price: decimal_col(row, "price"),
        estimated_days: row.get("estimated_days"),
        is_active: bool_col(row, "is_active"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
