use sqlx::Row;

use super::repository::{
    bool_col, check_version, concurrent_modification, decimal_col, new_id, now_rfc3339,
    opt_decimal_col, Repository,
};
use crate::errors::AppError;
use crate::models::{Coupon, CreateCouponRequest, DiscountType, UpdateCouponRequest};

const COUPON_COLUMNS: &str = "id, code, description, discount_type, discount_value, max_discount, min_purchase, start_date, end_date, usage_limit, current_usage, is_active, created_at, updated_at, version";

/// Codes are matched case-insensitively and stored upper-case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl Repository {
    /// List all coupons.
    pub async fn list_coupons(&self) -> Result<Vec<Coupon>, AppError> {
        let sql = format!("SELECT {} FROM coupons ORDER BY created_at DESC", COUPON_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(coupon_from_row).collect())
    }

    /// Get a coupon by ID.
    pub async fn get_coupon(&self, id: &str) -> Result<Option<Coupon>, AppError> {
        let sql = format!("SELECT {} FROM coupons WHERE id = ?", COUPON_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(coupon_from_row))
    }

    /// Look a coupon up by its code.
    pub async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, AppError> {
        let sql = format!("SELECT {} FROM coupons WHERE code = ?", COUPON_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(normalize_code(code))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(coupon_from_row))
    }

    /// Create a new coupon.
    pub async fn create_coupon(&self, request: &CreateCouponRequest) -> Result<Coupon, AppError> {
        let id = new_id();
        let now = now_rfc3339();
        let code = normalize_code(&request.code);
        if code.is_empty() {
            return Err(AppError::Validation("Coupon code is required".to_string()));
        }
        crate::pricing::validate_coupon_terms(
            request.discount_type,
            request.discount_value,
            request.max_discount,
            request.min_purchase,
            request.start_date,
            request.end_date,
            request.usage_limit,
        )?;

        sqlx::query(
            "INSERT INTO coupons (id, code, description, discount_type, discount_value, max_discount, min_purchase, start_date, end_date, usage_limit, current_usage, is_active, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, 1)"
        )
        .bind(&id)
        .bind(&code)
        .bind(&request.description)
        .bind(request.discount_type.as_str())
        .bind(request.discount_value.to_string())
        .bind(request.max_discount.map(|d| d.to_string()))
        .bind(request.min_purchase.map(|d| d.to_string()))
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.usage_limit)
        .bind(request.is_active as i32)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Duplicate(_) => AppError::Duplicate(format!("Coupon code {} already exists", code)),
            other => other,
        })?;

        self.increment_revision().await?;

        Ok(Coupon {
            id,
            code,
            description: request.description.clone(),
            discount_type: request.discount_type,
            discount_value: request.discount_value,
            max_discount: request.max_discount,
            min_purchase: request.min_purchase,
            start_date: request.start_date,
            end_date: request.end_date,
            usage_limit: request.usage_limit,
            current_usage: 0,
            is_active: request.is_active,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }

    /// Update a coupon with optimistic concurrency control.
    ///
    /// The merged terms are re-validated before anything is written.
    pub async fn update_coupon(
        &self,
        id: &str,
        request: &UpdateCouponRequest,
    ) -> Result<Coupon, AppError> {
        let existing = self
            .get_coupon(id)
            .await?
            .ok_or_else(|| AppError::not_found("Coupon", id))?;
        check_version(request.expected_version, existing.version)?;

        let now = now_rfc3339();
        let new_version = existing.version + 1;

        let merged = Coupon {
            id: existing.id.clone(),
            code: existing.code.clone(),
            description: request.description.clone().or(existing.description),
            discount_type: request.discount_type.unwrap_or(existing.discount_type),
            discount_value: request.discount_value.unwrap_or(existing.discount_value),
            max_discount: request.max_discount.or(existing.max_discount),
            min_purchase: request.min_purchase.or(existing.min_purchase),
            start_date: request.start_date.unwrap_or(existing.start_date),
            end_date: request.end_date.unwrap_or(existing.end_date),
            usage_limit: request.usage_limit.or(existing.usage_limit),
            current_usage: existing.current_usage,
            is_active: request.is_active.unwrap_or(existing.is_active),
            created_at: existing.created_at,
            updated_at: now,
            version: new_version,
        };

        crate::pricing::validate_coupon_terms(
            merged.discount_type,
            merged.discount_value,
            merged.max_discount,
            merged.min_purchase,
            merged.start_date,
            merged.end_date,
            merged.usage_limit,
        )?;

        let result = sqlx::query(
            "UPDATE coupons SET description = ?, discount_type = ?, discount_value = ?, max_discount = ?, min_purchase = ?, start_date = ?, end_date = ?, usage_limit = ?, is_active = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?"
        )
        .bind(&merged.description)
        .bind(merged.discount_type.as_str())
        .bind(merged.discount_value.to_string())
        .bind(merged.max_discount.map(|d| d.to_string()))
        .bind(merged.min_purchase.map(|d| d.to_string()))
        .bind(merged.start_date)
        .bind(merged.end_date)
        .bind(merged.usage_limit)
        .bind(merged.is_active as i32)
        .bind(&merged.updated_at)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_coupon(id).await?;
            return Err(concurrent_modification(current.map(|c| c.version)));
        }

        self.increment_revision().await?;
        Ok(merged)
    }

    /// Delete a coupon.
    pub async fn delete_coupon(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Coupon", id));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

pub(super) fn coupon_from_row(row: &sqlx::sqlite::SqliteRow) -> Coupon {
    let discount_type: String = row.get("discount_type");
    Coupon {
        id: row.get("id"),
        code: row.get("code"),
        description: row.get("description"),
        discount_type: DiscountType::parse(&discount_type).unwrap_or(DiscountType::Fixed),
        discount_value: decimal_col(row, "discount_value"),
        max_discount: opt_decimal_col(row, "max_discount"),
        min_purchase: opt_decimal_col(row, "min_purchase"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        usage_limit: row.get("usage_limit"),
        current_usage: row.get("current_usage"),
        is_active: bool_col(row, "is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
