use chrono::{DateTime, Utc};
use sqlx::Row;

use super::repository::{
    bool_col, check_version, concurrent_modification, decimal_col, new_id, now_rfc3339, Repository,
};
use crate::errors::AppError;
use crate::models::{CreateDealRequest, Deal, DealFilter, UpdateDealRequest};

const DEAL_COLUMNS: &str = "id, product_id, title, discount_percent, start_date, end_date, is_active, created_at, updated_at, version";

impl Repository {
    /// List deals, optionally for one product and/or only those live at `now`.
    pub async fn list_deals(
        &self,
        filter: &DealFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<Deal>, AppError> {
        let sql = format!(
            "SELECT {} FROM deals WHERE (?1 IS NULL OR product_id = ?1) ORDER BY start_date",
            DEAL_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&filter.product_id)
            .fetch_all(&self.pool)
            .await?;

        let deals = rows.iter().map(deal_from_row);
        Ok(if filter.live.unwrap_or(false) {
            deals.filter(|d| d.is_live_at(now)).collect()
        } else {
            deals.collect()
        })
    }

    /// Deals attached to a product, live or not.
    pub async fn deals_for_product(&self, product_id: &str) -> Result<Vec<Deal>, AppError> {
        let sql = format!("SELECT {} FROM deals WHERE product_id = ?", DEAL_COLUMNS);
        let rows = sqlx::query(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(deal_from_row).collect())
    }

    /// Get a deal by ID.
    pub async fn get_deal(&self, id: &str) -> Result<Option<Deal>, AppError> {
        let sql = format!("SELECT {} FROM deals WHERE id = ?", DEAL_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(deal_from_row))
    }

    /// Create a new deal.
    pub async fn create_deal(&self, request: &CreateDealRequest) -> Result<Deal, AppError> {
        let now = now_rfc3339();
        let deal = Deal {
            id: new_id(),
            product_id: request.product_id.clone(),
            title: request.title.trim().to_string(),
            discount_percent: request.discount_percent,
            start_date: request.start_date,
            end_date: request.end_date,
            is_active: request.is_active,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        };
        validate_deal_terms(&deal)?;

        sqlx::query(
            "INSERT INTO deals (id, product_id, title, discount_percent, start_date, end_date, is_active, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"
        )
        .bind(&deal.id)
        .bind(&deal.product_id)
        .bind(&deal.title)
        .bind(deal.discount_percent.to_string())
        .bind(deal.start_date)
        .bind(deal.end_date)
        .bind(deal.is_active as i32)
        .bind(&deal.created_at)
        .bind(&deal.updated_at)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;
        Ok(deal)
    }

    /// Update a deal with optimistic concurrency control.
    pub async fn update_deal(&self, id: &str, request: &UpdateDealRequest) -> Result<Deal, AppError> {
        let existing = self
            .get_deal(id)
            .await?
            .ok_or_else(|| AppError::not_found("Deal", id))?;
        check_version(request.expected_version, existing.version)?;

        let updated = Deal {
            id: existing.id.clone(),
            product_id: existing.product_id.clone(),
            title: request
                .title
                .as_ref()
                .map(|t| t.trim().to_string())
                .unwrap_or(existing.title),
            discount_percent: request.discount_percent.unwrap_or(existing.discount_percent),
            start_date: request.start_date.unwrap_or(existing.start_date),
            end_date: request.end_date.unwrap_or(existing.end_date),
            is_active: request.is_active.unwrap_or(existing.is_active),
            created_at: existing.created_at,
            updated_at: now_rfc3339(),
            version: existing.version + 1,
        };
        validate_deal_terms(&updated)?;

        let result = sqlx::query(
            "UPDATE deals SET title = ?, discount_percent = ?, start_date = ?, end_date = ?, is_active = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?"
        )
        .bind(&updated.title)
        .bind(updated.discount_percent.to_string())
        .bind(updated.start_date)
        .bind(updated.end_date)
        .bind(updated.is_active as i32)
        .bind(&updated.updated_at)
        .bind(updated.version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_deal(id).await?;
            return Err(concurrent_modification(current.map(|d| d.version)));
        }

        self.increment_revision().await?;
        Ok(updated)
    }

    /// Delete a deal.
    pub async fn delete_deal(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM deals WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Deal", id));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

/// Percent in (0, 100] and a non-empty window.
fn validate_deal_terms(deal: &Deal) -> Result<(), AppError> {
    use rust_decimal::Decimal;

    if deal.title.trim().is_empty() {
        return Err(AppError::Validation("Deal title is required".to_string()));
    }
    if deal.discount_percent <= Decimal::ZERO || deal.discount_percent > Decimal::ONE_HUNDRED {
        return Err(AppError::Validation(
            "Deal discount must be between 0 and 100 percent".to_string(),
        ));
    }
    if deal.end_date <= deal.start_date {
        return Err(AppError::Validation(
            "End date must be after start date".to_string(),
        ));
    }
    Ok(())
}

fn deal_from_row(row: &sqlx::sqlite::SqliteRow) -> Deal {
    Deal {
        id: row.get("id"),
        product_id: row.get("product_id"),
        title: row.get("title"),
        discount_percent: decimal_col(row, "discount_percent"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        is_active: bool_col(row, "is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
