use rust_decimal::Decimal;
use sqlx::Row;

use super::repository::{
    check_version, concurrent_modification, decimal_col, increment_revision_tx, new_id,
    now_rfc3339, Repository,
};
use super::stats::vendor_position;
use crate::errors::AppError;
use crate::models::{
    CreatePayoutRequest, PayoutFilter, PayoutStatus, UpdatePayoutRequest, VendorPayment,
};

const PAYOUT_COLUMNS: &str =
    "id, vendor_id, amount, method, status, reference, note, created_at, updated_at, version";

impl Repository {
    /// List payouts, newest first.
    pub async fn list_payouts(&self, filter: &PayoutFilter) -> Result<Vec<VendorPayment>, AppError> {
        let sql = format!(
            r#"SELECT {} FROM vendor_payments
               WHERE (?1 IS NULL OR vendor_id = ?1)
                 AND (?2 IS NULL OR status = ?2)
               ORDER BY created_at DESC"#,
            PAYOUT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&filter.vendor_id)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(payout_from_row).collect())
    }

    pub async fn get_payout(&self, id: &str) -> Result<Option<VendorPayment>, AppError> {
        let sql = format!("SELECT {} FROM vendor_payments WHERE id = ?", PAYOUT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(payout_from_row))
    }

    /// Record a pending payout. The amount may not exceed the vendor's open balance.
    pub async fn create_payout(
        &self,
        vendor_id: &str,
        request: &CreatePayoutRequest,
    ) -> Result<VendorPayment, AppError> {
        if request.amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Payout amount must be greater than zero".to_string(),
            ));
        }
        if request.method.trim().is_empty() {
            return Err(AppError::Validation("Payout method is required".to_string()));
        }

        self.require_vendor(vendor_id).await?;
        let settings = self.get_settings().await?;

        let mut tx = self.pool.begin().await?;

        // Writing first takes the lock, so the balance read below cannot go stale.
        increment_revision_tx(&mut tx).await?;

        let summary = vendor_position(&mut tx, vendor_id, settings.commission_rate).await?;
        if request.amount > summary.balance {
            return Err(AppError::Validation(format!(
                "Payout of {} exceeds available balance {}",
                request.amount, summary.balance
            )));
        }

        let id = new_id();
        let now = now_rfc3339();

        sqlx::query(
            "INSERT INTO vendor_payments (id, vendor_id, amount, method, status, reference, note, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"
        )
        .bind(&id)
        .bind(vendor_id)
        .bind(request.amount.to_string())
        .bind(request.method.trim())
        .bind(PayoutStatus::Pending.as_str())
        .bind(&request.reference)
        .bind(&request.note)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(payout_id = %id, vendor_id, amount = %request.amount, "Payout requested");

        Ok(VendorPayment {
            id,
            vendor_id: vendor_id.to_string(),
            amount: request.amount,
            method: request.method.trim().to_string(),
            status: PayoutStatus::Pending,
            reference: request.reference.clone(),
            note: request.note.clone(),
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }

    /// Settle or fail a payout. Only pending payouts can change status.
    pub async fn update_payout(
        &self,
        id: &str,
        request: &UpdatePayoutRequest,
    ) -> Result<VendorPayment, AppError> {
        let existing = self
            .get_payout(id)
            .await?
            .ok_or_else(|| AppError::not_found("Payout", id))?;
        check_version(request.expected_version, existing.version)?;

        if existing.status != PayoutStatus::Pending && request.status != existing.status {
            return Err(AppError::Validation(format!(
                "Payout is already {}",
                existing.status.as_str()
            )));
        }

        let now = now_rfc3339();
        let new_version = existing.version + 1;
        let reference = request.reference.clone().or(existing.reference);

        let result = sqlx::query(
            "UPDATE vendor_payments SET status = ?, reference = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?"
        )
        .bind(request.status.as_str())
        .bind(&reference)
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_payout(id).await?;
            return Err(concurrent_modification(current.map(|p| p.version)));
        }

        self.increment_revision().await?;

        tracing::info!(payout_id = %id, status = request.status.as_str(), "Payout updated");

        Ok(VendorPayment {
            status: request.status,
            reference,
            updated_at: now,
            version: new_version,
            ..existing
        })
    }
}

fn payout_from_row(row: &sqlx::sqlite::SqliteRow) -> VendorPayment {
    let status: String = row.get("status");
    VendorPayment {
        id: row.get("id"),
        vendor_id: row.get("vendor_id"),
        amount: decimal_col(row, "amount"),
        method: row.get("method"),
        status: PayoutStatus::parse(&status).unwrap_or_default(),
        reference: row.get("reference"),
        note: row.get("note"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
