//! Database repository for CRUD operations.
//!
//! `Repository` is split across this module's siblings, one `impl` block per entity.
//! This file holds the shared pieces: the revision counter and row conversion helpers.

use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::errors::AppError;
use crate::models::RevisionInfo;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let now = now_rfc3339();
        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(&now)
            .execute(&self.pool)
            .await?;
        self.get_revision_id().await
    }
}

/// Increment the revision inside an open transaction.
pub(super) async fn increment_revision_tx(tx: &mut Transaction<'_, Sqlite>) -> Result<(), AppError> {
    let now = now_rfc3339();
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(&now)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Fail with a conflict when the caller expects a different version.
pub(super) fn check_version(expected: Option<i64>, current: i64) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected != current => {
            Err(AppError::version_mismatch(expected, current))
        }
        _ => Ok(()),
    }
}

/// Conflict raised when a conditional `UPDATE ... WHERE version = ?` touched no rows.
pub(super) fn concurrent_modification(current_version: Option<i64>) -> AppError {
    AppError::Conflict {
        message: "Concurrent modification detected".to_string(),
        current_version: current_version.unwrap_or(0),
    }
}

pub(super) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(super) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

// Helper functions for row conversion

pub(super) fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

pub(super) fn parse_json_array<T: DeserializeOwned>(s: &str) -> Vec<T> {
    serde_json::from_str(s).unwrap_or_default()
}

pub(super) fn parse_decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap_or_default()
}

pub(super) fn decimal_col(row: &sqlx::sqlite::SqliteRow, column: &str) -> Decimal {
    let raw: String = row.get(column);
    parse_decimal(&raw)
}

pub(super) fn opt_decimal_col(row: &sqlx::sqlite::SqliteRow, column: &str) -> Option<Decimal> {
    let raw: Option<String> = row.get(column);
    raw.map(|s| parse_decimal(&s))
}

pub(super) fn bool_col(row: &sqlx::sqlite::SqliteRow, column: &str) -> bool {
    let raw: i32 = row.get(column);
    raw != 0
}
