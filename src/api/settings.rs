//! Store settings endpoints.

use axum::{extract::State, Json};
use rust_decimal::Decimal;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{StoreSettings, UpdateSettingsRequest};
use crate::AppState;

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<StoreSettings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_settings().await {
        Ok(settings) => success(settings, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> ApiResult<StoreSettings> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let percent_ok = |rate: Option<Decimal>| {
        rate.map_or(true, |r| r >= Decimal::ZERO && r <= Decimal::ONE_HUNDRED)
    };
    if !percent_ok(request.tax_rate) || !percent_ok(request.commission_rate) {
        return error(
            AppError::Validation("Rates must be between 0 and 100".to_string()),
            revision_id,
        );
    }
    if request
        .free_shipping_threshold
        .is_some_and(|t| t < Decimal::ZERO)
    {
        return error(
            AppError::Validation("Free shipping threshold cannot be negative".to_string()),
            revision_id,
        );
    }
    if request
        .store_name
        .as_deref()
        .is_some_and(|n| n.trim().is_empty())
    {
        return error(
            AppError::Validation("Store name cannot be empty".to_string()),
            revision_id,
        );
    }

    match state.repo.update_settings(&request).await {
        Ok(settings) => {
            tracing::info!(version = settings.version, "Store settings updated");
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(settings, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
