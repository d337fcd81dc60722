//! Vendor payout endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreatePayoutRequest, PayoutFilter, UpdatePayoutRequest, VendorPayment};
use crate::AppState;

/// GET /api/payouts - List payouts by vendor and/or status.
pub async fn list_payouts(
    State(state): State<AppState>,
    Query(filter): Query<PayoutFilter>,
) -> ApiResult<Vec<VendorPayment>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_payouts(&filter).await {
        Ok(payouts) => success(payouts, revision_id),
        Err(e) => error(e, revision_id),
    }
}

pub async fn get_payout(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<VendorPayment> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_payout(&id).await {
        Ok(Some(payout)) => success(payout, revision_id),
        Ok(None) => error(AppError::not_found("Payout", &id), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/vendors/{id}/payouts - Request a payout against the vendor's balance.
pub async fn create_payout(
    State(state): State<AppState>,
    Path(vendor_id): Path<String>,
    Json(request): Json<CreatePayoutRequest>,
) -> ApiResult<VendorPayment> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_payout(&vendor_id, &request).await {
        Ok(payout) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(payout, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/payouts/{id} - Mark a payout completed or failed.
pub async fn update_payout(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePayoutRequest>,
) -> ApiResult<VendorPayment> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_payout(&id, &request).await {
        Ok(payout) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(payout, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
