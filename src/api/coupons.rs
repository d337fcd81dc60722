//! Coupon management and validation endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    Coupon, CreateCouponRequest, DiscountOutcome, UpdateCouponRequest, ValidateCouponRequest,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponQuery {
    /// Only coupons a shopper could redeem right now.
    #[serde(default)]
    pub valid_only: bool,
}

/// GET /api/coupons - List coupons.
pub async fn list_coupons(
    State(state): State<AppState>,
    Query(query): Query<CouponQuery>,
) -> ApiResult<Vec<Coupon>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_coupons().await {
        Ok(mut coupons) => {
            if query.valid_only {
                let now = Utc::now();
                coupons.retain(|c| c.is_valid_at(now));
            }
            success(coupons, revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/coupons/{id}
pub async fn get_coupon(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Coupon> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_coupon(&id).await {
        Ok(Some(coupon)) => success(coupon, revision_id),
        Ok(None) => error(AppError::not_found("Coupon", &id), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/coupons
pub async fn create_coupon(
    State(state): State<AppState>,
    Json(request): Json<CreateCouponRequest>,
) -> ApiResult<Coupon> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_coupon(&request).await {
        Ok(coupon) => {
            tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(coupon, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/coupons/{id}
pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateCouponRequest>,
) -> ApiResult<Coupon> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_coupon(&id, &request).await {
        Ok(coupon) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(coupon, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/coupons/{id}
pub async fn delete_coupon(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_coupon(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/coupons/validate - Preview the discount a code gives on a subtotal.
///
/// An unknown or unusable code is not an error; the outcome says why nothing applies.
pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(request): Json<ValidateCouponRequest>,
) -> ApiResult<DiscountOutcome> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.find_coupon_by_code(&request.code).await {
        Ok(Some(coupon)) => success(
            coupon.calculate_discount(request.subtotal, Utc::now()),
            revision_id,
        ),
        Ok(None) => success(
            DiscountOutcome::rejected("Invalid coupon code".to_string()),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}
