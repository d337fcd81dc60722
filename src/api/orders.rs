//! Checkout and order management endpoints.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::auth::acting_vendor;
use crate::db::CheckoutOutcome;
use crate::errors::AppError;
use crate::models::{CheckoutRequest, Order, OrderFilter, UpdateOrderStatusRequest};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionQuery {
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// GET /api/orders - List orders.
///
/// A vendor-scoped request (header or `vendorId`) only sees orders with its
/// products, and only its own lines in them.
pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(mut filter): Query<OrderFilter>,
) -> ApiResult<Vec<Order>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Some(vendor_id) = acting_vendor(&headers) {
        filter.vendor_id = Some(vendor_id);
    }

    match state.repo.list_orders(&filter).await {
        Ok(orders) => success(orders, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Order> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let order = match state.repo.get_order(&id).await {
        Ok(Some(order)) => order,
        Ok(None) => return error(AppError::not_found("Order", &id), revision_id),
        Err(e) => return error(e, revision_id),
    };

    match acting_vendor(&headers) {
        Some(vendor_id) => match order.restricted_to_vendor(&vendor_id) {
            Some(order) => success(order, revision_id),
            None => error(AppError::not_found("Order", &id), revision_id),
        },
        None => success(order, revision_id),
    }
}

/// POST /api/checkout - Place an order from explicit items or the user's cart.
///
/// Replaying a payment reference returns the order it already produced.
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<Order> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.checkout(&request, Utc::now()).await {
        Ok(CheckoutOutcome::Created(order)) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(order, new_revision)
        }
        Ok(CheckoutOutcome::Existing(order)) => success(order, revision_id),
        Err(e) => {
            tracing::info!(user_id = %request.user_id, error = %e, "Checkout rejected");
            error(e, revision_id)
        }
    }
}

/// PUT /api/orders/{id}/status - Advance payment and/or fulfillment status.
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> ApiResult<Order> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.payment_status.is_none() && request.fulfillment_status.is_none() {
        return error(
            AppError::Validation("No status change provided".to_string()),
            revision_id,
        );
    }

    match state.repo.update_order_status(&id, &request).await {
        Ok(order) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(order, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/orders/{id}/cancel - Cancel an unshipped order and restock it.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<VersionQuery>,
) -> ApiResult<Order> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.cancel_order(&id, query.expected_version).await {
        Ok(order) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(order, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/orders/{id}
pub async fn delete_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_order(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
