//! Shipping method endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateShippingMethodRequest, ShippingMethod, UpdateShippingMethodRequest};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// GET /api/shipping-methods
pub async fn list_shipping_methods(
    State(state): State<AppState>,
    Query(query): Query<ShippingQuery>,
) -> ApiResult<Vec<ShippingMethod>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_shipping_methods(query.active_only).await {
        Ok(methods) => success(methods, revision_id),
        Err(e) => error(e, revision_id),
    }
}

pub async fn get_shipping_method(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ShippingMethod> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_shipping_method(&id).await {
        Ok(Some(method)) => success(method, revision_id),
        Ok(None) => error(AppError::not_found("Shipping method", &id), revision_id),
        Err(e) => error(e, revision_id),
    }
}

pub async fn create_shipping_method(
    State(state): State<AppState>,
    Json(request): Json<CreateShippingMethodRequest>,
) -> ApiResult<ShippingMethod> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.name.trim().is_empty() {
        return error(
            AppError::Validation("Name is required".to_string()),
            revision_id,
        );
    }
    if request.price < Decimal::ZERO {
        return error(
            AppError::Validation("Price cannot be negative".to_string()),
            revision_id,
        );
    }

    match state.repo.create_shipping_method(&request).await {
        Ok(method) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(method, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

pub async fn update_shipping_method(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateShippingMethodRequest>,
) -> ApiResult<ShippingMethod> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.price.is_some_and(|p| p < Decimal::ZERO) {
        return error(
            AppError::Validation("Price cannot be negative".to_string()),
            revision_id,
        );
    }

    match state.repo.update_shipping_method(&id, &request).await {
        Ok(method) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(method, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

pub async fn delete_shipping_method(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_shipping_method(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
