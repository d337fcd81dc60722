//! Deal endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateDealRequest, Deal, DealFilter, UpdateDealRequest};
use crate::AppState;

/// GET /api/deals - List deals, optionally only live ones or one product's.
pub async fn list_deals(
    State(state): State<AppState>,
    Query(filter): Query<DealFilter>,
) -> ApiResult<Vec<Deal>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_deals(&filter, Utc::now()).await {
        Ok(deals) => success(deals, revision_id),
        Err(e) => error(e, revision_id),
    }
}

pub async fn get_deal(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Deal> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_deal(&id).await {
        Ok(Some(deal)) => success(deal, revision_id),
        Ok(None) => error(AppError::not_found("Deal", &id), revision_id),
        Err(e) => error(e, revision_id),
    }
}

pub async fn create_deal(
    State(state): State<AppState>,
    Json(request): Json<CreateDealRequest>,
) -> ApiResult<Deal> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.create_deal(&request).await {
        Ok(deal) => {
            tracing::info!(deal_id = %deal.id, product_id = %deal.product_id, "Deal created");
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(deal, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

pub async fn update_deal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateDealRequest>,
) -> ApiResult<Deal> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.update_deal(&id, &request).await {
        Ok(deal) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(deal, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

pub async fn delete_deal(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_deal(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
