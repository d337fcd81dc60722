//! Admin and vendor dashboard endpoints.

use axum::extract::{Path, State};

use super::{error, success, ApiResult};
use crate::models::{
    AdminStats, Order, OrderFilter, PayoutFilter, Product, ProductFilter, RevisionInfo,
    VendorPayment, VendorSummary,
};
use crate::AppState;

/// GET /api/revision - Lightweight change detection for polling clients.
pub async fn get_revision(State(state): State<AppState>) -> ApiResult<RevisionInfo> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_revision_info().await {
        Ok(info) => success(info, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/dashboard/stats
pub async fn admin_stats(State(state): State<AppState>) -> ApiResult<AdminStats> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.admin_stats().await {
        Ok(stats) => success(stats, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/vendors/{id}/products
pub async fn vendor_products(
    State(state): State<AppState>,
    Path(vendor_id): Path<String>,
) -> ApiResult<Vec<Product>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let filter = ProductFilter {
        vendor_id: Some(vendor_id),
        ..Default::default()
    };
    match state.repo.list_products(&filter).await {
        Ok(products) => success(products, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/vendors/{id}/orders - Orders with this vendor's lines only.
pub async fn vendor_orders(
    State(state): State<AppState>,
    Path(vendor_id): Path<String>,
) -> ApiResult<Vec<Order>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let filter = OrderFilter {
        vendor_id: Some(vendor_id),
        ..Default::default()
    };
    match state.repo.list_orders(&filter).await {
        Ok(orders) => success(orders, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/vendors/{id}/summary
pub async fn vendor_summary(
    State(state): State<AppState>,
    Path(vendor_id): Path<String>,
) -> ApiResult<VendorSummary> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.vendor_summary(&vendor_id).await {
        Ok(summary) => success(summary, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/vendors/{id}/payouts
pub async fn vendor_payouts(
    State(state): State<AppState>,
    Path(vendor_id): Path<String>,
) -> ApiResult<Vec<VendorPayment>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let filter = PayoutFilter {
        vendor_id: Some(vendor_id),
        ..Default::default()
    };
    match state.repo.list_payouts(&filter).await {
        Ok(payouts) => success(payouts, revision_id),
        Err(e) => error(e, revision_id),
    }
}
