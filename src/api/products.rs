//! Product catalog endpoints, including search.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::auth::{acting_vendor, ensure_vendor_owns};
use crate::errors::AppError;
use crate::models::{CreateProductRequest, Product, ProductFilter, UpdateProductRequest};
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

const MAX_SEARCH_LIMIT: usize = 100;
const MAX_SEARCH_OFFSET: usize = 10_000;

/// Largest accepted product price and stock level.
const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);
const MAX_STOCK: i64 = 1_000_000_000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearchResponse {
    pub results: Vec<ProductHit>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductHit {
    pub product: Product,
    pub score: f32,
}

/// GET /api/products - List products.
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Vec<Product>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_products(&filter).await {
        Ok(products) => success(products, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/products/{id} - Get a single product.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Product> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_product(&id).await {
        Ok(Some(product)) => success(product, revision_id),
        Ok(None) => error(AppError::not_found("Product", &id), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/products - Create a product for a vendor.
pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateProductRequest>,
) -> ApiResult<Product> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let acting = acting_vendor(&headers);
    if let Err(e) = ensure_vendor_owns(acting.as_deref(), &request.vendor_id, "this product") {
        return error(e, revision_id);
    }
    if let Err(e) = validate_product_fields(
        Some(&request.name),
        Some(&request.category),
        Some(request.price),
        Some(request.stock),
    ) {
        return error(e, revision_id);
    }
    if let Err(e) = state.repo.require_vendor(&request.vendor_id).await {
        let e = match e {
            AppError::NotFound(_) => {
                AppError::Validation(format!("Unknown vendor {}", request.vendor_id))
            }
            other => other,
        };
        return error(e, revision_id);
    }

    match state.repo.create_product(&request).await {
        Ok(product) => {
            if let Err(e) = state.search.index_product(&product).await {
                tracing::warn!("Failed to index product: {}", e);
            }
            tracing::info!(product_id = %product.id, vendor_id = %product.vendor_id, "Product created");

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(product, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/products/{id} - Update a product.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<UpdateProductRequest>,
) -> ApiResult<Product> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = check_owner(&state, &id, &headers).await {
        return error(e, revision_id);
    }
    if let Err(e) = validate_product_fields(
        request.name.as_deref(),
        request.category.as_deref(),
        request.price,
        request.stock,
    ) {
        return error(e, revision_id);
    }

    match state.repo.update_product(&id, &request).await {
        Ok(product) => {
            if let Err(e) = state.search.index_product(&product).await {
                tracing::warn!("Failed to re-index product: {}", e);
            }

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(product, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/products/{id} - Delete a product.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = check_owner(&state, &id, &headers).await {
        return error(e, revision_id);
    }

    match state.repo.delete_product(&id).await {
        Ok(()) => {
            if let Err(e) = state.search.remove_product(&id).await {
                tracing::warn!("Failed to remove product from index: {}", e);
            }

            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/products/search - Full-text search over active products.
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<ProductSearchResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if params.offset > MAX_SEARCH_OFFSET {
        return error(
            AppError::BadRequest(format!("Offset cannot exceed {}", MAX_SEARCH_OFFSET)),
            revision_id,
        );
    }
    let limit = params.limit.clamp(1, MAX_SEARCH_LIMIT);

    let hits = match state.search.search(&params.q, limit, params.offset) {
        Ok(hits) => hits,
        Err(e) => return error(e, revision_id),
    };

    // The index can trail the database briefly; re-check against stored rows.
    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        match state.repo.get_product(&hit.product_id).await {
            Ok(Some(product)) if product.is_active => results.push(ProductHit {
                product,
                score: hit.score,
            }),
            Ok(_) => {}
            Err(e) => return error(e, revision_id),
        }
    }

    let total = results.len();
    success(
        ProductSearchResponse {
            results,
            total,
            limit,
            offset: params.offset,
        },
        revision_id,
    )
}

async fn check_owner(state: &AppState, id: &str, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(acting) = acting_vendor(headers) else {
        return Ok(());
    };
    let product = state.repo.require_product(id).await?;
    ensure_vendor_owns(Some(&acting), &product.vendor_id, &format!("product {}", id))
}

fn validate_product_fields(
    name: Option<&str>,
    category: Option<&str>,
    price: Option<Decimal>,
    stock: Option<i64>,
) -> Result<(), AppError> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if category.is_some_and(|c| c.trim().is_empty()) {
        return Err(AppError::Validation("Category is required".to_string()));
    }
    if price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(AppError::Validation("Price cannot be negative".to_string()));
    }
    if price.is_some_and(|p| p > MAX_PRICE) {
        return Err(AppError::Validation(format!("Price cannot exceed {}", MAX_PRICE)));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::Validation("Stock cannot be negative".to_string()));
    }
    if stock.is_some_and(|s| s > MAX_STOCK) {
        return Err(AppError::Validation(format!("Stock cannot exceed {}", MAX_STOCK)));
    }
    Ok(())
}
