//! Cart and wishlist endpoints, nested under a user.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    AddCartItemRequest, AddWishlistItemRequest, Cart, ItemCount, SetCartQuantityRequest,
    WishlistEntry,
};
use crate::AppState;

// ==================== CART ====================

/// GET /api/users/{id}/cart
pub async fn get_cart(State(state): State<AppState>, Path(user_id): Path<String>) -> ApiResult<Cart> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = state.repo.require_user(&user_id).await {
        return error(e, revision_id);
    }

    match state.repo.get_cart(&user_id).await {
        Ok(cart) => success(cart, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/users/{id}/cart/items - Add to the quantity already in the cart.
pub async fn add_cart_item(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<AddCartItemRequest>,
) -> ApiResult<Cart> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.quantity < 1 {
        return error(
            AppError::Validation("Quantity must be at least 1".to_string()),
            revision_id,
        );
    }
    if let Err(e) = state.repo.require_user(&user_id).await {
        return error(e, revision_id);
    }

    let result = match state
        .repo
        .add_cart_item(&user_id, &request.product_id, request.quantity)
        .await
    {
        Ok(()) => state.repo.get_cart(&user_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(cart) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(cart, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/users/{id}/cart/items/{product_id} - Set a line's quantity; 0 removes it.
pub async fn set_cart_quantity(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(String, String)>,
    Json(request): Json<SetCartQuantityRequest>,
) -> ApiResult<Cart> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.quantity < 0 {
        return error(
            AppError::Validation("Quantity cannot be negative".to_string()),
            revision_id,
        );
    }

    let result = match state
        .repo
        .set_cart_quantity(&user_id, &product_id, request.quantity)
        .await
    {
        Ok(()) => state.repo.get_cart(&user_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(cart) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(cart, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/users/{id}/cart/items/{product_id}
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(String, String)>,
) -> ApiResult<Cart> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let result = match state.repo.remove_cart_item(&user_id, &product_id).await {
        Ok(()) => state.repo.get_cart(&user_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(cart) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(cart, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/users/{id}/cart
pub async fn clear_cart(State(state): State<AppState>, Path(user_id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.clear_cart(&user_id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/users/{id}/cart/count - Total quantity across cart lines.
pub async fn cart_count(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ItemCount> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.cart_count(&user_id).await {
        Ok(count) => success(ItemCount { count }, revision_id),
        Err(e) => error(e, revision_id),
    }
}

// ==================== WISHLIST ====================

/// GET /api/users/{id}/wishlist
pub async fn list_wishlist(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<WishlistEntry>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = state.repo.require_user(&user_id).await {
        return error(e, revision_id);
    }

    match state.repo.list_wishlist(&user_id).await {
        Ok(entries) => success(entries, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/users/{id}/wishlist - Adding a product twice is a no-op.
pub async fn add_wishlist_item(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<AddWishlistItemRequest>,
) -> ApiResult<Vec<WishlistEntry>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = state.repo.require_user(&user_id).await {
        return error(e, revision_id);
    }

    let result = match state
        .repo
        .add_wishlist_item(&user_id, &request.product_id)
        .await
    {
        Ok(()) => state.repo.list_wishlist(&user_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(entries) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(entries, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/users/{id}/wishlist/{product_id}
pub async fn remove_wishlist_item(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state
        .repo
        .remove_wishlist_item(&user_id, &product_id)
        .await
    {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/users/{id}/wishlist/count
pub async fn wishlist_count(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ItemCount> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.wishlist_count(&user_id).await {
        Ok(count) => success(ItemCount { count }, revision_id),
        Err(e) => error(e, revision_id),
    }
}
