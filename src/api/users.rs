//! User API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateUserRequest, UpdateUserRequest, User, UserFilter, UserRole};
use crate::AppState;

/// GET /api/users - List users, optionally by role.
pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Vec<User>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_users(&filter).await {
        Ok(users) => success(users, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/users/{id} - Get a single user.
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_user(&id).await {
        Ok(Some(user)) => success(user, revision_id),
        Ok(None) => error(AppError::not_found("User", &id), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/users - Register a user.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = validate_new_user(&request) {
        return error(e, revision_id);
    }

    match state.repo.create_user(&request).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, role = user.role.as_str(), "User created");
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(user, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/users/{id} - Update a user.
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Some(email) = &request.email {
        if !looks_like_email(email) {
            return error(
                AppError::Validation("A valid email is required".to_string()),
                revision_id,
            );
        }
    }

    match state.repo.update_user(&id, &request).await {
        Ok(user) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(user, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/users/{id} - Delete a user.
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.delete_user(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

fn validate_new_user(request: &CreateUserRequest) -> Result<(), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if !looks_like_email(&request.email) {
        return Err(AppError::Validation("A valid email is required".to_string()));
    }
    if request.role == UserRole::Vendor
        && request
            .store_name
            .as_deref()
            .map_or(true, |s| s.trim().is_empty())
    {
        return Err(AppError::Validation(
            "Vendors must have a store name".to_string(),
        ));
    }
    if let Some(field) = request
        .shipping_address
        .as_ref()
        .and_then(|a| a.missing_field())
    {
        return Err(AppError::Validation(format!(
            "Shipping address {} is required",
            field
        )));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
