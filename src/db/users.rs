use sqlx::Row;

use super::repository::{
    check_version, concurrent_modification, new_id, now_rfc3339, to_json, Repository,
};
use crate::errors::AppError;
use crate::models::{Address, CreateUserRequest, UpdateUserRequest, User, UserFilter, UserRole};

const USER_COLUMNS: &str =
    "id, name, email, role, phone, store_name, shipping_address, created_at, updated_at, version";

impl Repository {
    /// List users, optionally by role.
    pub async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, AppError> {
        let sql = format!(
            "SELECT {} FROM users WHERE (?1 IS NULL OR role = ?1) ORDER BY name",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(filter.role.map(|r| r.as_str()))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get a user that must exist.
    pub async fn require_user(&self, id: &str) -> Result<User, AppError> {
        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    /// Get a user that must exist and be able to sell.
    pub async fn require_vendor(&self, id: &str) -> Result<User, AppError> {
        let user = self.require_user(id).await?;
        if !user.role.can_sell() {
            return Err(AppError::Validation(format!("User {} is not a vendor", id)));
        }
        Ok(user)
    }

    /// Create a new user.
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User, AppError> {
        let id = new_id();
        let now = now_rfc3339();
        let email = request.email.trim().to_lowercase();
        let address_json = request.shipping_address.as_ref().map(to_json);

        sqlx::query(
            "INSERT INTO users (id, name, email, role, phone, store_name, shipping_address, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(&email)
        .bind(request.role.as_str())
        .bind(&request.phone)
        .bind(&request.store_name)
        .bind(&address_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(email_taken)?;

        self.increment_revision().await?;

        Ok(User {
            id,
            name: request.name.trim().to_string(),
            email,
            role: request.role,
            phone: request.phone.clone(),
            store_name: request.store_name.clone(),
            shipping_address: request.shipping_address.clone(),
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }

    /// Update a user with optimistic concurrency control.
    pub async fn update_user(&self, id: &str, request: &UpdateUserRequest) -> Result<User, AppError> {
        let existing = self.require_user(id).await?;
        check_version(request.expected_version, existing.version)?;

        let now = now_rfc3339();
        let new_version = existing.version + 1;

        let name = request
            .name
            .as_ref()
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let email = request
            .email
            .as_ref()
            .map(|e| e.trim().to_lowercase())
            .unwrap_or(existing.email);
        let role = request.role.unwrap_or(existing.role);
        let phone = request.phone.clone().or(existing.phone);
        let store_name = request.store_name.clone().or(existing.store_name);
        let shipping_address = request
            .shipping_address
            .clone()
            .or(existing.shipping_address);

        if role == UserRole::Vendor && store_name.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(AppError::Validation(
                "Vendors must have a store name".to_string(),
            ));
        }

        let address_json = shipping_address.as_ref().map(to_json);

        let result = sqlx::query(
            "UPDATE users SET name = ?, email = ?, role = ?, phone = ?, store_name = ?, shipping_address = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?"
        )
        .bind(&name)
        .bind(&email)
        .bind(role.as_str())
        .bind(&phone)
        .bind(&store_name)
        .bind(&address_json)
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await
        .map_err(email_taken)?;

        if result.rows_affected() == 0 {
            let current = self.get_user(id).await?;
            return Err(concurrent_modification(current.map(|u| u.version)));
        }

        self.increment_revision().await?;

        Ok(User {
            id: id.to_string(),
            name,
            email,
            role,
            phone,
            store_name,
            shipping_address,
            created_at: existing.created_at,
            updated_at: now,
            version: new_version,
        })
    }

    /// Delete a user.
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User", id));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

fn email_taken(err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::Duplicate(_) => AppError::Duplicate("Email is already registered".to_string()),
        other => other,
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let role: String = row.get("role");
    let address: Option<String> = row.get("shipping_address");
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        role: UserRole::parse(&role).unwrap_or_default(),
        phone: row.get("phone"),
        store_name: row.get("store_name"),
        shipping_address: address.and_then(|s| serde_json::from_str::<Address>(&s).ok()),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
