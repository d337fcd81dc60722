use sqlx::Row;

use super::repository::{
    bool_col, check_version, concurrent_modification, decimal_col, new_id, now_rfc3339,
    parse_json_array, to_json, Repository,
};
use crate::errors::AppError;
use crate::models::{CreateProductRequest, Product, ProductFilter, UpdateProductRequest};

pub(super) const PRODUCT_COLUMNS: &str = "id, vendor_id, name, description, category, price, stock, images, tags, is_active, created_at, updated_at, version";

impl Repository {
    /// List products matching the filter.
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        let sql = format!(
            r#"SELECT {} FROM products
               WHERE (?1 IS NULL OR vendor_id = ?1)
                 AND (?2 IS NULL OR category = ?2 COLLATE NOCASE)
                 AND (?3 = 0 OR is_active = 1)
               ORDER BY created_at DESC, name"#,
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&filter.vendor_id)
            .bind(&filter.category)
            .bind(filter.active_only.unwrap_or(false) as i32)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(product_from_row).collect())
    }

    /// Get a product by ID.
    pub async fn get_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        let sql = format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(product_from_row))
    }

    /// Get a product that must exist.
    pub async fn require_product(&self, id: &str) -> Result<Product, AppError> {
        self.get_product(id)
            .await?
            .ok_or_else(|| AppError::not_found("Product", id))
    }

    /// Create a new product.
    pub async fn create_product(&self, request: &CreateProductRequest) -> Result<Product, AppError> {
        let id = new_id();
        let now = now_rfc3339();

        sqlx::query(
            "INSERT INTO products (id, vendor_id, name, description, category, price, stock, images, tags, is_active, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"
        )
        .bind(&id)
        .bind(&request.vendor_id)
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(request.category.trim())
        .bind(request.price.to_string())
        .bind(request.stock)
        .bind(to_json(&request.images))
        .bind(to_json(&request.tags))
        .bind(request.is_active as i32)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Product {
            id,
            vendor_id: request.vendor_id.clone(),
            name: request.name.trim().to_string(),
            description: request.description.clone(),
            category: request.category.trim().to_string(),
            price: request.price,
            stock: request.stock,
            images: request.images.clone(),
            tags: request.tags.clone(),
            is_active: request.is_active,
            created_at: now.clone(),
            updated_at: now,
            version: 1,
        })
    }

    /// Update a product with optimistic concurrency control.
    pub async fn update_product(
        &self,
        id: &str,
        request: &UpdateProductRequest,
    ) -> Result<Product, AppError> {
        let existing = self.require_product(id).await?;
        check_version(request.expected_version, existing.version)?;

        let now = now_rfc3339();
        let new_version = existing.version + 1;

        let name = request
            .name
            .as_ref()
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let description = request.description.clone().or(existing.description);
        let category = request
            .category
            .as_ref()
            .map(|c| c.trim().to_string())
            .unwrap_or(existing.category);
        let price = request.price.unwrap_or(existing.price);
        let stock = request.stock.unwrap_or(existing.stock);
        let images = request.images.clone().unwrap_or(existing.images);
        let tags = request.tags.clone().unwrap_or(existing.tags);
        let is_active = request.is_active.unwrap_or(existing.is_active);

        let result = sqlx::query(
            "UPDATE products SET name = ?, description = ?, category = ?, price = ?, stock = ?, images = ?, tags = ?, is_active = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?"
        )
        .bind(&name)
        .bind(&description)
        .bind(&category)
        .bind(price.to_string())
        .bind(stock)
        .bind(to_json(&images))
        .bind(to_json(&tags))
        .bind(is_active as i32)
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_product(id).await?;
            return Err(concurrent_modification(current.map(|p| p.version)));
        }

        self.increment_revision().await?;

        Ok(Product {
            id: id.to_string(),
            vendor_id: existing.vendor_id,
            name,
            description,
            category,
            price,
            stock,
            images,
            tags,
            is_active,
            created_at: existing.created_at,
            updated_at: now,
            version: new_version,
        })
    }

    /// Delete a product.
    pub async fn delete_product(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Product", id));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

pub(super) fn product_from_row(row: &sqlx::sqlite::SqliteRow) -> Product {
    let images: Option<String> = row.get("images");
    let tags: Option<String> = row.get("tags");
    Product {
        id: row.get("id"),
        vendor_id: row.get("vendor_id"),
        name: row.get("name"),
        description: row.get("description"),
        category: row.get("category"),
        price: decimal_col(row, "price"),
        stock: row.get("stock"),
        images: images.map(|s| parse_json_array(&s)).unwrap_or_default(),
        tags: tags.map(|s| parse_json_array(&s)).unwrap_or_default(),
        is_active: bool_col(row, "is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
