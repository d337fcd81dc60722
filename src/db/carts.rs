use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use super::products::product_from_row;
use super::repository::{now_rfc3339, Repository};
use crate::errors::AppError;
use crate::models::{Cart, CartLine, Product, WishlistEntry};
use crate::pricing;

impl Repository {
    /// Unit price of a product at `now`, after its best live deal.
    pub async fn effective_price(
        &self,
        product: &Product,
        now: DateTime<Utc>,
    ) -> Result<Decimal, AppError> {
        let deals = self.deals_for_product(&product.id).await?;
        Ok(pricing::best_price(product.price, &deals, now))
    }

    // ==================== CART ====================

    /// The user's cart with current prices.
    pub async fn get_cart(&self, user_id: &str) -> Result<Cart, AppError> {
        let rows = sqlx::query(
            r#"SELECT c.quantity AS cart_quantity, c.added_at AS cart_added_at, p.*
               FROM cart_items c JOIN products p ON p.id = c.product_id
               WHERE c.user_id = ?
               ORDER BY c.added_at"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let product = product_from_row(row);
            let quantity: i64 = row.get("cart_quantity");
            let unit_price = self.effective_price(&product, now).await?;
            items.push(CartLine {
                line_total: pricing::line_total(unit_price, quantity)?,
                product_id: product.id,
                name: product.name,
                unit_price,
                quantity,
                available: product.is_active && product.stock >= quantity,
                added_at: row.get("cart_added_at"),
            });
        }

        let item_count = items.iter().map(|l| l.quantity).sum();
        let subtotal = pricing::sum_money(
            items.iter().filter(|l| l.available).map(|l| l.line_total),
        )?;

        Ok(Cart {
            user_id: user_id.to_string(),
            items,
            item_count,
            subtotal,
        })
    }

    /// Raw (product_id, quantity) pairs in the user's cart.
    pub async fn cart_entries(&self, user_id: &str) -> Result<Vec<(String, i64)>, AppError> {
        let rows = sqlx::query(
            "SELECT product_id, quantity FROM cart_items WHERE user_id = ? ORDER BY added_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| (r.get("product_id"), r.get("quantity")))
            .collect())
    }

    /// Add `quantity` of a product, on top of what is already in the cart.
    pub async fn add_cart_item(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> Result<(), AppError> {
        let product = self.require_product(product_id).await?;
        if !product.is_active {
            return Err(AppError::Validation(format!(
                "Product {} is not available",
                product_id
            )));
        }

        let in_cart: Option<i64> = sqlx::query_scalar(
            "SELECT quantity FROM cart_items WHERE user_id = ? AND product_id = ?",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        let wanted = in_cart.unwrap_or(0).checked_add(quantity);
        if wanted.map_or(true, |w| w > product.stock) {
            return Err(AppError::Validation(format!(
                "Only {} of {} in stock",
                product.stock, product.name
            )));
        }

        sqlx::query(
            r#"INSERT INTO cart_items (user_id, product_id, quantity, added_at) VALUES (?, ?, ?, ?)
               ON CONFLICT(user_id, product_id) DO UPDATE SET quantity = quantity + excluded.quantity"#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;
        Ok(())
    }

    /// Set the quantity of a cart line; zero removes it.
    pub async fn set_cart_quantity(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> Result<(), AppError> {
        if quantity == 0 {
            return self.remove_cart_item(user_id, product_id).await;
        }

        let product = self.require_product(product_id).await?;
        if quantity > product.stock {
            return Err(AppError::Validation(format!(
                "Only {} of {} in stock",
                product.stock, product.name
            )));
        }

        let result =
            sqlx::query("UPDATE cart_items SET quantity = ? WHERE user_id = ? AND product_id = ?")
                .bind(quantity)
                .bind(user_id)
                .bind(product_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Product {} is not in the cart",
                product_id
            )));
        }

        self.increment_revision().await?;
        Ok(())
    }

    /// Remove one product from the cart.
    pub async fn remove_cart_item(&self, user_id: &str, product_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = ? AND product_id = ?")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Product {} is not in the cart",
                product_id
            )));
        }

        self.increment_revision().await?;
        Ok(())
    }

    /// Empty the cart. Emptying an empty cart is not an error.
    pub async fn clear_cart(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.increment_revision().await?;
        Ok(())
    }

    /// Total units in the cart.
    pub async fn cart_count(&self, user_id: &str) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM cart_items WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // ==================== WISHLIST ====================

    /// Products on the user's wishlist, most recent first.
    pub async fn list_wishlist(&self, user_id: &str) -> Result<Vec<WishlistEntry>, AppError> {
        let rows = sqlx::query(
            r#"SELECT w.added_at AS wish_added_at, p.*
               FROM wishlist_items w JOIN products p ON p.id = w.product_id
               WHERE w.user_id = ?
               ORDER BY w.added_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| WishlistEntry {
                product: product_from_row(row),
                added_at: row.get("wish_added_at"),
            })
            .collect())
    }

    /// Add a product to the wishlist. Adding twice keeps one entry.
    pub async fn add_wishlist_item(&self, user_id: &str, product_id: &str) -> Result<(), AppError> {
        self.require_product(product_id).await?;

        sqlx::query(
            "INSERT OR IGNORE INTO wishlist_items (user_id, product_id, added_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;
        Ok(())
    }

    /// Remove a product from the wishlist.
    pub async fn remove_wishlist_item(
        &self,
        user_id: &str,
        product_id: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = ? AND product_id = ?")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Product {} is not on the wishlist",
                product_id
            )));
        }

        self.increment_revision().await?;
        Ok(())
    }

    pub async fn wishlist_count(&self, user_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wishlist_items WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
