use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use super::repository::{
    check_version, concurrent_modification, decimal_col, increment_revision_tx, new_id,
    now_rfc3339, parse_json_array, to_json, Repository,
};
use crate::errors::AppError;
use crate::models::{
    Address, CheckoutItem, CheckoutRequest, FulfillmentStatus, Order, OrderFilter, OrderItem,
    PaymentStatus, UpdateOrderStatusRequest,
};
use crate::pricing::{self, OrderTotals};

const ORDER_COLUMNS: &str = "id, order_number, user_id, items, shipping_address, shipping_method_id, coupon_code, subtotal, discount, shipping_cost, tax, total, payment_status, fulfillment_status, payment_reference, created_at, updated_at, version";

/// What checkout did.
#[derive(Debug)]
pub enum CheckoutOutcome {
    Created(Order),
    /// The payment reference already had an order.
    Existing(Order),
}

impl Repository {
    /// List orders matching the filter, newest first.
    ///
    /// With a vendor filter each order only carries that vendor's lines.
    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        let sql = format!(
            r#"SELECT {} FROM orders
               WHERE (?1 IS NULL OR user_id = ?1)
                 AND (?2 IS NULL OR payment_status = ?2)
                 AND (?3 IS NULL OR fulfillment_status = ?3)
               ORDER BY created_at DESC"#,
            ORDER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(&filter.user_id)
            .bind(filter.payment_status.map(|s| s.as_str()))
            .bind(filter.fulfillment_status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?;

        let orders = rows.iter().map(order_from_row);
        Ok(match &filter.vendor_id {
            Some(vendor_id) => orders
                .filter_map(|o| o.restricted_to_vendor(vendor_id))
                .collect(),
            None => orders.collect(),
        })
    }

    /// Get an order by ID.
    pub async fn get_order(&self, id: &str) -> Result<Option<Order>, AppError> {
        let sql = format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(order_from_row))
    }

    pub async fn find_order_by_reference(&self, reference: &str) -> Result<Option<Order>, AppError> {
        let sql = format!("SELECT {} FROM orders WHERE payment_reference = ?", ORDER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(order_from_row))
    }

    /// Place an order: price the items, apply coupon and shipping, then write the
    /// order, stock, coupon usage and cart in a single transaction.
    pub async fn checkout(
        &self,
        request: &CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<CheckoutOutcome, AppError> {
        let reference = request
            .payment_reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty());
        if let Some(reference) = reference {
            if let Some(existing) = self.find_order_by_reference(reference).await? {
                tracing::info!(order_id = %existing.id, reference, "Checkout replayed for payment reference");
                return Ok(CheckoutOutcome::Existing(existing));
            }
        }

        let user = self
            .get_user(&request.user_id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Unknown user {}", request.user_id)))?;

        let (requested, from_cart) = match &request.items {
            Some(items) => (merge_items(items)?, false),
            None => (self.cart_entries(&user.id).await?, true),
        };
        if requested.is_empty() {
            return Err(AppError::Validation("No items to check out".to_string()));
        }

        let mut items = Vec::with_capacity(requested.len());
        for (product_id, quantity) in &requested {
            let product = self
                .get_product(product_id)
                .await?
                .ok_or_else(|| AppError::Validation(format!("Unknown product {}", product_id)))?;
            if !product.is_active {
                return Err(AppError::Validation(format!(
                    "{} is no longer available",
                    product.name
                )));
            }
            if product.stock < *quantity {
                return Err(AppError::Validation(format!(
                    "Only {} of {} in stock",
                    product.stock, product.name
                )));
            }
            let unit_price = self.effective_price(&product, now).await?;
            items.push(OrderItem {
                line_total: pricing::line_total(unit_price, *quantity)?,
                product_id: product.id,
                vendor_id: product.vendor_id,
                name: product.name,
                unit_price,
                quantity: *quantity,
            });
        }
        let subtotal = pricing::sum_money(items.iter().map(|i| i.line_total))?;

        let settings = self.get_settings().await?;

        let mut coupon_applied = None;
        let mut discount = Decimal::ZERO;
        if let Some(code) = request
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            let coupon = self
                .find_coupon_by_code(code)
                .await?
                .ok_or_else(|| AppError::Validation(format!("Unknown coupon {}", code)))?;
            let outcome = coupon.calculate_discount(subtotal, now);
            if !outcome.discount_applied {
                return Err(AppError::Validation(outcome.message));
            }
            discount = outcome.discount;
            coupon_applied = Some(coupon);
        }

        let shipping_cost = match &request.shipping_method_id {
            Some(method_id) => {
                let method = self
                    .get_shipping_method(method_id)
                    .await?
                    .filter(|m| m.is_active)
                    .ok_or_else(|| {
                        AppError::Validation(format!("Unknown shipping method {}", method_id))
                    })?;
                pricing::shipping_cost(
                    Some(method.price),
                    subtotal,
                    settings.free_shipping_threshold,
                )
            }
            None => Decimal::ZERO,
        };

        let address: Address = request
            .shipping_address
            .clone()
            .or(user.shipping_address)
            .ok_or_else(|| AppError::Validation("Shipping address is required".to_string()))?;
        if let Some(field) = address.missing_field() {
            return Err(AppError::Validation(format!(
                "Shipping address {} is required",
                field
            )));
        }

        let totals = OrderTotals::compute(subtotal, discount, shipping_cost, settings.tax_rate)?;

        let id = new_id();
        let created_at = now.to_rfc3339();
        let order = Order {
            order_number: order_number(&id, now),
            id,
            user_id: user.id,
            items,
            shipping_address: address,
            shipping_method_id: request.shipping_method_id.clone(),
            coupon_code: coupon_applied.as_ref().map(|c| c.code.clone()),
            subtotal: totals.subtotal,
            discount: totals.discount,
            shipping_cost: totals.shipping_cost,
            tax: totals.tax,
            total: totals.total,
            payment_status: PaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Processing,
            payment_reference: reference.map(str::to_string),
            created_at: created_at.clone(),
            updated_at: created_at,
            version: 1,
        };

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"INSERT INTO orders (
                id, order_number, user_id, items, shipping_address, shipping_method_id, coupon_code,
                subtotal, discount, shipping_cost, tax, total, payment_status, fulfillment_status,
                payment_reference, created_at, updated_at, version
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.user_id)
        .bind(to_json(&order.items))
        .bind(to_json(&order.shipping_address))
        .bind(&order.shipping_method_id)
        .bind(&order.coupon_code)
        .bind(order.subtotal.to_string())
        .bind(order.discount.to_string())
        .bind(order.shipping_cost.to_string())
        .bind(order.tax.to_string())
        .bind(order.total.to_string())
        .bind(order.payment_status.as_str())
        .bind(order.fulfillment_status.as_str())
        .bind(&order.payment_reference)
        .bind(&order.created_at)
        .bind(&order.updated_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            let err = AppError::from(err);
            // Lost a race with another checkout for the same payment reference.
            if let (AppError::Duplicate(_), Some(reference)) = (&err, reference) {
                drop(tx);
                if let Some(existing) = self.find_order_by_reference(reference).await? {
                    return Ok(CheckoutOutcome::Existing(existing));
                }
            }
            return Err(err);
        }

        for item in &order.items {
            let result = sqlx::query(
                "UPDATE products SET stock = stock - ?, updated_at = ?, version = version + 1 WHERE id = ? AND stock >= ?",
            )
            .bind(item.quantity)
            .bind(&order.created_at)
            .bind(&item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::Validation(format!(
                    "{} sold out while checking out",
                    item.name
                )));
            }
        }

        if let Some(coupon) = &coupon_applied {
            let result = sqlx::query(
                "UPDATE coupons SET current_usage = current_usage + 1, updated_at = ? WHERE id = ? AND is_active = 1 AND (usage_limit IS NULL OR current_usage < usage_limit)",
            )
            .bind(&order.created_at)
            .bind(&coupon.id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::Validation(
                    "Coupon usage limit reached".to_string(),
                ));
            }
        }

        if from_cart {
            sqlx::query("DELETE FROM cart_items WHERE user_id = ?")
                .bind(&order.user_id)
                .execute(&mut *tx)
                .await?;
        }

        increment_revision_tx(&mut tx).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            user_id = %order.user_id,
            lines = order.items.len(),
            total = %order.total,
            coupon = order.coupon_code.as_deref().unwrap_or("-"),
            "Order placed"
        );

        Ok(CheckoutOutcome::Created(order))
    }

    /// Move an order's payment and/or fulfillment status forward.
    pub async fn update_order_status(
        &self,
        id: &str,
        request: &UpdateOrderStatusRequest,
    ) -> Result<Order, AppError> {
        let existing = self
            .get_order(id)
            .await?
            .ok_or_else(|| AppError::not_found("Order", id))?;
        check_version(request.expected_version, existing.version)?;

        let payment_status = request.payment_status.unwrap_or(existing.payment_status);
        let fulfillment_status = request
            .fulfillment_status
            .unwrap_or(existing.fulfillment_status);

        if fulfillment_status == FulfillmentStatus::Cancelled
            && existing.fulfillment_status != FulfillmentStatus::Cancelled
        {
            return Err(AppError::Validation(
                "Use the cancel operation to cancel an order".to_string(),
            ));
        }
        if !existing.fulfillment_status.can_transition_to(fulfillment_status) {
            return Err(AppError::Validation(format!(
                "Cannot move fulfillment from {} to {}",
                existing.fulfillment_status.as_str(),
                fulfillment_status.as_str()
            )));
        }
        if !existing.payment_status.can_transition_to(payment_status) {
            return Err(AppError::Validation(format!(
                "Cannot move payment from {} to {}",
                existing.payment_status.as_str(),
                payment_status.as_str()
            )));
        }

        let now = now_rfc3339();
        let new_version = existing.version + 1;

        let result = sqlx::query(
            "UPDATE orders SET payment_status = ?, fulfillment_status = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(payment_status.as_str())
        .bind(fulfillment_status.as_str())
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_order(id).await?;
            return Err(concurrent_modification(current.map(|o| o.version)));
        }

        self.increment_revision().await?;

        tracing::info!(
            order_id = %id,
            payment = payment_status.as_str(),
            fulfillment = fulfillment_status.as_str(),
            "Order status updated"
        );

        Ok(Order {
            payment_status,
            fulfillment_status,
            updated_at: now,
            version: new_version,
            ..existing
        })
    }

    /// Cancel an order that has not shipped: restock its lines, release the coupon
    /// use, and mark a paid order refunded.
    pub async fn cancel_order(&self, id: &str, expected_version: Option<i64>) -> Result<Order, AppError> {
        let existing = self
            .get_order(id)
            .await?
            .ok_or_else(|| AppError::not_found("Order", id))?;
        check_version(expected_version, existing.version)?;

        if existing.fulfillment_status != FulfillmentStatus::Processing {
            return Err(AppError::Validation(format!(
                "Order {} is {} and can no longer be cancelled",
                existing.order_number,
                existing.fulfillment_status.as_str()
            )));
        }

        let payment_status = match existing.payment_status {
            PaymentStatus::Paid => PaymentStatus::Refunded,
            other => other,
        };
        let now = now_rfc3339();
        let new_version = existing.version + 1;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE orders SET payment_status = ?, fulfillment_status = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(payment_status.as_str())
        .bind(FulfillmentStatus::Cancelled.as_str())
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            drop(tx);
            let current = self.get_order(id).await?;
            return Err(concurrent_modification(current.map(|o| o.version)));
        }

        // Products deleted since checkout have nothing to restock.
        for item in &existing.items {
            sqlx::query(
                "UPDATE products SET stock = stock + ?, updated_at = ?, version = version + 1 WHERE id = ?",
            )
            .bind(item.quantity)
            .bind(&now)
            .bind(&item.product_id)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(code) = &existing.coupon_code {
            sqlx::query(
                "UPDATE coupons SET current_usage = MAX(current_usage - 1, 0), updated_at = ? WHERE code = ?",
            )
            .bind(&now)
            .bind(code)
            .execute(&mut *tx)
            .await?;
        }

        increment_revision_tx(&mut tx).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, refunded = payment_status == PaymentStatus::Refunded, "Order cancelled");

        Ok(Order {
            payment_status,
            fulfillment_status: FulfillmentStatus::Cancelled,
            updated_at: now,
            version: new_version,
            ..existing
        })
    }

    /// Delete an order record.
    pub async fn delete_order(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Order", id));
        }

        self.increment_revision().await?;
        Ok(())
    }
}

/// Collapse repeated products into one line and reject non-positive quantities.
fn merge_items(items: &[CheckoutItem]) -> Result<Vec<(String, i64)>, AppError> {
    let mut merged: Vec<(String, i64)> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity < 1 {
            return Err(AppError::Validation(format!(
                "Quantity for product {} must be at least 1",
                item.product_id
            )));
        }
        match merged.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, quantity)) => {
                *quantity = quantity.checked_add(item.quantity).ok_or_else(|| {
                    AppError::Validation(format!(
                        "Quantity for product {} is too large",
                        item.product_id
                    ))
                })?;
            }
            None => merged.push((item.product_id.clone(), item.quantity)),
        }
    }
    Ok(merged)
}

/// Human-facing order number: date plus the first eight hex digits of the id.
fn order_number(id: &str, now: DateTime<Utc>) -> String {
    let suffix: String = id
        .chars()
        .filter(|c| *c != '-')
        .take(8)
        .collect::<String>()
        .to_uppercase();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}

/// Decode the stored address snapshot. A corrupt snapshot is logged and left blank
/// so the rest of the order stays readable.
fn parse_address(order_id: &str, raw: &str) -> Address {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(order_id, error = %e, "Stored shipping address is unreadable");
        Address::default()
    })
}

pub(super) fn order_from_row(row: &sqlx::sqlite::SqliteRow) -> Order {
    let items: String = row.get("items");
    let address: String = row.get("shipping_address");
    let payment_status: String = row.get("payment_status");
    let fulfillment_status: String = row.get("fulfillment_status");
    let id: String = row.get("id");
    Order {
        shipping_address: parse_address(&id, &address),
        id,
        order_number: row.get("order_number"),
        user_id: row.get("user_id"),
        items: parse_json_array(&items),
        shipping_method_id: row.get("shipping_method_id"),
        coupon_code: row.get("coupon_code"),
        subtotal: decimal_col(row, "subtotal"),
        discount: decimal_col(row, "discount"),
        shipping_cost: decimal_col(row, "shipping_cost"),
        tax: decimal_col(row, "tax"),
        total: decimal_col(row, "total"),
        payment_status: PaymentStatus::parse(&payment_status).unwrap_or_default(),
        fulfillment_status: FulfillmentStatus::parse(&fulfillment_status).unwrap_or_default(),
        payment_reference: row.get("payment_reference"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        version: row.get("version"),
    }
}
