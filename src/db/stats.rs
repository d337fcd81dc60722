use rust_decimal::Decimal;
use sqlx::{Row, SqliteConnection};

use super::repository::{parse_decimal, parse_json_array, Repository};
use crate::errors::AppError;
use crate::models::{AdminStats, FulfillmentStatus, OrderItem, PaymentStatus, PayoutStatus, VendorSummary};
use crate::pricing::{percent_of, round_money};

impl Repository {
    /// Headline numbers for the admin dashboard.
    pub async fn admin_stats(&self) -> Result<AdminStats, AppError> {
        let row = sqlx::query(
            r#"SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM users WHERE role = 'vendor') AS vendors,
                (SELECT COUNT(*) FROM products) AS products,
                (SELECT COUNT(*) FROM orders) AS orders,
                (SELECT COUNT(*) FROM orders WHERE fulfillment_status = 'processing') AS pending_orders"#,
        )
        .fetch_one(&self.pool)
        .await?;

        // Money is stored as text, so sum in Rust to keep exact decimals.
        let totals: Vec<String> = sqlx::query_scalar("SELECT total FROM orders WHERE payment_status = ?")
            .bind(PaymentStatus::Paid.as_str())
            .fetch_all(&self.pool)
            .await?;
        let revenue: Decimal = totals.iter().map(|t| parse_decimal(t)).sum();

        Ok(AdminStats {
            users: row.get("users"),
            vendors: row.get("vendors"),
            products: row.get("products"),
            orders: row.get("orders"),
            pending_orders: row.get("pending_orders"),
            revenue,
        })
    }

    /// Earnings position of a vendor: sales, commission, payouts and what is still owed.
    pub async fn vendor_summary(&self, vendor_id: &str) -> Result<VendorSummary, AppError> {
        self.require_vendor(vendor_id).await?;
        let settings = self.get_settings().await?;
        let mut conn = self.pool.acquire().await?;
        vendor_position(&mut conn, vendor_id, settings.commission_rate).await
    }
}

/// Vendor summary read through one connection, so a caller holding a transaction
/// sees the same rows it is about to write against.
pub(super) async fn vendor_position(
    conn: &mut SqliteConnection,
    vendor_id: &str,
    commission_rate: Decimal,
) -> Result<VendorSummary, AppError> {
    let product_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE vendor_id = ?")
        .bind(vendor_id)
        .fetch_one(&mut *conn)
        .await?;

    let rows = sqlx::query(
        "SELECT items, payment_status, fulfillment_status FROM orders WHERE items LIKE ?",
    )
    .bind(format!("%{}%", vendor_id))
    .fetch_all(&mut *conn)
    .await?;

    let mut order_count = 0;
    let mut gross_sales = Decimal::ZERO;
    for row in &rows {
        let items: String = row.get("items");
        let items: Vec<OrderItem> = parse_json_array(&items);
        let mut lines = items.iter().filter(|i| i.vendor_id == vendor_id).peekable();
        if lines.peek().is_none() {
            continue;
        }
        order_count += 1;

        let payment: String = row.get("payment_status");
        let fulfillment: String = row.get("fulfillment_status");
        if payment == PaymentStatus::Paid.as_str() && fulfillment != FulfillmentStatus::Cancelled.as_str() {
            gross_sales += lines.map(|i| i.line_total).sum::<Decimal>();
        }
    }

    let payouts = sqlx::query("SELECT amount, status FROM vendor_payments WHERE vendor_id = ?")
        .bind(vendor_id)
        .fetch_all(&mut *conn)
        .await?;
    let mut paid_out = Decimal::ZERO;
    let mut pending_payouts = Decimal::ZERO;
    for row in &payouts {
        let amount: String = row.get("amount");
        let status: String = row.get("status");
        match PayoutStatus::parse(&status) {
            Some(PayoutStatus::Completed) => paid_out += parse_decimal(&amount),
            Some(PayoutStatus::Pending) => pending_payouts += parse_decimal(&amount),
            _ => {}
        }
    }

    Ok(summarize(
        vendor_id,
        product_count,
        order_count,
        gross_sales,
        commission_rate,
        paid_out,
        pending_payouts,
    ))
}

fn summarize(
    vendor_id: &str,
    product_count: i64,
    order_count: i64,
    gross_sales: Decimal,
    commission_rate: Decimal,
    paid_out: Decimal,
    pending_payouts: Decimal,
) -> VendorSummary {
    let commission = round_money(percent_of(gross_sales, commission_rate));
    let net_earnings = gross_sales - commission;
    VendorSummary {
        vendor_id: vendor_id.to_string(),
        product_count,
        order_count,
        gross_sales,
        commission,
        net_earnings,
        paid_out,
        pending_payouts,
        balance: net_earnings - paid_out - pending_payouts,
    }
}
