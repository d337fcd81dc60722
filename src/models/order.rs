//! Orders and checkout requests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Address;

/// Payment state of an order as reported by the payment processor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    /// Allowed moves: pending -> paid|failed, failed -> paid|pending, paid -> refunded.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        *self == next
            || matches!(
                (self, next),
                (Pending, Paid) | (Pending, Failed) | (Failed, Paid) | (Failed, Pending) | (Paid, Refunded)
            )
    }
}

/// Fulfillment state of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Processing => "processing",
            FulfillmentStatus::Shipped => "shipped",
            FulfillmentStatus::Delivered => "delivered",
            FulfillmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(FulfillmentStatus::Processing),
            "shipped" => Some(FulfillmentStatus::Shipped),
            "delivered" => Some(FulfillmentStatus::Delivered),
            "cancelled" => Some(FulfillmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Forward-only; cancellation goes through the cancel operation instead.
    pub fn can_transition_to(&self, next: FulfillmentStatus) -> bool {
        use FulfillmentStatus::*;
        *self == next
            || matches!(
                (self, next),
                (Processing, Shipped) | (Processing, Delivered) | (Shipped, Delivered)
            )
    }
}

/// Line item snapshot taken at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub vendor_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub line_total: Decimal,
}

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_method_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub version: i64,
}

impl Order {
    /// The order as one vendor may see it: only that vendor's lines, or `None`
    /// when the order holds none of them.
    pub fn restricted_to_vendor(mut self, vendor_id: &str) -> Option<Order> {
        self.items.retain(|item| item.vendor_id == vendor_id);
        if self.items.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Requested product and quantity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
}

/// Request body for placing an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub user_id: String,
    /// Items to buy; the user's cart is used when absent.
    #[serde(default)]
    pub items: Option<Vec<CheckoutItem>>,
    /// Falls back to the user's saved address.
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub shipping_method_id: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    /// Payment processor session id; repeats return the existing order.
    #[serde(default)]
    pub payment_reference: Option<String>,
}

/// Request body for moving an order through its lifecycle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub fulfillment_status: Option<FulfillmentStatus>,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Query parameters for listing orders.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub fulfillment_status: Option<FulfillmentStatus>,
}
