use rust_decimal::Decimal;
use serde::Serialize;

use super::round_money;
use crate::errors::AppError;

/// Money breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Tax is charged on the discounted subtotal; shipping is untaxed.
    pub fn compute(
        subtotal: Decimal,
        discount: Decimal,
        shipping_cost: Decimal,
        tax_rate: Decimal,
    ) -> Result<Self, AppError> {
        let discount = discount.min(subtotal).max(Decimal::ZERO);
        let taxable = subtotal - discount;
        let tax = taxable
            .checked_mul(tax_rate)
            .map(|t| round_money(t / Decimal::ONE_HUNDRED))
            .ok_or_else(amount_too_large)?;
        let total = sum_money([taxable, shipping_cost, tax])?;
        Ok(Self {
            subtotal,
            discount,
            shipping_cost,
            tax,
            total,
        })
    }
}

pub fn line_total(unit_price: Decimal, quantity: i64) -> Result<Decimal, AppError> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .map(round_money)
        .ok_or_else(amount_too_large)
}

/// Sum of money amounts, failing instead of overflowing.
pub fn sum_money<I>(amounts: I) -> Result<Decimal, AppError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(amount_too_large)
}

fn amount_too_large() -> AppError {
    AppError::Validation("Amount is too large".to_string())
}

/// Shipping charge for the chosen method, waived at or above the free threshold.
pub fn shipping_cost(
    method_price: Option<Decimal>,
    subtotal: Decimal,
    free_threshold: Option<Decimal>,
) -> Decimal {
    match (method_price, free_threshold) {
        (None, _) => Decimal::ZERO,
        (Some(_), Some(threshold)) if subtotal >= threshold => Decimal::ZERO,
        (Some(price), _) => price,
    }
}
