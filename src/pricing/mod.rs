//! Pure pricing rules: coupon validity and discounts, deal prices, order totals.
//!
//! Nothing here touches the database; callers load the records and pass `now`.

mod coupon;
mod deal;
mod totals;

pub use coupon::validate_coupon_terms;
pub use deal::best_price;
pub use totals::{line_total, shipping_cost, sum_money, OrderTotals};

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount * percent / 100`, unrounded.
pub(crate) fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    amount * percent / Decimal::ONE_HUNDRED
}
