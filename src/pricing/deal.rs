use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{percent_of, round_money};
use crate::models::Deal;

impl Deal {
    /// Active and inside `[start_date, end_date]`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }

    /// Price after the markdown, rounded to cents and never negative.
    pub fn apply(&self, price: Decimal) -> Decimal {
        round_money(price - percent_of(price, self.discount_percent)).max(Decimal::ZERO)
    }
}

/// Lowest price among the deals live at `now`; `price` when none are.
pub fn best_price(price: Decimal, deals: &[Deal], now: DateTime<Utc>) -> Decimal {
    deals
        .iter()
        .filter(|d| d.is_live_at(now))
        .map(|d| d.apply(price))
        .fold(price, Decimal::min)
}
