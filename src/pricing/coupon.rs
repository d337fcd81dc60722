use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{percent_of, round_money};
use crate::errors::AppError;
use crate::models::{Coupon, DiscountOutcome, DiscountType};

impl Coupon {
    /// Why the coupon cannot be used at `now`, or `None` if it can.
    pub fn invalid_reason(&self, now: DateTime<Utc>) -> Option<&'static str> {
        if !self.is_active {
            return Some("Coupon is not active");
        }
        if now < self.start_date {
            return Some("Coupon is not yet valid");
        }
        if now > self.end_date {
            return Some("Coupon has expired");
        }
        match self.usage_limit {
            Some(limit) if self.current_usage >= limit => Some("Coupon usage limit reached"),
            _ => None,
        }
    }

    /// Active, inside `[start_date, end_date]`, and under its usage limit.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.invalid_reason(now).is_none()
    }

    /// Discount this coupon grants on `subtotal` at `now`.
    pub fn calculate_discount(&self, subtotal: Decimal, now: DateTime<Utc>) -> DiscountOutcome {
        if let Some(reason) = self.invalid_reason(now) {
            return DiscountOutcome::rejected(reason.to_string());
        }

        if let Some(min) = self.min_purchase {
            if subtotal < min {
                return DiscountOutcome::rejected(format!(
                    "Minimum purchase of {} required",
                    round_money(min)
                ));
            }
        }

        if subtotal <= Decimal::ZERO {
            return DiscountOutcome::rejected("Nothing to discount".to_string());
        }

        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let pct = percent_of(subtotal, self.discount_value);
                match self.max_discount {
                    Some(cap) => pct.min(cap),
                    None => pct,
                }
            }
            DiscountType::Fixed => self.discount_value,
        };

        let discount = round_money(raw.min(subtotal).max(Decimal::ZERO));

        DiscountOutcome {
            discount_applied: true,
            discount,
            message: format!("Coupon {} applied", self.code),
        }
    }
}

impl DiscountOutcome {
    pub fn rejected(message: String) -> Self {
        Self {
            discount_applied: false,
            discount: Decimal::ZERO,
            message,
        }
    }
}

/// Check the terms of a coupon being created or edited.
pub fn validate_coupon_terms(
    discount_type: DiscountType,
    discount_value: Decimal,
    max_discount: Option<Decimal>,
    min_purchase: Option<Decimal>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    usage_limit: Option<i64>,
) -> Result<(), AppError> {
    if discount_value <= Decimal::ZERO {
        return Err(AppError::Validation(
            "Discount value must be greater than zero".to_string(),
        ));
    }
    if discount_type == DiscountType::Percentage && discount_value > Decimal::ONE_HUNDRED {
        return Err(AppError::Validation(
            "Percentage discount cannot exceed 100".to_string(),
        ));
    }
    if max_discount.is_some_and(|m| m <= Decimal::ZERO) {
        return Err(AppError::Validation(
            "Max discount must be greater than zero".to_string(),
        ));
    }
    if min_purchase.is_some_and(|m| m < Decimal::ZERO) {
        return Err(AppError::Validation(
            "Minimum purchase cannot be negative".to_string(),
        ));
    }
    if end_date <= start_date {
        return Err(AppError::Validation(
            "End date must be after start date".to_string(),
        ));
    }
    if usage_limit.is_some_and(|l| l < 1) {
        return Err(AppError::Validation(
            "Usage limit must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn coupon(discount_type: DiscountType, value: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: "c1".to_string(),
            code: "SAVE".to_string(),
            description: None,
            discount_type,
            discount_value: dec(value),
            max_discount: None,
            min_purchase: None,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            usage_limit: None,
            current_usage: 0,
            is_active: true,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
            version: 1,
        }
    }

    #[test]
    fn test_percentage_capped_by_max_discount() {
        let mut c = coupon(DiscountType::Percentage, 25);
        c.max_discount = Some(dec(500));

        let outcome = c.calculate_discount(dec(3000), Utc::now());
        assert!(outcome.discount_applied);
        assert_eq!(outcome.discount, dec(500));
    }

    #[test]
    fn test_percentage_below_cap() {
        let mut c = coupon(DiscountType::Percentage, 10);
        c.max_discount = Some(dec(500));

        let outcome = c.calculate_discount(dec(3000), Utc::now());
        assert_eq!(outcome.discount, dec(300));
    }

    #[test]
    fn test_fixed_never_exceeds_subtotal() {
        let c = coupon(DiscountType::Fixed, 200);
        let outcome = c.calculate_discount(dec(150), Utc::now());
        assert!(outcome.discount_applied);
        assert_eq!(outcome.discount, dec(150));

        let outcome = c.calculate_discount(dec(1000), Utc::now());
        assert_eq!(outcome.discount, dec(200));
    }

    #[test]
    fn test_expired_coupon_is_never_valid() {
        let mut c = coupon(DiscountType::Percentage, 10);
        let now = Utc::now();
        c.start_date = now - Duration::days(10);
        c.end_date = now - Duration::seconds(1);
        c.usage_limit = Some(100);

        assert!(!c.is_valid_at(now));
        let outcome = c.calculate_discount(dec(1000), now);
        assert!(!outcome.discount_applied);
        assert_eq!(outcome.discount, Decimal::ZERO);
        assert_eq!(outcome.message, "Coupon has expired");
    }

    #[test]
    fn test_usage_limit_reached_is_never_valid() {
        let mut c = coupon(DiscountType::Fixed, 10);
        c.usage_limit = Some(5);
        c.current_usage = 5;
        assert!(!c.is_valid_at(Utc::now()));

        c.current_usage = 4;
        assert!(c.is_valid_at(Utc::now()));
    }

    #[test]
    fn test_inactive_and_future_coupons() {
        let mut c = coupon(DiscountType::Fixed, 10);
        c.is_active = false;
        assert_eq!(c.invalid_reason(Utc::now()), Some("Coupon is not active"));

        let mut c = coupon(DiscountType::Fixed, 10);
        c.start_date = Utc::now() + Duration::hours(1);
        c.end_date = Utc::now() + Duration::days(1);
        assert_eq!(c.invalid_reason(Utc::now()), Some("Coupon is not yet valid"));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let c = coupon(DiscountType::Fixed, 10);
        assert!(c.is_valid_at(c.start_date));
        assert!(c.is_valid_at(c.end_date));
    }

    #[test]
    fn test_below_min_purchase_is_not_applied() {
        let mut c = coupon(DiscountType::Percentage, 10);
        c.min_purchase = Some(dec(100));

        let outcome = c.calculate_discount(dec(99), Utc::now());
        assert!(!outcome.discount_applied);
        assert_eq!(outcome.discount, Decimal::ZERO);

        let outcome = c.calculate_discount(dec(100), Utc::now());
        assert!(outcome.discount_applied);
        assert_eq!(outcome.discount, dec(10));
    }

    #[test]
    fn test_percentage_rounds_to_cents() {
        let c = coupon(DiscountType::Percentage, 15);
        // 15% of 10.05 = 1.5075
        let outcome = c.calculate_discount(Decimal::new(1005, 2), Utc::now());
        assert_eq!(outcome.discount, Decimal::new(151, 2));
    }

    #[test]
    fn test_validate_coupon_terms() {
        let now = Utc::now();
        let later = now + Duration::days(1);
        assert!(validate_coupon_terms(
            DiscountType::Percentage,
            dec(25),
            Some(dec(500)),
            None,
            now,
            later,
            Some(10)
        )
        .is_ok());
        assert!(validate_coupon_terms(
            DiscountType::Percentage,
            dec(120),
            None,
            None,
            now,
            later,
            None
        )
        .is_err());
        assert!(
            validate_coupon_terms(DiscountType::Fixed, dec(0), None, None, now, later, None)
                .is_err()
        );
        assert!(
            validate_coupon_terms(DiscountType::Fixed, dec(5), None, None, later, now, None)
                .is_err()
        );
        assert!(
            validate_coupon_terms(DiscountType::Fixed, dec(5), None, None, now, later, Some(0))
                .is_err()
        );
    }
}
