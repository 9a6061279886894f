//! # Financial Calculator
//!
//! Pure derivation of subtotal, discount, total and outstanding balance.
//! No I/O; re-run on every create, edit and payment.
//!
//! ## Invariants
//! ```text
//! subtotal = Σ quantity_i × unit_price_i           (over the given items)
//! discount ∈ [0, subtotal]                         (regardless of input)
//! total    = subtotal - discount                   (exact at 2 decimals)
//! pending  = total - paid                          (signed in detail views,
//!                                                   floored at 0 in reports)
//! ```
//!
//! All quantities are integer cents, so every derived value is already exact
//! at 2 decimal places; the half-up rounding the stored-then-recomputed flow
//! requires happens inside [`Money::percentage`] for percent discounts.

use crate::money::Money;
use crate::types::{Discount, OrderItemInput};

// =============================================================================
// Totals
// =============================================================================

/// The derived financial state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

/// Computes subtotal, clamped discount and total over a desired item set.
///
/// ## Discount Clamping
/// Out-of-range inputs are clamped, never rejected:
/// - percent: value clamped to `[0, 100]` before applying, and the resulting
///   amount clamped to `[0, subtotal]`
/// - amount: clamped to `[0, subtotal]`
///
/// ## Example
/// ```rust
/// use pedidos_core::finance::compute_totals;
/// use pedidos_core::types::{Discount, OrderItemInput};
/// use pedidos_core::Money;
///
/// let items = vec![OrderItemInput {
///     product_id: None,
///     name: "Box A".into(),
///     quantity: 2,
///     unit_price: Money::from_cents(1000),
///     is_manual: true,
/// }];
/// let totals = compute_totals(&items, Some(Discount::Amount(Money::from_cents(500))));
/// assert_eq!(totals.total.cents(), 1500);
/// ```
pub fn compute_totals(items: &[OrderItemInput], discount: Option<Discount>) -> Totals {
    let subtotal = items
        .iter()
        .fold(Money::zero(), |acc, it| acc + it.line_total());

    let discount = match discount {
        None => Money::zero(),
        Some(Discount::Amount(amount)) => amount.clamp_range(Money::zero(), subtotal),
        Some(Discount::Percent(bps)) => subtotal
            .percentage(bps.min(10_000))
            .clamp_range(Money::zero(), subtotal),
    };

    Totals {
        subtotal,
        discount,
        total: subtotal - discount,
    }
}

/// Outstanding balance ("pendiente"), signed.
///
/// Negative values reveal overpayment and are deliberately shown in per-order
/// detail views.
#[inline]
pub fn outstanding(total: Money, paid: Money) -> Money {
    total - paid
}

/// Outstanding balance for aggregate report contexts, floored at zero.
#[inline]
pub fn outstanding_for_report(total: Money, paid: Money) -> Money {
    (total - paid).floor_zero()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, qty: i64, price_cents: i64) -> OrderItemInput {
        OrderItemInput {
            product_id: None,
            name: name.to_string(),
            quantity: qty,
            unit_price: Money::from_cents(price_cents),
            is_manual: true,
        }
    }

    #[test]
    fn test_subtotal_is_sum_of_line_totals() {
        let items = vec![item("a", 2, 1000), item("b", 3, 250)];
        let t = compute_totals(&items, None);
        assert_eq!(t.subtotal.cents(), 2750);
        assert_eq!(t.discount.cents(), 0);
        assert_eq!(t.total.cents(), 2750);
    }

    #[test]
    fn test_amount_discount_clamped_to_subtotal() {
        let items = vec![item("a", 1, 1000)];
        let t = compute_totals(&items, Some(Discount::Amount(Money::from_cents(5000))));
        assert_eq!(t.discount.cents(), 1000);
        assert_eq!(t.total.cents(), 0);
    }

    #[test]
    fn test_negative_amount_discount_clamped_to_zero() {
        let items = vec![item("a", 1, 1000)];
        let t = compute_totals(&items, Some(Discount::Amount(Money::from_cents(-300))));
        assert_eq!(t.discount.cents(), 0);
        assert_eq!(t.total.cents(), 1000);
    }

    #[test]
    fn test_percent_discount_clamped_to_hundred() {
        let items = vec![item("a", 1, 1000)];
        // 250% clamps to 100%
        let t = compute_totals(&items, Some(Discount::Percent(25_000)));
        assert_eq!(t.discount.cents(), 1000);
        assert_eq!(t.total.cents(), 0);
    }

    #[test]
    fn test_percent_discount_half_up_rounding() {
        // 999 cents at 33.33% = 332.96.. cents → 333
        let items = vec![item("a", 1, 999)];
        let t = compute_totals(&items, Some(Discount::Percent(3333)));
        assert_eq!(t.discount.cents(), 333);
        assert_eq!(t.total.cents(), 666);
    }

    #[test]
    fn test_total_invariant_holds_for_all_discount_kinds() {
        let items = vec![item("a", 2, 750), item("b", 1, 499)];
        for discount in [
            None,
            Some(Discount::Amount(Money::from_cents(100))),
            Some(Discount::Amount(Money::from_cents(-50))),
            Some(Discount::Amount(Money::from_cents(99_999))),
            Some(Discount::Percent(0)),
            Some(Discount::Percent(825)),
            Some(Discount::Percent(10_000)),
            Some(Discount::Percent(60_000)),
        ] {
            let t = compute_totals(&items, discount);
            assert_eq!(t.total, t.subtotal - t.discount);
            assert!(t.discount >= Money::zero());
            assert!(t.discount <= t.subtotal);
        }
    }

    #[test]
    fn test_empty_item_set_is_all_zero() {
        let t = compute_totals(&[], Some(Discount::Percent(5000)));
        assert_eq!(t.subtotal, Money::zero());
        assert_eq!(t.discount, Money::zero());
        assert_eq!(t.total, Money::zero());
    }

    #[test]
    fn test_outstanding_sign_behavior() {
        let total = Money::from_cents(1500);

        assert_eq!(outstanding(total, Money::zero()).cents(), 1500);
        assert_eq!(outstanding(total, Money::from_cents(2000)).cents(), -500);

        // Reports never go negative.
        assert_eq!(outstanding_for_report(total, Money::from_cents(2000)).cents(), 0);
        assert_eq!(outstanding_for_report(total, Money::from_cents(500)).cents(), 1000);
    }
}
