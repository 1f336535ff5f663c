//! Order totals
//!
//! Pure money math: a given set of snapshotted items and a shipping
//! method always produce the same totals. Everything is `Decimal`,
//! rounded to 2 decimal places at each stage.

use crate::db::models::{OrderItem, ShippingMethod};
use rust_decimal::Decimal;
use serde::Serialize;

/// Sales tax: 8.5%
pub fn tax_rate() -> Decimal {
    Decimal::new(85, 3)
}

/// Shipping is waived once the subtotal reaches this amount.
pub fn free_shipping_threshold() -> Decimal {
    Decimal::from(50)
}

impl ShippingMethod {
    /// Flat shipping rate
    pub fn rate(self) -> Decimal {
        match self {
            ShippingMethod::Standard => Decimal::new(599, 2),
            ShippingMethod::Express => Decimal::new(1299, 2),
            ShippingMethod::Overnight => Decimal::new(2499, 2),
            ShippingMethod::Pickup => Decimal::ZERO,
        }
    }

    /// Transit estimate used for `shipping.estimated_delivery`
    pub fn transit_days(self) -> i64 {
        match self {
            ShippingMethod::Standard => 5,
            ShippingMethod::Express => 2,
            ShippingMethod::Overnight => 1,
            ShippingMethod::Pickup => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

/// Line total for one snapshotted item.
pub fn line_total(price: Decimal, quantity: i32) -> Decimal {
    (price * Decimal::from(quantity)).round_dp(2)
}

/// Compute subtotal, tax, shipping, and total for an order.
pub fn calculate(items: &[OrderItem], method: ShippingMethod) -> OrderTotals {
    let subtotal: Decimal = items.iter().map(|i| i.total).sum();
    let subtotal = subtotal.round_dp(2);
    let tax = (subtotal * tax_rate()).round_dp(2);
    let shipping_fee = if subtotal >= free_shipping_threshold() {
        Decimal::ZERO
    } else {
        method.rate()
    };
    let total = (subtotal + tax + shipping_fee).round_dp(2);

    OrderTotals {
        subtotal,
        tax,
        shipping_fee,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surrealdb::RecordId;

    fn item(price: Decimal, quantity: i32) -> OrderItem {
        OrderItem {
            product: RecordId::from_table_key("product", "p1"),
            name: "Widget".into(),
            sku: "W-1".into(),
            price,
            quantity,
            total: line_total(price, quantity),
            variant_id: None,
        }
    }

    #[test]
    fn totals_add_up_with_shipping() {
        // 2 x 9.99 = 19.98; tax 1.70; standard shipping 5.99
        let items = vec![item(Decimal::new(999, 2), 2)];
        let totals = calculate(&items, ShippingMethod::Standard);

        assert_eq!(totals.subtotal, Decimal::new(1998, 2));
        assert_eq!(totals.tax, Decimal::new(170, 2));
        assert_eq!(totals.shipping_fee, Decimal::new(599, 2));
        assert_eq!(totals.total, Decimal::new(2767, 2));
    }

    #[test]
    fn shipping_waived_at_threshold() {
        // exactly 50.00 qualifies
        let items = vec![item(Decimal::from(25), 2)];
        let totals = calculate(&items, ShippingMethod::Overnight);
        assert_eq!(totals.shipping_fee, Decimal::ZERO);

        let items = vec![item(Decimal::new(4999, 2), 1)];
        let totals = calculate(&items, ShippingMethod::Overnight);
        assert_eq!(totals.shipping_fee, Decimal::new(2499, 2));
    }

    #[test]
    fn pickup_is_always_free() {
        let items = vec![item(Decimal::from(1), 1)];
        let totals = calculate(&items, ShippingMethod::Pickup);
        assert_eq!(totals.shipping_fee, Decimal::ZERO);
    }

    #[test]
    fn calculation_is_idempotent() {
        let items = vec![
            item(Decimal::new(1250, 2), 3),
            item(Decimal::new(333, 2), 1),
        ];
        let first = calculate(&items, ShippingMethod::Express);
        let second = calculate(&items, ShippingMethod::Express);
        assert_eq!(first, second);
    }

    #[test]
    fn tax_rounds_to_cents() {
        // 10.01 * 0.085 = 0.85085 -> 0.85
        let items = vec![item(Decimal::new(1001, 2), 1)];
        let totals = calculate(&items, ShippingMethod::Pickup);
        assert_eq!(totals.tax, Decimal::new(85, 2));
        assert_eq!(totals.total, Decimal::new(1086, 2));
    }
}
