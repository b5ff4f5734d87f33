use serde::Serialize;

use crate::structs::{LineItem, Order};

/// Local-currency price for a USD price at the given exchange rate.
///
/// Returns `None` when there is no USD price or the rate is zero, in which
/// case the price already on the form stands.
pub fn derive_local_price(price_usd: Option<f64>, exchange_rate: f64) -> Option<f64> {
    match price_usd {
        Some(usd) if exchange_rate != 0.0 => Some(usd * exchange_rate),
        _ => None,
    }
}

/// Bonus lines are free of charge.
pub fn line_total(item: &LineItem) -> f64 {
    if item.is_bonus {
        0.0
    } else {
        item.quantity as f64 * item.price
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub delivery: f64,
    pub total: f64,
}

impl OrderTotals {
    pub fn of(order: &Order) -> Self {
        let subtotal: f64 = order.drugs.iter().map(line_total).sum();
        let delivery = if order.is_free_delivery {
            0.0
        } else {
            order.delivery_fee.unwrap_or(0.0)
        };
        OrderTotals {
            subtotal,
            delivery,
            total: subtotal + delivery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn local_price_is_usd_times_rate() {
        assert_eq!(derive_local_price(Some(2.5), 15000.0), Some(37500.0));
        assert_eq!(derive_local_price(Some(2.5), 14000.0), Some(35000.0));
        assert_eq!(derive_local_price(Some(3.0), 14000.0), Some(42000.0));
    }

    #[test]
    fn no_usd_price_or_zero_rate_leaves_price_alone() {
        assert_eq!(derive_local_price(None, 15000.0), None);
        assert_eq!(derive_local_price(Some(2.0), 0.0), None);
    }

    #[test]
    fn totals_skip_bonus_lines_and_honour_free_delivery() {
        let mut order: Order = serde_json::from_value(json!({
            "_id": "o1",
            "status": "confirmed",
            "deliveryFee": 5000,
            "drugs": [
                { "drug": { "name": "Panadol" }, "quantity": 10, "price": 1200 },
                { "drug": { "name": "Panadol" }, "quantity": 2, "price": 1200, "isBonus": true },
                { "drug": { "name": "Augmentin" }, "quantity": 3, "price": 8000 }
            ]
        }))
        .unwrap();

        let totals = OrderTotals::of(&order);
        assert_eq!(totals.subtotal, 36000.0);
        assert_eq!(totals.delivery, 5000.0);
        assert_eq!(totals.total, 41000.0);

        order.is_free_delivery = true;
        let totals = OrderTotals::of(&order);
        assert_eq!(totals.delivery, 0.0);
        assert_eq!(totals.total, 36000.0);
    }

    #[test]
    fn missing_delivery_fee_counts_as_zero() {
        let order: Order = serde_json::from_value(json!({
            "_id": "o1", "status": "pending", "drugs": []
        }))
        .unwrap();
        assert_eq!(
            OrderTotals::of(&order),
            OrderTotals { subtotal: 0.0, delivery: 0.0, total: 0.0 }
        );
    }
}
