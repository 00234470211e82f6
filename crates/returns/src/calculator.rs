//! Remuneration and return totals.
//!
//! Integer arithmetic over minor currency units, no I/O. Totals saturate at
//! the `i64` bounds rather than overflow.

use returnflow_core::Money;

use crate::model::{CalculableObject, OrderItem, Return, ReturnTotals, Totals};

#[derive(Debug, Clone, Copy, Default)]
pub struct RemunerationTotalCalculator;

impl RemunerationTotalCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Write the sum of item remuneration amounts into the object's totals.
    ///
    /// Items without a remuneration amount contribute zero.
    pub fn calculate_remuneration_total(&self, calculable: &mut CalculableObject) {
        calculable.totals.remuneration_total = remuneration_sum(&calculable.items);
    }

    /// Totals over a plain list of order items.
    pub fn expand_order_items_totals(&self, items: &[OrderItem]) -> Totals {
        Totals {
            refund_total: items.iter().map(|i| i.refundable_amount).sum(),
            remuneration_total: remuneration_sum(items),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnTotalCalculator;

impl ReturnTotalCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Derive totals from the order items linked to the return's items.
    ///
    /// Return items whose order item could not be resolved contribute zero.
    pub fn calculate_return_totals(&self, sales_return: &Return) -> ReturnTotals {
        let linked = sales_return
            .items
            .iter()
            .filter_map(|item| item.order_item.as_ref());

        let mut totals = ReturnTotals::default();
        for order_item in linked {
            totals.refund_total += order_item.refundable_amount;
            totals.remuneration_total += order_item.remuneration_amount.unwrap_or(Money::ZERO);
        }
        totals
    }
}

fn remuneration_sum(items: &[OrderItem]) -> Money {
    items
        .iter()
        .map(|i| i.remuneration_amount.unwrap_or(Money::ZERO))
        .sum()
}
