//! Monetary rounding and basket totals.

use crate::record::BasketItem;

/// Round to 2 decimal places, half away from zero.
pub fn round_money(value: f64) -> f64 {
    // f64::round already rounds half away from zero
    (value * 100.0).round() / 100.0
}

/// The three money fields of a basket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasketTotals {
    pub nett: f64,
    pub vat: f64,
    pub total: f64,
}

impl BasketTotals {
    /// Compute totals for a list of items.
    ///
    /// The net sum is rounded once, after summing unrounded line totals, and
    /// tax is derived from the rounded net.
    pub fn compute(items: &[BasketItem], vat_rate: f64) -> Self {
        let raw: f64 = items
            .iter()
            .map(|item| item.price * item.quantity as f64)
            .sum();

        let nett = round_money(raw);
        let vat = round_money(nett * vat_rate);
        let total = round_money(nett + vat);

        Self { nett, vat, total }
    }
}
