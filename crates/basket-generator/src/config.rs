//! Generation parameters.

use serde::{Deserialize, Serialize};

/// Parameters that shape every generated basket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Upper bound on line items per basket (at least one item is always drawn).
    pub max_items_per_basket: u32,
    /// Upper bound on quantity per line item.
    pub max_quantity: u32,
    /// Sales tax rate applied to the rounded net amount.
    pub vat_rate: f64,
    /// Pin every basket to this store index instead of drawing one.
    pub store_index: Option<usize>,
    /// Zone offset appended to the human-readable timestamps, e.g. "+02:00".
    pub time_offset: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_items_per_basket: 10,
            max_quantity: 5,
            vat_rate: 0.15,
            store_index: None,
            time_offset: "+00:00".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Set the item count bound.
    pub fn with_max_items(mut self, max_items: u32) -> Self {
        self.max_items_per_basket = max_items;
        self
    }

    /// Set the per-item quantity bound.
    pub fn with_max_quantity(mut self, max_quantity: u32) -> Self {
        self.max_quantity = max_quantity;
        self
    }

    /// Set the sales tax rate.
    pub fn with_vat_rate(mut self, vat_rate: f64) -> Self {
        self.vat_rate = vat_rate;
        self
    }

    /// Pin the store selection.
    pub fn with_store_index(mut self, store_index: Option<usize>) -> Self {
        self.store_index = store_index;
        self
    }

    /// Set the appended zone offset.
    pub fn with_time_offset(mut self, time_offset: impl Into<String>) -> Self {
        self.time_offset = time_offset.into();
        self
    }
}
