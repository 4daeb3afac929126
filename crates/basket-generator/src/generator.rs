//! Basket and payment construction.

use crate::config::GeneratorConfig;
use crate::ids::generate_uuid_v4;
use crate::timestamp::{epoch_millis, format_local, payment_delay};
use basket_types::{Basket, BasketItem, BasketTotals, IdRef, Payment, SeedCatalog, SeedError};
use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Highest terminal-point number drawn for a basket.
const MAX_TERMINAL_POINT: u32 = 20;

/// Error type for generator operations.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The catalog cannot feed generation
    #[error("Seed catalog unusable: {0}")]
    Catalog(#[from] SeedError),

    /// Fixed store index outside the catalog
    #[error("Store index {index} out of range ({count} stores in seed catalog)")]
    StoreOutOfRange { index: usize, count: usize },

    /// Configuration bounds that make generation impossible
    #[error("Invalid generator config: {0}")]
    InvalidConfig(String),
}

/// A generated basket plus what the payment and the broker key need from it.
#[derive(Debug, Clone)]
pub struct GeneratedBasket {
    pub basket: Basket,
    /// The single captured instant both basket timestamps derive from.
    pub event_time: DateTime<Local>,
    /// Partition key for the broker.
    pub store_name: String,
}

/// Generator that produces correlated basket/payment pairs.
///
/// Holds no state across calls other than its random source.
pub struct EventGenerator {
    config: GeneratorConfig,
    rng: StdRng,
}

impl EventGenerator {
    /// Create a new generator.
    ///
    /// With `seed` set every draw is reproducible; without it the RNG is
    /// seeded from OS entropy.
    pub fn new(config: GeneratorConfig, seed: Option<u64>) -> Result<Self, GeneratorError> {
        if config.max_items_per_basket == 0 {
            return Err(GeneratorError::InvalidConfig(
                "max_items_per_basket must be at least 1".to_string(),
            ));
        }
        if config.max_quantity == 0 {
            return Err(GeneratorError::InvalidConfig(
                "max_quantity must be at least 1".to_string(),
            ));
        }
        if i32::try_from(config.max_quantity).is_err() {
            return Err(GeneratorError::InvalidConfig(format!(
                "max_quantity must fit an int32 quantity, got {}",
                config.max_quantity
            )));
        }
        if !config.vat_rate.is_finite() || config.vat_rate < 0.0 {
            return Err(GeneratorError::InvalidConfig(format!(
                "vat_rate must be a non-negative number, got {}",
                config.vat_rate
            )));
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self { config, rng })
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Check that `catalog` can feed this generator.
    ///
    /// Callers run this once before the first `generate_basket` call.
    pub fn check_catalog(&self, catalog: &SeedCatalog) -> Result<(), GeneratorError> {
        catalog.validate()?;
        if let Some(index) = self.config.store_index {
            if index >= catalog.stores.len() {
                return Err(GeneratorError::StoreOutOfRange {
                    index,
                    count: catalog.stores.len(),
                });
            }
        }
        Ok(())
    }

    /// Generate a basket stamped with the current local time.
    pub fn generate_basket(
        &mut self,
        catalog: &SeedCatalog,
    ) -> Result<GeneratedBasket, GeneratorError> {
        self.generate_basket_at(catalog, Local::now())
    }

    /// Generate a basket stamped with `event_time`.
    pub fn generate_basket_at(
        &mut self,
        catalog: &SeedCatalog,
        event_time: DateTime<Local>,
    ) -> Result<GeneratedBasket, GeneratorError> {
        self.check_catalog(catalog)?;

        let store = match self.config.store_index {
            Some(index) => &catalog.stores[index],
            None => &catalog.stores[self.rng.gen_range(0..catalog.stores.len())],
        };
        let clerk = &catalog.clerks[self.rng.gen_range(0..catalog.clerks.len())];

        let invoice_number = generate_uuid_v4(&mut self.rng);

        // At least one item per basket; products may repeat across lines
        let item_count = self.rng.gen_range(1..=self.config.max_items_per_basket);
        let basket_items: Vec<BasketItem> = (0..item_count)
            .map(|_| {
                let product = &catalog.products[self.rng.gen_range(0..catalog.products.len())];
                let quantity = self.rng.gen_range(1..=self.config.max_quantity);
                BasketItem {
                    id: product.id.clone(),
                    name: product.name.clone(),
                    brand: product.brand.clone(),
                    category: product.category.clone(),
                    price: product.price,
                    // max_quantity is checked against i32::MAX in new()
                    quantity: quantity as i32,
                }
            })
            .collect();

        let totals = BasketTotals::compute(&basket_items, self.config.vat_rate);
        let terminal_point = self.rng.gen_range(0..=MAX_TERMINAL_POINT);

        let basket = Basket {
            invoice_number,
            sale_date_time: format_local(&event_time, &self.config.time_offset),
            sale_timestamp: epoch_millis(&event_time),
            store: IdRef {
                id: store.id.clone(),
                name: store.name.clone(),
            },
            clerk: IdRef {
                id: clerk.id.clone(),
                name: clerk.name.clone(),
            },
            terminal_point: terminal_point.to_string(),
            basket_items,
            nett: totals.nett,
            vat: totals.vat,
            total: totals.total,
        };

        tracing::trace!(
            "Generated basket {} with {} items, total {:.2}",
            basket.invoice_number,
            basket.basket_items.len(),
            basket.total
        );

        Ok(GeneratedBasket {
            store_name: store.name.clone(),
            basket,
            event_time,
        })
    }

    /// Generate the payment settling a basket.
    ///
    /// Pay time is derived from the basket's captured `event_time`, never
    /// from a fresh clock reading.
    pub fn generate_payment(
        &mut self,
        invoice_number: &str,
        event_time: DateTime<Local>,
        total: f64,
    ) -> Payment {
        let pay_time = event_time + payment_delay(&mut self.rng);

        Payment {
            invoice_number: invoice_number.to_string(),
            pay_date_time: format_local(&pay_time, &self.config.time_offset),
            pay_timestamp: epoch_millis(&pay_time),
            paid: total,
            fin_transaction_id: generate_uuid_v4(&mut self.rng),
        }
    }
}
