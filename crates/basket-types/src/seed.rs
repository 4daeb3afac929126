//! Seed catalog: the reference data records are generated from.
//!
//! The catalog is a JSON document with three named sequences:
//!
//! ```json
//! {
//!   "clerks":   [{ "id": "...", "name": "..." }],
//!   "stores":   [{ "id": "...", "name": "..." }],
//!   "products": [{ "id": "...", "name": "...", "brand": "...", "category": "...", "price": 10.0 }]
//! }
//! ```
//!
//! It is loaded once per run and never mutated afterwards.

use crate::error::SeedError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clerk {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
}

/// Immutable reference data shared by every generated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedCatalog {
    pub clerks: Vec<Clerk>,
    pub stores: Vec<Store>,
    pub products: Vec<Product>,
}

impl SeedCatalog {
    /// Load and validate a catalog from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&content)?;

        tracing::debug!(
            "Loaded seed catalog from {}: {} clerks, {} stores, {} products",
            path.display(),
            catalog.clerks.len(),
            catalog.stores.len(),
            catalog.products.len()
        );

        Ok(catalog)
    }

    /// Parse and validate a catalog from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        let catalog: SeedCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Every sequence must hold at least one element or generation cannot proceed.
    pub fn validate(&self) -> Result<(), SeedError> {
        if self.clerks.is_empty() {
            return Err(SeedError::Empty("clerks"));
        }
        if self.stores.is_empty() {
            return Err(SeedError::Empty("stores"));
        }
        if self.products.is_empty() {
            return Err(SeedError::Empty("products"));
        }
        Ok(())
    }

    /// Pretty-printed JSON form, used when echoing the seed at startup.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
