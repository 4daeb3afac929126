//! Event generator for basket-loadgen.
//!
//! This crate provides the `EventGenerator` which produces a `Basket` from the
//! seed catalog and, from that basket, its dependent `Payment`. All random
//! draws come from one `StdRng`, so a fixed seed reproduces a run exactly.
//!
//! # Architecture
//!
//! ```text
//! SeedCatalog + GeneratorConfig
//!        │
//!        ▼
//! ┌─────────────────┐
//! │ EventGenerator  │
//! │                 │
//! │  - rng (StdRng) │
//! └────────┬────────┘
//!          │ generate_basket()
//!          ▼
//!   GeneratedBasket { basket, event_time, store_name }
//!          │ generate_payment(invoice, event_time, total)
//!          ▼
//!       Payment
//! ```
//!
//! # Example
//!
//! ```rust
//! use basket_generator::{EventGenerator, GeneratorConfig};
//! use basket_types::SeedCatalog;
//!
//! let catalog = SeedCatalog::from_json(r#"{
//!   "clerks":   [{ "id": "c1", "name": "Alice" }],
//!   "stores":   [{ "id": "s1", "name": "Downtown" }],
//!   "products": [{ "id": "p1", "name": "Tea", "price": 10.0 }]
//! }"#).unwrap();
//!
//! let mut generator = EventGenerator::new(GeneratorConfig::default(), Some(42)).unwrap();
//! let generated = generator.generate_basket(&catalog).unwrap();
//! let payment = generator.generate_payment(
//!     &generated.basket.invoice_number,
//!     generated.event_time,
//!     generated.basket.total,
//! );
//! assert_eq!(payment.paid, generated.basket.total);
//! ```

pub mod config;
pub mod generator;
pub mod ids;
pub mod timestamp;

// Re-exports for convenience
pub use config::GeneratorConfig;
pub use generator::{EventGenerator, GeneratedBasket, GeneratorError};
