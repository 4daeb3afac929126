//! Shared record types for basket-loadgen.
//!
//! This crate defines the data every other crate in the workspace agrees on:
//!
//! - [`seed`] - the read-only reference catalog (clerks, stores, products)
//! - [`record`] - the generated `Basket` and `Payment` records and their
//!   JSON field layout
//! - [`money`] - two-decimal rounding and basket totals
//! - [`proto`] - the protobuf schema text registered with the schema registry
//!   and the matching wire encoding
//!
//! The record structs are the single schema definition: serde drives the JSON
//! form (used for the document store and the file dump) and [`proto`] encodes
//! the same fields for the broker.

pub mod error;
pub mod money;
pub mod proto;
pub mod record;
pub mod seed;

pub use error::{EncodeError, SeedError};
pub use money::{round_money, BasketTotals};
pub use record::{Basket, BasketItem, IdRef, Payment, RecordKind, SalesRecord};
pub use seed::{Clerk, Product, SeedCatalog, Store};
