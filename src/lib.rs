//! basket-loadgen
//!
//! Generates correlated retail basket and payment events and delivers each
//! pair to Kafka (schema-registry protobuf), MongoDB (single or batched
//! inserts) and optionally to per-run JSON files.
//!
//! The sinks live in their own crates:
//!
//! - `basket_generator` - basket and payment construction
//! - `basket_kafka_producer` - schema registry, wire framing, produce/flush
//! - `basket_mongodb_sink` - JSON to BSON conversion and batched writes
//!
//! This crate holds configuration, logging, the file dump and the run loop.
//!
//! # CLI Usage
//!
//! ```bash
//! # Run with dev_app.json, dev_kafka.json and dev_mongo.json from ./conf
//! basket-loadgen run --env dev --config-dir conf
//!
//! # Reproducible 1000-iteration run
//! basket-loadgen run --env dev --config-dir conf --seed 42 --iterations 1000
//! ```

pub mod app;
pub mod config;
pub mod file_dump;
pub mod logging;
pub mod metrics;
pub mod run;

pub use config::{Config, Credentials};
pub use file_dump::FileDump;
pub use metrics::RunMetrics;
pub use run::{RunLoop, RunOptions};
