//! Kafka producer for basket-loadgen.
//!
//! This library wraps a schema-registry aware protobuf serializer and an
//! rdkafka producer into a request/acknowledgement contract: `produce`
//! returns only once the broker has confirmed the message (partition and
//! offset) or reported a delivery error for it.
//!
//! ## Features
//!
//! - **Schema registry**: protobuf schemas are registered under the
//!   `{topic}-value` subject and the returned id is cached
//! - **Wire format**: payloads carry the registry envelope
//!   (magic byte, schema id, message indexes)
//! - **Producer capability**: [`MessageProducer`] with a Kafka-backed and a
//!   no-op implementation, so callers never branch on whether the broker is
//!   enabled
//! - **Topic management**: create the record topics if they don't exist
//!
//! ## Usage
//!
//! ```rust,no_run
//! use basket_kafka_producer::{KafkaProducer, KafkaProducerConfig, MessageProducer};
//! use basket_types::SalesRecord;
//!
//! # async fn run(basket: &basket_types::Basket) -> anyhow::Result<()> {
//! let config = KafkaProducerConfig::new("localhost:9092", "http://localhost:8081");
//! let mut producer = KafkaProducer::new(&config)?;
//!
//! let delivery = producer
//!     .produce(SalesRecord::Basket(basket), "pos_basket", &basket.store.name)
//!     .await?;
//! println!("partition {} offset {}", delivery.partition, delivery.offset);
//!
//! producer.close().await;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod error;
pub mod producer;
pub mod schema_registry;
pub mod serializer;
pub mod wire;

pub use admin::{create_topics, TopicSpec};
pub use error::{ProduceError, SchemaRegistryError};
pub use producer::{
    Delivery, KafkaProducer, KafkaProducerConfig, MessageProducer, NoopProducer, NULL_OFFSET,
};
pub use schema_registry::{value_subject, SchemaRegistryClient, SchemaResolver};
pub use serializer::ProtobufSerializer;
