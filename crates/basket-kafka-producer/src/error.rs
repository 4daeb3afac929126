//! Error types for the Kafka producer.

use basket_types::EncodeError;
use thiserror::Error;

/// Errors talking to the schema registry.
#[derive(Error, Debug)]
pub enum SchemaRegistryError {
    #[error("Schema registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Schema registry rejected subject '{subject}' (status {status}, code {code}): {message}")]
    Api {
        subject: String,
        status: u16,
        code: i64,
        message: String,
    },
}

/// Errors from a single produce call.
///
/// Serialization failures (`Encode`, `SchemaRegistry`) are distinct from
/// broker failures (`Delivery`).
#[derive(Error, Debug)]
pub enum ProduceError {
    #[error("Failed to create Kafka client: {0}")]
    Client(#[source] rdkafka::error::KafkaError),

    #[error("Serialization failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("Schema registry error: {0}")]
    SchemaRegistry(#[from] SchemaRegistryError),

    #[error("Delivery to topic '{topic}' failed: {source}")]
    Delivery {
        topic: String,
        #[source]
        source: rdkafka::error::KafkaError,
    },

    #[error("Topic creation failed for '{topic}': {message}")]
    TopicCreation { topic: String, message: String },
}

impl ProduceError {
    /// True when the failure happened before anything reached the broker.
    pub fn is_serialization(&self) -> bool {
        matches!(
            self,
            ProduceError::Encode(_) | ProduceError::SchemaRegistry(_)
        )
    }
}
