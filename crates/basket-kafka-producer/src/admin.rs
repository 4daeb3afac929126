//! Topic administration.

use crate::error::ProduceError;
use crate::producer::KafkaProducerConfig;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::types::RDKafkaErrorCode;
use std::time::Duration;
use tracing::info;

/// A topic to create before producing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i32,
    /// Value for the `retention.ms` topic setting.
    pub retention_ms: Option<i64>,
}

impl TopicSpec {
    pub fn new(name: impl Into<String>, partitions: i32, replication_factor: i32) -> Self {
        Self {
            name: name.into(),
            partitions,
            replication_factor,
            retention_ms: None,
        }
    }

    pub fn with_retention_ms(mut self, retention_ms: i64) -> Self {
        self.retention_ms = Some(retention_ms);
        self
    }
}

/// Create the given topics. A topic that already exists is not an error.
pub async fn create_topics(
    config: &KafkaProducerConfig,
    topics: &[TopicSpec],
    timeout: Duration,
) -> Result<(), ProduceError> {
    if topics.is_empty() {
        return Ok(());
    }

    let admin_client: AdminClient<DefaultClientContext> =
        config.client_config().create().map_err(ProduceError::Client)?;

    let retention: Vec<Option<String>> = topics
        .iter()
        .map(|t| t.retention_ms.map(|ms| ms.to_string()))
        .collect();
    let new_topics: Vec<NewTopic<'_>> = topics
        .iter()
        .zip(&retention)
        .map(|(spec, retention)| {
            let topic = NewTopic::new(
                &spec.name,
                spec.partitions,
                TopicReplication::Fixed(spec.replication_factor),
            );
            match retention {
                Some(ms) => topic.set("retention.ms", ms),
                None => topic,
            }
        })
        .collect();

    let opts = AdminOptions::new().operation_timeout(Some(timeout));

    let results = admin_client
        .create_topics(&new_topics, &opts)
        .await
        .map_err(|e| ProduceError::TopicCreation {
            topic: topics
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
            message: e.to_string(),
        })?;

    for result in results {
        match result {
            Ok(topic_name) => {
                info!("Topic '{topic_name}' created successfully");
            }
            Err((topic_name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                info!("Topic '{topic_name}' already exists");
            }
            Err((topic_name, code)) => {
                return Err(ProduceError::TopicCreation {
                    topic: topic_name,
                    message: code.to_string(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_spec_builder() {
        let spec = TopicSpec::new("pos_basket", 3, 1).with_retention_ms(604_800_000);
        assert_eq!(spec.name, "pos_basket");
        assert_eq!(spec.partitions, 3);
        assert_eq!(spec.retention_ms, Some(604_800_000));
    }

    #[tokio::test]
    async fn test_no_topics_is_noop() {
        let config = KafkaProducerConfig::new("localhost:1", "http://localhost:1");
        create_topics(&config, &[], Duration::from_secs(1)).await.unwrap();
    }
}
