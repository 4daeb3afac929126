//! Produce client.
//!
//! [`MessageProducer`] is the capability the run loop drives. Each call to
//! `produce` waits for the broker acknowledgement of that one message, so a
//! returned [`Delivery`] always carries the assigned partition and offset.

use crate::error::ProduceError;
use crate::schema_registry::SchemaRegistryClient;
use crate::serializer::ProtobufSerializer;
use async_trait::async_trait;
use basket_types::SalesRecord;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Offset reported by producers that never reach a broker.
pub const NULL_OFFSET: i64 = -1;

/// How long `close` waits for outstanding messages.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Broker acknowledgement for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

impl Delivery {
    /// False for the placeholder returned when nothing was sent.
    pub fn is_delivered(&self) -> bool {
        self.offset != NULL_OFFSET
    }
}

/// Connection settings for [`KafkaProducer`].
#[derive(Debug, Clone)]
pub struct KafkaProducerConfig {
    pub bootstrap_servers: String,
    pub schema_registry_url: String,
    pub client_id: Option<String>,
    pub security_protocol: Option<String>,
    /// SASL is configured only when this is non-empty.
    pub sasl_mechanisms: Option<String>,
    pub sasl_username: Option<String>,
    pub sasl_password: Option<String>,
    pub schema_registry_auth: Option<(String, String)>,
    /// Upper bound on how long librdkafka retries one message.
    pub message_timeout: Duration,
    /// How long `send` may wait for room in the local queue.
    pub queue_timeout: Duration,
}

impl KafkaProducerConfig {
    pub fn new(bootstrap_servers: impl Into<String>, schema_registry_url: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            schema_registry_url: schema_registry_url.into(),
            client_id: None,
            security_protocol: None,
            sasl_mechanisms: None,
            sasl_username: None,
            sasl_password: None,
            schema_registry_auth: None,
            message_timeout: Duration::from_secs(30),
            queue_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_sasl(
        mut self,
        security_protocol: impl Into<String>,
        mechanisms: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.security_protocol = Some(security_protocol.into());
        self.sasl_mechanisms = Some(mechanisms.into());
        self.sasl_username = Some(username.into());
        self.sasl_password = Some(password.into());
        self
    }

    pub fn with_schema_registry_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.schema_registry_auth = Some((username.into(), password.into()));
        self
    }

    fn sasl_enabled(&self) -> bool {
        self.sasl_mechanisms
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty())
    }

    /// librdkafka settings shared by the producer and the admin client.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        if let Some(client_id) = &self.client_id {
            config.set("client.id", client_id);
        }
        if self.sasl_enabled() {
            if let Some(protocol) = &self.security_protocol {
                config.set("security.protocol", protocol);
            }
            if let Some(mechanisms) = &self.sasl_mechanisms {
                config.set("sasl.mechanisms", mechanisms);
            }
            if let Some(username) = &self.sasl_username {
                config.set("sasl.username", username);
            }
            if let Some(password) = &self.sasl_password {
                config.set("sasl.password", password);
            }
        }
        config
    }

    fn producer_config(&self) -> ClientConfig {
        let mut config = self.client_config();
        config.set(
            "message.timeout.ms",
            self.message_timeout.as_millis().to_string(),
        );
        config
    }
}

/// Publishes records and reports their delivery.
#[async_trait]
pub trait MessageProducer: Send {
    /// Serialize and send one record, waiting for its acknowledgement.
    async fn produce(
        &mut self,
        record: SalesRecord<'_>,
        topic: &str,
        key: &str,
    ) -> Result<Delivery, ProduceError>;

    /// Wait up to `timeout` for outstanding messages. Returns how many remain.
    async fn flush(&mut self, timeout: Duration) -> usize;

    /// Flush and release the client.
    async fn close(&mut self);
}

/// Kafka-backed producer with schema-registry protobuf values.
pub struct KafkaProducer {
    producer: FutureProducer,
    serializer: ProtobufSerializer<SchemaRegistryClient>,
    queue_timeout: Duration,
}

impl KafkaProducer {
    pub fn new(config: &KafkaProducerConfig) -> Result<Self, ProduceError> {
        let producer: FutureProducer = config
            .producer_config()
            .create()
            .map_err(ProduceError::Client)?;

        let mut registry = SchemaRegistryClient::new(&config.schema_registry_url);
        if let Some((username, password)) = &config.schema_registry_auth {
            registry = registry.with_basic_auth(username, password);
        }

        info!(
            "Kafka producer created for {} (schema registry {})",
            config.bootstrap_servers,
            registry.base_url()
        );

        Ok(Self {
            producer,
            serializer: ProtobufSerializer::new(registry),
            queue_timeout: config.queue_timeout,
        })
    }

    async fn flush_blocking(&self, timeout: Duration) -> usize {
        let producer = self.producer.clone();
        let result = tokio::task::spawn_blocking(move || {
            if let Err(e) = producer.flush(timeout) {
                warn!("Producer flush did not complete: {e}");
            }
            producer.in_flight_count()
        })
        .await;

        match result {
            Ok(remaining) => remaining.max(0) as usize,
            Err(e) => {
                warn!("Producer flush task failed: {e}");
                self.producer.in_flight_count().max(0) as usize
            }
        }
    }
}

#[async_trait]
impl MessageProducer for KafkaProducer {
    async fn produce(
        &mut self,
        record: SalesRecord<'_>,
        topic: &str,
        key: &str,
    ) -> Result<Delivery, ProduceError> {
        let payload = self.serializer.serialize(topic, record).await?;

        let (partition, offset) = self
            .producer
            .send(
                FutureRecord::to(topic).key(key).payload(&payload),
                self.queue_timeout,
            )
            .await
            .map_err(|(source, _)| ProduceError::Delivery {
                topic: topic.to_string(),
                source,
            })?;

        debug!(
            "Delivered {} {} to {topic} [{partition}] @ {offset}",
            record.kind(),
            record.invoice_number()
        );
        Ok(Delivery { partition, offset })
    }

    async fn flush(&mut self, timeout: Duration) -> usize {
        self.flush_blocking(timeout).await
    }

    async fn close(&mut self) {
        let remaining = self.flush_blocking(CLOSE_FLUSH_TIMEOUT).await;
        if remaining > 0 {
            warn!("Closing producer with {remaining} undelivered messages");
        } else {
            info!("Kafka producer closed");
        }
    }
}

/// Producer used when the broker is disabled. Accepts everything, sends nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProducer;

#[async_trait]
impl MessageProducer for NoopProducer {
    async fn produce(
        &mut self,
        record: SalesRecord<'_>,
        topic: &str,
        _key: &str,
    ) -> Result<Delivery, ProduceError> {
        tracing::trace!("Skipping {} {} for {topic}", record.kind(), record.invoice_number());
        Ok(Delivery {
            partition: -1,
            offset: NULL_OFFSET,
        })
    }

    async fn flush(&mut self, _timeout: Duration) -> usize {
        0
    }

    async fn close(&mut self) {}
}
