//! Wires a loaded [`Config`] into a ready-to-run [`RunLoop`].

use crate::config::{Config, KafkaSettings, MongoSettings};
use crate::file_dump::FileDump;
use crate::logging::mask_connection_password;
use crate::metrics::RunMetrics;
use crate::run::{RunLoop, RunOptions, DEFAULT_FLUSH_TIMEOUT};
use anyhow::Context;
use basket_generator::EventGenerator;
use basket_kafka_producer::{
    create_topics, KafkaProducer, KafkaProducerConfig, MessageProducer, NoopProducer, TopicSpec,
};
use basket_mongodb_sink::{BatchSinkWriter, CollectionNames, MongoDocumentStore};
use basket_types::SeedCatalog;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// Host name used as the Kafka client id.
fn client_id() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "basket-loadgen".to_string())
}

/// Producer settings derived from the Kafka options.
pub fn producer_config(kafka: &KafkaSettings) -> KafkaProducerConfig {
    let mut config = KafkaProducerConfig::new(&kafka.bootstrap_servers, &kafka.schema_registry_url)
        .with_client_id(client_id());
    if !kafka.sasl_mechanisms.trim().is_empty() {
        config = config.with_sasl(
            &kafka.security_protocol,
            &kafka.sasl_mechanisms,
            kafka.sasl_username.clone().unwrap_or_default(),
            kafka.sasl_password.clone().unwrap_or_default(),
        );
    }
    if let Some(username) = &kafka.schema_registry_username {
        config = config.with_schema_registry_auth(
            username,
            kafka.schema_registry_password.clone().unwrap_or_default(),
        );
    }
    config
}

/// Topics to create before the run.
pub fn topic_specs(kafka: &KafkaSettings) -> Vec<TopicSpec> {
    [&kafka.basket_topic, &kafka.payment_topic]
        .into_iter()
        .map(|name| {
            let spec = TopicSpec::new(name, kafka.num_partitions, kafka.replication_factor);
            match kafka.retention {
                Some(ms) => spec.with_retention_ms(ms),
                None => spec,
            }
        })
        .collect()
}

async fn connect_kafka(kafka: &KafkaSettings) -> anyhow::Result<Box<dyn MessageProducer>> {
    let config = producer_config(kafka);

    if kafka.create_topics {
        create_topics(&config, &topic_specs(kafka), kafka.admin_timeout()?)
            .await
            .context("Failed to create Kafka topics")?;
    }

    let producer = KafkaProducer::new(&config).context("Failed to create Kafka producer")?;
    Ok(Box::new(producer))
}

async fn connect_mongo(
    mongo: &MongoSettings,
) -> anyhow::Result<BatchSinkWriter<MongoDocumentStore>> {
    let uri = mongo.connection_uri();
    info!("Connecting to MongoDB at {}", mask_connection_password(&uri));

    let names = CollectionNames::new(&mongo.basket_collection, &mongo.payment_collection);
    let store = MongoDocumentStore::connect(&uri, &mongo.datastore, names)
        .await
        .context("Failed to connect to MongoDB")?;
    Ok(BatchSinkWriter::new(store, mongo.batch_size))
}

/// Load the seed catalog, connect the enabled sinks and run.
pub async fn run(config: Config, cancel: CancellationToken) -> anyhow::Result<RunMetrics> {
    if config.general.echo_config {
        config.echo();
    }

    let catalog = SeedCatalog::from_file(&config.general.seed_file)
        .with_context(|| format!("Failed to load seed file {:?}", config.general.seed_file))?;
    info!(
        "Loaded seed catalog: {} clerks, {} stores, {} products",
        catalog.clerks.len(),
        catalog.stores.len(),
        catalog.products.len()
    );
    if config.general.echo_seed {
        info!("Seed:\n{}", catalog.to_pretty_json());
    }

    let rng_seed = config.general.rng_seed;
    let generator = EventGenerator::new(config.general.generator_config(), rng_seed)
        .context("Invalid generator settings")?;
    generator
        .check_catalog(&catalog)
        .context("Seed catalog cannot feed the generator")?;

    let producer: Box<dyn MessageProducer> = match &config.kafka {
        Some(kafka) => connect_kafka(kafka).await?,
        None => Box::new(NoopProducer),
    };

    let documents = match &config.mongo {
        Some(mongo) => Some(connect_mongo(mongo).await?),
        None => None,
    };

    let file_dump = if config.general.json_to_file {
        let run_id = Uuid::new_v4().to_string();
        let dump = FileDump::create(&config.general.output_path, &run_id).await?;
        info!("Dumping records to {:?} and {:?}", dump.basket_path(), dump.payment_path());
        Some(dump)
    } else {
        None
    };

    let options = RunOptions {
        iterations: config.general.iterations(),
        sleep_ms: config.general.sleep_ms,
        basket_topic: config
            .kafka
            .as_ref()
            .map(|k| k.basket_topic.clone())
            .unwrap_or_default(),
        payment_topic: config
            .kafka
            .as_ref()
            .map(|k| k.payment_topic.clone())
            .unwrap_or_default(),
        // Nothing to flush without a broker
        flush_interval: config.kafka.as_ref().map(|k| k.flush_interval).unwrap_or(0),
        flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        pacing_seed: rng_seed.map(|seed| seed.wrapping_add(1)),
    };

    let mut run_loop = RunLoop::new(options, catalog, generator, producer, cancel);
    if let Some(writer) = documents {
        run_loop = run_loop.with_documents(writer);
    }
    if let Some(dump) = file_dump {
        run_loop = run_loop.with_file_dump(dump);
    }

    run_loop.run().await
}
