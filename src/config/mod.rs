//! Run configuration.
//!
//! Three JSON files are read from the config directory for an environment
//! name `env`:
//!
//! - `{env}_app.json` - general options, always read
//! - `{env}_kafka.json` - broker options, read only when Kafka is enabled
//! - `{env}_mongo.json` - document store options, read only when MongoDB is enabled
//!
//! Credentials never live in these files; they come from the command line or
//! the environment (see [`Credentials`]).

pub mod duration;

pub use duration::parse_duration;

use crate::logging::{mask_connection_password, mask_secret};
use anyhow::Context;
use basket_generator::GeneratorConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// General options from `{env}_app.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 0 info, 1 debug, 2+ trace. Ignored when `RUST_LOG` is set.
    pub debug_level: u8,
    pub echo_config: bool,
    pub echo_seed: bool,
    /// Iterations to run; 0 runs until interrupted.
    pub test_size: u64,
    /// Upper bound of the random pause, in milliseconds.
    pub sleep_ms: u64,
    pub seed_file: PathBuf,
    pub vat_rate: f64,
    /// Fixed store position in the catalog; 0 draws a store per basket.
    pub store: usize,
    pub kafka_enabled: bool,
    pub mongo_enabled: bool,
    pub json_to_file: bool,
    pub output_path: PathBuf,
    pub time_offset: String,
    pub max_items_basket: u32,
    pub max_quantity: u32,
    /// Seed for every random draw of the run.
    pub rng_seed: Option<u64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug_level: 0,
            echo_config: false,
            echo_seed: false,
            test_size: 100,
            sleep_ms: 0,
            seed_file: PathBuf::from("seed.json"),
            vat_rate: 0.15,
            store: 0,
            kafka_enabled: false,
            mongo_enabled: false,
            json_to_file: false,
            output_path: PathBuf::from("output"),
            time_offset: "+00:00".to_string(),
            max_items_basket: 10,
            max_quantity: 5,
            rng_seed: None,
        }
    }
}

impl GeneralConfig {
    /// `None` when unbounded.
    pub fn iterations(&self) -> Option<u64> {
        (self.test_size > 0).then_some(self.test_size)
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig::default()
            .with_max_items(self.max_items_basket)
            .with_max_quantity(self.max_quantity)
            .with_vat_rate(self.vat_rate)
            .with_store_index((self.store > 0).then_some(self.store))
            .with_time_offset(self.time_offset.clone())
    }
}

/// Broker options from `{env}_kafka.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaSettings {
    pub bootstrap_servers: String,
    pub schema_registry_url: String,
    pub schema_registry_username: Option<String>,
    pub basket_topic: String,
    pub payment_topic: String,
    pub num_partitions: i32,
    pub replication_factor: i32,
    /// Topic `retention.ms`; broker default when unset.
    pub retention: Option<i64>,
    /// Admin operation timeout, e.g. "60s".
    pub admin_timeout: String,
    pub security_protocol: String,
    pub sasl_mechanisms: String,
    /// Produced pairs between explicit flushes; 0 never flushes mid-run.
    pub flush_interval: u64,
    pub create_topics: bool,
    #[serde(skip)]
    pub sasl_username: Option<String>,
    #[serde(skip)]
    pub sasl_password: Option<String>,
    #[serde(skip)]
    pub schema_registry_password: Option<String>,
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            schema_registry_url: "http://localhost:8081".to_string(),
            schema_registry_username: None,
            basket_topic: "pos_basket".to_string(),
            payment_topic: "pos_pmnt".to_string(),
            num_partitions: 3,
            replication_factor: 1,
            retention: None,
            admin_timeout: "60s".to_string(),
            security_protocol: "PLAINTEXT".to_string(),
            sasl_mechanisms: String::new(),
            flush_interval: 100,
            create_topics: true,
            sasl_username: None,
            sasl_password: None,
            schema_registry_password: None,
        }
    }
}

impl KafkaSettings {
    pub fn admin_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration(&self.admin_timeout)
            .with_context(|| format!("Invalid admin_timeout '{}'", self.admin_timeout))
    }
}

/// Document store options from `{env}_mongo.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoSettings {
    /// URI scheme, "mongodb" or "mongodb+srv".
    pub root: String,
    /// Host part of the URI, optionally with a path and query.
    pub url: String,
    pub datastore: String,
    pub basket_collection: String,
    pub payment_collection: String,
    /// 1 inserts each document on its own.
    pub batch_size: usize,
    #[serde(skip)]
    pub username: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            root: "mongodb".to_string(),
            url: "localhost:27017".to_string(),
            datastore: "pos".to_string(),
            basket_collection: "pos_basket".to_string(),
            payment_collection: "pos_pmnt".to_string(),
            batch_size: 1,
            username: None,
            password: None,
        }
    }
}

impl MongoSettings {
    /// Connection string with majority write concern.
    pub fn connection_uri(&self) -> String {
        let host = match (&self.username, &self.password) {
            (Some(user), Some(password)) if !user.is_empty() => {
                format!("{user}:{password}@{}", self.url)
            }
            (Some(user), None) if !user.is_empty() => format!("{user}@{}", self.url),
            _ => self.url.clone(),
        };
        let separator = if host.contains('?') {
            "&"
        } else if host.contains('/') {
            "?"
        } else {
            "/?"
        };
        format!("{}://{host}{separator}w=majority", self.root)
    }
}

/// Secrets supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub sasl_username: Option<String>,
    pub sasl_password: Option<String>,
    pub schema_registry_password: Option<String>,
    pub mongo_username: Option<String>,
    pub mongo_password: Option<String>,
}

/// Everything a run needs, loaded once and passed down.
#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    pub general: GeneralConfig,
    pub kafka: Option<KafkaSettings>,
    pub mongo: Option<MongoSettings>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {path:?}"))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse config file {path:?}"))
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl Config {
    /// Load and validate the configuration for `env` from `config_dir`.
    pub fn load(config_dir: &Path, env: &str, credentials: Credentials) -> anyhow::Result<Self> {
        let mut general: GeneralConfig = read_json(&config_dir.join(format!("{env}_app.json")))?;
        general.seed_file = resolve(config_dir, &general.seed_file);
        general.output_path = resolve(config_dir, &general.output_path);

        let kafka = if general.kafka_enabled {
            let mut kafka: KafkaSettings =
                read_json(&config_dir.join(format!("{env}_kafka.json")))?;
            kafka.sasl_username = credentials.sasl_username;
            kafka.sasl_password = credentials.sasl_password;
            kafka.schema_registry_password = credentials.schema_registry_password;
            Some(kafka)
        } else {
            None
        };

        let mongo = if general.mongo_enabled {
            let mut mongo: MongoSettings =
                read_json(&config_dir.join(format!("{env}_mongo.json")))?;
            mongo.username = credentials.mongo_username;
            mongo.password = credentials.mongo_password;
            Some(mongo)
        } else {
            None
        };

        let config = Self {
            config_dir: config_dir.to_path_buf(),
            general,
            kafka,
            mongo,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that make a run impossible.
    pub fn validate(&self) -> anyhow::Result<()> {
        let general = &self.general;
        if general.max_items_basket == 0 {
            anyhow::bail!("max_items_basket must be at least 1");
        }
        if general.max_quantity == 0 {
            anyhow::bail!("max_quantity must be at least 1");
        }
        if !general.vat_rate.is_finite() || general.vat_rate < 0.0 {
            anyhow::bail!("vat_rate must be a non-negative number, got {}", general.vat_rate);
        }
        if let Some(kafka) = &self.kafka {
            kafka.admin_timeout()?;
            if kafka.basket_topic.is_empty() || kafka.payment_topic.is_empty() {
                anyhow::bail!("basket_topic and payment_topic must be set");
            }
        }
        if let Some(mongo) = &self.mongo {
            if mongo.batch_size == 0 {
                anyhow::bail!("batch_size must be at least 1");
            }
        }
        Ok(())
    }

    /// Log the effective configuration with secrets masked.
    pub fn echo(&self) {
        let g = &self.general;
        info!("****** General Parameters *****");
        info!("Config dir         : {:?}", self.config_dir);
        info!("Debug level        : {}", g.debug_level);
        info!("Test size          : {}", g.test_size);
        info!("Sleep (ms)         : {}", g.sleep_ms);
        info!("Seed file          : {:?}", g.seed_file);
        info!("VAT rate           : {}", g.vat_rate);
        info!("Store              : {}", g.store);
        info!("Max items/basket   : {}", g.max_items_basket);
        info!("Max quantity       : {}", g.max_quantity);
        info!("Time offset        : {}", g.time_offset);
        info!("Kafka enabled      : {}", g.kafka_enabled);
        info!("Mongo enabled      : {}", g.mongo_enabled);
        info!("JSON to file       : {}", g.json_to_file);
        if g.json_to_file {
            info!("Output path        : {:?}", g.output_path);
        }
        if let Some(seed) = g.rng_seed {
            info!("RNG seed           : {seed}");
        }

        if let Some(k) = &self.kafka {
            info!("****** Kafka Parameters *****");
            info!("Bootstrap servers  : {}", k.bootstrap_servers);
            info!("Schema registry    : {}", k.schema_registry_url);
            info!("Basket topic       : {}", k.basket_topic);
            info!("Payment topic      : {}", k.payment_topic);
            info!("Partitions         : {}", k.num_partitions);
            info!("Replication factor : {}", k.replication_factor);
            info!("Flush interval     : {}", k.flush_interval);
            info!("Security protocol  : {}", k.security_protocol);
            info!("SASL mechanisms    : {}", k.sasl_mechanisms);
            info!(
                "SASL username      : {}",
                k.sasl_username.as_deref().unwrap_or_default()
            );
            info!(
                "SASL password      : {}",
                mask_secret(k.sasl_password.as_deref())
            );
        }

        if let Some(m) = &self.mongo {
            info!("****** Mongo Parameters *****");
            info!("URI                : {}", mask_connection_password(&m.connection_uri()));
            info!("Datastore          : {}", m.datastore);
            info!("Basket collection  : {}", m.basket_collection);
            info!("Payment collection : {}", m.payment_collection);
            info!("Batch size         : {}", m.batch_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_general_only() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "dev_app.json",
            r#"{"test_size": 5, "seed_file": "seed.json", "store": 2, "rng_seed": 7}"#,
        );

        let config = Config::load(dir.path(), "dev", Credentials::default()).unwrap();
        assert_eq!(config.general.iterations(), Some(5));
        assert_eq!(config.general.seed_file, dir.path().join("seed.json"));
        assert_eq!(config.general.rng_seed, Some(7));
        assert!(config.kafka.is_none());
        assert!(config.mongo.is_none());

        let generator = config.general.generator_config();
        assert_eq!(generator.store_index, Some(2));
        assert_eq!(generator.vat_rate, 0.15);
    }

    #[test]
    fn test_zero_store_and_test_size() {
        let general = GeneralConfig {
            test_size: 0,
            store: 0,
            ..Default::default()
        };
        assert_eq!(general.iterations(), None);
        assert_eq!(general.generator_config().store_index, None);
    }

    #[test]
    fn test_kafka_file_read_only_when_enabled() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dev_app.json", r#"{"kafka_enabled": true}"#);
        assert!(Config::load(dir.path(), "dev", Credentials::default()).is_err());

        write(
            dir.path(),
            "dev_kafka.json",
            r#"{"bootstrap_servers": "broker:9092", "flush_interval": 10, "admin_timeout": "5m"}"#,
        );
        let credentials = Credentials {
            sasl_username: Some("user".to_string()),
            sasl_password: Some("pw".to_string()),
            ..Default::default()
        };
        let config = Config::load(dir.path(), "dev", credentials).unwrap();
        let kafka = config.kafka.unwrap();
        assert_eq!(kafka.bootstrap_servers, "broker:9092");
        assert_eq!(kafka.flush_interval, 10);
        assert_eq!(kafka.admin_timeout().unwrap(), Duration::from_secs(300));
        assert_eq!(kafka.sasl_password.as_deref(), Some("pw"));
        assert_eq!(kafka.basket_topic, "pos_basket");
    }

    #[test]
    fn test_mongo_batch_size_validated() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dev_app.json", r#"{"mongo_enabled": true}"#);
        write(dir.path(), "dev_mongo.json", r#"{"batch_size": 0}"#);

        let err = Config::load(dir.path(), "dev", Credentials::default()).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_invalid_general_values() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "dev_app.json", r#"{"max_quantity": 0}"#);
        assert!(Config::load(dir.path(), "dev", Credentials::default()).is_err());

        write(dir.path(), "dev_app.json", r#"{"vat_rate": -0.1}"#);
        assert!(Config::load(dir.path(), "dev", Credentials::default()).is_err());
    }

    #[test]
    fn test_mongo_connection_uri() {
        let mut mongo = MongoSettings::default();
        assert_eq!(mongo.connection_uri(), "mongodb://localhost:27017/?w=majority");

        mongo.root = "mongodb+srv".to_string();
        mongo.url = "cluster0.example.net/?retryWrites=true".to_string();
        mongo.username = Some("app".to_string());
        mongo.password = Some("pw".to_string());
        assert_eq!(
            mongo.connection_uri(),
            "mongodb+srv://app:pw@cluster0.example.net/?retryWrites=true&w=majority"
        );
    }
}
