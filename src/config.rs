//! Service configuration
//!
//! Everything comes from the environment (optionally seeded from a .env
//! file by `main`). Every knob has a default that works against a local
//! MinIO + SQLite + OpenAI-compatible endpoint, so `from_env` only fails
//! on malformed values, never on missing ones — except the agent API key,
//! which has no sensible default.

use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub broker: BrokerConfig,
    pub agent: AgentConfig,
    pub parser: ParserConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Topic ingestion events are published to.
    pub resume_topic: String,
    /// Partition count for the in-process broker. Events are keyed by
    /// file key, so all events for one document share a partition.
    pub partitions: usize,
    /// Capacity of the bounded publish queue between the registration
    /// path and the publish worker.
    pub publish_queue_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Hard wall-clock bound for handling one ingestion event.
    pub deadline: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://vitae.db".to_string(),
            },
            storage: StorageConfig {
                endpoint: "http://localhost:9000".to_string(),
                region: "us-east-1".to_string(),
                bucket: "resumes".to_string(),
                access_key: "minioadmin".to_string(),
                secret_key: "minioadmin".to_string(),
            },
            broker: BrokerConfig {
                resume_topic: "resume.parse".to_string(),
                partitions: 16,
                publish_queue_capacity: 256,
            },
            agent: AgentConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: String::new(),
                model: "gpt-4o-mini".to_string(),
            },
            parser: ParserConfig {
                deadline: Duration::from_secs(120),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Self {
            server: ServerConfig {
                host: var_or("SERVER_HOST", defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            database: DatabaseConfig {
                url: var_or("DATABASE_URL", defaults.database.url),
            },
            storage: StorageConfig {
                endpoint: var_or("S3_ENDPOINT", defaults.storage.endpoint),
                region: var_or("S3_REGION", defaults.storage.region),
                bucket: var_or("S3_BUCKET", defaults.storage.bucket),
                access_key: var_or("S3_ACCESS_KEY", defaults.storage.access_key),
                secret_key: var_or("S3_SECRET_KEY", defaults.storage.secret_key),
            },
            broker: BrokerConfig {
                resume_topic: var_or("RESUME_TOPIC", defaults.broker.resume_topic),
                partitions: parse_var("BROKER_PARTITIONS", defaults.broker.partitions)?,
                publish_queue_capacity: parse_var(
                    "PUBLISH_QUEUE_CAPACITY",
                    defaults.broker.publish_queue_capacity,
                )?,
            },
            agent: AgentConfig {
                base_url: var_or("MODEL_BASE_URL", defaults.agent.base_url),
                api_key: var_or("MODEL_API_KEY", defaults.agent.api_key),
                model: var_or("MODEL_NAME", defaults.agent.model),
            },
            parser: ParserConfig {
                deadline: Duration::from_secs(parse_var(
                    "PARSE_DEADLINE_SECS",
                    defaults.parser.deadline.as_secs(),
                )?),
            },
        })
    }
}

fn var_or(name: &str, default: String) -> String {
    env::var(name).unwrap_or(default)
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        Err(_) => Ok(default),
    }
}
