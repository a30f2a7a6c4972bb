use config::{Config as ConfigLoader, ConfigError, Environment, File};
use parley_types::PaginationPolicy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
    pub mongodb: MongoDbConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    pub pagination: PaginationPolicy,
    pub sequence: SequenceConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    pub mongodb_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    #[default]
    Elasticsearch,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MongoDbConfig {
    pub database: String,
    pub pool_size: u32,
    pub timeout_ms: u64,
}

impl Default for MongoDbConfig {
    fn default() -> Self {
        Self {
            database: "parley".to_string(),
            pool_size: 10,
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: StoreBackend,
    /// Collection holding cache entries when backed by MongoDB
    pub collection: String,
    pub ttl_secs: u64,
    pub timeout_ms: u64,
    pub fail_open: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Mongodb,
            collection: "cache_entries".to_string(),
            ttl_secs: parley_cache::APPLICATION_TTL.as_secs(),
            timeout_ms: 250,
            fail_open: true,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub backend: SearchBackend,
    pub url: String,
    pub index: String,
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: SearchBackend::Elasticsearch,
            url: "http://elasticsearch:9200".to_string(),
            index: "messages".to_string(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Attempts per chat/message creation before a conflict is reported
    pub max_attempts: u32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            max_attempts: parley_persist::sequence::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables prefixed with `PARLEY_`, sections split by
    ///    `__` (e.g. `PARLEY_SERVER__PORT=8080`, `PARLEY_CACHE__FAIL_OPEN=false`)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // 3. Environment variables override everything
            .add_source(
                Environment::with_prefix("PARLEY")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.origins")
                    .try_parsing(true),
            );

        let config = builder.build()?;

        let mut cfg: Config = config.try_deserialize()?;

        // Secrets and well-known service URLs from ENV (not in TOML)
        if let Ok(url) = std::env::var("ELASTICSEARCH_URL") {
            cfg.search.url = url;
        }
        if let Ok(uri) = std::env::var("MONGODB_URI") {
            cfg.mongodb_uri = uri;
        }
        if cfg.needs_mongodb() && cfg.mongodb_uri.is_empty() {
            return Err(ConfigError::Message(
                "MONGODB_URI environment variable is required".to_string(),
            ));
        }

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Every backend in memory; nothing external is needed
    pub fn in_memory() -> Self {
        let mut cfg = Self::default();
        cfg.storage.backend = StoreBackend::Memory;
        cfg.cache.backend = StoreBackend::Memory;
        cfg.search.backend = SearchBackend::Memory;
        cfg
    }

    pub fn needs_mongodb(&self) -> bool {
        self.storage.backend == StoreBackend::Mongodb || self.cache.backend == StoreBackend::Mongodb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 3000
            request_timeout_secs = 10

            [cors]
            enabled = true
            origins = ["http://localhost:3000"]

            [storage]
            backend = "memory"

            [mongodb]
            database = "test"
            pool_size = 5
            timeout_ms = 3000

            [cache]
            backend = "mongodb"
            ttl_secs = 60
            fail_open = false

            [search]
            backend = "elasticsearch"
            url = "http://localhost:9200"

            [pagination]
            max_per_page = 50

            [sequence]
            max_attempts = 3

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.mongodb.database, "test");
        assert_eq!(config.storage.backend, StoreBackend::Memory);
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert!(!config.cache.fail_open);
        assert_eq!(config.cache.timeout_ms, 250);
        assert_eq!(config.pagination.max_per_page, 50);
        assert_eq!(config.pagination.default_per_page, 20);
        assert_eq!(config.sequence.max_attempts, 3);
        assert!(config.needs_mongodb());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.ttl_secs, 1800);
        assert!(config.cache.fail_open);
        assert_eq!(config.pagination.max_per_page, 100);
        assert_eq!(config.search.index, "messages");
        assert_eq!(config.sequence.max_attempts, 5);
    }

    #[test]
    fn test_shipped_defaults_parse() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = Config::from_file(path).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.search.backend, SearchBackend::Elasticsearch);
        assert_eq!(config.cors.origins, vec!["http://localhost:3000".to_string()]);
    }

    #[test]
    fn test_in_memory_needs_nothing_external() {
        assert!(!Config::in_memory().needs_mongodb());
    }
}
