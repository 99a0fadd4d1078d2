//! Configuration management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::raw_store::StorageBackend;

// ============================================================================
// Remote API Constants
// ============================================================================

/// Default base URL of the remote API.
pub const DEFAULT_TWITTER_API_URL: &str = "https://api.twitter.com";

/// Default HTTP timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default number of posts fetched per run.
pub const DEFAULT_FETCH_COUNT: u32 = 5;

// ============================================================================
// Raw Storage Constants
// ============================================================================

/// Default directory of the local raw store.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default S3 region.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Default S3 bucket.
pub const DEFAULT_S3_BUCKET: &str = "tweetpipe";

// ============================================================================
// Database Constants
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/tweetpipe";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 1;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub twitter: TwitterConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,
    pub timeout_secs: u64,
}

/// Raw store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
    pub s3: S3Config,
}

/// S3 bucket configuration
///
/// Without static keys the AWS default credential chain is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: Option<String>,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    pub path_style: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

impl Config {
    /// Load configuration from `.env`, environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Read the environment without loading `.env` or validating
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match env_opt("TWEETPIPE_STORAGE") {
            Some(value) => value.parse()?,
            None => StorageBackend::default(),
        };

        Ok(Config {
            twitter: TwitterConfig {
                api_url: env_or("TWITTER_API_URL", DEFAULT_TWITTER_API_URL),
                bearer_token: env_opt("TWITTER_BEARER_TOKEN"),
                timeout_secs: env_parse("TWITTER_TIMEOUT", DEFAULT_HTTP_TIMEOUT_SECS),
            },
            storage: StorageConfig {
                backend,
                data_dir: PathBuf::from(env_or("TWEETPIPE_DATA_DIR", DEFAULT_DATA_DIR)),
                s3: S3Config::from_env(),
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: env_parse("DATABASE_MIN_CONNECTIONS", DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: env_parse(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_parse("DATABASE_IDLE_TIMEOUT", DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.twitter.api_url.is_empty() {
            anyhow::bail!("Remote API URL cannot be empty");
        }

        if self.twitter.timeout_secs == 0 {
            anyhow::bail!("HTTP timeout must be greater than 0");
        }

        if self.storage.data_dir.as_os_str().is_empty() {
            anyhow::bail!("Data directory cannot be empty");
        }

        if self.storage.backend == StorageBackend::S3 && self.storage.s3.bucket.is_empty() {
            anyhow::bail!("S3 bucket cannot be empty");
        }

        if self.storage.s3.access_key.is_some() != self.storage.s3.secret_key.is_some() {
            anyhow::bail!("S3 access key and secret key must be set together");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.twitter.bearer_token.is_none() {
            tracing::debug!("No bearer token configured - fetching is unavailable");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            twitter: TwitterConfig {
                api_url: DEFAULT_TWITTER_API_URL.to_string(),
                bearer_token: None,
                timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            },
            storage: StorageConfig {
                backend: StorageBackend::default(),
                data_dir: PathBuf::from(DEFAULT_DATA_DIR),
                s3: S3Config::default(),
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
        }
    }
}

impl S3Config {
    pub fn from_env() -> Self {
        Self {
            endpoint: env_opt("S3_ENDPOINT"),
            region: env_or("S3_REGION", DEFAULT_S3_REGION),
            bucket: env_or("S3_BUCKET", DEFAULT_S3_BUCKET),
            access_key: env_opt("S3_ACCESS_KEY").or_else(|| env_opt("AWS_ACCESS_KEY_ID")),
            secret_key: env_opt("S3_SECRET_KEY").or_else(|| env_opt("AWS_SECRET_ACCESS_KEY")),
            path_style: env_parse("S3_PATH_STYLE", false),
        }
    }

    /// Local MinIO with its default credentials
    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: DEFAULT_S3_REGION.to_string(),
            bucket: bucket.into(),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            path_style: true,
        }
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: DEFAULT_S3_REGION.to_string(),
            bucket: DEFAULT_S3_BUCKET.to_string(),
            access_key: None,
            secret_key: None,
            path_style: false,
        }
    }
}
