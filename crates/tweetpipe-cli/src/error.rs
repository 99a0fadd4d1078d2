//! Error types for the TweetPipe CLI
//!
//! Messages are user-facing and say what to check next.

use thiserror::Error;
use tweetpipe_core::extract::ExtractError;
use tweetpipe_core::load::StoreError;
use tweetpipe_core::raw_store::RawStoreError;
use tweetpipe_core::ConfigurationError;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Command line is incomplete
    #[error("Invalid usage: {0}. Run 'tweetpipe --help' for the available options.")]
    Usage(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or .env file.")]
    Config(String),

    /// Remote API failed
    #[error("Remote API error: {0}. Check TWITTER_API_URL and TWITTER_BEARER_TOKEN.")]
    Extract(#[from] ExtractError),

    /// Raw store failed
    #[error("Raw storage error: {0}. Check TWEETPIPE_DATA_DIR or the S3_* settings.")]
    RawStore(#[from] RawStoreError),

    /// Entity store failed
    #[error("Database error: {0}. Check DATABASE_URL and that PostgreSQL is running, or use --dry-run.")]
    Database(#[from] StoreError),

    /// Parsers or entity schemas are misdeclared
    #[error("Invalid entity configuration: {0}")]
    Entities(#[from] ConfigurationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
