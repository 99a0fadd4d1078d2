//! Fetching user timelines from the remote API

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::TwitterConfig;
use crate::document::{FetchMetadata, RawDocument};
use crate::raw_store::document_key;

const USER_TIMELINE_PATH: &str = "/1.1/statuses/user_timeline.json";

/// Remote API failures
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No bearer token configured (set TWITTER_BEARER_TOKEN)")]
    MissingCredentials,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response payload: {0}")]
    UnexpectedPayload(String),
}

/// A fetched batch and the key it is stored under
#[derive(Debug, Clone)]
pub struct Extraction {
    pub key: String,
    pub document: RawDocument,
    pub fetched_at: DateTime<Utc>,
}

/// Bearer-token client for the timeline endpoint
#[derive(Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl TwitterClient {
    pub fn new(config: &TwitterConfig) -> Result<Self, ExtractError> {
        let bearer_token = config
            .bearer_token
            .clone()
            .ok_or(ExtractError::MissingCredentials)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("tweetpipe/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            bearer_token,
        })
    }

    /// Latest `count` posts of `handle`, newest first
    #[instrument(skip(self))]
    pub async fn user_timeline(&self, handle: &str, count: u32) -> Result<Vec<Value>, ExtractError> {
        let url = format!("{}{}", self.base_url, USER_TIMELINE_PATH);
        let count = count.to_string();
        debug!(%url, "Requesting timeline");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("screen_name", handle),
                ("count", count.as_str()),
                ("tweet_mode", "extended"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api {
                status: status.as_u16(),
                body,
            });
        }

        match response.json::<Value>().await? {
            Value::Array(items) => Ok(items),
            other => Err(ExtractError::UnexpectedPayload(format!(
                "expected a list of posts, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Fetches a batch and wraps it with fetch metadata
    pub async fn fetch(&self, handle: &str, count: u32) -> Result<Extraction, ExtractError> {
        let items = self.user_timeline(handle, count).await?;
        let fetched_at = Utc::now();

        info!(handle, requested = count, received = items.len(), "Fetched timeline");

        let metadata = FetchMetadata::new(handle, count, &fetched_at);
        Ok(Extraction {
            key: document_key(handle, &fetched_at),
            document: RawDocument::new(items, &metadata),
            fetched_at,
        })
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
