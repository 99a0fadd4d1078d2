//! Raw store on S3 or an S3-compatible service (MinIO)

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use tracing::{debug, info, instrument};

use super::{validate_key, Listing, RawStore, RawStoreError};
use crate::config::S3Config;
use crate::document::RawDocument;

#[derive(Clone)]
pub struct S3RawStore {
    client: Client,
    bucket: String,
}

impl S3RawStore {
    /// Builds the client; static keys win over the default credential chain
    pub async fn new(config: S3Config) -> Result<Self, RawStoreError> {
        debug!(
            endpoint = ?config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            path_style = config.path_style,
            "Initializing S3 raw store"
        );

        let mut builder = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = Credentials::new(access_key, secret_key, None, None, "tweetpipe-raw-store");
                aws_sdk_s3::Config::builder()
                    .behavior_version_latest()
                    .credentials_provider(credentials)
                    .region(Region::new(config.region.clone()))
            }
            _ => {
                let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        builder = builder.force_path_style(config.path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());
        info!(bucket = %config.bucket, "S3 raw store initialized");

        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl RawStore for S3RawStore {
    fn name(&self) -> &str {
        "s3"
    }

    #[instrument(skip(self, document))]
    async fn write(&self, key: &str, document: &RawDocument) -> Result<(), RawStoreError> {
        validate_key(key)?;
        let data = serde_json::to_vec(document)?;
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| RawStoreError::S3(DisplayErrorContext(&e).to_string()))?;

        info!(key, size, "Uploaded to s3://{}/{}", self.bucket, key);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn read(&self, key: &str) -> Result<RawDocument, RawStoreError> {
        validate_key(key)?;

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service = e.into_service_error();
                if service.is_no_such_key() {
                    RawStoreError::NotFound(key.to_string())
                } else {
                    RawStoreError::S3(DisplayErrorContext(&service).to_string())
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| RawStoreError::S3(e.to_string()))?
            .into_bytes();

        debug!(key, size = data.len(), "Downloaded from s3://{}/{}", self.bucket, key);
        Ok(serde_json::from_slice(&data)?)
    }

    #[instrument(skip(self))]
    async fn list(&self, prefix: Option<&str>) -> Result<Listing, RawStoreError> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_prefix(prefix.map(str::to_string))
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| RawStoreError::S3(DisplayErrorContext(&e).to_string()))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );
        }

        let listing = Listing::new(prefix, keys);
        debug!(prefix = %listing.prefix, count = listing.count, "Listed s3://{}", self.bucket);
        Ok(listing)
    }
}
