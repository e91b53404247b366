//! Amazon S3 gateway built on `aws-sdk-s3`.

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use super::ObjectStore;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::types::{ImageBytes, ImageKey};

/// Content type of every object the pipeline writes.
const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// S3 (or S3-compatible) gateway reading from one bucket and writing to another.
///
/// The SDK client is internally reference-counted and safe to share between
/// workers without extra locking.
pub struct S3Store {
    client: Client,
    source_bucket: String,
    destination_bucket: String,
}

impl S3Store {
    /// Build a client from the default AWS provider chain plus any overrides
    /// in `config` (region, custom endpoint, path-style addressing).
    pub async fn connect(config: &StoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint_url {
            tracing::debug!("Using custom S3 endpoint {endpoint}");
            builder = builder.endpoint_url(endpoint);
        }

        Self::from_client(Client::from_conf(builder.build()), config)
    }

    /// Wrap an already-configured client.
    pub fn from_client(client: Client, config: &StoreConfig) -> Self {
        Self {
            client,
            source_bucket: config.source_bucket.clone(),
            destination_bucket: config.destination_bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        "s3"
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ImageKey>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.source_bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        let mut page_count = 0usize;
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| classify(&e, prefix))?;
            page_count += 1;

            for object in page.contents() {
                // Zero-size entries are folder placeholders, not images.
                if object.size().unwrap_or(0) <= 0 {
                    continue;
                }
                if let Some(key) = object.key() {
                    keys.push(ImageKey::from(key));
                }
            }
        }

        tracing::debug!(
            "Listed {} objects under s3://{}/{} in {} page(s)",
            keys.len(),
            self.source_bucket,
            prefix,
            page_count
        );
        Ok(keys)
    }

    async fn read(&self, key: &ImageKey) -> StoreResult<ImageBytes> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.source_bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|e| classify(&e, key.as_str()))?;

        let body = resp.body.collect().await.map_err(|e| StoreError::Transfer {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(body.into_bytes())
    }

    async fn write(&self, key: &ImageKey, bytes: ImageBytes) -> StoreResult<()> {
        self.client
            .put_object()
            .bucket(&self.destination_bucket)
            .key(key.as_str())
            .content_type(OUTPUT_CONTENT_TYPE)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| classify(&e, key.as_str()))?;
        Ok(())
    }
}

/// Map an SDK failure onto the store taxonomy.
fn classify<E>(err: &SdkError<E, HttpResponse>, key: &str) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let detail = DisplayErrorContext(err).to_string();
    match err {
        SdkError::ServiceError(service) => from_status(
            service.raw().status().as_u16(),
            service.err().code(),
            key,
            detail,
        ),
        SdkError::ResponseError(_) => StoreError::Transfer {
            key: key.to_string(),
            message: detail,
        },
        // Dispatch failures, timeouts and request construction problems.
        _ => StoreError::Unavailable(detail),
    }
}

fn from_status(status: u16, code: Option<&str>, key: &str, detail: String) -> StoreError {
    match (status, code) {
        (_, Some("QuotaExceeded" | "ServiceQuotaExceeded")) | (507, _) => {
            StoreError::QuotaExceeded {
                key: key.to_string(),
                message: detail,
            }
        }
        (404, _) | (_, Some("NoSuchKey" | "NoSuchBucket")) => StoreError::NotFound(key.to_string()),
        (401 | 403, _) | (_, Some("AccessDenied" | "InvalidAccessKeyId" | "ExpiredToken")) => {
            StoreError::Auth(detail)
        }
        _ => StoreError::Unavailable(detail),
    }
}
