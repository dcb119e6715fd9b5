//! Object-Store Driver Selection
//!
//! Maps a driver name from the configuration onto a concrete
//! [`ObjectStore`] implementation. The engine itself only ever sees
//! `Arc<dyn ObjectStore>`; endpoint, addressing-style, and credential quirks
//! stay in here.
//!
//! ## Credentials
//!
//! - **S3**: resolved from the environment/instance chain
//!   ([`AmazonS3Builder::from_env`]). Missing credentials downgrade to
//!   unsigned requests with a warning, since mock S3 backends accept
//!   anonymous access.
//! - **GCS**: a service-account JSON key file, read eagerly at construction
//!   so a bad path fails the broker at startup rather than the first offload.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::{ClientOptions, ObjectStore, RetryConfig};

use crate::config::OffloadConfig;
use crate::error::{Error, Result};

/// Driver names accepted by the engine, matched case-insensitively.
pub const DRIVER_NAMES: [&str; 3] = ["S3", "aws-s3", "google-cloud-storage"];

pub fn driver_supported(driver: &str) -> bool {
    DRIVER_NAMES.iter().any(|d| d.eq_ignore_ascii_case(driver))
}

pub fn is_s3_driver(driver: &str) -> bool {
    driver.eq_ignore_ascii_case(DRIVER_NAMES[0]) || driver.eq_ignore_ascii_case(DRIVER_NAMES[1])
}

pub fn is_gcs_driver(driver: &str) -> bool {
    driver.eq_ignore_ascii_case(DRIVER_NAMES[2])
}

/// Build the object store for a validated configuration.
pub fn build_object_store(config: &OffloadConfig) -> Result<Arc<dyn ObjectStore>> {
    let retry = RetryConfig {
        max_retries: config.max_retries,
        ..Default::default()
    };
    let client_options =
        ClientOptions::new().with_timeout(Duration::from_secs(config.request_timeout_secs));

    if is_s3_driver(&config.driver) {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_retry(retry)
            .with_client_options(client_options);

        // Request signing needs a region even against custom endpoints.
        builder = builder.with_region(config.region.as_deref().unwrap_or("us-east-1"));
        if let Some(endpoint) = &config.endpoint {
            // Custom endpoints (MinIO, localstack) use path-style addressing.
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false);
            if endpoint.starts_with("http://") {
                builder = builder.with_allow_http(true);
            }
        }
        if std::env::var("AWS_ACCESS_KEY_ID").is_err() {
            // Some mock S3 services need no credential.
            tracing::warn!(
                bucket = %config.bucket,
                "no S3 credentials in the environment, sending unsigned requests"
            );
            builder = builder.with_skip_signature(true);
        }

        let store = builder
            .build()
            .map_err(|e| Error::Config(format!("cannot build S3 store: {e}")))?;
        Ok(Arc::new(store))
    } else if is_gcs_driver(&config.driver) {
        let key_path = config.gcs_service_account_path.as_ref().ok_or_else(|| {
            Error::Config("GCS offload requires a service-account key path".to_string())
        })?;
        let key = std::fs::read_to_string(key_path).map_err(|e| {
            Error::Config(format!("cannot read GCS service-account key {key_path}: {e}"))
        })?;
        serde_json::from_str::<serde_json::Value>(&key).map_err(|e| {
            Error::Config(format!("GCS service-account key {key_path} is not JSON: {e}"))
        })?;

        let mut builder = GoogleCloudStorageBuilder::new()
            .with_bucket_name(&config.bucket)
            .with_service_account_key(&key)
            .with_retry(retry)
            .with_client_options(client_options);
        if let Some(url) = &config.endpoint {
            builder = builder.with_url(url.clone());
        }

        let store = builder
            .build()
            .map_err(|e| Error::Config(format!("cannot build GCS store: {e}")))?;
        Ok(Arc::new(store))
    } else {
        Err(Error::Config(format!(
            "unsupported offload driver: {}",
            config.driver
        )))
    }
}

/// Bucket lifecycle operations.
///
/// The `object_store` abstraction deliberately has no container
/// create/delete; deployments provision buckets out of band. Installing an
/// implementation of this trait (tests use a memory-backed one) enables the
/// offloader's administrative `create_bucket`/`delete_bucket` operations.
#[async_trait]
pub trait BucketAdmin: Send + Sync {
    /// Create the bucket; returns false when it already existed.
    async fn create_bucket(&self, bucket: &str) -> Result<bool>;

    /// Delete the bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}
