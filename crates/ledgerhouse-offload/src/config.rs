//! Offload Configuration
//!
//! Controls which object-store driver the engine talks to and how blocks are
//! sized:
//!
//! - **driver**: `S3`, `aws-s3`, or `google-cloud-storage` (case-insensitive)
//! - **bucket**: target bucket/container name
//! - **endpoint**: optional custom S3 endpoint (MinIO/localstack)
//! - **region**: bucket region; S3 requires region or endpoint
//! - **max_block_size**: data block / multipart part size (default: 64MB,
//!   minimum 5MB per the S3 multipart lower bound)
//! - **read_buffer_size**: range-read buffer for the read handle (default: 1MB)
//! - **gcs_service_account_path**: service-account JSON key, read eagerly at
//!   construction (GCS only; S3 credentials come from the environment chain)
//!
//! ## Usage
//!
//! ```ignore
//! use ledgerhouse_offload::OffloadConfig;
//!
//! // Production config (AWS S3)
//! let config = OffloadConfig {
//!     driver: "aws-s3".to_string(),
//!     bucket: "ledger-offload".to_string(),
//!     region: Some("us-east-1".to_string()),
//!     ..Default::default()
//! };
//!
//! // Development config (MinIO)
//! let config = OffloadConfig {
//!     driver: "S3".to_string(),
//!     bucket: "ledger-offload".to_string(),
//!     endpoint: Some("http://localhost:9000".to_string()),
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::block::MIN_BLOCK_SIZE;
use crate::driver::{driver_supported, is_gcs_driver, is_s3_driver};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffloadConfig {
    /// Object-store driver name (case-insensitive)
    pub driver: String,

    /// Bucket/container holding the offloaded objects
    pub bucket: String,

    /// Optional custom endpoint (for MinIO/localstack)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bucket region
    #[serde(default)]
    pub region: Option<String>,

    /// Data block and multipart part size in bytes (default: 64MB, min 5MB)
    #[serde(default = "default_max_block_size")]
    pub max_block_size: u64,

    /// Read handle range-buffer size in bytes (default: 1MB)
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,

    /// Path to the GCS service-account JSON key
    #[serde(default)]
    pub gcs_service_account_path: Option<String>,

    /// Object-store socket timeout in seconds (default: 25)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Per-operation retries internal to the driver (default: 100)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Number of per-ledger execution lanes (default: 8)
    #[serde(default = "default_lanes")]
    pub lanes: usize,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            driver: "S3".to_string(),
            bucket: String::new(),
            endpoint: None,
            region: None,
            max_block_size: default_max_block_size(),
            read_buffer_size: default_read_buffer_size(),
            gcs_service_account_path: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            lanes: default_lanes(),
        }
    }
}

impl OffloadConfig {
    /// Validate the configuration before any store is constructed.
    pub fn validate(&self) -> Result<()> {
        if !driver_supported(&self.driver) {
            return Err(Error::Config(format!(
                "unsupported offload driver: {}",
                self.driver
            )));
        }
        if self.bucket.is_empty() {
            return Err(Error::Config(
                "offload bucket cannot be empty".to_string(),
            ));
        }
        if is_s3_driver(&self.driver) && self.region.is_none() && self.endpoint.is_none() {
            return Err(Error::Config(
                "S3 offload requires either a region or an endpoint".to_string(),
            ));
        }
        if is_gcs_driver(&self.driver) && self.gcs_service_account_path.is_none() {
            return Err(Error::Config(
                "GCS offload requires a service-account key path".to_string(),
            ));
        }
        if self.max_block_size < MIN_BLOCK_SIZE {
            return Err(Error::Config(format!(
                "max_block_size {} is below the {} byte multipart minimum",
                self.max_block_size, MIN_BLOCK_SIZE
            )));
        }
        Ok(())
    }
}

fn default_max_block_size() -> u64 {
    64 * 1024 * 1024 // 64MB
}

fn default_read_buffer_size() -> usize {
    1024 * 1024 // 1MB
}

fn default_request_timeout_secs() -> u64 {
    25
}

fn default_max_retries() -> usize {
    100
}

fn default_lanes() -> usize {
    8
}
