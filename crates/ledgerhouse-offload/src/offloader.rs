//! Object-Tier Offloader
//!
//! `BlobStoreOffloader` is the engine's public surface. It orchestrates:
//!
//! 1. **offload**: multipart upload of the data object (one block per part,
//!    uploaded sequentially), then a single put of the index object. The
//!    index put is the commit point; every failure before it leaves no
//!    visible offload behind.
//! 2. **read_offloaded**: opens an [`OffloadedReadHandle`] over the pair.
//! 3. **delete_offloaded**: removes both objects (missing objects are
//!    benign, so deletes are idempotent).
//!
//! ## Failure Compensation
//!
//! - Failure before the multipart completes: abort the upload (best-effort)
//!   and surface the original error.
//! - Failure during complete: surface the error; no index was written, so no
//!   observer considers the ledger offloaded.
//! - Failure during the index put: delete the data object (best-effort) and
//!   surface the error.
//!
//! Compensation failures are logged and never replace the primary error.
//!
//! ## Object Keys and Versioning
//!
//! Objects are keyed `"{uuid}-ledger-{id}"` and `"{uuid}-ledger-{id}-index"`;
//! the caller-chosen UUID lets historical offloads of one ledger coexist.
//! Both objects carry user metadata naming the format version, software
//! version, and build SHA. Metadata keys are written lowercased because
//! store drivers normalize them to lowercase.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use ledgerhouse_core::LedgerReader;
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, MultipartUpload, ObjectStore, PutMultipartOptions,
    PutOptions, PutPayload,
};
use uuid::Uuid;

use crate::block::DATA_BLOCK_HEADER_SIZE;
use crate::config::OffloadConfig;
use crate::driver::{build_object_store, BucketAdmin};
use crate::error::{Error, Result};
use crate::index::OffloadIndexBuilder;
use crate::read_handle::OffloadedReadHandle;
use crate::scheduler::OrderedExecutor;
use crate::streamer::{calculate_block_size, BlockStreamer};

/// User-metadata key naming the on-object format version
pub const METADATA_FORMAT_VERSION_KEY: &str = "ledger-offload-format-version";

/// User-metadata key naming the software version that wrote the object
pub const METADATA_SOFTWARE_VERSION_KEY: &str = "ledger-offload-software-version";

/// User-metadata key naming the build the object was written by
pub const METADATA_SOFTWARE_GITSHA_KEY: &str = "ledger-offload-software-gitsha";

/// Current on-object format version
pub const CURRENT_FORMAT_VERSION: &str = "1";

fn software_gitsha() -> &'static str {
    option_env!("LEDGERHOUSE_GIT_SHA").unwrap_or("unknown")
}

/// Key of the data object for one offload attempt.
pub fn data_object_key(ledger_id: u64, uid: &Uuid) -> String {
    format!("{uid}-ledger-{ledger_id}")
}

/// Key of the index object for one offload attempt.
pub fn index_object_key(ledger_id: u64, uid: &Uuid) -> String {
    format!("{uid}-ledger-{ledger_id}-index")
}

/// Attributes attached to both offloaded objects: content type, version
/// metadata, and any caller-supplied extras (keys lowercased).
fn object_attributes(extra_metadata: &HashMap<String, String>) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(
        Attribute::ContentType,
        AttributeValue::from("application/octet-stream"),
    );
    attributes.insert(
        Attribute::Metadata(Cow::Borrowed(METADATA_FORMAT_VERSION_KEY)),
        AttributeValue::from(CURRENT_FORMAT_VERSION),
    );
    attributes.insert(
        Attribute::Metadata(Cow::Borrowed(METADATA_SOFTWARE_VERSION_KEY)),
        AttributeValue::from(env!("CARGO_PKG_VERSION")),
    );
    attributes.insert(
        Attribute::Metadata(Cow::Borrowed(METADATA_SOFTWARE_GITSHA_KEY)),
        AttributeValue::from(software_gitsha()),
    );
    for (key, value) in extra_metadata {
        attributes.insert(
            Attribute::Metadata(Cow::Owned(key.to_lowercase())),
            AttributeValue::from(value.clone()),
        );
    }
    attributes
}

/// Gate reads on the format-version user metadata: an absent or different
/// version means the object was written by an incompatible engine.
pub fn check_version(key: &str, attributes: &Attributes) -> Result<()> {
    let found = attributes.get(&Attribute::Metadata(Cow::Borrowed(
        METADATA_FORMAT_VERSION_KEY,
    )));
    match found {
        Some(version) if version.as_ref() == CURRENT_FORMAT_VERSION => Ok(()),
        other => Err(Error::IncompatibleVersion {
            key: key.to_string(),
            found: other.map(|v| v.as_ref().to_string()),
            expected: CURRENT_FORMAT_VERSION,
        }),
    }
}

/// Moves closed ledgers into object storage and back.
pub struct BlobStoreOffloader {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    max_block_size: u64,
    read_buffer_size: usize,
    executor: Arc<OrderedExecutor>,
    bucket_admin: Option<Arc<dyn BucketAdmin>>,
}

impl BlobStoreOffloader {
    /// Build an offloader from configuration: validates it, constructs the
    /// driver's store, and spawns the per-ledger lanes. Must be called
    /// within a tokio runtime.
    pub fn from_config(config: &OffloadConfig) -> Result<Self> {
        config.validate()?;
        let store = build_object_store(config)?;
        tracing::info!(
            driver = %config.driver,
            bucket = %config.bucket,
            endpoint = ?config.endpoint,
            region = ?config.region,
            max_block_size = config.max_block_size,
            "constructed ledger offloader"
        );
        Ok(Self {
            store,
            bucket: config.bucket.clone(),
            max_block_size: config.max_block_size,
            read_buffer_size: config.read_buffer_size,
            executor: Arc::new(OrderedExecutor::new(config.lanes)),
            bucket_admin: None,
        })
    }

    /// Build an offloader over an existing store, mostly for tests.
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        executor: Arc<OrderedExecutor>,
        max_block_size: u64,
        read_buffer_size: usize,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            max_block_size,
            read_buffer_size,
            executor,
            bucket_admin: None,
        }
    }

    /// Install a bucket administrator enabling `create_bucket`/`delete_bucket`.
    pub fn with_bucket_admin(mut self, admin: Arc<dyn BucketAdmin>) -> Self {
        self.bucket_admin = Some(admin);
        self
    }

    /// Create the offload bucket (administrative).
    pub async fn create_bucket(&self) -> Result<bool> {
        match &self.bucket_admin {
            Some(admin) => admin.create_bucket(&self.bucket).await,
            None => Err(Error::Config(
                "no bucket administrator configured; provision the bucket out of band"
                    .to_string(),
            )),
        }
    }

    /// Delete the offload bucket (administrative).
    pub async fn delete_bucket(&self) -> Result<()> {
        match &self.bucket_admin {
            Some(admin) => admin.delete_bucket(&self.bucket).await,
            None => Err(Error::Config(
                "no bucket administrator configured; provision the bucket out of band"
                    .to_string(),
            )),
        }
    }

    /// Offload a closed ledger as `{uid}-ledger-{id}` plus its index object.
    ///
    /// Serialized against every other operation on the same ledger.
    pub async fn offload(
        &self,
        reader: Arc<dyn LedgerReader>,
        uid: Uuid,
        extra_metadata: HashMap<String, String>,
    ) -> Result<()> {
        let store = self.store.clone();
        let bucket = self.bucket.clone();
        let max_block_size = self.max_block_size;
        self.executor
            .submit(reader.id(), async move {
                offload_ledger(store, bucket, max_block_size, reader, uid, extra_metadata).await
            })
            .await?
    }

    /// Open a read handle over a previously offloaded ledger.
    pub async fn read_offloaded(&self, ledger_id: u64, uid: Uuid) -> Result<OffloadedReadHandle> {
        let store = self.store.clone();
        let executor = self.executor.clone();
        let read_buffer_size = self.read_buffer_size;
        let data_key = data_object_key(ledger_id, &uid);
        let index_key = index_object_key(ledger_id, &uid);
        self.executor
            .submit(ledger_id, async move {
                OffloadedReadHandle::open(
                    executor,
                    store,
                    data_key,
                    index_key,
                    ledger_id,
                    read_buffer_size,
                )
                .await
            })
            .await?
    }

    /// Delete both objects of an offloaded ledger. Missing objects are
    /// benign, so repeated deletes succeed.
    pub async fn delete_offloaded(&self, ledger_id: u64, uid: Uuid) -> Result<()> {
        let store = self.store.clone();
        let data_path = Path::from(data_object_key(ledger_id, &uid));
        let index_path = Path::from(index_object_key(ledger_id, &uid));
        self.executor
            .submit(ledger_id, async move {
                delete_ignoring_missing(&store, &data_path).await?;
                delete_ignoring_missing(&store, &index_path).await?;
                tracing::debug!(ledger_id, data_key = %data_path, "deleted offloaded ledger");
                Ok(())
            })
            .await?
    }
}

async fn delete_ignoring_missing(store: &Arc<dyn ObjectStore>, path: &Path) -> Result<()> {
    match store.delete(path).await {
        Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// The offload algorithm proper; runs on the ledger's lane.
async fn offload_ledger(
    store: Arc<dyn ObjectStore>,
    bucket: String,
    max_block_size: u64,
    reader: Arc<dyn LedgerReader>,
    uid: Uuid,
    extra_metadata: HashMap<String, String>,
) -> Result<()> {
    if reader.length() == 0 || !reader.is_closed() || reader.last_add_confirmed() < 0 {
        return Err(Error::InvalidArgument(
            "an empty or open ledger must never be offloaded".to_string(),
        ));
    }

    let ledger_id = reader.id();
    let data_key = data_object_key(ledger_id, &uid);
    let index_key = index_object_key(ledger_id, &uid);
    let data_path = Path::from(data_key.clone());
    let index_path = Path::from(index_key.clone());
    let attributes = object_attributes(&extra_metadata);

    let mut index_builder = OffloadIndexBuilder::new()
        .with_ledger_metadata(reader.metadata().clone())
        .with_data_block_header_size(DATA_BLOCK_HEADER_SIZE as u32);

    let mut upload = store
        .put_multipart_opts(
            &data_path,
            PutMultipartOptions {
                attributes: attributes.clone(),
                ..Default::default()
            },
        )
        .await?;

    let data_object_length = match upload_data_blocks(
        upload.as_mut(),
        reader.as_ref(),
        max_block_size,
        &mut index_builder,
    )
    .await
    {
        Ok(length) => length,
        Err(err) => {
            if let Err(abort_err) = upload.abort().await {
                tracing::error!(
                    bucket = %bucket,
                    key = %data_key,
                    error = %abort_err,
                    "failed to abort multipart upload"
                );
            }
            return Err(err);
        }
    };

    // No compensation on a failed complete: without an index object the
    // offload is invisible, and the store reaps the unfinished upload.
    upload.complete().await?;

    let index = index_builder
        .with_data_object_length(data_object_length)
        .build()?;
    let index_bytes = index.to_bytes()?;

    let put_result = store
        .put_opts(
            &index_path,
            PutPayload::from(index_bytes),
            PutOptions {
                attributes,
                ..Default::default()
            },
        )
        .await;
    if let Err(err) = put_result {
        if let Err(delete_err) = store.delete(&data_path).await {
            tracing::error!(
                bucket = %bucket,
                key = %data_key,
                error = %delete_err,
                "failed to delete data object after index upload failure"
            );
        }
        return Err(err.into());
    }

    tracing::info!(
        ledger_id,
        data_key = %data_key,
        index_key = %index_key,
        parts = index.entries().len(),
        data_object_length,
        "offloaded ledger"
    );
    Ok(())
}

/// Sequential pack-and-upload loop. Returns the data object length counted
/// into the index.
async fn upload_data_blocks(
    upload: &mut dyn MultipartUpload,
    reader: &dyn LedgerReader,
    max_block_size: u64,
    index_builder: &mut OffloadIndexBuilder,
) -> Result<u64> {
    let mut start_entry: i64 = 0;
    let mut part_id: u32 = 1;
    let mut entry_bytes_written: u64 = 0;
    let mut data_object_length: u64 = 0;

    while start_entry <= reader.last_add_confirmed() {
        let block_size =
            calculate_block_size(max_block_size, reader, start_entry, entry_bytes_written);
        let streamer = BlockStreamer::build(reader, start_entry, block_size).await?;
        let end_entry = streamer.end_entry_id();
        let entry_bytes_read = streamer.entry_bytes_read();

        upload
            .put_part(PutPayload::from_iter(streamer.into_chunks()))
            .await?;
        tracing::debug!(
            ledger_id = reader.id(),
            part_id,
            block_size,
            start_entry,
            end_entry,
            "uploaded multipart part"
        );

        index_builder.add_block(start_entry, part_id, block_size);

        if end_entry == -1 {
            // The source stopped producing entries below the LAC.
            break;
        }
        start_entry = end_entry + 1;
        entry_bytes_written += entry_bytes_read;
        part_id += 1;
        data_object_length += block_size;
    }

    Ok(data_object_length)
}
