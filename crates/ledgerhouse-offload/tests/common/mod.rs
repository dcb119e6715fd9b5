//! Shared fixtures for the offload integration tests: an in-memory ledger
//! source, a failure-injecting object store wrapper, and a memory-backed
//! bucket administrator.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use ledgerhouse_core::{LedgerEntry, LedgerMetadata, LedgerReader};
use ledgerhouse_offload::driver::BucketAdmin;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore,
    PutMultipartOptions, PutOptions, PutPayload, PutResult, UploadPart,
};

/// Ledger fixture over a vector of payloads. Entry IDs start at 0.
pub struct MemoryLedger {
    id: u64,
    payloads: Vec<Bytes>,
    metadata: LedgerMetadata,
}

impl MemoryLedger {
    pub fn closed(id: u64, payloads: Vec<Bytes>) -> Self {
        Self::build(id, payloads, true)
    }

    pub fn open(id: u64, payloads: Vec<Bytes>) -> Self {
        Self::build(id, payloads, false)
    }

    pub fn empty(id: u64) -> Self {
        Self::build(id, Vec::new(), true)
    }

    fn build(id: u64, payloads: Vec<Bytes>, closed: bool) -> Self {
        let length: u64 = payloads.iter().map(|p| p.len() as u64).sum();
        let mut properties = BTreeMap::new();
        properties.insert("managed-ledger".to_string(), format!("orders/{id}"));
        Self {
            id,
            metadata: LedgerMetadata {
                ensemble_size: 3,
                write_quorum: 2,
                ack_quorum: 2,
                creation_time_ms: 1_700_000_000_000,
                last_entry_id: payloads.len() as i64 - 1,
                length,
                closed,
                properties,
            },
            payloads,
        }
    }
}

#[async_trait]
impl LedgerReader for MemoryLedger {
    fn id(&self) -> u64 {
        self.id
    }
    fn length(&self) -> u64 {
        self.metadata.length
    }
    fn is_closed(&self) -> bool {
        self.metadata.closed
    }
    fn last_add_confirmed(&self) -> i64 {
        self.metadata.last_entry_id
    }
    fn metadata(&self) -> &LedgerMetadata {
        &self.metadata
    }
    async fn read_entry(&self, entry_id: i64) -> ledgerhouse_core::Result<Option<LedgerEntry>> {
        if entry_id < 0 {
            return Ok(None);
        }
        Ok(self
            .payloads
            .get(entry_id as usize)
            .map(|p| LedgerEntry::new(self.id, entry_id, p.clone())))
    }
}

/// Object store wrapper injecting failures at chosen points.
#[derive(Debug)]
pub struct FlakyStore<O: ObjectStore> {
    inner: O,
    /// 1-based multipart part number whose upload fails
    fail_put_part: Option<usize>,
    /// Fail plain puts whose key ends with this suffix
    fail_put_suffix: Option<String>,
    /// Set once any multipart upload is aborted
    pub aborted: Arc<AtomicBool>,
}

impl<O: ObjectStore> FlakyStore<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            fail_put_part: None,
            fail_put_suffix: None,
            aborted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_put_part(mut self, part: usize) -> Self {
        self.fail_put_part = Some(part);
        self
    }

    pub fn fail_put_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.fail_put_suffix = Some(suffix.into());
        self
    }
}

impl<O: ObjectStore> Display for FlakyStore<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FlakyStore wrapping: {}", self.inner)
    }
}

fn injected_error() -> object_store::Error {
    object_store::Error::Generic {
        store: "flaky",
        source: "injected failure".into(),
    }
}

#[derive(Debug)]
struct FlakyUpload {
    inner: Box<dyn MultipartUpload>,
    fail_at: Option<usize>,
    next_part: usize,
    aborted: Arc<AtomicBool>,
}

#[async_trait]
impl MultipartUpload for FlakyUpload {
    fn put_part(&mut self, data: PutPayload) -> UploadPart {
        let part = self.next_part;
        self.next_part += 1;
        if Some(part) == self.fail_at {
            return Box::pin(async { Err(injected_error()) });
        }
        self.inner.put_part(data)
    }

    async fn complete(&mut self) -> object_store::Result<PutResult> {
        self.inner.complete().await
    }

    async fn abort(&mut self) -> object_store::Result<()> {
        self.aborted.store(true, Ordering::SeqCst);
        self.inner.abort().await
    }
}

#[async_trait]
impl<O: ObjectStore> ObjectStore for FlakyStore<O> {
    async fn put_opts(
        &self,
        location: &object_store::path::Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        if let Some(suffix) = &self.fail_put_suffix {
            if location.as_ref().ends_with(suffix.as_str()) {
                return Err(injected_error());
            }
        }
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &object_store::path::Path,
        opts: PutMultipartOptions,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        let inner = self.inner.put_multipart_opts(location, opts).await?;
        Ok(Box::new(FlakyUpload {
            inner,
            fail_at: self.fail_put_part,
            next_part: 1,
            aborted: self.aborted.clone(),
        }))
    }

    async fn get_opts(
        &self,
        location: &object_store::path::Path,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &object_store::path::Path) -> object_store::Result<()> {
        self.inner.delete(location).await
    }

    fn list(
        &self,
        prefix: Option<&object_store::path::Path>,
    ) -> BoxStream<'static, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(
        &self,
        prefix: Option<&object_store::path::Path>,
    ) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(
        &self,
        from: &object_store::path::Path,
        to: &object_store::path::Path,
    ) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(
        &self,
        from: &object_store::path::Path,
        to: &object_store::path::Path,
    ) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}

/// Memory-backed bucket lifecycle for the administrative operations.
#[derive(Debug, Default)]
pub struct MemoryBucketAdmin {
    buckets: Mutex<HashSet<String>>,
}

impl MemoryBucketAdmin {
    pub fn exists(&self, bucket: &str) -> bool {
        self.buckets.lock().unwrap().contains(bucket)
    }
}

#[async_trait]
impl BucketAdmin for MemoryBucketAdmin {
    async fn create_bucket(&self, bucket: &str) -> ledgerhouse_offload::Result<bool> {
        Ok(self.buckets.lock().unwrap().insert(bucket.to_string()))
    }

    async fn delete_bucket(&self, bucket: &str) -> ledgerhouse_offload::Result<()> {
        self.buckets.lock().unwrap().remove(bucket);
        Ok(())
    }
}
