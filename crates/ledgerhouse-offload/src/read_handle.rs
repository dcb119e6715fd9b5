//! Backed Read Handle
//!
//! Random-access reader over an offloaded ledger's two objects. Opening the
//! handle fetches and version-checks the index object once; after that the
//! handle touches only the data object, through a bounded range buffer.
//!
//! ## Read Flow
//!
//! ```text
//! read(first, last)
//!     ↓
//! Index lookup → which block holds `first`?
//!     ↓
//! Scan frames from the block start, skipping earlier entries
//!     ↓
//! Frame header in buffer? ──no──► ranged GET of read_buffer_size bytes
//!     ↓ yes                        (version-checked, buffer reset)
//! Validate entry ID, slice payload out of the buffer
//!     ↓
//! Next entry starts a new block? → jump past the padding via the index
//! ```
//!
//! One `read_buffer_size` ranged GET typically serves many consecutive
//! entries; a payload longer than the buffer extends the range read to
//! cover it.
//!
//! ## Failure Semantics
//!
//! Transport errors surface as-is and are not retried here (the caller layer
//! retries whole reads). A version mismatch or index parse failure is fatal
//! for the handle; an entry-ID mismatch fails the read with `CorruptEntry`
//! but leaves the handle usable.

use std::sync::Arc;

use bytes::{Buf, Bytes};
use ledgerhouse_core::LedgerEntry;
use object_store::path::Path;
use object_store::{GetOptions, ObjectStore};
use tokio::sync::Mutex;

use crate::block::ENTRY_HEADER_SIZE;
use crate::error::{Error, Result};
use crate::index::OffloadIndex;
use crate::offloader::check_version;
use crate::scheduler::OrderedExecutor;

/// Window of the data object held in memory.
#[derive(Default)]
struct RangeBuffer {
    /// Absolute offset of `data[0]` within the data object
    offset: u64,
    data: Bytes,
}

/// Read handle over one offloaded ledger.
pub struct OffloadedReadHandle {
    ledger_id: u64,
    data_key: String,
    data_path: Path,
    store: Arc<dyn ObjectStore>,
    index: Arc<OffloadIndex>,
    read_buffer_size: usize,
    executor: Arc<OrderedExecutor>,
    buffer: Arc<Mutex<RangeBuffer>>,
}

impl OffloadedReadHandle {
    /// Fetch and parse the index object, gating on its format-version
    /// metadata, and return a handle ready to serve entry reads.
    pub async fn open(
        executor: Arc<OrderedExecutor>,
        store: Arc<dyn ObjectStore>,
        data_key: String,
        index_key: String,
        ledger_id: u64,
        read_buffer_size: usize,
    ) -> Result<Self> {
        let index_path = Path::from(index_key.clone());
        let result = store.get_opts(&index_path, GetOptions::default()).await?;
        let attributes = result.attributes.clone();
        check_version(&index_key, &attributes)?;

        let bytes = result.bytes().await?;
        let index = OffloadIndex::from_bytes(&bytes)?;
        tracing::debug!(
            ledger_id,
            index_key = %index_key,
            blocks = index.entries().len(),
            data_object_length = index.data_object_length(),
            "opened offloaded ledger"
        );

        Ok(Self {
            ledger_id,
            data_path: Path::from(data_key.clone()),
            data_key,
            store,
            index: Arc::new(index),
            read_buffer_size,
            executor,
            buffer: Arc::new(Mutex::new(RangeBuffer::default())),
        })
    }

    pub fn ledger_id(&self) -> u64 {
        self.ledger_id
    }

    /// Total payload bytes in the ledger
    pub fn length(&self) -> u64 {
        self.index.ledger_metadata().length
    }

    /// Largest entry ID the ledger holds
    pub fn last_add_confirmed(&self) -> i64 {
        self.index.ledger_metadata().last_entry_id
    }

    /// The metadata blob carried through the offload
    pub fn ledger_metadata(&self) -> &ledgerhouse_core::LedgerMetadata {
        self.index.ledger_metadata()
    }

    /// Read entries `first_entry_id..=last_entry_id`, in order.
    ///
    /// Runs on the ledger's lane, serialized against other operations on the
    /// same ledger.
    pub async fn read(&self, first_entry_id: i64, last_entry_id: i64) -> Result<Vec<LedgerEntry>> {
        if first_entry_id > last_entry_id {
            return Err(Error::InvalidArgument(format!(
                "invalid entry range [{first_entry_id}, {last_entry_id}]"
            )));
        }

        let store = self.store.clone();
        let data_path = self.data_path.clone();
        let data_key = self.data_key.clone();
        let index = self.index.clone();
        let buffer = self.buffer.clone();
        let read_buffer_size = self.read_buffer_size;
        let ledger_id = self.ledger_id;
        self.executor
            .submit(self.ledger_id, async move {
                let mut buffer = buffer.lock().await;
                read_entry_range(
                    &store,
                    &data_path,
                    &data_key,
                    &index,
                    read_buffer_size,
                    &mut buffer,
                    ledger_id,
                    first_entry_id,
                    last_entry_id,
                )
                .await
            })
            .await?
    }

    /// Discard the range buffer. The handle can be dropped afterwards; reads
    /// issued later simply refill the buffer.
    pub async fn close(&self) {
        let mut buffer = self.buffer.lock().await;
        buffer.data = Bytes::new();
        buffer.offset = 0;
    }
}

#[allow(clippy::too_many_arguments)]
async fn read_entry_range(
    store: &Arc<dyn ObjectStore>,
    data_path: &Path,
    data_key: &str,
    index: &OffloadIndex,
    read_buffer_size: usize,
    buffer: &mut RangeBuffer,
    ledger_id: u64,
    first_entry_id: i64,
    last_entry_id: i64,
) -> Result<Vec<LedgerEntry>> {
    let header_size = index.data_block_header_size() as u64;
    let mut entries = Vec::with_capacity((last_entry_id - first_entry_id + 1) as usize);
    let mut next = first_entry_id;

    'seek: while next <= last_entry_id {
        // Position the cursor at the first frame of the block holding `next`.
        let location = *index.lookup(next)?;
        let mut cursor = location.offset + header_size;
        let mut expected_id = location.first_entry_id;

        loop {
            let mut frame = ensure_buffered(
                store,
                data_path,
                data_key,
                index,
                read_buffer_size,
                buffer,
                cursor,
                ENTRY_HEADER_SIZE as u64,
            )
            .await?;
            let length = frame.get_u32() as u64;
            let entry_id = frame.get_i64();

            if entry_id != expected_id {
                return Err(Error::CorruptEntry(format!(
                    "expected entry {expected_id} at offset {cursor} of {data_key}, found {entry_id}"
                )));
            }

            if entry_id >= next {
                let payload = ensure_buffered(
                    store,
                    data_path,
                    data_key,
                    index,
                    read_buffer_size,
                    buffer,
                    cursor + ENTRY_HEADER_SIZE as u64,
                    length,
                )
                .await?;
                entries.push(LedgerEntry::new(ledger_id, entry_id, payload));
                next = entry_id + 1;
                if next > last_entry_id {
                    break 'seek;
                }
            }

            cursor += ENTRY_HEADER_SIZE as u64 + length;
            expected_id += 1;

            // A new block begins with `expected_id`: skip this block's
            // padding by re-seeking through the index.
            if index.lookup(expected_id)?.first_entry_id == expected_id {
                continue 'seek;
            }
        }
    }

    Ok(entries)
}

/// Return `len` bytes at absolute `offset`, refilling the range buffer with
/// a single version-checked ranged GET when the span is not already held.
#[allow(clippy::too_many_arguments)]
async fn ensure_buffered(
    store: &Arc<dyn ObjectStore>,
    data_path: &Path,
    data_key: &str,
    index: &OffloadIndex,
    read_buffer_size: usize,
    buffer: &mut RangeBuffer,
    offset: u64,
    len: u64,
) -> Result<Bytes> {
    let end = offset + len;
    if end > index.data_object_length() {
        return Err(Error::CorruptEntry(format!(
            "read of {len} bytes at offset {offset} overruns the {} byte data object {data_key}",
            index.data_object_length()
        )));
    }

    let held = !buffer.data.is_empty()
        && offset >= buffer.offset
        && end <= buffer.offset + buffer.data.len() as u64;
    if !held {
        let fetch_end = offset
            .saturating_add((read_buffer_size as u64).max(len))
            .min(index.data_object_length());
        let options = GetOptions {
            range: Some((offset..fetch_end).into()),
            ..Default::default()
        };
        let result = store.get_opts(data_path, options).await?;
        let attributes = result.attributes.clone();
        check_version(data_key, &attributes)?;

        buffer.data = result.bytes().await?;
        buffer.offset = offset;
        tracing::trace!(
            data_key,
            offset,
            buffered = buffer.data.len(),
            "refilled read buffer"
        );

        if (buffer.data.len() as u64) < len {
            return Err(Error::CorruptEntry(format!(
                "short range read at offset {offset} of {data_key}: got {} bytes, need {len}",
                buffer.data.len()
            )));
        }
    }

    let start = (offset - buffer.offset) as usize;
    Ok(buffer.data.slice(start..start + len as usize))
}
