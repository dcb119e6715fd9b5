//! Offload Index Block
//!
//! The index object is the commit point of an offload: a ledger counts as
//! offloaded if and only if its index object exists. It carries the ledger
//! metadata blob and a sorted table mapping the first entry ID of every data
//! block to `(part_id, offset)` within the data object.
//!
//! ## Invariants
//!
//! - Index entries are strictly increasing in first entry ID, part ID, and
//!   offset
//! - Part IDs start at 1
//! - Offsets are multiples of the configured maximum block size (only the
//!   final block is trimmed)
//!
//! The builder accumulates offsets from the block sizes handed to
//! [`add_block`](OffloadIndexBuilder::add_block), so the upload loop never
//! tracks offsets itself.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use ledgerhouse_core::LedgerMetadata;

use crate::error::{Error, Result};

/// Magic bytes opening the index object: "LDGO"
pub const INDEX_MAGIC: u32 = 0x4C44_474F;

/// Version number for the index format
pub const INDEX_FORMAT_VERSION: u16 = 1;

/// Fixed index header size: magic (4) + version (2) + entry count (4)
/// + data header size (4) + data object length (8) + metadata length (4)
const INDEX_HEADER_SIZE: usize = 26;

/// Serialized size of one index entry
const INDEX_ENTRY_SIZE: usize = 20;

/// Location of one data block within the data object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// ID of the first entry stored in the block
    pub first_entry_id: i64,

    /// Multipart part the block was uploaded as (starting at 1)
    pub part_id: u32,

    /// Byte offset of the block within the data object
    pub offset: u64,
}

/// Parsed (or freshly built) offload index.
#[derive(Debug, Clone)]
pub struct OffloadIndex {
    ledger_metadata: LedgerMetadata,
    data_block_header_size: u32,
    data_object_length: u64,
    entries: Vec<IndexEntry>,
}

impl OffloadIndex {
    /// The ledger metadata blob carried alongside the index table
    pub fn ledger_metadata(&self) -> &LedgerMetadata {
        &self.ledger_metadata
    }

    /// Size of the header at the start of every data block
    pub fn data_block_header_size(&self) -> u32 {
        self.data_block_header_size
    }

    /// Total byte length of the data object
    pub fn data_object_length(&self) -> u64 {
        self.data_object_length
    }

    /// The block table, sorted by first entry ID
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Locate the block containing `entry_id`: the entry with the greatest
    /// first entry ID at or below it.
    pub fn lookup(&self, entry_id: i64) -> Result<&IndexEntry> {
        let last = self.ledger_metadata.last_entry_id;
        let first = self.entries.first().map(|e| e.first_entry_id).unwrap_or(0);
        if entry_id < first || entry_id > last || self.entries.is_empty() {
            return Err(Error::EntryOutOfRange {
                entry_id,
                first,
                last,
            });
        }

        let pos = self
            .entries
            .partition_point(|e| e.first_entry_id <= entry_id);
        Ok(&self.entries[pos - 1])
    }

    /// Serialize into the on-object form.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let metadata = self.ledger_metadata.to_bytes()?;
        let mut buf = BytesMut::with_capacity(
            INDEX_HEADER_SIZE + metadata.len() + self.entries.len() * INDEX_ENTRY_SIZE,
        );

        buf.put_u32(INDEX_MAGIC);
        buf.put_u16(INDEX_FORMAT_VERSION);
        buf.put_u32(self.entries.len() as u32);
        buf.put_u32(self.data_block_header_size);
        buf.put_u64(self.data_object_length);
        buf.put_u32(metadata.len() as u32);
        buf.put_slice(&metadata);

        for entry in &self.entries {
            buf.put_i64(entry.first_entry_id);
            buf.put_u32(entry.part_id);
            buf.put_u64(entry.offset);
        }

        Ok(buf.freeze())
    }

    /// Exact serialized length, for content-length headers.
    pub fn serialized_size(&self) -> Result<u64> {
        let metadata = self.ledger_metadata.to_bytes()?;
        Ok((INDEX_HEADER_SIZE + metadata.len() + self.entries.len() * INDEX_ENTRY_SIZE) as u64)
    }

    /// Parse an index object.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < INDEX_HEADER_SIZE {
            return Err(Error::CorruptIndex(format!(
                "index object truncated: {} bytes, need at least {}",
                data.len(),
                INDEX_HEADER_SIZE
            )));
        }

        let mut cursor = data;
        let magic = cursor.get_u32();
        if magic != INDEX_MAGIC {
            return Err(Error::CorruptIndex(format!(
                "bad index magic: {magic:#010x}"
            )));
        }
        let version = cursor.get_u16();
        if version != INDEX_FORMAT_VERSION {
            return Err(Error::CorruptIndex(format!(
                "unsupported index version: {version}"
            )));
        }

        let entry_count = cursor.get_u32() as usize;
        let data_block_header_size = cursor.get_u32();
        let data_object_length = cursor.get_u64();
        let metadata_len = cursor.get_u32() as usize;

        if cursor.remaining() < metadata_len + entry_count * INDEX_ENTRY_SIZE {
            return Err(Error::CorruptIndex(format!(
                "index object truncated: {} bytes remain, need {}",
                cursor.remaining(),
                metadata_len + entry_count * INDEX_ENTRY_SIZE
            )));
        }

        let ledger_metadata = LedgerMetadata::from_bytes(&cursor[..metadata_len])
            .map_err(|e| Error::CorruptIndex(format!("ledger metadata blob: {e}")))?;
        cursor.advance(metadata_len);

        let mut entries = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            entries.push(IndexEntry {
                first_entry_id: cursor.get_i64(),
                part_id: cursor.get_u32(),
                offset: cursor.get_u64(),
            });
        }

        for pair in entries.windows(2) {
            if pair[1].first_entry_id <= pair[0].first_entry_id
                || pair[1].part_id <= pair[0].part_id
                || pair[1].offset <= pair[0].offset
            {
                return Err(Error::CorruptIndex(
                    "index entries are not strictly increasing".to_string(),
                ));
            }
        }

        Ok(Self {
            ledger_metadata,
            data_block_header_size,
            data_object_length,
            entries,
        })
    }
}

/// Accumulates block locations during an offload and seals them into an
/// [`OffloadIndex`].
#[derive(Debug, Default)]
pub struct OffloadIndexBuilder {
    ledger_metadata: Option<LedgerMetadata>,
    data_block_header_size: u32,
    data_object_length: u64,
    entries: Vec<IndexEntry>,
    next_offset: u64,
}

impl OffloadIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger_metadata(mut self, metadata: LedgerMetadata) -> Self {
        self.ledger_metadata = Some(metadata);
        self
    }

    pub fn with_data_block_header_size(mut self, size: u32) -> Self {
        self.data_block_header_size = size;
        self
    }

    pub fn with_data_object_length(mut self, length: u64) -> Self {
        self.data_object_length = length;
        self
    }

    /// Record one uploaded block. Must be called in emission order; part IDs
    /// start at 1 and the block's offset is the running sum of earlier block
    /// sizes.
    pub fn add_block(&mut self, first_entry_id: i64, part_id: u32, block_size: u64) {
        if let Some(last) = self.entries.last() {
            assert!(
                first_entry_id > last.first_entry_id && part_id > last.part_id,
                "blocks must be added in strictly increasing order"
            );
        } else {
            assert_eq!(part_id, 1, "part IDs start at 1");
        }

        self.entries.push(IndexEntry {
            first_entry_id,
            part_id,
            offset: self.next_offset,
        });
        self.next_offset += block_size;
    }

    pub fn build(self) -> Result<OffloadIndex> {
        let ledger_metadata = self.ledger_metadata.ok_or_else(|| {
            Error::InvalidArgument("index builder requires ledger metadata".to_string())
        })?;
        Ok(OffloadIndex {
            ledger_metadata,
            data_block_header_size: self.data_block_header_size,
            data_object_length: self.data_object_length,
            entries: self.entries,
        })
    }
}
