//! Data Block Format
//!
//! The data object is a sequence of blocks, each uploaded as one multipart
//! part. A block is a 64-byte header, then whole framed entries, then zero
//! padding out to the block size recorded in the header. Entries never
//! straddle blocks.
//!
//! Framed entry layout: `[length: u32][entry_id: i64][payload]`, big-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Magic bytes opening every data block: "LDGB"
pub const DATA_BLOCK_MAGIC: u32 = 0x4C44_4742;

/// Fixed size of the data block header in bytes
pub const DATA_BLOCK_HEADER_SIZE: usize = 64;

/// Size of the per-entry frame header: length (4) + entry ID (8)
pub const ENTRY_HEADER_SIZE: usize = 12;

/// Smallest permitted block size, aligned with the S3 multipart minimum
pub const MIN_BLOCK_SIZE: u64 = 5 * 1024 * 1024;

const RESERVED_LEN: usize = DATA_BLOCK_HEADER_SIZE - 24;

/// Header written at the start of every data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBlockHeader {
    /// Exact byte length of this block, padding included
    pub block_size: u64,

    /// ID of the first entry packed into this block
    pub first_entry_id: i64,

    /// Number of entries packed into this block
    pub entry_count: u32,
}

impl DataBlockHeader {
    /// Encode into the fixed 64-byte on-object form.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(DATA_BLOCK_HEADER_SIZE);
        buf.put_u32(DATA_BLOCK_MAGIC);
        buf.put_u64(self.block_size);
        buf.put_i64(self.first_entry_id);
        buf.put_u32(self.entry_count);
        buf.put_bytes(0, RESERVED_LEN);
        buf.freeze()
    }

    /// Decode a header from the start of a block.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < DATA_BLOCK_HEADER_SIZE {
            return Err(Error::CorruptEntry(format!(
                "data block header truncated: {} bytes, need {}",
                data.len(),
                DATA_BLOCK_HEADER_SIZE
            )));
        }

        let mut cursor = &data[..DATA_BLOCK_HEADER_SIZE];
        let magic = cursor.get_u32();
        if magic != DATA_BLOCK_MAGIC {
            return Err(Error::CorruptEntry(format!(
                "bad data block magic: {magic:#010x}"
            )));
        }

        Ok(Self {
            block_size: cursor.get_u64(),
            first_entry_id: cursor.get_i64(),
            entry_count: cursor.get_u32(),
        })
    }
}
