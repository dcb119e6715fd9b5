//! Block-Aware Segment Streamer
//!
//! Packs entries pulled from a [`LedgerReader`] into exactly one block's
//! worth of bytes for upload as a single multipart part.
//!
//! ## Emission Order
//!
//! 1. The 64-byte data block header
//! 2. Greedily, framed entries starting at `start_entry_id`: an entry is
//!    packed if and only if the remaining block budget holds its full frame
//!    (`12 + payload length`). Packing stops at the first entry that does
//!    not fit, or past the last-add-confirmed, or when the source stops
//!    producing entries.
//! 3. Zero padding until exactly `block_size` bytes have been produced.
//!
//! The block is exposed as a sequence of [`Bytes`] chunks (payloads are
//! passed through zero-copy) rather than one contiguous allocation; peak
//! memory per in-flight block stays bounded by the block size.
//!
//! ## Reporting
//!
//! After building, [`end_entry_id`](BlockStreamer::end_entry_id) is the last
//! entry ID packed (-1 when none was), and
//! [`entry_bytes_read`](BlockStreamer::entry_bytes_read) is the payload bytes
//! consumed, which the offload loop accumulates to trim the final block via
//! [`calculate_block_size`].

use bytes::{BufMut, Bytes, BytesMut};
use ledgerhouse_core::LedgerReader;

use crate::block::{DataBlockHeader, DATA_BLOCK_HEADER_SIZE, ENTRY_HEADER_SIZE};
use crate::error::{Error, Result};

/// One block of the data object, fully assembled.
pub struct BlockStreamer {
    block_size: u64,
    end_entry_id: i64,
    entry_bytes_read: u64,
    chunks: Vec<Bytes>,
}

impl BlockStreamer {
    /// Pull entries from `reader` starting at `start_entry_id` and assemble
    /// a block of exactly `block_size` bytes.
    ///
    /// Fails with `InvalidArgument` when the first entry's frame cannot fit
    /// an empty block: the caller sized the block with
    /// [`calculate_block_size`], so this means the entry exceeds the maximum
    /// block size and the ledger cannot be offloaded with this configuration.
    pub async fn build(
        reader: &dyn LedgerReader,
        start_entry_id: i64,
        block_size: u64,
    ) -> Result<Self> {
        if block_size < DATA_BLOCK_HEADER_SIZE as u64 {
            return Err(Error::InvalidArgument(format!(
                "block size {block_size} smaller than the {DATA_BLOCK_HEADER_SIZE} byte header"
            )));
        }

        let last_add_confirmed = reader.last_add_confirmed();
        let mut budget = block_size - DATA_BLOCK_HEADER_SIZE as u64;
        let mut chunks: Vec<Bytes> = Vec::new();
        let mut end_entry_id: i64 = -1;
        let mut entry_bytes_read: u64 = 0;
        let mut entry_count: u32 = 0;
        let mut next_id = start_entry_id;

        while next_id <= last_add_confirmed {
            let Some(entry) = reader.read_entry(next_id).await? else {
                break;
            };
            let framed = ENTRY_HEADER_SIZE as u64 + entry.length();
            if framed > budget {
                if entry_count == 0 {
                    return Err(Error::InvalidArgument(format!(
                        "entry {next_id} ({} bytes) exceeds the maximum block payload",
                        entry.length()
                    )));
                }
                break;
            }

            let mut frame = BytesMut::with_capacity(ENTRY_HEADER_SIZE);
            frame.put_u32(entry.length() as u32);
            frame.put_i64(entry.entry_id);
            chunks.push(frame.freeze());
            entry_bytes_read += entry.length();
            chunks.push(entry.payload);

            budget -= framed;
            end_entry_id = next_id;
            entry_count += 1;
            next_id += 1;
        }

        let header = DataBlockHeader {
            block_size,
            first_entry_id: start_entry_id,
            entry_count,
        };
        chunks.insert(0, header.to_bytes());
        if budget > 0 {
            chunks.push(Bytes::from(vec![0u8; budget as usize]));
        }

        Ok(Self {
            block_size,
            end_entry_id,
            entry_bytes_read,
            chunks,
        })
    }

    /// Exact byte length of the assembled block
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Last entry ID packed into the block, or -1 when none was
    pub fn end_entry_id(&self) -> i64 {
        self.end_entry_id
    }

    /// Payload bytes consumed from the ledger (framing excluded)
    pub fn entry_bytes_read(&self) -> u64 {
        self.entry_bytes_read
    }

    /// The block as an ordered chunk sequence summing to `block_size` bytes
    pub fn into_chunks(self) -> Vec<Bytes> {
        self.chunks
    }
}

/// Size the next block: the full `max_block_size`, or less for the final
/// block so the data object does not overshoot the ledger.
///
/// `entry_bytes_written` is the payload byte count already packed into
/// earlier blocks. The result is always at least `64 + 12 + first entry
/// length` when that entry fits a block at all.
pub fn calculate_block_size(
    max_block_size: u64,
    reader: &dyn LedgerReader,
    start_entry_id: i64,
    entry_bytes_written: u64,
) -> u64 {
    let remaining_entries = (reader.last_add_confirmed() - start_entry_id + 1).max(0) as u64;
    let remaining_bytes = reader.length().saturating_sub(entry_bytes_written);
    max_block_size.min(
        DATA_BLOCK_HEADER_SIZE as u64
            + remaining_bytes
            + remaining_entries * ENTRY_HEADER_SIZE as u64,
    )
}
