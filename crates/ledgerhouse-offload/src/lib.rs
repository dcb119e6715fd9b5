//! Ledger Offload Engine
//!
//! This crate moves closed, immutable ledgers out of the replicated
//! bookkeeping tier into cheap object storage (S3-compatible or Google Cloud
//! Storage), and later serves random-access entry reads from the object tier
//! as if the ledger were still online.
//!
//! ## On-Object Layout
//!
//! Each offloaded ledger becomes two objects. The **data object** is a
//! sequence of fixed-size blocks, uploaded as one multipart part per block:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Block 1 (max_block_size bytes, part 1)                      │
//! │ ├─ Header (64 bytes)                                        │
//! │ │  - Magic: "LDGB" (4 bytes)                                │
//! │ │  - Block size (8 bytes)                                   │
//! │ │  - First entry ID in block (8 bytes)                      │
//! │ │  - Entry count in block (4 bytes)                         │
//! │ │  - Reserved (40 bytes)                                    │
//! │ ├─ Entry: [length:4][entry_id:8][payload]                   │
//! │ ├─ Entry: [length:4][entry_id:8][payload]                   │
//! │ ├─ ...                                                      │
//! │ └─ Zero padding to exactly the block size                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Block 2 (max_block_size bytes, part 2)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │ ...                                                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Block N (trimmed to the remaining data, part N)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries never straddle blocks: when the next entry does not fit, the
//! block is padded and a new block (= new part) begins.
//!
//! The **index object** maps entry IDs to block locations and carries the
//! ledger metadata blob:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Header (26 bytes)                                           │
//! │ - Magic: "LDGO" (4 bytes)                                   │
//! │ - Version: 1 (2 bytes)                                      │
//! │ - Index entry count (4 bytes)                               │
//! │ - Data block header size (4 bytes)                          │
//! │ - Data object length (8 bytes)                              │
//! │ - Ledger metadata length (4 bytes)                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Ledger metadata blob                                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Index entries, sorted by first entry ID:                    │
//! │ - First entry ID of block (8 bytes)                         │
//! │ - Part ID (4 bytes)                                         │
//! │ - Offset of block in data object (8 bytes)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian.
//!
//! A ledger counts as offloaded **if and only if its index object exists**.
//! The data object is uploaded and completed first; a data object without an
//! index is unreferenced garbage for an out-of-band sweeper. This ordering
//! gives at-most-once visible offloads without cross-object transactions.
//!
//! ## Main Components
//!
//! ### [`BlobStoreOffloader`](offloader::BlobStoreOffloader)
//! Orchestrates `offload` (multipart upload of the data object, single put of
//! the index object), `read_offloaded` (opens a read handle), and
//! `delete_offloaded`. Drivers: `S3`, `aws-s3`, `google-cloud-storage`.
//!
//! ### [`BlockStreamer`](streamer::BlockStreamer)
//! Packs entries pulled from a [`LedgerReader`](ledgerhouse_core::LedgerReader)
//! into exactly one block's worth of bytes.
//!
//! ### [`OffloadIndex`](index::OffloadIndex)
//! In-memory builder and on-object codec for the index, with binary-search
//! entry lookup.
//!
//! ### [`OffloadedReadHandle`](read_handle::OffloadedReadHandle)
//! Random-access reader over the two objects: loads the index once, then
//! serves `read(first, last)` out of a bounded range buffer over the data
//! object.
//!
//! ## Concurrency Model
//!
//! The engine is parallel across ledgers but serial per ledger: every
//! operation on a given ledger runs on the same lane of an
//! [`OrderedExecutor`](scheduler::OrderedExecutor), so per-ledger state needs
//! no locking and multipart parts are uploaded strictly in order (one block
//! in flight bounds memory to one block).

pub mod block;
pub mod config;
pub mod driver;
pub mod error;
pub mod index;
pub mod offloader;
pub mod read_handle;
pub mod scheduler;
pub mod streamer;

pub use block::{DataBlockHeader, DATA_BLOCK_HEADER_SIZE, ENTRY_HEADER_SIZE};
pub use config::OffloadConfig;
pub use driver::BucketAdmin;
pub use error::{Error, Result};
pub use index::{IndexEntry, OffloadIndex, OffloadIndexBuilder};
pub use offloader::BlobStoreOffloader;
pub use read_handle::OffloadedReadHandle;
pub use scheduler::OrderedExecutor;
pub use streamer::{calculate_block_size, BlockStreamer};
