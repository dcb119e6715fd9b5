//! Ledger Entry Data Structure
//!
//! This module defines the core `LedgerEntry` type - the fundamental unit of
//! data in a ledger.
//!
//! ## What is a Ledger Entry?
//! An entry is a single immutable record appended to a ledger, similar to:
//! - A BookKeeper entry
//! - A WAL record
//! - A message in a replicated log
//!
//! ## Structure
//! Each entry contains:
//! - **ledger_id**: The ledger this entry belongs to
//! - **entry_id**: Unique, monotonically increasing ID within the ledger,
//!   starting at 0. Signed because -1 is the sentinel for "no entry"
//!   (an empty ledger has a last-add-confirmed of -1).
//! - **payload**: The actual data (arbitrary bytes)
//!
//! ## Design Decisions
//! - Uses `bytes::Bytes` for zero-copy operations (no allocations when slicing)
//! - Entry IDs are i64 to represent the -1 sentinel used throughout the
//!   bookkeeping tier

use bytes::Bytes;

/// A single entry in a ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Ledger this entry belongs to
    pub ledger_id: u64,

    /// Entry ID within the ledger (monotonically increasing from 0)
    pub entry_id: i64,

    /// Payload bytes
    pub payload: Bytes,
}

impl LedgerEntry {
    pub fn new(ledger_id: u64, entry_id: i64, payload: Bytes) -> Self {
        Self {
            ledger_id,
            entry_id,
            payload,
        }
    }

    /// Length of the payload in bytes
    pub fn length(&self) -> u64 {
        self.payload.len() as u64
    }
}
