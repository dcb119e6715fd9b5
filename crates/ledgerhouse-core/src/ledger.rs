//! Ledger Metadata and the Ledger Reader Interface
//!
//! A ledger is a closed, immutable, append-only sequence of entries living in
//! the replicated bookkeeping tier. This module defines:
//!
//! 1. **LedgerMetadata**: the descriptive record the bookkeeping tier keeps
//!    for each ledger (replication parameters, creation time, custom
//!    properties). The offload tier carries this blob alongside the data so a
//!    ledger read back from object storage is indistinguishable from one
//!    served by the bookkeeping tier.
//! 2. **LedgerReader**: the narrow read capability the offload engine needs -
//!    identity, bounds, and entry-by-ID access. The bookkeeping client
//!    implements this over its own read handles; tests implement it over a
//!    `Vec`.
//!
//! ## Why JSON for the metadata blob?
//!
//! The offload engine treats metadata as an opaque, round-trippable byte
//! blob. JSON keeps the on-object blob debuggable with nothing more than
//! `curl` and keeps unknown properties intact via the properties map.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::entry::LedgerEntry;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Metadata describing a ledger, as kept by the bookkeeping tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMetadata {
    /// Number of storage nodes the ledger is striped across
    pub ensemble_size: u32,

    /// Number of replicas each entry is written to
    pub write_quorum: u32,

    /// Number of replicas that must acknowledge a write
    pub ack_quorum: u32,

    /// Creation timestamp in milliseconds since epoch
    pub creation_time_ms: u64,

    /// Largest entry ID durably written (-1 for an empty ledger)
    pub last_entry_id: i64,

    /// Total payload bytes in the ledger
    pub length: u64,

    /// Whether the ledger is sealed against further appends
    pub closed: bool,

    /// Application-defined properties, carried verbatim
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl LedgerMetadata {
    /// Serialize into the opaque blob stored in the offload index object.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::InvalidMetadata(e.to_string()))
    }

    /// Parse a metadata blob previously produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| Error::InvalidMetadata(e.to_string()))
    }
}

/// Read capability over a single closed ledger.
///
/// Implemented by the bookkeeping client for real ledgers and by in-memory
/// fixtures in tests. All entry IDs at or below `last_add_confirmed` are
/// expected to be readable; `read_entry` returning `Ok(None)` means the
/// source could not produce the entry (e.g. it was truncated underneath us),
/// which consumers treat as end-of-stream rather than corruption.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Ledger ID
    fn id(&self) -> u64;

    /// Total payload bytes in the ledger
    fn length(&self) -> u64;

    /// Whether the ledger is sealed against further appends
    fn is_closed(&self) -> bool;

    /// Last-add-confirmed: the largest durably written entry ID, or -1
    fn last_add_confirmed(&self) -> i64;

    /// The ledger's metadata record
    fn metadata(&self) -> &LedgerMetadata;

    /// Read one entry by ID
    async fn read_entry(&self, entry_id: i64) -> Result<Option<LedgerEntry>>;
}
