//! Offload Error Types
//!
//! ## Error Categories
//!
//! ### Construction Errors
//! - `Config`: bad driver name, missing region/endpoint, undersized blocks
//!
//! ### Offload-Time Errors
//! - `InvalidArgument`: offload of an empty or open ledger, oversized entry
//! - `Io`: object-store transport failure (multipart abort and orphan
//!   deletion compensation run best-effort before this surfaces)
//!
//! ### Read-Time Errors
//! - `CorruptIndex`: magic/version mismatch or truncated index object
//! - `CorruptEntry`: entry ID mismatch or length overrun in the data object
//! - `IncompatibleVersion`: object format-version metadata differs from ours
//! - `EntryOutOfRange`: requested entry not covered by the index
//!
//! Errors never downgrade to empty results, and compensation failures are
//! logged without replacing the primary error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid offload configuration: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Object store error: {0}")]
    Io(#[from] object_store::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledgerhouse_core::Error),

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Corrupt entry: {0}")]
    CorruptEntry(String),

    #[error("Incompatible object version for {key}: found {found:?}, expected {expected}")]
    IncompatibleVersion {
        key: String,
        found: Option<String>,
        expected: &'static str,
    },

    #[error("Entry {entry_id} is outside the offloaded range [{first}, {last}]")]
    EntryOutOfRange {
        entry_id: i64,
        first: i64,
        last: i64,
    },

    #[error("Offload engine is shut down")]
    Shutdown,
}
