//! Error Types for the Core Ledger Model
//!
//! All functions in this crate return `Result<T>` which is aliased to
//! `Result<T, Error>`, allowing `?` propagation into the broker tiers
//! that consume it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid ledger metadata: {0}")]
    InvalidMetadata(String),

    #[error("Entry {entry_id} not found in ledger {ledger_id}")]
    EntryNotFound { ledger_id: u64, entry_id: i64 },
}

pub type Result<T> = std::result::Result<T, Error>;
