pub mod entry;
pub mod error;
pub mod ledger;

pub use entry::LedgerEntry;
pub use error::{Error, Result};
pub use ledger::{LedgerMetadata, LedgerReader};
