use std::path::PathBuf;

use thiserror::Error;

use crate::core::cash::Denomination;
use crate::core::ledger::Ledger;
use crate::core::report::Report;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt record in {path}: {detail}")]
    Corrupt { path: PathBuf, detail: String },
    /// The store holds a count for a denomination the machine is not
    /// configured with.
    #[error("stored count for unconfigured denomination {0}")]
    UnknownDenomination(Denomination),
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Durable home of a [`Ledger`]. Accounts and inventory are rewritten
/// whole on save; reports are append-only.
///
/// Callers must not report success to their own callers until every write
/// for the operation has returned `Ok`.
pub trait LedgerStore {
    /// Reads the full ledger. Missing files mean a fresh ledger: no
    /// accounts, the configured denominations at zero stock, no reports.
    fn load(&self) -> Result<Ledger>;

    fn save_accounts(&self, ledger: &Ledger) -> Result<()>;

    fn save_inventory(&self, ledger: &Ledger) -> Result<()>;

    fn append_report(&self, report: &Report) -> Result<()>;
}
