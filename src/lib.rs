mod atm;
mod backend;
mod config;
mod core;

pub use crate::atm::Atm;
pub use crate::backend::{BackendError, FlatFileStore, JsonStore, LedgerStore, MemoryStore};
pub use crate::config::{AtmConfig, StorageFormat};
pub use crate::core::{Account, AtmError, CashInventory, Ledger, Report};
pub use crate::core::{account, cash, error, ledger, report};
