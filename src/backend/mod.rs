mod flat_file;
mod interface;
mod json_store;
mod memory;

pub use flat_file::FlatFileStore;
pub use interface::{BackendError, LedgerStore, Result};
pub use json_store::JsonStore;
pub use memory::MemoryStore;
