pub mod account;
pub mod cash;
pub mod error;
pub mod ledger;
pub mod report;

pub use account::Account;
pub use cash::CashInventory;
pub use error::AtmError;
pub use ledger::Ledger;
pub use report::Report;
