use std::cell::RefCell;

use crate::backend::interface::{LedgerStore, Result};
use crate::core::account::Account;
use crate::core::cash::{CashInventory, Denomination};
use crate::core::ledger::Ledger;
use crate::core::report::Report;

/// Volatile store for tests and ephemeral machines. Implements the same
/// per-entity contract as the durable stores, so the commit discipline of
/// [`crate::Atm`] can be exercised without a filesystem.
pub struct MemoryStore {
    accounts: RefCell<Vec<Account>>,
    inventory: RefCell<CashInventory>,
    reports: RefCell<Vec<Report>>,
}

impl MemoryStore {
    pub fn new(denominations: &[Denomination]) -> MemoryStore {
        MemoryStore {
            accounts: RefCell::new(Vec::new()),
            inventory: RefCell::new(CashInventory::new(denominations)),
            reports: RefCell::new(Vec::new()),
        }
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Ledger> {
        Ok(Ledger::from_stored(
            self.accounts.borrow().clone(),
            self.inventory.borrow().clone(),
            self.reports.borrow().clone(),
        ))
    }

    fn save_accounts(&self, ledger: &Ledger) -> Result<()> {
        *self.accounts.borrow_mut() = ledger.accounts().cloned().collect();
        Ok(())
    }

    fn save_inventory(&self, ledger: &Ledger) -> Result<()> {
        *self.inventory.borrow_mut() = ledger.inventory().clone();
        Ok(())
    }

    fn append_report(&self, report: &Report) -> Result<()> {
        self.reports.borrow_mut().push(report.clone());
        Ok(())
    }
}
