use log::warn;
use rust_decimal::Decimal;

use crate::backend::{self, LedgerStore};
use crate::core::account::Account;
use crate::core::cash::{Denomination, NoteCount};
use crate::core::error::AtmResult;
use crate::core::ledger::{Ledger, Transfer, Withdrawal};
use crate::core::report::Report;

/// The machine itself: one [`Ledger`] plus the store that keeps it durable.
///
/// Every state-changing operation runs against a working copy of the
/// ledger; the copy only replaces the live one after every durable write
/// has succeeded. A failed write therefore leaves the in-memory state
/// exactly where the last successful persist left it. All mutating
/// operations take `&mut self`, so two of them can never interleave
/// between snapshot and commit.
pub struct Atm {
    ledger: Ledger,
    store: Box<dyn LedgerStore>,
}

impl Atm {
    pub fn open(store: Box<dyn LedgerStore>) -> AtmResult<Atm> {
        let ledger = store.load()?;
        Ok(Atm { ledger, store })
    }

    pub fn register(
        &mut self,
        number: &str,
        owner: &str,
        pin: &str,
        initial_deposit: Decimal,
    ) -> AtmResult<Account> {
        self.commit(|ledger| {
            ledger
                .register(number, owner, pin, initial_deposit)
                .map(|account| account.clone())
        })
    }

    pub fn withdraw(&mut self, number: &str, amount: u64) -> AtmResult<Withdrawal> {
        self.commit(|ledger| ledger.withdraw(number, amount))
    }

    pub fn deposit(&mut self, number: &str, amount: Decimal) -> AtmResult<Decimal> {
        self.commit(|ledger| ledger.deposit(number, amount))
    }

    pub fn transfer(
        &mut self,
        sender: &str,
        receiver: &str,
        amount: Decimal,
    ) -> AtmResult<Transfer> {
        self.commit(|ledger| ledger.transfer(sender, receiver, amount))
    }

    pub fn set_active(&mut self, number: &str, active: bool) -> AtmResult<Account> {
        self.commit(|ledger| {
            ledger
                .set_active(number, active)
                .map(|account| account.clone())
        })
    }

    pub fn add_cash(
        &mut self,
        admin: &str,
        denom: Denomination,
        count: NoteCount,
    ) -> AtmResult<u64> {
        self.commit(|ledger| ledger.add_cash(admin, denom, count))
    }

    // ----- reads: no mutation, no persistence -----

    pub fn balance_inquiry(&self, number: &str) -> AtmResult<Decimal> {
        self.ledger.balance_inquiry(number)
    }

    pub fn total_cash(&self) -> u64 {
        self.ledger.total_cash()
    }

    /// Note stock, denomination descending.
    pub fn stock(&self) -> Vec<(Denomination, NoteCount)> {
        self.ledger.stock().collect()
    }

    /// The last `limit` report entries, most recent last.
    pub fn recent_reports(&self, limit: usize) -> &[Report] {
        self.ledger.recent_reports(limit)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Runs `op` on a working copy, persists the outcome, and only then
    /// swaps the copy in.
    fn commit<T>(&mut self, op: impl FnOnce(&mut Ledger) -> AtmResult<T>) -> AtmResult<T> {
        let mut working = self.ledger.clone();
        let reports_before = working.reports().len();
        let payload = op(&mut working)?;

        if let Err(err) = self.persist(&working, reports_before) {
            warn!("durable write failed, discarding staged changes: {}", err);
            return Err(err.into());
        }
        self.ledger = working;
        Ok(payload)
    }

    fn persist(&self, working: &Ledger, reports_before: usize) -> backend::Result<()> {
        self.store.save_accounts(working)?;
        self.store.save_inventory(working)?;
        for report in &working.reports()[reports_before..] {
            self.store.append_report(report)?;
        }
        Ok(())
    }
}
