use std::collections::BTreeMap;

use log::info;
use rust_decimal::Decimal;

use crate::core::account::Account;
use crate::core::cash::{
    format_breakdown, Breakdown, CashInventory, Denomination, NoteCount,
};
use crate::core::error::{AtmError, AtmResult};
use crate::core::report::Report;

/// Outcome of a successful withdrawal: the notes handed out and the
/// balance left on the account.
#[derive(Clone, Debug, PartialEq)]
pub struct Withdrawal {
    pub notes: Breakdown,
    pub new_balance: Decimal,
}

/// Balances on both sides after a successful transfer.
#[derive(Clone, Debug, PartialEq)]
pub struct Transfer {
    pub sender_balance: Decimal,
    pub receiver_balance: Decimal,
}

/// The in-memory ledger: accounts, the machine's note inventory and the
/// append-only report log. Purely in-memory; durability is layered on top
/// by [`crate::Atm`], which owns one `Ledger` and persists it through a
/// [`crate::LedgerStore`].
///
/// A withdrawal couples accounts and inventory: the note decrement must
/// succeed before the balance decrement is committed.
#[derive(Clone, Debug)]
pub struct Ledger {
    accounts: BTreeMap<String, Account>,
    inventory: CashInventory,
    reports: Vec<Report>,
}

impl Ledger {
    pub fn new(denominations: &[Denomination]) -> Ledger {
        Ledger {
            accounts: BTreeMap::new(),
            inventory: CashInventory::new(denominations),
            reports: Vec::new(),
        }
    }

    pub(crate) fn from_stored(
        accounts: Vec<Account>,
        inventory: CashInventory,
        reports: Vec<Report>,
    ) -> Ledger {
        let accounts = accounts
            .into_iter()
            .map(|account| (account.number().to_owned(), account))
            .collect();
        Ledger { accounts, inventory, reports }
    }

    // ----- account operations -----

    pub fn register(
        &mut self,
        number: &str,
        owner: &str,
        pin: &str,
        initial_deposit: Decimal,
    ) -> AtmResult<&Account> {
        if self.accounts.contains_key(number) {
            return Err(AtmError::DuplicateAccount(number.to_owned()));
        }
        let account = Account::new(number, owner, pin, initial_deposit)?;
        info!("registered account {} for {}", number, owner);
        Ok(self.accounts.entry(number.to_owned()).or_insert(account))
    }

    /// Dispenses `amount` as notes and debits the account.
    ///
    /// All preconditions are checked before anything is touched; the
    /// inventory is decremented first, then the balance, and one report
    /// entry records both.
    pub fn withdraw(&mut self, number: &str, amount: u64) -> AtmResult<Withdrawal> {
        let balance = self.active_account(number)?.balance();
        if amount == 0 {
            return Err(AtmError::InvalidAmount);
        }
        let requested = Decimal::from(amount);
        if balance < requested {
            return Err(AtmError::InsufficientBalance { balance, requested });
        }

        let notes = self
            .inventory
            .breakdown(amount)
            .ok_or(AtmError::NoExactBreakdown(amount))?;
        self.inventory.apply(&notes)?;

        let account = self.active_account_mut(number)?;
        let new_balance = account.debit(requested)?;
        let owner = account.owner().to_owned();

        info!("account {} withdrew {}", number, amount);
        self.report(format!(
            "USER {} withdrew {} ({})",
            owner,
            amount,
            format_breakdown(&notes)
        ));
        Ok(Withdrawal { notes, new_balance })
    }

    pub fn deposit(&mut self, number: &str, amount: Decimal) -> AtmResult<Decimal> {
        let account = self.active_account_mut(number)?;
        if amount <= Decimal::ZERO {
            return Err(AtmError::InvalidAmount);
        }
        let new_balance = account.credit(amount);
        let owner = account.owner().to_owned();

        info!("account {} deposited {}", number, amount);
        self.report(format!("USER {} deposited {}", owner, amount));
        Ok(new_balance)
    }

    /// Moves `amount` between two accounts. Both accounts are validated
    /// before either balance moves, so no partial transfer is ever
    /// observable.
    pub fn transfer(
        &mut self,
        sender: &str,
        receiver: &str,
        amount: Decimal,
    ) -> AtmResult<Transfer> {
        let balance = self.active_account(sender)?.balance();
        self.active_account(receiver)?;
        if amount <= Decimal::ZERO {
            return Err(AtmError::InvalidAmount);
        }
        if balance < amount {
            return Err(AtmError::InsufficientBalance { balance, requested: amount });
        }

        let sender_balance = self.active_account_mut(sender)?.debit(amount)?;
        let receiver_account = self.active_account_mut(receiver)?;
        let receiver_balance = receiver_account.credit(amount);
        let to = receiver_account.owner().to_owned();
        let from = self.account(sender)?.owner().to_owned();

        info!("transfer of {} from {} to {}", amount, sender, receiver);
        self.report(format!("USER {} transferred {} to {}", from, amount, to));
        Ok(Transfer { sender_balance, receiver_balance })
    }

    /// Pure read: no mutation, no report entry.
    pub fn balance_inquiry(&self, number: &str) -> AtmResult<Decimal> {
        Ok(self.active_account(number)?.balance())
    }

    /// Admin toggle between `Active` and `Deactivated`. The only way an
    /// account changes state; financial operations never do.
    pub fn set_active(&mut self, number: &str, active: bool) -> AtmResult<&Account> {
        let account = self
            .accounts
            .get_mut(number)
            .ok_or_else(|| AtmError::AccountNotFound(number.to_owned()))?;
        account.set_active(active);

        let state = if active { "activated" } else { "deactivated" };
        info!("{} account {}", state, number);
        self.report(format!("ADMIN {} account {}", state, number));
        self.account(number)
    }

    // ----- cash operations -----

    pub fn add_cash(
        &mut self,
        admin: &str,
        denom: Denomination,
        count: NoteCount,
    ) -> AtmResult<u64> {
        self.inventory.add(denom, count)?;
        let total = self.inventory.total();

        info!("{} loaded {} x {} notes", admin, count, denom);
        self.report(format!(
            "ADMIN {} added {} x {} notes. Total cash now: {}",
            admin, count, denom, total
        ));
        Ok(total)
    }

    pub fn total_cash(&self) -> u64 {
        self.inventory.total()
    }

    /// Note stock, denomination descending.
    pub fn stock(&self) -> impl Iterator<Item = (Denomination, NoteCount)> + '_ {
        self.inventory.stock()
    }

    // ----- reads -----

    pub fn account(&self, number: &str) -> AtmResult<&Account> {
        self.accounts
            .get(number)
            .ok_or_else(|| AtmError::AccountNotFound(number.to_owned()))
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn inventory(&self) -> &CashInventory {
        &self.inventory
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// The last `limit` report entries, most recent last.
    pub fn recent_reports(&self, limit: usize) -> &[Report] {
        let start = self.reports.len().saturating_sub(limit);
        &self.reports[start..]
    }

    // ----- helpers -----

    fn active_account(&self, number: &str) -> AtmResult<&Account> {
        let account = self.account(number)?;
        if !account.is_active() {
            return Err(AtmError::AccountDeactivated(number.to_owned()));
        }
        Ok(account)
    }

    fn active_account_mut(&mut self, number: &str) -> AtmResult<&mut Account> {
        let account = self
            .accounts
            .get_mut(number)
            .ok_or_else(|| AtmError::AccountNotFound(number.to_owned()))?;
        if !account.is_active() {
            return Err(AtmError::AccountDeactivated(number.to_owned()));
        }
        Ok(account)
    }

    fn report(&mut self, message: String) {
        self.reports.push(Report::new(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use rust_decimal_macros::dec;

    const DENOMS: [Denomination; 4] = [500, 200, 100, 50];

    /// Two accounts and a stocked machine.
    #[fixture]
    fn ledger() -> Ledger {
        let mut ledger = Ledger::new(&DENOMS);
        ledger.register("1001", "Bilbo", "1111", dec!(500)).unwrap();
        ledger.register("1002", "Frodo", "2222", dec!(100)).unwrap();
        ledger.add_cash("Gandalf", 500, 1).unwrap();
        ledger
    }

    #[rstest]
    fn register_rejects_duplicates(mut ledger: Ledger) {
        let res = ledger.register("1001", "Impostor", "9999", dec!(0));
        assert!(matches!(res, Err(AtmError::DuplicateAccount(number)) if number == "1001"));
    }

    #[rstest]
    fn register_rejects_bad_pin(mut ledger: Ledger) {
        let res = ledger.register("1003", "Merry", "12", dec!(0));
        assert!(matches!(res, Err(AtmError::InvalidPin)));
        assert!(matches!(
            ledger.balance_inquiry("1003"),
            Err(AtmError::AccountNotFound(_))
        ));
    }

    #[rstest]
    fn withdraw_dispenses_and_debits(mut ledger: Ledger) {
        let withdrawal = ledger.withdraw("1001", 500).unwrap();

        assert_eq!(withdrawal.notes, [(500, 1)].into());
        assert_eq!(withdrawal.new_balance, dec!(0));
        assert_eq!(ledger.balance_inquiry("1001").unwrap(), dec!(0));
        assert_eq!(ledger.inventory().count(500), Some(0));
    }

    #[rstest]
    fn withdraw_conserves_cash(mut ledger: Ledger) {
        ledger.add_cash("Gandalf", 100, 5).unwrap();
        let total_before = ledger.total_cash();

        ledger.withdraw("1001", 300).unwrap();

        assert_eq!(ledger.total_cash(), total_before - 300);
    }

    #[rstest]
    fn add_cash_conserves_cash(mut ledger: Ledger) {
        let total_before = ledger.total_cash();
        let total = ledger.add_cash("Gandalf", 50, 4).unwrap();
        assert_eq!(total, total_before + 200);
    }

    #[rstest]
    fn withdraw_requires_positive_amount(mut ledger: Ledger) {
        assert!(matches!(
            ledger.withdraw("1001", 0),
            Err(AtmError::InvalidAmount)
        ));
    }

    #[rstest]
    fn withdraw_requires_funds(mut ledger: Ledger) {
        // Frodo holds 100; the machine could dispense 500
        let res = ledger.withdraw("1002", 500);
        assert!(matches!(res, Err(AtmError::InsufficientBalance { .. })));
        assert_eq!(ledger.balance_inquiry("1002").unwrap(), dec!(100));
        assert_eq!(ledger.inventory().count(500), Some(1));
    }

    #[rstest]
    fn withdraw_fails_cleanly_without_exact_notes(mut ledger: Ledger) {
        let reports_before = ledger.reports().len();

        // only a single 500 note is stocked
        let res = ledger.withdraw("1001", 300);

        assert!(matches!(res, Err(AtmError::NoExactBreakdown(300))));
        assert_eq!(ledger.balance_inquiry("1001").unwrap(), dec!(500));
        assert_eq!(ledger.total_cash(), 500);
        assert_eq!(ledger.reports().len(), reports_before);
    }

    #[rstest]
    fn deposit_credits_balance(mut ledger: Ledger) {
        let new_balance = ledger.deposit("1002", dec!(49.50)).unwrap();
        assert_eq!(new_balance, dec!(149.50));
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-10))]
    fn deposit_rejects_non_positive_amounts(mut ledger: Ledger, #[case] amount: Decimal) {
        assert!(matches!(
            ledger.deposit("1002", amount),
            Err(AtmError::InvalidAmount)
        ));
    }

    #[rstest]
    fn transfer_moves_funds(mut ledger: Ledger) {
        let transfer = ledger.transfer("1001", "1002", dec!(50)).unwrap();

        assert_eq!(transfer.sender_balance, dec!(450));
        assert_eq!(transfer.receiver_balance, dec!(150));
    }

    #[rstest]
    fn transfer_to_deactivated_receiver_changes_nothing(mut ledger: Ledger) {
        ledger.set_active("1002", false).unwrap();
        let reports_before = ledger.reports().len();

        let res = ledger.transfer("1001", "1002", dec!(50));

        assert!(matches!(res, Err(AtmError::AccountDeactivated(number)) if number == "1002"));
        assert_eq!(ledger.account("1001").unwrap().balance(), dec!(500));
        assert_eq!(ledger.account("1002").unwrap().balance(), dec!(100));
        assert_eq!(ledger.reports().len(), reports_before);
    }

    #[rstest]
    fn transfer_requires_funds(mut ledger: Ledger) {
        let res = ledger.transfer("1002", "1001", dec!(100.01));
        assert!(matches!(res, Err(AtmError::InsufficientBalance { .. })));
        assert_eq!(ledger.account("1002").unwrap().balance(), dec!(100));
    }

    #[rstest]
    fn deactivated_account_rejects_every_operation(mut ledger: Ledger) {
        ledger.set_active("1001", false).unwrap();
        let reports_before = ledger.reports().len();
        let cash_before = ledger.total_cash();

        assert!(matches!(
            ledger.withdraw("1001", 500),
            Err(AtmError::AccountDeactivated(_))
        ));
        assert!(matches!(
            ledger.deposit("1001", dec!(10)),
            Err(AtmError::AccountDeactivated(_))
        ));
        assert!(matches!(
            ledger.transfer("1001", "1002", dec!(10)),
            Err(AtmError::AccountDeactivated(_))
        ));
        assert!(matches!(
            ledger.balance_inquiry("1001"),
            Err(AtmError::AccountDeactivated(_))
        ));

        assert_eq!(ledger.account("1001").unwrap().balance(), dec!(500));
        assert_eq!(ledger.total_cash(), cash_before);
        assert_eq!(ledger.reports().len(), reports_before);
    }

    #[rstest]
    fn reactivation_restores_service(mut ledger: Ledger) {
        ledger.set_active("1001", false).unwrap();
        ledger.set_active("1001", true).unwrap();
        assert_eq!(ledger.balance_inquiry("1001").unwrap(), dec!(500));
    }

    #[rstest]
    fn balance_inquiry_is_idempotent(mut ledger: Ledger) {
        let reports_before = ledger.reports().len();

        let first = ledger.balance_inquiry("1001").unwrap();
        let second = ledger.balance_inquiry("1001").unwrap();

        assert_eq!(first, second);
        assert_eq!(ledger.reports().len(), reports_before);
    }

    #[rstest]
    fn operations_on_unknown_accounts_fail(mut ledger: Ledger) {
        assert!(matches!(
            ledger.withdraw("9999", 100),
            Err(AtmError::AccountNotFound(_))
        ));
        assert!(matches!(
            ledger.set_active("9999", false),
            Err(AtmError::AccountNotFound(_))
        ));
        assert!(matches!(
            ledger.transfer("1001", "9999", dec!(10)),
            Err(AtmError::AccountNotFound(_))
        ));
    }

    #[rstest]
    fn reports_record_state_changes_in_order(mut ledger: Ledger) {
        ledger.deposit("1002", dec!(25)).unwrap();
        ledger.withdraw("1001", 500).unwrap();

        let messages: Vec<&str> = ledger
            .reports()
            .iter()
            .map(|report| report.message())
            .collect();
        assert_eq!(
            messages,
            vec![
                "ADMIN Gandalf added 1 x 500 notes. Total cash now: 500",
                "USER Frodo deposited 25",
                "USER Bilbo withdrew 500 (1x500)",
            ]
        );
    }

    #[rstest]
    fn recent_reports_returns_tail(mut ledger: Ledger) {
        ledger.deposit("1002", dec!(1)).unwrap();
        ledger.deposit("1002", dec!(2)).unwrap();

        let recent = ledger.recent_reports(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message(), "USER Frodo deposited 1");
        assert_eq!(recent[1].message(), "USER Frodo deposited 2");

        assert_eq!(ledger.recent_reports(100).len(), ledger.reports().len());
    }
}
