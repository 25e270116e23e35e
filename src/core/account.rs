use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::error::{AtmError, AtmResult};

/// A customer account. The number is the primary key and never changes;
/// the PIN is opaque to the core and only ever equality-compared.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    number: String,
    owner: String,
    pin: String,
    balance: Decimal,
    active: bool,
}

impl Account {
    pub fn new(number: &str, owner: &str, pin: &str, initial_deposit: Decimal) -> AtmResult<Account> {
        if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(AtmError::InvalidPin);
        }
        if initial_deposit < Decimal::ZERO {
            return Err(AtmError::InvalidAmount);
        }
        Ok(Account {
            number: number.to_owned(),
            owner: owner.to_owned(),
            pin: pin.to_owned(),
            balance: initial_deposit,
            active: true,
        })
    }

    /// Rebuilds an account from stored fields, bypassing registration
    /// checks: stored rows were validated when first created.
    pub(crate) fn from_stored(
        number: String,
        owner: String,
        pin: String,
        balance: Decimal,
        active: bool,
    ) -> Account {
        Account { number, owner, pin, balance, active }
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn verify_pin(&self, candidate: &str) -> bool {
        self.pin == candidate
    }

    pub(crate) fn pin(&self) -> &str {
        &self.pin
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn credit(&mut self, amount: Decimal) -> Decimal {
        self.balance += amount;
        self.balance
    }

    /// Subtracts `amount`, refusing to let the balance go negative.
    pub(crate) fn debit(&mut self, amount: Decimal) -> AtmResult<Decimal> {
        if self.balance < amount {
            return Err(AtmError::InsufficientBalance {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number, self.owner)
    }
}

impl fmt::Debug for Account {
    // the PIN stays out of debug output
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("number", &self.number)
            .field("owner", &self.owner)
            .field("balance", &self.balance)
            .field("active", &self.active)
            .finish()
    }
}
