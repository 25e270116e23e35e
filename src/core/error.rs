use rust_decimal::Decimal;
use thiserror::Error;

use crate::backend::BackendError;
use crate::core::cash::{Denomination, NoteCount};

pub type AtmResult<T> = Result<T, AtmError>;

#[derive(Debug, Error)]
pub enum AtmError {
    /// No account is registered under the given number.
    #[error("no such account: {0}")]
    AccountNotFound(String),
    /// The account exists but an admin has deactivated it;
    /// every financial operation is rejected until reactivation.
    #[error("account {0} is deactivated")]
    AccountDeactivated(String),
    /// Zero or negative amount.
    #[error("amount must be positive")]
    InvalidAmount,
    /// Withdrawal or transfer exceeds the available balance.
    #[error("insufficient balance: have {balance}, requested {requested}")]
    InsufficientBalance { balance: Decimal, requested: Decimal },
    /// The amount cannot be composed exactly from the notes
    /// currently in the machine.
    #[error("cannot dispense {0} exactly with available notes, try a different amount")]
    NoExactBreakdown(u64),
    /// A breakdown asked for more notes than the inventory holds.
    /// Unreachable when `apply` directly follows `breakdown` on the
    /// same inventory state; reaching it signals a sequencing fault.
    #[error("internal error: need {needed} x {denom} notes, {available} in inventory")]
    InsufficientInventory {
        denom: Denomination,
        needed: NoteCount,
        available: NoteCount,
    },
    /// Denomination outside the configured set.
    #[error("unknown denomination: {0}")]
    UnknownDenomination(Denomination),
    /// Note count must be positive.
    #[error("note count must be positive")]
    InvalidCount,
    /// An account with this number already exists.
    #[error("account {0} already exists")]
    DuplicateAccount(String),
    /// PINs are exactly four ASCII digits.
    #[error("PIN must be exactly 4 digits")]
    InvalidPin,
    /// A durable write or read failed; the in-memory ledger
    /// was left unchanged.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
