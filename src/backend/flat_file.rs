use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use log::debug;
use rust_decimal::Decimal;

use crate::backend::interface::{BackendError, LedgerStore, Result};
use crate::core::account::Account;
use crate::core::cash::{CashInventory, Denomination, NoteCount};
use crate::core::ledger::Ledger;
use crate::core::report::Report;

const ACCOUNTS_FILE: &str = "accounts.txt";
const CASH_FILE: &str = "cash.txt";
const REPORTS_FILE: &str = "reports.txt";

/// The reference line-oriented layout: `accounts.txt` with
/// `number,owner,pin,balance,active` rows, `cash.txt` with `denom,count`
/// rows, and an append-only `reports.txt` of `[timestamp] message` lines.
/// Accounts and inventory are rewritten whole on every save.
///
/// Field values themselves must not contain commas; the row layout has no
/// escaping.
pub struct FlatFileStore {
    dir: PathBuf,
    denominations: Vec<Denomination>,
}

impl FlatFileStore {
    pub fn new(dir: impl Into<PathBuf>, denominations: &[Denomination]) -> FlatFileStore {
        FlatFileStore {
            dir: dir.into(),
            denominations: denominations.to_vec(),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Non-blank lines of a data file, or `None` if it does not exist yet.
    fn read_lines(&self, file: &str) -> Result<Option<Vec<String>>> {
        let path = self.path(file);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(
                contents
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(str::to_owned)
                    .collect(),
            )),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BackendError::Io { path, source }),
        }
    }

    fn write_file(&self, file: &str, contents: String) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| BackendError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path(file);
        fs::write(&path, contents).map_err(|source| BackendError::Io { path, source })
    }

    fn corrupt(&self, file: &str, detail: String) -> BackendError {
        BackendError::Corrupt {
            path: self.path(file),
            detail,
        }
    }

    fn parse_account(&self, line: &str) -> Result<Account> {
        let fields: Vec<&str> = line.split(',').collect();
        match fields.as_slice() {
            [number, owner, pin, balance, active] => {
                let balance = Decimal::from_str(balance).map_err(|err| {
                    self.corrupt(ACCOUNTS_FILE, format!("bad balance {:?}: {}", balance, err))
                })?;
                let active = parse_bool(active).ok_or_else(|| {
                    self.corrupt(ACCOUNTS_FILE, format!("bad active flag {:?}", active))
                })?;
                Ok(Account::from_stored(
                    (*number).to_owned(),
                    (*owner).to_owned(),
                    (*pin).to_owned(),
                    balance,
                    active,
                ))
            }
            _ => Err(self.corrupt(
                ACCOUNTS_FILE,
                format!("expected 5 fields, got {}: {:?}", fields.len(), line),
            )),
        }
    }

    fn load_accounts(&self) -> Result<Vec<Account>> {
        let Some(lines) = self.read_lines(ACCOUNTS_FILE)? else {
            return Ok(Vec::new());
        };
        lines.iter().map(|line| self.parse_account(line)).collect()
    }

    fn load_inventory(&self) -> Result<CashInventory> {
        let mut inventory = CashInventory::new(&self.denominations);
        let Some(lines) = self.read_lines(CASH_FILE)? else {
            return Ok(inventory);
        };
        for line in &lines {
            let (denom, count) = line.split_once(',').ok_or_else(|| {
                self.corrupt(CASH_FILE, format!("expected denom,count row: {:?}", line))
            })?;
            let denom: Denomination = denom
                .parse()
                .map_err(|_| self.corrupt(CASH_FILE, format!("bad denomination {:?}", denom)))?;
            let count: NoteCount = count
                .parse()
                .map_err(|_| self.corrupt(CASH_FILE, format!("bad note count {:?}", count)))?;
            inventory
                .set_count(denom, count)
                .map_err(|_| BackendError::UnknownDenomination(denom))?;
        }
        Ok(inventory)
    }

    fn load_reports(&self) -> Result<Vec<Report>> {
        let Some(lines) = self.read_lines(REPORTS_FILE)? else {
            return Ok(Vec::new());
        };
        lines
            .iter()
            .map(|line| {
                Report::parse_line(line).ok_or_else(|| {
                    self.corrupt(REPORTS_FILE, format!("bad report line: {:?}", line))
                })
            })
            .collect()
    }
}

impl LedgerStore for FlatFileStore {
    fn load(&self) -> Result<Ledger> {
        let accounts = self.load_accounts()?;
        let inventory = self.load_inventory()?;
        let reports = self.load_reports()?;
        debug!(
            "loaded {} accounts, {} report lines from {}",
            accounts.len(),
            reports.len(),
            self.dir.display()
        );
        Ok(Ledger::from_stored(accounts, inventory, reports))
    }

    fn save_accounts(&self, ledger: &Ledger) -> Result<()> {
        let mut rows = String::new();
        for account in ledger.accounts() {
            rows.push_str(&format!(
                "{},{},{},{},{}\n",
                account.number(),
                account.owner(),
                account.pin(),
                account.balance(),
                account.is_active()
            ));
        }
        self.write_file(ACCOUNTS_FILE, rows)
    }

    fn save_inventory(&self, ledger: &Ledger) -> Result<()> {
        let mut rows = String::new();
        for (denom, count) in ledger.inventory().stock() {
            rows.push_str(&format!("{},{}\n", denom, count));
        }
        self.write_file(CASH_FILE, rows)
    }

    fn append_report(&self, report: &Report) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| BackendError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path(REPORTS_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| BackendError::Io {
                path: path.clone(),
                source,
            })?;
        writeln!(file, "{}", report).map_err(|source| BackendError::Io { path, source })
    }
}

fn parse_bool(field: &str) -> Option<bool> {
    match field {
        "true" | "True" => Some(true),
        "false" | "False" => Some(false),
        _ => None,
    }
}
