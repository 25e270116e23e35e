use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use log::debug;

use crate::backend::interface::{BackendError, LedgerStore, Result};
use crate::core::account::Account;
use crate::core::cash::{CashInventory, Denomination};
use crate::core::ledger::Ledger;
use crate::core::report::Report;

const ACCOUNTS_FILE: &str = "accounts.json";
const INVENTORY_FILE: &str = "inventory.json";
const REPORTS_FILE: &str = "reports.jsonl";

/// Structured alternative to [`crate::FlatFileStore`]: accounts and
/// inventory as JSON documents, reports as one JSON object per line so
/// appends stay appends.
pub struct JsonStore {
    dir: PathBuf,
    denominations: Vec<Denomination>,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>, denominations: &[Denomination]) -> JsonStore {
        JsonStore {
            dir: dir.into(),
            denominations: denominations.to_vec(),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// File contents, or `None` if the file does not exist yet.
    fn read_file(&self, file: &str) -> Result<Option<String>> {
        let path = self.path(file);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
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

    fn load_accounts(&self) -> Result<Vec<Account>> {
        let Some(contents) = self.read_file(ACCOUNTS_FILE)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&contents)
            .map_err(|err| self.corrupt(ACCOUNTS_FILE, err.to_string()))
    }

    fn load_inventory(&self) -> Result<CashInventory> {
        let mut inventory = CashInventory::new(&self.denominations);
        let Some(contents) = self.read_file(INVENTORY_FILE)? else {
            return Ok(inventory);
        };
        let stored: CashInventory = serde_json::from_str(&contents)
            .map_err(|err| self.corrupt(INVENTORY_FILE, err.to_string()))?;
        for (denom, count) in stored.stock() {
            inventory
                .set_count(denom, count)
                .map_err(|_| BackendError::UnknownDenomination(denom))?;
        }
        Ok(inventory)
    }

    fn load_reports(&self) -> Result<Vec<Report>> {
        let Some(contents) = self.read_file(REPORTS_FILE)? else {
            return Ok(Vec::new());
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|err| self.corrupt(REPORTS_FILE, err.to_string()))
            })
            .collect()
    }
}

impl LedgerStore for JsonStore {
    fn load(&self) -> Result<Ledger> {
        let accounts = self.load_accounts()?;
        let inventory = self.load_inventory()?;
        let reports = self.load_reports()?;
        debug!(
            "loaded {} accounts, {} reports from {}",
            accounts.len(),
            reports.len(),
            self.dir.display()
        );
        Ok(Ledger::from_stored(accounts, inventory, reports))
    }

    fn save_accounts(&self, ledger: &Ledger) -> Result<()> {
        let accounts: Vec<&Account> = ledger.accounts().collect();
        let contents = serde_json::to_string_pretty(&accounts)
            .map_err(|err| self.corrupt(ACCOUNTS_FILE, err.to_string()))?;
        self.write_file(ACCOUNTS_FILE, contents)
    }

    fn save_inventory(&self, ledger: &Ledger) -> Result<()> {
        let contents = serde_json::to_string_pretty(ledger.inventory())
            .map_err(|err| self.corrupt(INVENTORY_FILE, err.to_string()))?;
        self.write_file(INVENTORY_FILE, contents)
    }

    fn append_report(&self, report: &Report) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| BackendError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let line = serde_json::to_string(report)
            .map_err(|err| self.corrupt(REPORTS_FILE, err.to_string()))?;
        let path = self.path(REPORTS_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| BackendError::Io {
                path: path.clone(),
                source,
            })?;
        writeln!(file, "{}", line).map_err(|source| BackendError::Io { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    const DENOMS: [Denomination; 4] = [500, 200, 100, 50];

    #[fixture]
    fn dir() -> TempDir {
        TempDir::new().unwrap()
    }

    #[rstest]
    fn missing_files_mean_fresh_ledger(dir: TempDir) {
        let store = JsonStore::new(dir.path(), &DENOMS);
        let ledger = store.load().unwrap();

        assert_eq!(ledger.accounts().count(), 0);
        assert_eq!(ledger.total_cash(), 0);
        assert_eq!(ledger.reports().len(), 0);
    }

    #[rstest]
    fn round_trip(dir: TempDir) {
        let store = JsonStore::new(dir.path(), &DENOMS);

        let mut ledger = Ledger::new(&DENOMS);
        ledger.register("1001", "Bilbo", "1111", dec!(250.75)).unwrap();
        ledger.add_cash("Gandalf", 200, 3).unwrap();

        store.save_accounts(&ledger).unwrap();
        store.save_inventory(&ledger).unwrap();
        for report in ledger.reports() {
            store.append_report(report).unwrap();
        }

        let loaded = store.load().unwrap();
        let bilbo = loaded.account("1001").unwrap();
        assert_eq!(bilbo.balance(), dec!(250.75));
        assert!(bilbo.verify_pin("1111"));
        assert_eq!(loaded.inventory(), ledger.inventory());
        assert_eq!(loaded.reports(), ledger.reports());
    }

    #[rstest]
    fn rejects_unconfigured_stored_denomination(dir: TempDir) {
        let store = JsonStore::new(dir.path(), &DENOMS);

        let mut ledger = Ledger::new(&[500, 200, 100, 50, 20]);
        ledger.add_cash("Gandalf", 20, 4).unwrap();
        store.save_inventory(&ledger).unwrap();

        assert!(matches!(
            store.load(),
            Err(BackendError::UnknownDenomination(20))
        ));
    }

    #[rstest]
    fn rejects_corrupt_documents(dir: TempDir) {
        fs::write(dir.path().join(ACCOUNTS_FILE), "not json").unwrap();

        let store = JsonStore::new(dir.path(), &DENOMS);
        assert!(matches!(store.load(), Err(BackendError::Corrupt { .. })));
    }
}
