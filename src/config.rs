use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

use crate::backend::{FlatFileStore, JsonStore, LedgerStore};
use crate::core::cash::Denomination;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    Flat,
    Json,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    pub format: StorageFormat,
    pub dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CashConfig {
    pub denominations: Vec<Denomination>,
}

/// Machine configuration: where the ledger lives and which note
/// denominations the machine holds. The denomination set is fixed here and
/// never changes at runtime.
#[derive(Debug, Serialize, Deserialize)]
pub struct AtmConfig {
    pub storage: StorageConfig,
    pub cash: CashConfig,
}

impl Default for AtmConfig {
    fn default() -> AtmConfig {
        AtmConfig {
            storage: StorageConfig {
                format: StorageFormat::Flat,
                dir: PathBuf::from("data"),
            },
            cash: CashConfig {
                denominations: vec![500, 200, 100, 50],
            },
        }
    }
}

impl AtmConfig {
    pub fn read(filepath: impl AsRef<Path>) -> anyhow::Result<AtmConfig> {
        let file_content = fs::read_to_string(filepath)
            .with_context(|| "failed to read config file")?;
        let config: AtmConfig = toml::from_str(&file_content)
            .with_context(|| "failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let denoms = &self.cash.denominations;
        ensure!(!denoms.is_empty(), "denomination set must not be empty");
        ensure!(
            denoms.iter().all(|&denom| denom > 0),
            "denominations must be positive"
        );
        let unique: BTreeSet<Denomination> = denoms.iter().copied().collect();
        ensure!(
            unique.len() == denoms.len(),
            "denominations must be unique"
        );
        Ok(())
    }

    /// Builds the store matching the configured format.
    pub fn open_store(&self) -> Box<dyn LedgerStore> {
        match self.storage.format {
            StorageFormat::Flat => Box::new(FlatFileStore::new(
                &self.storage.dir,
                &self.cash.denominations,
            )),
            StorageFormat::Json => Box::new(JsonStore::new(
                &self.storage.dir,
                &self.cash.denominations,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: AtmConfig = toml::from_str(
            r#"
            [storage]
            format = "json"
            dir = "/var/lib/cashpoint"

            [cash]
            denominations = [2000, 500, 200, 100, 50]
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.format, StorageFormat::Json);
        assert_eq!(config.storage.dir, PathBuf::from("/var/lib/cashpoint"));
        assert_eq!(config.cash.denominations, vec![2000, 500, 200, 100, 50]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_matches_reference_machine() {
        let config = AtmConfig::default();
        assert_eq!(config.storage.format, StorageFormat::Flat);
        assert_eq!(config.cash.denominations, vec![500, 200, 100, 50]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_denomination_sets() {
        let mut config = AtmConfig::default();

        config.cash.denominations = vec![];
        assert!(config.validate().is_err());

        config.cash.denominations = vec![500, 0];
        assert!(config.validate().is_err());

        config.cash.denominations = vec![500, 500];
        assert!(config.validate().is_err());
    }
}
