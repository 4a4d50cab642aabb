use std::{fs, path::{Path, PathBuf}};

use anyhow::{self, Context};
use serde::{Serialize, Deserialize};

use crate::backend::JsonStore;
use crate::core::Ledger;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Where the account snapshot lives
    pub snapshot_path: PathBuf,
    /// How many fresh account numbers to draw before giving up on a registration
    pub account_number_attempts: usize
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            snapshot_path: PathBuf::from("accounts.json"),
            account_number_attempts: Ledger::<JsonStore>::DEFAULT_NUMBER_ATTEMPTS
        }
    }
}

impl LedgerConfig {
    pub fn read(filepath: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file_content = fs::read_to_string(filepath)
            .with_context(|| "failed to read config file")?;
        let config: LedgerConfig = toml::from_str(&file_content)
            .with_context(|| "failed to parse config file")?;
        if config.account_number_attempts == 0 {
            anyhow::bail!("account_number_attempts must be at least 1");
        }
        return Ok(config);
    }

    /// Opens the ledger stored at `snapshot_path`.
    pub fn open_ledger(&self) -> Ledger<JsonStore> {
        Ledger::open(JsonStore::new(&self.snapshot_path))
            .with_number_attempts(self.account_number_attempts)
    }
}


#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use rstest::rstest;

    use super::LedgerConfig;

    #[rstest]
    fn reads_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        fs::write(&path, "snapshot_path = \"/var/lib/bank/accounts.json\"\naccount_number_attempts = 4\n").unwrap();

        let config = LedgerConfig::read(&path).unwrap();
        assert_eq!(config.snapshot_path, PathBuf::from("/var/lib/bank/accounts.json"));
        assert_eq!(config.account_number_attempts, 4);
    }

    #[rstest]
    #[case("")]
    #[case("account_number_attempts = 16\n")]
    fn missing_fields_use_defaults(#[case] content: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        fs::write(&path, content).unwrap();

        assert_eq!(LedgerConfig::read(&path).unwrap(), LedgerConfig::default());
    }

    #[rstest]
    #[case("account_number_attempts = 0\n")]
    #[case("snapshot = \"x\"\n")]
    #[case("account_number_attempts = \"many\"\n")]
    fn rejects_bad_values(#[case] content: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        fs::write(&path, content).unwrap();

        assert!(LedgerConfig::read(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(LedgerConfig::read("/nonexistent/ledger.toml").is_err());
    }

    #[test]
    fn opens_ledger_at_snapshot_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            snapshot_path: dir.path().join("accounts.json"),
            account_number_attempts: 2
        };
        let ledger = config.open_ledger();
        ledger.register("alice", "a@x.com", "555-0001", "pw1", rust_decimal::Decimal::new(10, 0)).unwrap();

        assert!(config.snapshot_path.exists());
        assert_eq!(config.open_ledger().len(), 1);
    }
}
