use crate::core::monetary::{DEFAULT_BLOCK_REWARD, DEFAULT_TRANSACTION_FEE, UNITS_PER_COIN};
use crate::error::{LedgerError, Result};
use crate::wallet::ADDRESS_VERSION;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR_KEY: &str = "UTXO_DATA_DIR";
const ADMIN_ADDRESS_KEY: &str = "UTXO_ADMIN_ADDRESS";
const BLOCK_REWARD_KEY: &str = "UTXO_BLOCK_REWARD";
const DEFAULT_FEE_KEY: &str = "UTXO_DEFAULT_FEE";

static DEFAULT_DATA_DIR: &str = "data";

/// Ledger settings.
///
/// Loaded from an optional TOML file, then overridden by `UTXO_*`
/// environment variables. Missing keys fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root for the sled database (`db/`) and block files (`blocks/`)
    pub data_dir: PathBuf,
    /// Source of wallet bonuses and of spends with an empty `from`
    pub admin_address: Option<String>,
    pub block_reward: u64,
    /// Pool size required before a block can be mined
    pub min_pool_transactions: usize,
    /// Upper bound of pooled transactions folded into one block
    pub max_pool_transactions: usize,
    /// Number of wallets (counted at creation) that receive a bonus
    pub wallet_bonus_threshold: usize,
    pub wallet_bonus_amount: u64,
    pub default_fee: u64,
    /// Payment outputs each spend is split into
    pub output_split_count: usize,
    /// Recorded in every block header; no search is performed
    pub difficulty: u32,
    pub address_version: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            admin_address: None,
            block_reward: DEFAULT_BLOCK_REWARD,
            min_pool_transactions: 1,
            max_pool_transactions: 10,
            wallet_bonus_threshold: 0,
            wallet_bonus_amount: UNITS_PER_COIN,
            default_fee: DEFAULT_TRANSACTION_FEE,
            output_split_count: 1,
            difficulty: 1,
            address_version: ADDRESS_VERSION,
        }
    }
}

impl Config {
    /// Defaults, then `path` (if given), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path).map_err(|e| {
            LedgerError::Io(format!("Failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Config> {
        toml::from_str(text).map_err(|e| LedgerError::Parse(format!("Invalid config: {e}")))
    }

    pub fn with_data_dir<P: AsRef<Path>>(mut self, dir: P) -> Config {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = env::var(DATA_DIR_KEY) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(address) = env::var(ADMIN_ADDRESS_KEY) {
            self.admin_address = Some(address).filter(|a| !a.trim().is_empty());
        }
        if let Ok(reward) = env::var(BLOCK_REWARD_KEY) {
            self.block_reward = parse_env(BLOCK_REWARD_KEY, &reward)?;
        }
        if let Ok(fee) = env::var(DEFAULT_FEE_KEY) {
            self.default_fee = parse_env(DEFAULT_FEE_KEY, &fee)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_pool_transactions > self.max_pool_transactions {
            return Err(LedgerError::Validation(format!(
                "min_pool_transactions ({}) exceeds max_pool_transactions ({})",
                self.min_pool_transactions, self.max_pool_transactions
            )));
        }
        if self.max_pool_transactions == 0 {
            return Err(LedgerError::Validation(
                "max_pool_transactions must be at least 1".to_string(),
            ));
        }
        if self.output_split_count == 0 {
            return Err(LedgerError::Validation(
                "output_split_count must be at least 1".to_string(),
            ));
        }
        if self.block_reward == 0 {
            return Err(LedgerError::Validation(
                "block_reward must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("db")
    }

    pub fn blocks_dir(&self) -> PathBuf {
        self.data_dir.join("blocks")
    }
}

fn parse_env(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| LedgerError::Parse(format!("{key}={value:?} is not an amount: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.output_split_count, 1);
        assert_eq!(config.block_reward, DEFAULT_BLOCK_REWARD);
        assert_eq!(config.db_path(), PathBuf::from("data").join("db"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            data_dir = "/tmp/ledger"
            block_reward = 100
            min_pool_transactions = 2
            admin_address = "1BoatSLRHtKNngkdXEeobR76b53LETtpyT"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ledger"));
        assert_eq!(config.block_reward, 100);
        assert_eq!(config.min_pool_transactions, 2);
        assert_eq!(config.max_pool_transactions, 10);
        assert_eq!(
            config.admin_address.as_deref(),
            Some("1BoatSLRHtKNngkdXEeobR76b53LETtpyT")
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("block_reward = \"lots\""),
            Err(LedgerError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_rejects_inconsistent_values() {
        let config = Config {
            min_pool_transactions: 5,
            max_pool_transactions: 2,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            output_split_count: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        fs::write(&path, "output_split_count = 3\ndifficulty = 4\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.output_split_count, 3);
        assert_eq!(config.difficulty, 4);
    }
}
