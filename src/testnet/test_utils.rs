//! Test utilities for ledger testing

use crate::config::Config;
use crate::core::{Block, Ledger, Utxo};
use crate::error::Result;
use crate::utils::KeySpec;
use crate::wallet::Wallet;
use tempfile::TempDir;

/// Open a ledger over a fresh temporary directory. The directory must
/// outlive the ledger.
pub fn create_test_ledger(config: Config) -> (Ledger, TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let ledger = Ledger::open(config.with_data_dir(temp_dir.path()))
        .expect("failed to open test ledger");
    (ledger, temp_dir)
}

/// One unspent output per amount, each in its own transaction
pub fn utxos(amounts: &[u64]) -> Vec<Utxo> {
    amounts
        .iter()
        .enumerate()
        .map(|(i, &amount)| Utxo::new(&format!("{i:064x}"), 0, amount))
        .collect()
}

/// Create one wallet per name
pub fn create_test_wallets(ledger: &Ledger, names: &[&str]) -> Result<Vec<Wallet>> {
    names
        .iter()
        .map(|name| Ok(ledger.create_wallet(name, KeySpec::default())?.wallet))
        .collect()
}

/// Check heights and previous-hash links by walking from the tip
pub fn validate_chain_linkage(ledger: &Ledger) -> Result<bool> {
    let blocks = ledger
        .blockchain()
        .iterator()?
        .collect::<Result<Vec<Block>>>()?;
    for pair in blocks.windows(2) {
        let (newer, older) = (&pair[0], &pair[1]);
        if newer.get_previous_hash() != older.get_hash()
            || newer.get_height() != older.get_height() + 1
        {
            return Ok(false);
        }
    }
    Ok(blocks.last().map_or(true, |genesis| genesis.is_genesis()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_ledger() {
        let (ledger, dir) = create_test_ledger(Config::default());
        assert_eq!(ledger.config().data_dir, dir.path());
        assert!(ledger.tip().unwrap().is_none());
    }

    #[test]
    fn test_create_test_wallets() {
        let (ledger, _dir) = create_test_ledger(Config::default());
        let wallets = create_test_wallets(&ledger, &["a", "b", "c"]).unwrap();
        assert_eq!(wallets.len(), 3);
        assert_ne!(wallets[0].get_address(), wallets[1].get_address());
        assert_ne!(wallets[1].get_address(), wallets[2].get_address());
    }

    #[test]
    fn test_validate_chain_linkage() {
        let (ledger, _dir) = create_test_ledger(Config {
            min_pool_transactions: 0,
            ..Config::default()
        });
        create_test_wallets(&ledger, &["miner"]).unwrap();
        assert!(validate_chain_linkage(&ledger).unwrap());

        ledger.mine_genesis_block("miner").unwrap();
        ledger.mine_block("miner").unwrap();
        ledger.mine_block("miner").unwrap();
        assert!(validate_chain_linkage(&ledger).unwrap());
        assert_eq!(ledger.verify_chain().unwrap(), 3);
    }
}
