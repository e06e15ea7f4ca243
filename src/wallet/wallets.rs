use crate::core::selection::Utxo;
use crate::error::{LedgerError, Result};
use crate::storage::{AccountIndex, KeyValueStore, Namespace, SharedStore, StoreExt, TransactionStore};
use crate::utils::{decode_hex, validate_address, KeySpec, HASH160_LEN};
use crate::wallet::{validate_wallet_name, Wallet};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// One row of the wallet listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub name: String,
    pub address: String,
    pub balance: u64,
}

/// Public view of a wallet; the private key is never included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub name: String,
    pub address: String,
    pub public_key: String,
    pub hash160: String,
    pub key_spec: KeySpec,
    pub balance: u64,
}

/// Wallet registry over the WALLETS, NODES and ACCOUNTS namespaces
pub struct WalletManager {
    store: SharedStore,
    accounts: AccountIndex,
    transactions: TransactionStore,
    address_version: u8,
    // name check and insert must not interleave
    creation_lock: Mutex<()>,
}

impl WalletManager {
    pub fn new(store: SharedStore, address_version: u8) -> WalletManager {
        WalletManager {
            accounts: AccountIndex::new(store.clone()),
            transactions: TransactionStore::new(store.clone()),
            store,
            address_version,
            creation_lock: Mutex::new(()),
        }
    }

    pub fn create_wallet(&self, name: &str, key_spec: KeySpec) -> Result<Wallet> {
        validate_wallet_name(name)?;
        let _guard = self
            .creation_lock
            .lock()
            .map_err(|_| LedgerError::Validation("Wallet creation lock poisoned".to_string()))?;
        if self.store.contains(Namespace::Wallets, name)? {
            return Err(LedgerError::DuplicateKeyName(name.to_string()));
        }

        let wallet = Wallet::new(name, key_spec, self.address_version)?;
        self.store.put_json(Namespace::Wallets, name, &wallet)?;
        self.store
            .put_string(Namespace::Nodes, wallet.get_address(), name)?;
        self.accounts.init_empty(wallet.get_address())?;
        info!(
            "Created {key_spec} wallet {name} with address {}",
            wallet.get_address()
        );
        Ok(wallet)
    }

    pub fn get_wallet(&self, name: &str) -> Result<Wallet> {
        self.store
            .get_json(Namespace::Wallets, name)?
            .ok_or_else(|| LedgerError::WalletNotFound(name.to_string()))
    }

    pub fn wallet_info(&self, name: &str) -> Result<WalletInfo> {
        let wallet = self.get_wallet(name)?;
        let balance = self.balance_of(wallet.get_address())?;
        Ok(WalletInfo {
            name: wallet.get_name().to_string(),
            address: wallet.get_address().to_string(),
            public_key: wallet.get_public_key().to_string(),
            hash160: wallet.get_hash160().to_string(),
            key_spec: wallet.get_key_spec(),
            balance,
        })
    }

    /// Local wallet name or peer id registered for `address`
    pub fn owner_of(&self, address: &str) -> Result<Option<String>> {
        self.store.get_string(Namespace::Nodes, address)
    }

    /// The local wallet owning `address`, if any. Addresses that belong to a
    /// remote peer resolve to `None`.
    pub fn wallet_for_address(&self, address: &str) -> Result<Option<Wallet>> {
        match self.owner_of(address)? {
            Some(owner) => {
                let wallet: Option<Wallet> = self.store.get_json(Namespace::Wallets, &owner)?;
                Ok(wallet.filter(|w| w.get_address() == address))
            }
            None => Ok(None),
        }
    }

    /// Records `address` as belonging to a remote peer
    pub fn register_peer_address(&self, address: &str, peer_id: &str) -> Result<()> {
        if peer_id.trim().is_empty() {
            return Err(LedgerError::Validation("Peer id must not be empty".to_string()));
        }
        validate_address(address, None)?;
        if self.wallet_for_address(address)?.is_some() {
            return Err(LedgerError::Validation(format!(
                "Address {address} belongs to a local wallet"
            )));
        }
        self.store.put_string(Namespace::Nodes, address, peer_id)?;
        if !self.accounts.exists(address)? {
            self.accounts.init_empty(address)?;
        }
        info!("Registered address {address} for peer {peer_id}");
        Ok(())
    }

    /// Spendable outputs of `address`, each resolved through the confirmed
    /// store and then the pool
    pub fn utxos_of(&self, address: &str) -> Result<Vec<Utxo>> {
        self.accounts
            .outpoints(address)?
            .into_iter()
            .map(|outpoint| {
                let output = self.transactions.resolve_output(&outpoint)?;
                Ok(Utxo {
                    outpoint,
                    amount: output.get_amount(),
                })
            })
            .collect()
    }

    pub fn balance_of(&self, address: &str) -> Result<u64> {
        Ok(self
            .utxos_of(address)?
            .iter()
            .fold(0u64, |acc, u| acc.saturating_add(u.amount)))
    }

    /// All local wallets with their balances, sorted by name
    pub fn list_wallets(&self) -> Result<Vec<WalletSummary>> {
        let mut summaries = vec![];
        for (name, bytes) in self.store.entries(Namespace::Wallets)? {
            let wallet: Wallet = serde_json::from_slice(&bytes).map_err(|e| {
                LedgerError::Parse(format!("Malformed wallet record {name}: {e}"))
            })?;
            summaries.push(WalletSummary {
                balance: self.balance_of(wallet.get_address())?,
                address: wallet.get_address().to_string(),
                name,
            });
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    pub fn wallet_count(&self) -> Result<usize> {
        self.store.len(Namespace::Wallets)
    }

    /// Checks that `address` is a well-formed address for `hash160_hex`.
    /// Returns `Ok(true)` on success and an integrity-kind error otherwise.
    pub fn verify_address(&self, address: &str, hash160_hex: &str) -> Result<bool> {
        if address.trim().is_empty() {
            return Err(LedgerError::MalformedInput("Address must not be empty".to_string()));
        }
        if hash160_hex.len() != HASH160_LEN * 2 {
            return Err(LedgerError::MalformedInput(format!(
                "hash160 must be {} hex characters, found {}",
                HASH160_LEN * 2,
                hash160_hex.len()
            )));
        }
        let expected = decode_hex(hash160_hex)?;
        validate_address(address, Some(&expected))?;
        Ok(true)
    }

    /// Removes the wallet, its node entry and its account entry
    pub fn delete_wallet(&self, name: &str) -> Result<Wallet> {
        let wallet = self.get_wallet(name)?;
        self.store.delete(Namespace::Wallets, name)?;
        self.store.delete(Namespace::Nodes, wallet.get_address())?;
        self.accounts.delete(wallet.get_address())?;
        info!("Deleted wallet {name} ({})", wallet.get_address());
        Ok(wallet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;
    use crate::core::OutPoint;
    use crate::error::ErrorKind;
    use crate::storage::SledStore;
    use crate::utils::base58check_encode;
    use crate::wallet::ADDRESS_VERSION;
    use std::sync::Arc;

    fn manager() -> (WalletManager, SharedStore) {
        let store: SharedStore = Arc::new(SledStore::temporary().unwrap());
        (WalletManager::new(store.clone(), ADDRESS_VERSION), store)
    }

    #[test]
    fn test_create_wallet_persists_indexes() {
        let (wallets, store) = manager();
        let wallet = wallets.create_wallet("alice", KeySpec::default()).unwrap();

        assert_eq!(wallets.get_wallet("alice").unwrap(), wallet);
        assert_eq!(
            store.get_string(Namespace::Nodes, wallet.get_address()).unwrap(),
            Some("alice".to_string())
        );
        assert_eq!(
            store
                .get_string(Namespace::Accounts, wallet.get_address())
                .unwrap(),
            Some("EMPTY".to_string())
        );
        assert_eq!(wallets.balance_of(wallet.get_address()).unwrap(), 0);
    }

    #[test]
    fn test_duplicate_and_invalid_names() {
        let (wallets, _) = manager();
        wallets.create_wallet("alice", KeySpec::default()).unwrap();
        assert_eq!(
            wallets.create_wallet("alice", KeySpec::Ed25519).unwrap_err(),
            LedgerError::DuplicateKeyName("alice".to_string())
        );
        assert!(matches!(
            wallets.create_wallet("-alice", KeySpec::default()),
            Err(LedgerError::InvalidKeyName(_))
        ));
        assert_eq!(wallets.wallet_count().unwrap(), 1);
    }

    #[test]
    fn test_list_wallets_sorted_with_balances() {
        let (wallets, store) = manager();
        let bob = wallets.create_wallet("bob", KeySpec::default()).unwrap();
        wallets.create_wallet("alice", KeySpec::default()).unwrap();

        let coinbase = Transaction::new_coinbase_tx(bob.get_address(), 25, "t").unwrap();
        TransactionStore::new(store.clone()).put_confirmed(&coinbase).unwrap();
        AccountIndex::new(store)
            .append(bob.get_address(), &[OutPoint::new(coinbase.get_id(), 0)])
            .unwrap();

        let listing = wallets.list_wallets().unwrap();
        let names: Vec<&str> = listing.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(listing[0].balance, 0);
        assert_eq!(listing[1].balance, 25);
        assert_eq!(wallets.wallet_info("bob").unwrap().balance, 25);
    }

    #[test]
    fn test_verify_address() {
        let (wallets, _) = manager();
        let wallet = wallets.create_wallet("alice", KeySpec::default()).unwrap();
        assert!(wallets
            .verify_address(wallet.get_address(), wallet.get_hash160())
            .unwrap());

        let err = wallets
            .verify_address(wallet.get_address(), "abcd")
            .unwrap_err();
        assert!(matches!(err, LedgerError::MalformedInput(_)));
        assert!(matches!(
            wallets.verify_address("", wallet.get_hash160()),
            Err(LedgerError::MalformedInput(_))
        ));

        let other = "00".repeat(20);
        let err = wallets.verify_address(wallet.get_address(), &other).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn test_wallet_for_address_and_peers() {
        let (wallets, _) = manager();
        let wallet = wallets.create_wallet("alice", KeySpec::default()).unwrap();
        assert_eq!(
            wallets.wallet_for_address(wallet.get_address()).unwrap(),
            Some(wallet.clone())
        );

        let remote = base58check_encode(ADDRESS_VERSION, &[8; 20]);
        wallets.register_peer_address(&remote, "peer-1").unwrap();
        assert_eq!(wallets.owner_of(&remote).unwrap(), Some("peer-1".to_string()));
        assert!(wallets.wallet_for_address(&remote).unwrap().is_none());

        assert!(wallets
            .register_peer_address(wallet.get_address(), "peer-2")
            .is_err());
        assert!(wallets.register_peer_address("not-an-address", "peer-3").is_err());
    }

    #[test]
    fn test_delete_wallet() {
        let (wallets, store) = manager();
        let wallet = wallets.create_wallet("alice", KeySpec::default()).unwrap();
        wallets.delete_wallet("alice").unwrap();

        assert!(matches!(
            wallets.get_wallet("alice"),
            Err(LedgerError::WalletNotFound(_))
        ));
        assert!(!store.contains(Namespace::Nodes, wallet.get_address()).unwrap());
        assert!(!store
            .contains(Namespace::Accounts, wallet.get_address())
            .unwrap());
        assert!(matches!(
            wallets.delete_wallet("alice"),
            Err(LedgerError::WalletNotFound(_))
        ));
    }
}
