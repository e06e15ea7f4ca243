use crate::error::{LedgerError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Logical namespaces of the persistent store. Each maps onto one sled tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// block hash -> block file path, plus the tip record
    Blockchain,
    /// confirmed txid -> transaction JSON
    Transactions,
    /// pooled (not yet mined) txid -> transaction JSON
    TransactionsPool,
    /// address -> local wallet name or remote peer id
    Nodes,
    /// wallet name -> wallet JSON
    Wallets,
    /// address -> "EMPTY" or list of unspent outpoints
    Accounts,
}

impl Namespace {
    pub const ALL: [Namespace; 6] = [
        Namespace::Blockchain,
        Namespace::Transactions,
        Namespace::TransactionsPool,
        Namespace::Nodes,
        Namespace::Wallets,
        Namespace::Accounts,
    ];

    pub fn tree_name(&self) -> &'static str {
        match self {
            Namespace::Blockchain => "BLOCKCHAIN",
            Namespace::Transactions => "TRANSACTIONS",
            Namespace::TransactionsPool => "TRANSACTIONS_POOL",
            Namespace::Nodes => "NODES",
            Namespace::Wallets => "WALLETS",
            Namespace::Accounts => "ACCOUNTS",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tree_name())
    }
}

impl FromStr for Namespace {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.to_uppercase().replace('-', "_");
        Namespace::ALL
            .into_iter()
            .find(|ns| ns.tree_name() == wanted)
            .ok_or_else(|| LedgerError::Validation(format!("Unknown namespace: {s}")))
    }
}

/// Namespaced key-value storage. Single-key writes are atomic; anything
/// spanning several keys must be serialized by the caller.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, namespace: Namespace, key: &str) -> Result<Option<Vec<u8>>>;

    fn put(&self, namespace: Namespace, key: &str, value: &[u8]) -> Result<()>;

    /// Returns whether the key was present
    fn delete(&self, namespace: Namespace, key: &str) -> Result<bool>;

    /// All entries of a namespace in key order
    fn entries(&self, namespace: Namespace) -> Result<Vec<(String, Vec<u8>)>>;

    fn contains(&self, namespace: Namespace, key: &str) -> Result<bool> {
        Ok(self.get(namespace, key)?.is_some())
    }

    fn len(&self, namespace: Namespace) -> Result<usize> {
        Ok(self.entries(namespace)?.len())
    }

    fn flush(&self) -> Result<()>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Typed helpers layered over the raw byte interface
pub trait StoreExt: KeyValueStore {
    fn get_string(&self, namespace: Namespace, key: &str) -> Result<Option<String>> {
        match self.get(namespace, key)? {
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| {
                LedgerError::Parse(format!("{namespace}/{key} is not valid UTF-8: {e}"))
            }),
            None => Ok(None),
        }
    }

    fn put_string(&self, namespace: Namespace, key: &str, value: &str) -> Result<()> {
        self.put(namespace, key, value.as_bytes())
    }

    fn get_json<T: DeserializeOwned>(&self, namespace: Namespace, key: &str) -> Result<Option<T>> {
        match self.get(namespace, key)? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                LedgerError::Parse(format!("Malformed JSON at {namespace}/{key}: {e}"))
            }),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, namespace: Namespace, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.put(namespace, key, &bytes)
    }
}

impl<S: KeyValueStore + ?Sized> StoreExt for S {}

/// sled-backed store; one tree per namespace
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SledStore> {
        let db = sled::open(path.as_ref())
            .map_err(|e| LedgerError::Database(format!("Failed to open database: {e}")))?;
        Ok(SledStore { db })
    }

    /// Store that is discarded on drop
    pub fn temporary() -> Result<SledStore> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| LedgerError::Database(format!("Failed to create temporary db: {e}")))?;
        Ok(SledStore { db })
    }

    fn tree(&self, namespace: Namespace) -> Result<sled::Tree> {
        self.db.open_tree(namespace.tree_name()).map_err(|e| {
            LedgerError::Database(format!("Failed to open {namespace} tree: {e}"))
        })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, namespace: Namespace, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .tree(namespace)?
            .get(key)
            .map_err(|e| LedgerError::Database(format!("Failed to read {namespace}/{key}: {e}")))?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn put(&self, namespace: Namespace, key: &str, value: &[u8]) -> Result<()> {
        self.tree(namespace)?
            .insert(key, value)
            .map_err(|e| LedgerError::Database(format!("Failed to write {namespace}/{key}: {e}")))?;
        Ok(())
    }

    fn delete(&self, namespace: Namespace, key: &str) -> Result<bool> {
        let previous = self.tree(namespace)?.remove(key).map_err(|e| {
            LedgerError::Database(format!("Failed to delete {namespace}/{key}: {e}"))
        })?;
        Ok(previous.is_some())
    }

    fn entries(&self, namespace: Namespace) -> Result<Vec<(String, Vec<u8>)>> {
        let mut entries = vec![];
        for item in self.tree(namespace)?.iter() {
            let (k, v) = item.map_err(|e| {
                LedgerError::Database(format!("Failed to iterate {namespace} tree: {e}"))
            })?;
            let key = String::from_utf8(k.to_vec())
                .map_err(|e| LedgerError::Parse(format!("Non UTF-8 key in {namespace}: {e}")))?;
            entries.push((key, v.to_vec()));
        }
        Ok(entries)
    }

    fn len(&self, namespace: Namespace) -> Result<usize> {
        Ok(self.tree(namespace)?.len())
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| LedgerError::Database(format!("Failed to flush: {e}")))?;
        Ok(())
    }
}
