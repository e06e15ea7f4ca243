use crate::core::{OutPoint, TXOutput, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::{KeyValueStore, Namespace, SharedStore, StoreExt, TransactionPool};

/// Where a transaction was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Confirmed,
    Pending,
}

/// Confirmed transactions (TRANSACTIONS) with a fallback to the pool for
/// lookups
#[derive(Clone)]
pub struct TransactionStore {
    store: SharedStore,
    pool: TransactionPool,
}

impl TransactionStore {
    pub fn new(store: SharedStore) -> TransactionStore {
        TransactionStore {
            pool: TransactionPool::new(store.clone()),
            store,
        }
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    pub fn put_confirmed(&self, tx: &Transaction) -> Result<()> {
        self.store
            .put_json(Namespace::Transactions, tx.get_id(), tx)
    }

    pub fn get_confirmed(&self, txid: &str) -> Result<Option<Transaction>> {
        self.store.get_json(Namespace::Transactions, txid)
    }

    pub fn is_confirmed(&self, txid: &str) -> Result<bool> {
        self.store.contains(Namespace::Transactions, txid)
    }

    /// Moves a pooled transaction into the confirmed namespace. The
    /// confirmed copy is written before the pool entry is dropped so the
    /// transaction stays resolvable throughout.
    pub fn confirm(&self, tx: &Transaction) -> Result<()> {
        self.put_confirmed(tx)?;
        self.pool.remove(tx.get_id())?;
        Ok(())
    }

    /// Looks in the confirmed store first, then the pool
    pub fn find(&self, txid: &str) -> Result<Option<(Transaction, TransactionStatus)>> {
        if let Some(tx) = self.get_confirmed(txid)? {
            return Ok(Some((tx, TransactionStatus::Confirmed)));
        }
        Ok(self
            .pool
            .get(txid)?
            .map(|tx| (tx, TransactionStatus::Pending)))
    }

    pub fn get(&self, txid: &str) -> Result<Transaction> {
        self.find(txid)?
            .map(|(tx, _)| tx)
            .ok_or_else(|| LedgerError::TransactionNotFound(txid.to_string()))
    }

    /// The output an outpoint refers to
    pub fn resolve_output(&self, outpoint: &OutPoint) -> Result<TXOutput> {
        let tx = self.get(&outpoint.transaction_id)?;
        tx.get_output(outpoint.vout).cloned().ok_or_else(|| {
            LedgerError::Integrity(format!(
                "Transaction {} has no output {}",
                outpoint.transaction_id, outpoint.vout
            ))
        })
    }
}
