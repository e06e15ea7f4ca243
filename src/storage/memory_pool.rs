use crate::core::Transaction;
use crate::error::Result;
use crate::storage::{KeyValueStore, Namespace, SharedStore, StoreExt};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Pending transactions, persisted in TRANSACTIONS_POOL
/// ( K -> txid_hex, V => Transaction JSON )
#[derive(Clone)]
pub struct TransactionPool {
    store: SharedStore,
}

impl TransactionPool {
    pub fn new(store: SharedStore) -> TransactionPool {
        TransactionPool { store }
    }

    pub fn get(&self, txid: &str) -> Result<Option<Transaction>> {
        self.store.get_json(Namespace::TransactionsPool, txid)
    }

    pub fn add(&self, tx: &Transaction) -> Result<()> {
        self.store
            .put_json(Namespace::TransactionsPool, tx.get_id(), tx)
    }

    pub fn contains(&self, txid: &str) -> Result<bool> {
        self.store.contains(Namespace::TransactionsPool, txid)
    }

    pub fn remove(&self, txid: &str) -> Result<bool> {
        self.store.delete(Namespace::TransactionsPool, txid)
    }

    pub fn len(&self) -> Result<usize> {
        self.store.len(Namespace::TransactionsPool)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All pooled transactions, oldest first (ties broken by id). A
    /// transaction that spends the output of another pooled transaction is
    /// always placed after it, whatever the timestamps say.
    pub fn get_all(&self) -> Result<Vec<Transaction>> {
        let transactions = self
            .store
            .entries(Namespace::TransactionsPool)?
            .into_iter()
            .map(|(_, bytes)| Transaction::deserialize(&bytes))
            .collect::<Result<Vec<_>>>()?;
        Ok(parents_first(transactions))
    }

    /// Up to `limit` of the oldest pooled transactions
    pub fn oldest(&self, limit: usize) -> Result<Vec<Transaction>> {
        let mut transactions = self.get_all()?;
        transactions.truncate(limit);
        Ok(transactions)
    }
}

// Kahn's algorithm over in-pool parent links; among the transactions whose
// parents are already placed the oldest goes next
fn parents_first(transactions: Vec<Transaction>) -> Vec<Transaction> {
    let mut by_id: HashMap<String, Transaction> = transactions
        .into_iter()
        .map(|tx| (tx.get_id().to_string(), tx))
        .collect();

    let mut waiting_on: HashMap<String, usize> = HashMap::new();
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    let mut ready = BinaryHeap::new();
    for (id, tx) in &by_id {
        let parents: HashSet<&str> = tx
            .get_inputs()
            .iter()
            .map(|input| input.get_transaction_id())
            .filter(|parent| *parent != id.as_str() && by_id.contains_key(*parent))
            .collect();
        if parents.is_empty() {
            ready.push(Reverse((tx.get_timestamp(), id.clone())));
            continue;
        }
        waiting_on.insert(id.clone(), parents.len());
        for parent in parents {
            children
                .entry(parent.to_string())
                .or_default()
                .push(id.clone());
        }
    }

    let mut ordered = Vec::with_capacity(by_id.len());
    while let Some(Reverse((_, id))) = ready.pop() {
        for child in children.remove(&id).unwrap_or_default() {
            if let Some(count) = waiting_on.get_mut(&child) {
                *count -= 1;
                if *count == 0 {
                    waiting_on.remove(&child);
                    if let Some(tx) = by_id.get(&child) {
                        ready.push(Reverse((tx.get_timestamp(), child)));
                    }
                }
            }
        }
        if let Some(tx) = by_id.remove(&id) {
            ordered.push(tx);
        }
    }

    // ids are content hashes so parent links cannot form a cycle; anything
    // left over still goes out in time order
    let mut rest: Vec<Transaction> = by_id.into_values().collect();
    rest.sort_by(|a, b| {
        a.get_timestamp()
            .cmp(&b.get_timestamp())
            .then_with(|| a.get_id().cmp(b.get_id()))
    });
    ordered.extend(rest);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OutPoint, TXInput, TXOutput};
    use crate::storage::SledStore;
    use crate::utils::base58check_encode;
    use std::sync::Arc;

    fn tx_at(timestamp: i64, tag: &str) -> Transaction {
        let to = base58check_encode(0, &[3; 20]);
        Transaction::build(timestamp, vec![], vec![TXOutput::new(5, 0, &to).unwrap()], 0, tag)
            .unwrap()
    }

    #[test]
    fn test_pool_operations() {
        let pool = TransactionPool::new(Arc::new(SledStore::temporary().unwrap()));
        assert!(pool.is_empty().unwrap());

        let tx = tx_at(10, "a");
        pool.add(&tx).unwrap();
        assert!(pool.contains(tx.get_id()).unwrap());
        assert_eq!(pool.get(tx.get_id()).unwrap(), Some(tx.clone()));
        assert_eq!(pool.len().unwrap(), 1);

        assert!(pool.remove(tx.get_id()).unwrap());
        assert!(!pool.remove(tx.get_id()).unwrap());
        assert!(pool.get(tx.get_id()).unwrap().is_none());
    }

    #[test]
    fn test_oldest_first() {
        let pool = TransactionPool::new(Arc::new(SledStore::temporary().unwrap()));
        let newest = tx_at(30, "c");
        let oldest = tx_at(10, "a");
        let middle = tx_at(20, "b");
        for tx in [&newest, &oldest, &middle] {
            pool.add(tx).unwrap();
        }

        let ids: Vec<String> = pool
            .get_all()
            .unwrap()
            .iter()
            .map(|tx| tx.get_id().to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                oldest.get_id().to_string(),
                middle.get_id().to_string(),
                newest.get_id().to_string()
            ]
        );
        assert_eq!(pool.oldest(2).unwrap().len(), 2);
        assert_eq!(pool.oldest(2).unwrap()[0], oldest);
    }

    // A child spending `parent` with the same timestamp and an id between
    // `above` and the parent's, so time-then-id order alone would put it first
    fn same_time_child(parent: &Transaction, above: &str) -> Transaction {
        let to = base58check_encode(0, &[5; 20]);
        (0..)
            .map(|n| {
                let input = TXInput::new(&OutPoint::new(parent.get_id(), 0), "pk");
                Transaction::build(
                    parent.get_timestamp(),
                    vec![input],
                    vec![TXOutput::new(4, 0, &to).unwrap()],
                    1,
                    &format!("child {n}"),
                )
                .unwrap()
            })
            .find(|child| child.get_id() > above && child.get_id() < parent.get_id())
            .unwrap()
    }

    #[test]
    fn test_parents_precede_children_with_equal_timestamps() {
        let pool = TransactionPool::new(Arc::new(SledStore::temporary().unwrap()));
        let parent = (0..)
            .map(|n| tx_at(10, &format!("parent {n}")))
            .find(|tx| tx.get_id() > "8")
            .unwrap();
        let child = same_time_child(&parent, "4");
        let grandchild = same_time_child(&child, "");
        let unrelated = tx_at(11, "later");
        for tx in [&grandchild, &unrelated, &child, &parent] {
            pool.add(tx).unwrap();
        }

        let ordered = pool.get_all().unwrap();
        assert_eq!(
            ordered,
            vec![parent.clone(), child.clone(), grandchild, unrelated]
        );
        assert_eq!(pool.oldest(1).unwrap(), vec![parent]);
    }
}
