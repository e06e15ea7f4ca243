use crate::core::OutPoint;
use crate::error::{LedgerError, Result};
use crate::storage::{KeyValueStore, Namespace, SharedStore, StoreExt};

/// Stored value for an address with no spendable outputs
pub const EMPTY_ACCOUNT: &str = "EMPTY";

const ENTRY_SEPARATOR: char = ';';
const FIELD_SEPARATOR: char = ',';

/// Per-address index of unspent outpoints, kept in the ACCOUNTS namespace.
///
/// Values are either `EMPTY` or `txid,vout;txid,vout;...` in insertion order.
/// Read-modify-write cycles are not atomic; callers hold the address lock.
#[derive(Clone)]
pub struct AccountIndex {
    store: SharedStore,
}

impl AccountIndex {
    pub fn new(store: SharedStore) -> AccountIndex {
        AccountIndex { store }
    }

    pub fn init_empty(&self, address: &str) -> Result<()> {
        self.store
            .put_string(Namespace::Accounts, address, EMPTY_ACCOUNT)
    }

    pub fn exists(&self, address: &str) -> Result<bool> {
        self.store.contains(Namespace::Accounts, address)
    }

    /// Unspent outpoints of `address`. An address never seen is empty.
    pub fn outpoints(&self, address: &str) -> Result<Vec<OutPoint>> {
        match self.store.get_string(Namespace::Accounts, address)? {
            Some(value) => decode_outpoints(&value),
            None => Ok(vec![]),
        }
    }

    pub fn append(&self, address: &str, new_outpoints: &[OutPoint]) -> Result<()> {
        if new_outpoints.is_empty() {
            return Ok(());
        }
        let mut outpoints = self.outpoints(address)?;
        for outpoint in new_outpoints {
            if !outpoints.contains(outpoint) {
                outpoints.push(outpoint.clone());
            }
        }
        self.write(address, &outpoints)
    }

    /// Removes consumed outpoints. Fails without writing if any of them is
    /// not currently listed, so an outpoint can only be consumed once.
    pub fn remove_outpoints(&self, address: &str, consumed: &[OutPoint]) -> Result<()> {
        let mut outpoints = self.outpoints(address)?;
        for outpoint in consumed {
            match outpoints.iter().position(|o| o == outpoint) {
                Some(idx) => {
                    outpoints.remove(idx);
                }
                None => {
                    return Err(LedgerError::Integrity(format!(
                        "Outpoint {outpoint} is not unspent for {address}"
                    )))
                }
            }
        }
        self.write(address, &outpoints)
    }

    pub fn delete(&self, address: &str) -> Result<bool> {
        self.store.delete(Namespace::Accounts, address)
    }

    fn write(&self, address: &str, outpoints: &[OutPoint]) -> Result<()> {
        self.store
            .put_string(Namespace::Accounts, address, &encode_outpoints(outpoints))
    }
}

pub fn encode_outpoints(outpoints: &[OutPoint]) -> String {
    if outpoints.is_empty() {
        return EMPTY_ACCOUNT.to_string();
    }
    outpoints
        .iter()
        .map(|o| format!("{}{FIELD_SEPARATOR}{}", o.transaction_id, o.vout))
        .collect::<Vec<_>>()
        .join(&ENTRY_SEPARATOR.to_string())
}

pub fn decode_outpoints(value: &str) -> Result<Vec<OutPoint>> {
    if value == EMPTY_ACCOUNT || value.is_empty() {
        return Ok(vec![]);
    }
    value
        .split(ENTRY_SEPARATOR)
        .map(|entry| {
            let (txid, vout) = entry.split_once(FIELD_SEPARATOR).ok_or_else(|| {
                LedgerError::Parse(format!("Malformed account entry {entry:?}"))
            })?;
            let vout = vout.parse::<u32>().map_err(|e| {
                LedgerError::Parse(format!("Malformed vout in account entry {entry:?}: {e}"))
            })?;
            Ok(OutPoint::new(txid, vout))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SledStore;
    use std::sync::Arc;

    fn index() -> AccountIndex {
        AccountIndex::new(Arc::new(SledStore::temporary().unwrap()))
    }

    #[test]
    fn test_encoding() {
        assert_eq!(encode_outpoints(&[]), "EMPTY");
        let outpoints = vec![OutPoint::new("aa", 0), OutPoint::new("bb", 3)];
        let encoded = encode_outpoints(&outpoints);
        assert_eq!(encoded, "aa,0;bb,3");
        assert_eq!(decode_outpoints(&encoded).unwrap(), outpoints);
        assert!(decode_outpoints("EMPTY").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_entries() {
        assert!(matches!(
            decode_outpoints("aa"),
            Err(LedgerError::Parse(_))
        ));
        assert!(matches!(
            decode_outpoints("aa,x"),
            Err(LedgerError::Parse(_))
        ));
    }

    #[test]
    fn test_append_and_remove() {
        let index = index();
        index.init_empty("addr").unwrap();
        assert!(index.exists("addr").unwrap());
        assert!(index.outpoints("addr").unwrap().is_empty());

        let a = OutPoint::new("aa", 0);
        let b = OutPoint::new("bb", 1);
        index.append("addr", &[a.clone(), b.clone()]).unwrap();
        index.append("addr", &[a.clone()]).unwrap();
        assert_eq!(index.outpoints("addr").unwrap(), vec![a.clone(), b.clone()]);

        index.remove_outpoints("addr", &[a.clone()]).unwrap();
        assert_eq!(index.outpoints("addr").unwrap(), vec![b.clone()]);

        index.remove_outpoints("addr", &[b]).unwrap();
        assert!(index.outpoints("addr").unwrap().is_empty());
    }

    #[test]
    fn test_outpoint_removed_only_once() {
        let index = index();
        let a = OutPoint::new("aa", 0);
        let b = OutPoint::new("bb", 0);
        index.append("addr", &[a.clone(), b.clone()]).unwrap();
        index.remove_outpoints("addr", &[a.clone()]).unwrap();

        let err = index.remove_outpoints("addr", &[b.clone(), a]).unwrap_err();
        assert!(matches!(err, LedgerError::Integrity(_)));
        // nothing written on failure
        assert_eq!(index.outpoints("addr").unwrap(), vec![b]);
    }

    #[test]
    fn test_unknown_address_is_empty() {
        let index = index();
        assert!(!index.exists("nobody").unwrap());
        assert!(index.outpoints("nobody").unwrap().is_empty());
    }
}
