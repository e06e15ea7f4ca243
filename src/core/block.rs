use crate::core::merkle::merkle_root_hex;
use crate::core::Transaction;
use crate::error::{LedgerError, Result};
use crate::utils::{current_timestamp, double_sha256};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

/// previousHash recorded by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "";

/// Blocks reference their transactions by id; the transactions themselves
/// live in the TRANSACTIONS namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    hash: String,
    previous_hash: String,
    height: u64,
    timestamp: i64,
    transaction_ids: Vec<String>,
    num_tx: usize,
    merkle_root: String,
    nonce: u64,
    difficulty: u32,
    size: usize,
    weight: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HeaderPreimage<'a> {
    previous_hash: &'a str,
    height: u64,
    timestamp: i64,
    merkle_root: &'a str,
    nonce: u64,
    difficulty: u32,
}

impl Block {
    /// Builds a block over `transactions`, which must start with the coinbase.
    /// The nonce stays 0: there is no proof-of-work search and the hash is
    /// accepted as computed.
    pub fn new_block(
        previous_hash: String,
        transactions: &[Transaction],
        height: u64,
        difficulty: u32,
    ) -> Result<Block> {
        Self::new_block_at(
            current_timestamp()?,
            previous_hash,
            transactions,
            height,
            difficulty,
        )
    }

    pub fn new_block_at(
        timestamp: i64,
        previous_hash: String,
        transactions: &[Transaction],
        height: u64,
        difficulty: u32,
    ) -> Result<Block> {
        match transactions.first() {
            None => {
                return Err(LedgerError::Validation(
                    "Block must contain at least one transaction".to_string(),
                ))
            }
            Some(first) if !first.is_coinbase() => {
                return Err(LedgerError::Validation(
                    "First transaction of a block must be the coinbase".to_string(),
                ))
            }
            Some(_) => {}
        }
        if transactions[1..].iter().any(Transaction::is_coinbase) {
            return Err(LedgerError::Validation(
                "Only the first transaction of a block may be a coinbase".to_string(),
            ));
        }

        let transaction_ids: Vec<String> = transactions
            .iter()
            .map(|tx| tx.get_id().to_string())
            .collect();
        let merkle_root = merkle_root_hex(&transaction_ids)?;

        let mut block = Block {
            hash: String::new(),
            previous_hash,
            height,
            timestamp,
            num_tx: transaction_ids.len(),
            transaction_ids,
            merkle_root,
            nonce: 0,
            difficulty,
            size: 0,
            weight: 0,
        };
        block.hash = block.compute_hash()?;
        block.size = serde_json::to_vec(&block)?.len();
        block.weight = block.size * 4;
        Ok(block)
    }

    pub fn compute_hash(&self) -> Result<String> {
        let header = HeaderPreimage {
            previous_hash: &self.previous_hash,
            height: self.height,
            timestamp: self.timestamp,
            merkle_root: &self.merkle_root,
            nonce: self.nonce,
            difficulty: self.difficulty,
        };
        let bytes = serde_json::to_vec(&header)?;
        Ok(HEXLOWER.encode(&double_sha256(&bytes)))
    }

    /// Checks the stored hash, Merkle root and transaction count against the
    /// block content
    pub fn verify(&self) -> Result<()> {
        if self.num_tx != self.transaction_ids.len() {
            return Err(LedgerError::Integrity(format!(
                "Block {} declares {} transactions but lists {}",
                self.hash,
                self.num_tx,
                self.transaction_ids.len()
            )));
        }
        let merkle_root = merkle_root_hex(&self.transaction_ids)?;
        if merkle_root != self.merkle_root {
            return Err(LedgerError::Integrity(format!(
                "Merkle root mismatch in block {}",
                self.hash
            )));
        }
        let hash = self.compute_hash()?;
        if hash != self.hash {
            return Err(LedgerError::Integrity(format!(
                "Block hash mismatch at height {}: stored {}, computed {hash}",
                self.height, self.hash
            )));
        }
        Ok(())
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_height(&self) -> u64 {
        self.height
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_transaction_ids(&self) -> &[String] {
        self.transaction_ids.as_slice()
    }

    pub fn get_num_tx(&self) -> usize {
        self.num_tx
    }

    pub fn get_merkle_root(&self) -> &str {
        self.merkle_root.as_str()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_size(&self) -> usize {
        self.size
    }

    pub fn get_weight(&self) -> usize {
        self.weight
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        serde_json::from_slice(bytes)
            .map_err(|e| LedgerError::Parse(format!("Malformed block JSON: {e}")))
    }
}
