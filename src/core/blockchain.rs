// The chain itself: block files on disk, indexed by hash in the BLOCKCHAIN
// namespace, with a tip record pointing at the latest block.
// Blocks are appended strictly in height order and never rewritten.

use crate::core::{Block, GENESIS_PREVIOUS_HASH};
use crate::error::{LedgerError, Result};
use crate::storage::{ensure_fits_record, BlockFiles, Namespace, SharedStore, StoreExt};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Key of the tip record; block hashes are 64 hex chars so they never clash
const TIP_BLOCK_HASH_KEY: &str = "tip_block_hash";

/// Hash and height of the latest block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    pub hash: String,
    pub height: u64,
}

#[derive(Clone)]
pub struct Blockchain {
    store: SharedStore,
    files: BlockFiles,
}

impl Blockchain {
    pub fn new(store: SharedStore, files: BlockFiles) -> Blockchain {
        Blockchain { store, files }
    }

    pub fn get_tip(&self) -> Result<Option<ChainTip>> {
        self.store.get_json(Namespace::Blockchain, TIP_BLOCK_HASH_KEY)
    }

    pub fn get_tip_hash(&self) -> Result<Option<String>> {
        Ok(self.get_tip()?.map(|tip| tip.hash))
    }

    pub fn get_best_height(&self) -> Result<Option<u64>> {
        Ok(self.get_tip()?.map(|tip| tip.height))
    }

    pub fn genesis_exists(&self) -> Result<bool> {
        Ok(self.get_tip()?.is_some())
    }

    /// Runs every check `add_block` applies without writing anything.
    ///
    /// The block must pass its own verification, fit in one block file
    /// record and link to the tip: height one above it and previousHash
    /// equal to its hash. The first block must be a genesis block.
    pub fn check_block(&self, block: &Block) -> Result<()> {
        block.verify()?;
        ensure_fits_record(block)?;
        match self.get_tip()? {
            None => {
                if !block.is_genesis() || block.get_previous_hash() != GENESIS_PREVIOUS_HASH {
                    return Err(LedgerError::Integrity(format!(
                        "First block must be a genesis block, got height {}",
                        block.get_height()
                    )));
                }
            }
            Some(tip) => {
                if block.get_height() != tip.height + 1 {
                    return Err(LedgerError::Integrity(format!(
                        "Block height {} does not follow tip height {}",
                        block.get_height(),
                        tip.height
                    )));
                }
                if block.get_previous_hash() != tip.hash {
                    return Err(LedgerError::Integrity(format!(
                        "Block {} does not link to tip {}",
                        block.get_hash(),
                        tip.hash
                    )));
                }
            }
        }
        Ok(())
    }

    /// Appends a block on top of the current tip after [`check_block`]
    ///
    /// [`check_block`]: Blockchain::check_block
    pub fn add_block(&self, block: &Block) -> Result<PathBuf> {
        self.check_block(block)?;

        // the file goes first so the index never points at a missing file
        let path = self.files.write(block)?;
        self.store.put_string(
            Namespace::Blockchain,
            block.get_hash(),
            &path.to_string_lossy(),
        )?;
        self.store.put_json(
            Namespace::Blockchain,
            TIP_BLOCK_HASH_KEY,
            &ChainTip {
                hash: block.get_hash().to_string(),
                height: block.get_height(),
            },
        )?;
        info!(
            "Appended block {} at height {} with {} transactions",
            block.get_hash(),
            block.get_height(),
            block.get_num_tx()
        );
        Ok(path)
    }

    pub fn get_block(&self, block_hash: &str) -> Result<Block> {
        let path = self
            .store
            .get_string(Namespace::Blockchain, block_hash)?
            .filter(|_| block_hash != TIP_BLOCK_HASH_KEY)
            .ok_or_else(|| LedgerError::BlockNotFound(block_hash.to_string()))?;
        let block = self.files.read(&path)?;
        if block.get_hash() != block_hash {
            return Err(LedgerError::Integrity(format!(
                "File {path} holds block {} instead of {block_hash}",
                block.get_hash()
            )));
        }
        Ok(block)
    }

    pub fn get_block_by_height(&self, height: u64) -> Result<Block> {
        match self.get_best_height()? {
            Some(best) if height <= best => {}
            _ => return Err(LedgerError::BlockNotFound(format!("height {height}"))),
        }
        let block = self.files.read_height(height)?;
        if block.get_height() != height {
            return Err(LedgerError::Integrity(format!(
                "Block file for height {height} holds height {}",
                block.get_height()
            )));
        }
        Ok(block)
    }

    pub fn block_exists(&self, block_hash: &str) -> Result<bool> {
        if block_hash == TIP_BLOCK_HASH_KEY {
            return Ok(false);
        }
        Ok(self
            .store
            .get_string(Namespace::Blockchain, block_hash)?
            .is_some())
    }

    /// Walks from the tip back to genesis
    pub fn iterator(&self) -> Result<BlockchainIterator> {
        Ok(BlockchainIterator {
            blockchain: self.clone(),
            current_hash: self.get_tip_hash()?,
        })
    }

    /// Re-reads every block from genesis to the tip and checks heights,
    /// previous-hash links, recomputed hashes and Merkle roots. Returns the
    /// number of blocks verified.
    pub fn verify_chain(&self) -> Result<u64> {
        let tip = match self.get_tip()? {
            Some(tip) => tip,
            None => return Ok(0),
        };

        let mut previous_hash = GENESIS_PREVIOUS_HASH.to_string();
        for height in 0..=tip.height {
            let block = self.get_block_by_height(height)?;
            block.verify()?;
            if block.get_previous_hash() != previous_hash {
                return Err(LedgerError::Integrity(format!(
                    "Block at height {height} links to {} instead of {previous_hash}",
                    block.get_previous_hash()
                )));
            }
            if !self.block_exists(block.get_hash())? {
                return Err(LedgerError::Integrity(format!(
                    "Block {} at height {height} is missing from the hash index",
                    block.get_hash()
                )));
            }
            previous_hash = block.get_hash().to_string();
        }

        if previous_hash != tip.hash {
            return Err(LedgerError::Integrity(format!(
                "Tip record {} does not match the last block {previous_hash}",
                tip.hash
            )));
        }
        Ok(tip.height + 1)
    }
}

pub struct BlockchainIterator {
    blockchain: Blockchain,
    current_hash: Option<String>,
}

impl Iterator for BlockchainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current_hash.take()?;
        match self.blockchain.get_block(&hash) {
            Ok(block) => {
                if !block.is_genesis() {
                    self.current_hash = Some(block.get_previous_hash().to_string());
                }
                Some(Ok(block))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
