//! Core ledger functionality
//!
//! This module contains the ledger data model (transactions, blocks, Merkle
//! roots), the chain of persisted blocks, UTXO selection and the [`Ledger`]
//! engine that ties them together.

pub mod block;
pub mod blockchain;
pub mod ledger;
pub mod merkle;
pub mod monetary;
pub mod selection;
pub mod transaction;

pub use block::{Block, GENESIS_PREVIOUS_HASH};
pub use blockchain::{Blockchain, BlockchainIterator, ChainTip};
pub use ledger::{split_amount, BlockContent, BlockRef, CreatedWallet, Ledger};
pub use merkle::{merkle_root, merkle_root_hex};
pub use monetary::{
    format_amount, parse_amount, DEFAULT_BLOCK_REWARD, DEFAULT_TRANSACTION_FEE, UNITS_PER_COIN,
};
pub use selection::{select_utxos, Selection, SelectionAlgorithm, Utxo};
pub use transaction::{OutPoint, ScriptPubKey, TXInput, TXOutput, Transaction, P2PKH_SCRIPT_TYPE};
