//! Data storage and persistence
//!
//! This module owns everything that touches disk: the namespaced key-value
//! store, the per-address account index, pending and confirmed transaction
//! lookups, and the block files.

pub mod accounts;
pub mod block_file;
pub mod kv_store;
pub mod memory_pool;
pub mod transaction_store;

pub use accounts::{AccountIndex, EMPTY_ACCOUNT};
pub use block_file::{
    ensure_fits_record, record_body_len, BlockFiles, BLOCK_FILE_MAGIC, MAX_RECORD_BODY_LEN,
};
pub use kv_store::{KeyValueStore, Namespace, SharedStore, SledStore, StoreExt};
pub use memory_pool::TransactionPool;
pub use transaction_store::{TransactionStatus, TransactionStore};
