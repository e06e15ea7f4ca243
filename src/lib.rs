//! # utxo-chain
//!
//! A single-node ledger for a toy UTXO-based cryptocurrency. It creates
//! wallets, derives Base58Check addresses, builds and pools transactions,
//! selects unspent outputs to pay for them and mines blocks that link to
//! each other by hash and height.
//!
//! ## Layout
//! - `core/`: transactions, blocks, Merkle roots, UTXO selection, the block
//!   chain and the [`Ledger`] engine
//! - `wallet/`: key generation, address derivation, balances
//! - `storage/`: the namespaced sled store, account index, transaction pool
//!   and block files
//! - `config/`: ledger settings from TOML and the environment
//! - `utils/`: hashing, key pairs and address encoding
//! - `cli/`: command-line parsing for the binary
//!
//! ## Quick start
//! ```no_run
//! use utxo_chain::{Config, KeySpec, Ledger, SelectionAlgorithm};
//!
//! # fn main() -> utxo_chain::Result<()> {
//! let ledger = Ledger::open(Config::default().with_data_dir("data"))?;
//! let alice = ledger.create_wallet("alice", KeySpec::default())?.wallet;
//! let bob = ledger.create_wallet("bob", KeySpec::default())?.wallet;
//! ledger.mine_genesis_block("alice")?;
//! ledger.make_transaction(
//!     alice.get_address(),
//!     bob.get_address(),
//!     30,
//!     Some(1),
//!     SelectionAlgorithm::MeetInTheMiddle,
//!     "first payment",
//! )?;
//! ledger.mine_block("alice")?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    Block, BlockContent, BlockRef, Blockchain, CreatedWallet, Ledger, OutPoint,
    Selection, SelectionAlgorithm, TXInput, TXOutput, Transaction, Utxo,
};
pub use error::{ErrorKind, LedgerError, Result};
pub use storage::{KeyValueStore, Namespace, SharedStore, SledStore};
pub use utils::{
    base58_decode, base58_encode, base58check_decode, base58check_encode, derive_address,
    double_sha256, hash160, sha256_digest, validate_address, KeySpec,
};
pub use wallet::{Wallet, WalletInfo, WalletManager, WalletSummary};
