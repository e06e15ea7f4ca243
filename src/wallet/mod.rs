//! Wallet management
//!
//! This module handles wallet creation, key generation, address derivation
//! and balance lookups for local wallets and registered peer addresses.

#[allow(clippy::module_inception)]
pub mod wallet;
pub mod wallets;

pub use wallet::{validate_wallet_name, Wallet, ADDRESS_VERSION, MAX_WALLET_NAME_LEN};
pub use wallets::{WalletInfo, WalletManager, WalletSummary};
