//! Configuration management
//!
//! Ledger settings: storage location, issuance amounts, pool limits and
//! the wallet bonus policy.

pub mod settings;

pub use settings::Config;
