//! Command-line interface
//!
//! This module contains the CLI commands and argument parsing
//! for the ledger binary.

pub mod commands;

pub use commands::{parse_coin_amount, Command, Opt};
