//! Helpers for in-crate tests
//!
//! Isolated ledgers over temporary directories and chain checks used by the
//! unit tests of several modules.

pub mod test_utils;

pub use test_utils::*;
