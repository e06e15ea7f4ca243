//! Utility functions and helpers
//!
//! Hashing, key generation and the Base58Check address encoding used
//! throughout the ledger.

pub mod crypto;
pub mod encoding;

pub use crypto::{
    current_timestamp, double_sha256, hash160, new_key_pair, ripemd160_digest, sha256_digest,
    GeneratedKeyPair, KeySpec, HASH160_LEN,
};

pub use encoding::{
    base58_decode, base58_encode, base58check_decode, base58check_encode, checksum, decode_hex,
    derive_address, validate_address, AddressParts, ADDRESS_CHECK_SUM_LEN,
    ADDRESS_PAYLOAD_LEN,
};
