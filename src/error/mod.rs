//! Error handling for the ledger
//!
//! Every failure is returned to the caller as a typed [`LedgerError`]. The
//! transport layer maps [`LedgerError::kind`] onto its own response
//! categories; the core knows nothing about status codes.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Coarse taxonomy used by callers to decide how to report an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or empty request fields, rejected before any mutation
    Validation,
    /// Missing wallet, transaction, block or address
    NotFound,
    /// Malformed persisted data (store corruption or version skew)
    Parse,
    /// Selection could not meet the requested amount
    InsufficientFunds,
    /// Not enough pooled transactions to assemble a block
    InsufficientPoolSize,
    /// Checksum or hash mismatch on an address or block linkage
    Integrity,
    /// Underlying store or file I/O fault
    Storage,
    /// Key generation or other cryptographic fault
    Crypto,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Generic request validation failure
    Validation(String),
    /// Input had an invalid length or encoding
    MalformedInput(String),
    /// Wallet name violates the allowed character pattern
    InvalidKeyName(String),
    /// A wallet with this name already exists
    DuplicateKeyName(String),
    /// Base58 text contained a symbol outside the alphabet
    InvalidCharacter { character: char, index: usize },
    WalletNotFound(String),
    TransactionNotFound(String),
    BlockNotFound(String),
    /// Neither a local wallet nor a known peer owns this address
    UnknownAddress(String),
    /// Generic missing key in a namespace
    KeyNotFound { namespace: String, key: String },
    /// Persisted value could not be decoded
    Parse(String),
    InsufficientFunds { required: u64, available: u64 },
    InsufficientPoolSize { required: usize, available: usize },
    GenesisAlreadyExists,
    /// Decoded address has the wrong length or layout
    InvalidAddress(String),
    ChecksumMismatch(String),
    Hash160Mismatch(String),
    /// Block linkage, transaction id or balance check failed
    Integrity(String),
    Database(String),
    Io(String),
    Crypto(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_)
            | LedgerError::MalformedInput(_)
            | LedgerError::InvalidKeyName(_)
            | LedgerError::DuplicateKeyName(_)
            | LedgerError::InvalidCharacter { .. }
            | LedgerError::GenesisAlreadyExists => ErrorKind::Validation,
            LedgerError::WalletNotFound(_)
            | LedgerError::TransactionNotFound(_)
            | LedgerError::BlockNotFound(_)
            | LedgerError::UnknownAddress(_)
            | LedgerError::KeyNotFound { .. } => ErrorKind::NotFound,
            LedgerError::Parse(_) => ErrorKind::Parse,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::InsufficientPoolSize { .. } => ErrorKind::InsufficientPoolSize,
            LedgerError::InvalidAddress(_)
            | LedgerError::ChecksumMismatch(_)
            | LedgerError::Hash160Mismatch(_)
            | LedgerError::Integrity(_) => ErrorKind::Integrity,
            LedgerError::Database(_) | LedgerError::Io(_) => ErrorKind::Storage,
            LedgerError::Crypto(_) => ErrorKind::Crypto,
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Validation(msg) => write!(f, "Validation error: {msg}"),
            LedgerError::MalformedInput(msg) => write!(f, "Malformed input: {msg}"),
            LedgerError::InvalidKeyName(name) => write!(f, "Invalid key name: {name:?}"),
            LedgerError::DuplicateKeyName(name) => {
                write!(f, "A key named {name:?} already exists")
            }
            LedgerError::InvalidCharacter { character, index } => {
                write!(f, "Invalid base58 character {character:?} at index {index}")
            }
            LedgerError::WalletNotFound(name) => write!(f, "Wallet not found: {name}"),
            LedgerError::TransactionNotFound(id) => write!(f, "Transaction not found: {id}"),
            LedgerError::BlockNotFound(id) => write!(f, "Block not found: {id}"),
            LedgerError::UnknownAddress(addr) => write!(f, "Unknown address: {addr}"),
            LedgerError::KeyNotFound { namespace, key } => {
                write!(f, "Key {key:?} not found in namespace {namespace}")
            }
            LedgerError::Parse(msg) => write!(f, "Parse error: {msg}"),
            LedgerError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            LedgerError::InsufficientPoolSize {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient pool size: required {required} transactions, available {available}"
                )
            }
            LedgerError::GenesisAlreadyExists => write!(f, "Genesis block already exists"),
            LedgerError::InvalidAddress(msg) => write!(f, "Invalid address: {msg}"),
            LedgerError::ChecksumMismatch(addr) => {
                write!(f, "Address checksum mismatch: {addr}")
            }
            LedgerError::Hash160Mismatch(addr) => {
                write!(f, "Address does not encode the supplied hash160: {addr}")
            }
            LedgerError::Integrity(msg) => write!(f, "Integrity error: {msg}"),
            LedgerError::Database(msg) => write!(f, "Database error: {msg}"),
            LedgerError::Io(msg) => write!(f, "I/O error: {msg}"),
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Io(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_follow_taxonomy() {
        assert_eq!(
            LedgerError::InvalidKeyName("-bad".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LedgerError::UnknownAddress("1abc".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LedgerError::ChecksumMismatch("1abc".to_string()).kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            LedgerError::InsufficientFunds {
                required: 10,
                available: 3
            }
            .kind(),
            ErrorKind::InsufficientFunds
        );
        assert_eq!(
            LedgerError::InsufficientPoolSize {
                required: 2,
                available: 0
            }
            .kind(),
            ErrorKind::InsufficientPoolSize
        );
    }

    #[test]
    fn test_insufficient_funds_reports_shortfall() {
        let err = LedgerError::InsufficientFunds {
            required: 31,
            available: 20,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: required 31, available 20"
        );
    }

    #[test]
    fn test_json_error_maps_to_parse() {
        let err: LedgerError = serde_json::from_str::<u64>("not json").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
