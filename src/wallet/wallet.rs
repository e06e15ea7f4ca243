use crate::error::{LedgerError, Result};
use crate::utils::{base58check_encode, hash160, new_key_pair, KeySpec};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

/// Version byte of P2PKH addresses
pub const ADDRESS_VERSION: u8 = 0x00;
pub const MAX_WALLET_NAME_LEN: usize = 64;

/// A named key pair and the address derived from it.
///
/// Key material is hex encoded; the private key is the PKCS#8 document
/// produced by `ring`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    name: String,
    public_key: String,
    private_key: String,
    hash160: String,
    address: String,
    #[serde(default)]
    key_spec: KeySpec,
}

impl Wallet {
    pub fn new(name: &str, key_spec: KeySpec, version: u8) -> Result<Wallet> {
        validate_wallet_name(name)?;
        let key_pair = new_key_pair(key_spec)?;
        let pub_key_hash = hash160(key_pair.public_key.as_slice());
        let address = base58check_encode(version, pub_key_hash.as_slice());
        Ok(Wallet {
            name: name.to_string(),
            public_key: HEXLOWER.encode(&key_pair.public_key),
            private_key: HEXLOWER.encode(&key_pair.pkcs8),
            hash160: HEXLOWER.encode(&pub_key_hash),
            address,
            key_spec,
        })
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn get_public_key(&self) -> &str {
        self.public_key.as_str()
    }

    pub fn get_private_key(&self) -> &str {
        self.private_key.as_str()
    }

    pub fn get_hash160(&self) -> &str {
        self.hash160.as_str()
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    pub fn get_key_spec(&self) -> KeySpec {
        self.key_spec
    }
}

/// Letters, digits and dashes; no leading or trailing dash; 1..=64 chars
pub fn validate_wallet_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_WALLET_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');
    if !valid {
        return Err(LedgerError::InvalidKeyName(name.to_string()));
    }
    Ok(())
}
