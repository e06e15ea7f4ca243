use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, Ed25519KeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING,
};
use ripemd::{Digest as RipemdDigest, Ripemd160};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

pub const HASH160_LEN: usize = 20;

pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LedgerError::Crypto(format!("System time error: {e}")))?
        .as_millis();

    if duration > i64::MAX as u128 {
        return Err(LedgerError::Crypto("Timestamp overflow".to_string()));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// SHA256(SHA256(data))
pub fn double_sha256(data: &[u8]) -> Vec<u8> {
    sha256_digest(sha256_digest(data).as_slice())
}

pub fn ripemd160_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// RIPEMD160(SHA256(data)), used to identify a public key compactly
pub fn hash160(data: &[u8]) -> Vec<u8> {
    ripemd160_digest(sha256_digest(data).as_slice())
}

/// Key algorithm used when generating a wallet key pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeySpec {
    #[default]
    EcdsaP256,
    Ed25519,
}

impl FromStr for KeySpec {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ecdsa-p256" | "p256" | "ec" => Ok(KeySpec::EcdsaP256),
            "ed25519" => Ok(KeySpec::Ed25519),
            _ => Err(LedgerError::Validation(format!(
                "Unknown key spec {s:?}. Valid options: ecdsa-p256, ed25519"
            ))),
        }
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySpec::EcdsaP256 => write!(f, "ecdsa-p256"),
            KeySpec::Ed25519 => write!(f, "ed25519"),
        }
    }
}

/// Freshly generated key material: PKCS#8 private key and raw public key
pub struct GeneratedKeyPair {
    pub pkcs8: Vec<u8>,
    pub public_key: Vec<u8>,
}

pub fn new_key_pair(spec: KeySpec) -> Result<GeneratedKeyPair> {
    let rng = SystemRandom::new();
    match spec {
        KeySpec::EcdsaP256 => {
            let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
                .map_err(|e| {
                    LedgerError::Crypto(format!("Failed to generate ECDSA key pair: {e}"))
                })?
                .as_ref()
                .to_vec();
            let key_pair =
                EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                    .map_err(|e| {
                        LedgerError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
                    })?;
            let public_key = key_pair.public_key().as_ref().to_vec();
            Ok(GeneratedKeyPair { pkcs8, public_key })
        }
        KeySpec::Ed25519 => {
            let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
                .map_err(|e| {
                    LedgerError::Crypto(format!("Failed to generate Ed25519 key pair: {e}"))
                })?
                .as_ref()
                .to_vec();
            let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).map_err(|e| {
                LedgerError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
            })?;
            let public_key = key_pair.public_key().as_ref().to_vec();
            Ok(GeneratedKeyPair { pkcs8, public_key })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_encoding::HEXLOWER;

    #[test]
    fn test_sha256_known_vector() {
        let digest = sha256_digest(b"abc");
        assert_eq!(
            HEXLOWER.encode(&digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_ripemd160_known_vectors() {
        assert_eq!(
            HEXLOWER.encode(&ripemd160_digest(b"")),
            "9c1185a5c5e9fc54612808977ee8f548b2258d31"
        );
        assert_eq!(
            HEXLOWER.encode(&ripemd160_digest(b"abc")),
            "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"
        );
        assert_eq!(
            HEXLOWER.encode(&ripemd160_digest(
                b"abcdbcdecdefdefgefghfghighijhijkijkljklmklmnlmnomnopnopq"
            )),
            "12a053384a9c0c88e405a06c27dcf49ada62eb2b"
        );
    }

    #[test]
    fn test_hash160_chains_sha256_then_ripemd160() {
        let data = b"public key bytes";
        let expected = ripemd160_digest(&sha256_digest(data));
        assert_eq!(hash160(data), expected);
        assert_eq!(hash160(data).len(), HASH160_LEN);
    }

    #[test]
    fn test_double_sha256_differs_from_single() {
        let data = b"hello";
        assert_ne!(double_sha256(data), sha256_digest(data));
        assert_eq!(double_sha256(data), sha256_digest(&sha256_digest(data)));
    }

    #[test]
    fn test_key_generation_for_each_spec() {
        let ecdsa = new_key_pair(KeySpec::EcdsaP256).unwrap();
        assert_eq!(ecdsa.public_key.len(), 65); // uncompressed P-256 point
        assert!(!ecdsa.pkcs8.is_empty());

        let ed = new_key_pair(KeySpec::Ed25519).unwrap();
        assert_eq!(ed.public_key.len(), 32);
    }

    #[test]
    fn test_key_spec_parsing() {
        assert_eq!("ed25519".parse::<KeySpec>().unwrap(), KeySpec::Ed25519);
        assert_eq!("ECDSA-P256".parse::<KeySpec>().unwrap(), KeySpec::EcdsaP256);
        assert!("rsa".parse::<KeySpec>().is_err());
    }
}
