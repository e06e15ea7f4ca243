// Base58 / Base58Check and hex helpers shared by the wallet and ledger code

use crate::error::{LedgerError, Result};
use crate::utils::crypto::{double_sha256, hash160, HASH160_LEN};

pub const ADDRESS_CHECK_SUM_LEN: usize = 4;

/// version byte + hash160 + checksum
pub const ADDRESS_PAYLOAD_LEN: usize = 1 + HASH160_LEN + ADDRESS_CHECK_SUM_LEN;

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data).into_vec().map_err(|e| match e {
        bs58::decode::Error::InvalidCharacter { character, index } => {
            LedgerError::InvalidCharacter { character, index }
        }
        bs58::decode::Error::NonAsciiCharacter { index } => LedgerError::InvalidCharacter {
            character: data.chars().nth(index).unwrap_or('?'),
            index,
        },
        other => LedgerError::MalformedInput(format!("Invalid base58 encoding: {other}")),
    })
}

/// First four bytes of SHA256(SHA256(payload))
pub fn checksum(payload: &[u8]) -> Vec<u8> {
    double_sha256(payload)[0..ADDRESS_CHECK_SUM_LEN].to_vec()
}

/// Encodes `version ‖ payload ‖ checksum(version ‖ payload)`
pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(1 + payload.len() + ADDRESS_CHECK_SUM_LEN);
    data.push(version);
    data.extend_from_slice(payload);
    let checksum = checksum(data.as_slice());
    data.extend(checksum);
    base58_encode(data.as_slice())
}

/// Inverse of [`base58check_encode`]; returns the version byte and payload
pub fn base58check_decode(encoded: &str) -> Result<(u8, Vec<u8>)> {
    let data = base58_decode(encoded)?;
    if data.len() < 1 + ADDRESS_CHECK_SUM_LEN {
        return Err(LedgerError::InvalidAddress(format!(
            "{encoded}: decoded length {} is too short",
            data.len()
        )));
    }
    let split = data.len() - ADDRESS_CHECK_SUM_LEN;
    let (body, embedded) = data.split_at(split);
    if checksum(body) != embedded {
        return Err(LedgerError::ChecksumMismatch(encoded.to_string()));
    }
    Ok((body[0], body[1..].to_vec()))
}

pub fn derive_address(version: u8, public_key: &[u8]) -> String {
    base58check_encode(version, hash160(public_key).as_slice())
}

/// Decoded view of a P2PKH address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressParts {
    pub version: u8,
    pub hash160: Vec<u8>,
}

/// Checks the layout and checksum of `address`. When `expected_hash160` is
/// given the checksum is recomputed over that value and it must also equal
/// the hash160 embedded in the address.
pub fn validate_address(address: &str, expected_hash160: Option<&[u8]>) -> Result<AddressParts> {
    let payload = base58_decode(address)?;
    if payload.len() != ADDRESS_PAYLOAD_LEN {
        return Err(LedgerError::InvalidAddress(format!(
            "{address}: expected {ADDRESS_PAYLOAD_LEN} decoded bytes, found {}",
            payload.len()
        )));
    }

    let version = payload[0];
    let decoded_hash160 = &payload[1..1 + HASH160_LEN];
    let embedded_checksum = &payload[1 + HASH160_LEN..];

    let hash160 = expected_hash160.unwrap_or(decoded_hash160);
    if hash160.len() != HASH160_LEN {
        return Err(LedgerError::MalformedInput(format!(
            "hash160 must be {HASH160_LEN} bytes, found {}",
            hash160.len()
        )));
    }

    let mut versioned = Vec::with_capacity(1 + HASH160_LEN);
    versioned.push(version);
    versioned.extend_from_slice(hash160);
    if checksum(versioned.as_slice()) != embedded_checksum {
        return Err(LedgerError::ChecksumMismatch(address.to_string()));
    }
    if hash160 != decoded_hash160 {
        return Err(LedgerError::Hash160Mismatch(address.to_string()));
    }

    Ok(AddressParts {
        version,
        hash160: decoded_hash160.to_vec(),
    })
}

/// Parses user-supplied hex, failing with `MalformedInput`
pub fn decode_hex(value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| LedgerError::MalformedInput(format!("Invalid hex {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_base58_known_vectors() {
        assert_eq!(base58_encode(b"hello world"), "StV1DL6CwTryKyV");
        assert_eq!(base58_encode(&[0, 0, 1]), "112");
        assert_eq!(base58_decode("112").unwrap(), vec![0, 0, 1]);
        assert_eq!(base58_encode(&[]), "");
    }

    #[test]
    fn test_base58_round_trip_preserves_leading_zeros() {
        let payloads: Vec<Vec<u8>> = vec![
            vec![0],
            vec![0, 0, 0, 0xff],
            vec![0, 0x61, 0x62],
            (0u8..=255).collect(),
            vec![0xde, 0xad, 0xbe, 0xef],
        ];
        for payload in payloads {
            let encoded = base58_encode(&payload);
            let leading_zeros = payload.iter().take_while(|b| **b == 0).count();
            assert!(encoded.chars().take(leading_zeros).all(|c| c == '1'));
            assert_eq!(base58_decode(&encoded).unwrap(), payload);
        }
    }

    #[test]
    fn test_base58_rejects_characters_outside_alphabet() {
        for bad in ["0abc", "abcO", "Il1", "ab l"] {
            let err = base58_decode(bad).unwrap_err();
            assert!(
                matches!(err, LedgerError::InvalidCharacter { .. }),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn test_known_bitcoin_address_validates() {
        // hash160 of the genesis coinbase public key
        let hash = hex::decode("62e907b15cbf27d5425399ebf6f0fb50ebb88f18").unwrap();
        let address = base58check_encode(0x00, &hash);
        assert_eq!(address, "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa");
        let parts = validate_address(&address, Some(&hash)).unwrap();
        assert_eq!(parts.version, 0);
        assert_eq!(parts.hash160, hash);
    }

    #[test]
    fn test_base58check_round_trip() {
        let payload = vec![7u8; 20];
        let encoded = base58check_encode(0x6f, &payload);
        assert_eq!(base58check_decode(&encoded).unwrap(), (0x6f, payload));
    }

    #[test]
    fn test_validate_address_rejects_wrong_length() {
        let short = base58_encode(&[0, 1, 2, 3, 4, 5, 6]);
        let err = validate_address(&short, None).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAddress(_)));
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn test_validate_address_rejects_other_hash160() {
        let hash = vec![1u8; 20];
        let address = base58check_encode(0x00, &hash);
        let other = vec![2u8; 20];
        let err = validate_address(&address, Some(&other)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn test_decode_hex_reports_malformed_input() {
        assert!(matches!(
            decode_hex("zz").unwrap_err(),
            LedgerError::MalformedInput(_)
        ));
        assert_eq!(decode_hex("00ff").unwrap(), vec![0, 255]);
    }
}
