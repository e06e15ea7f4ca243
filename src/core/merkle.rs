use crate::error::{LedgerError, Result};
use crate::utils::double_sha256;
use data_encoding::HEXLOWER;

/// Hash two values together (double SHA-256 of the concatenation)
pub fn hash_pair(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut combined = Vec::with_capacity(left.len() + right.len());
    combined.extend_from_slice(left);
    combined.extend_from_slice(right);
    double_sha256(&combined)
}

fn next_level(current: &[Vec<u8>]) -> Vec<Vec<u8>> {
    current
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            // odd levels duplicate their last element
            [single] => hash_pair(single, single),
            _ => unreachable!("chunks(2) yields one or two elements"),
        })
        .collect()
}

/// Merkle root of an ordered list of hashes. A single hash is still paired
/// with itself.
pub fn merkle_root(hashes: &[Vec<u8>]) -> Result<Vec<u8>> {
    if hashes.is_empty() {
        return Err(LedgerError::Validation(
            "Cannot calculate Merkle root from empty transaction list".to_string(),
        ));
    }

    let mut current_level = next_level(hashes);
    while current_level.len() > 1 {
        current_level = next_level(&current_level);
    }
    Ok(current_level.swap_remove(0))
}

/// Hex Merkle root of an ordered list of hex transaction ids
pub fn merkle_root_hex(ids: &[String]) -> Result<String> {
    let hashes = ids
        .iter()
        .map(|id| {
            HEXLOWER
                .decode(id.as_bytes())
                .map_err(|e| LedgerError::Parse(format!("Transaction id {id:?} is not hex: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(HEXLOWER.encode(&merkle_root(&hashes)?))
}
