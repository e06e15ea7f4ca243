use crate::core::Block;
use crate::error::{LedgerError, Result};
use data_encoding::BASE64;
use std::fs;
use std::path::{Path, PathBuf};

/// Leading bytes of every block file body
pub const BLOCK_FILE_MAGIC: &[u8; 4] = b"UTXC";

const LENGTH_PREFIX_LEN: usize = 2;

/// Largest body a record can carry behind its 2-byte length
pub const MAX_RECORD_BODY_LEN: usize = u16::MAX as usize;

/// Block files on disk.
///
/// Each file holds one record: a 2-byte big-endian length followed by that
/// many bytes of `UTXC` + Base64(JSON(block)). Files are numbered from 1, so
/// the block at height `h` lives in `blk{h+1:010}.dat`.
#[derive(Debug, Clone)]
pub struct BlockFiles {
    dir: PathBuf,
}

impl BlockFiles {
    pub fn new<P: AsRef<Path>>(dir: P) -> BlockFiles {
        BlockFiles {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(height: u64) -> String {
        format!("blk{:010}.dat", height + 1)
    }

    pub fn path_for_height(&self, height: u64) -> PathBuf {
        self.dir.join(Self::file_name(height))
    }

    /// Writes the block file and returns its path
    pub fn write(&self, block: &Block) -> Result<PathBuf> {
        let record = encode_record(block)?;
        fs::create_dir_all(&self.dir).map_err(|e| {
            LedgerError::Io(format!(
                "Failed to create block directory {}: {e}",
                self.dir.display()
            ))
        })?;
        let path = self.path_for_height(block.get_height());
        fs::write(&path, record)
            .map_err(|e| LedgerError::Io(format!("Failed to write {}: {e}", path.display())))?;
        log::debug!(
            "Wrote block {} at height {} to {}",
            block.get_hash(),
            block.get_height(),
            path.display()
        );
        Ok(path)
    }

    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Block> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LedgerError::BlockNotFound(path.display().to_string())
            } else {
                LedgerError::Io(format!("Failed to read {}: {e}", path.display()))
            }
        })?;
        decode_record(&bytes)
    }

    pub fn read_height(&self, height: u64) -> Result<Block> {
        self.read(self.path_for_height(height))
    }
}

/// Length of the record body (magic plus Base64 JSON) `block` encodes to
pub fn record_body_len(block: &Block) -> Result<usize> {
    let json = block.serialize()?;
    Ok(BLOCK_FILE_MAGIC.len() + BASE64.encode_len(json.len()))
}

/// Fails with `Validation` when `block` does not fit in one record
pub fn ensure_fits_record(block: &Block) -> Result<()> {
    let len = record_body_len(block)?;
    if len > MAX_RECORD_BODY_LEN {
        return Err(LedgerError::Validation(format!(
            "Block {} encodes to {len} bytes, above the {MAX_RECORD_BODY_LEN} byte record limit",
            block.get_hash()
        )));
    }
    Ok(())
}

pub fn encode_record(block: &Block) -> Result<Vec<u8>> {
    ensure_fits_record(block)?;
    let json = block.serialize()?;
    let mut body = BLOCK_FILE_MAGIC.to_vec();
    body.extend_from_slice(BASE64.encode(&json).as_bytes());

    let len = u16::try_from(body.len()).map_err(|_| {
        LedgerError::Validation(format!(
            "Block {} encodes to {} bytes, above the {MAX_RECORD_BODY_LEN} byte record limit",
            block.get_hash(),
            body.len()
        ))
    })?;
    let mut record = Vec::with_capacity(LENGTH_PREFIX_LEN + body.len());
    record.extend_from_slice(&len.to_be_bytes());
    record.extend_from_slice(&body);
    Ok(record)
}

pub fn decode_record(bytes: &[u8]) -> Result<Block> {
    if bytes.len() < LENGTH_PREFIX_LEN {
        return Err(LedgerError::Parse("Block file is truncated".to_string()));
    }
    let len = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
    let body = bytes
        .get(LENGTH_PREFIX_LEN..LENGTH_PREFIX_LEN + len)
        .ok_or_else(|| {
            LedgerError::Parse(format!(
                "Block record declares {len} bytes but only {} follow",
                bytes.len() - LENGTH_PREFIX_LEN
            ))
        })?;
    let encoded = body
        .strip_prefix(BLOCK_FILE_MAGIC.as_slice())
        .ok_or_else(|| LedgerError::Parse("Block file magic mismatch".to_string()))?;
    let json = BASE64
        .decode(encoded)
        .map_err(|e| LedgerError::Parse(format!("Block file body is not Base64: {e}")))?;
    Block::deserialize(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;
    use crate::utils::base58check_encode;

    fn block(height: u64) -> Block {
        let tx = Transaction::new_coinbase_tx(&base58check_encode(0, &[4; 20]), 7, "b").unwrap();
        Block::new_block(String::new(), &[tx], height, 1).unwrap()
    }

    #[test]
    fn test_file_names_are_one_indexed() {
        assert_eq!(BlockFiles::file_name(0), "blk0000000001.dat");
        assert_eq!(BlockFiles::file_name(41), "blk0000000042.dat");
    }

    #[test]
    fn test_record_layout() {
        let block = block(0);
        let record = encode_record(&block).unwrap();
        let len = u16::from_be_bytes([record[0], record[1]]) as usize;
        assert_eq!(len, record.len() - 2);
        assert_eq!(record_body_len(&block).unwrap(), len);
        assert_eq!(&record[2..6], b"UTXC");

        let json = BASE64.decode(&record[6..]).unwrap();
        assert_eq!(Block::deserialize(&json).unwrap(), block);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let files = BlockFiles::new(dir.path().join("blocks"));
        let block = block(3);
        let path = files.write(&block).unwrap();
        assert!(path.ends_with("blk0000000004.dat"));
        assert_eq!(files.read(&path).unwrap(), block);
        assert_eq!(files.read_height(3).unwrap(), block);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let files = BlockFiles::new(dir.path());
        assert!(matches!(
            files.read_height(9),
            Err(LedgerError::BlockNotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_records_rejected() {
        let record = encode_record(&block(0)).unwrap();
        assert!(decode_record(&record[..1]).is_err());
        assert!(decode_record(&record[..record.len() - 1]).is_err());

        let mut bad_magic = record.clone();
        bad_magic[2] = b'X';
        assert!(matches!(decode_record(&bad_magic), Err(LedgerError::Parse(_))));
    }
}
