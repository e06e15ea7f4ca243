// Transactions follow the UTXO model: inputs reference earlier outputs by
// (transaction id, output index) and outputs lock an amount to a hash160.

use crate::error::{LedgerError, Result};
use crate::utils::{current_timestamp, double_sha256, validate_address};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const P2PKH_SCRIPT_TYPE: &str = "P2PKH";

/// Reference to a single output of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPoint {
    pub transaction_id: String,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(transaction_id: &str, vout: u32) -> OutPoint {
        OutPoint {
            transaction_id: transaction_id.to_string(),
            vout,
        }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transaction_id, self.vout)
    }
}

/// Pay-to-public-key-hash locking script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPubKey {
    pub assembly: String,
    pub hex: String,
    pub address: String,
    #[serde(rename = "type")]
    pub script_type: String,
}

impl ScriptPubKey {
    pub fn p2pkh(address: &str) -> Result<ScriptPubKey> {
        let parts = validate_address(address, None)?;
        let hash_hex = HEXLOWER.encode(&parts.hash160);
        Ok(ScriptPubKey {
            assembly: format!("OP_DUP OP_HASH160 {hash_hex} OP_EQUALVERIFY OP_CHECKSIG"),
            // OP_DUP OP_HASH160 PUSH20 <hash> OP_EQUALVERIFY OP_CHECKSIG
            hex: format!("76a914{hash_hex}88ac"),
            address: address.to_string(),
            script_type: P2PKH_SCRIPT_TYPE.to_string(),
        })
    }

    pub fn pub_key_hash_hex(&self) -> Option<&str> {
        self.hex
            .strip_prefix("76a914")
            .and_then(|rest| rest.strip_suffix("88ac"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TXInput {
    transaction_id: String,
    vout: u32,
    /// Spender's public key (hex). Nothing is signed.
    script_signature: String,
}

impl TXInput {
    pub fn new(outpoint: &OutPoint, script_signature: &str) -> TXInput {
        TXInput {
            transaction_id: outpoint.transaction_id.clone(),
            vout: outpoint.vout,
            script_signature: script_signature.to_string(),
        }
    }

    pub fn get_transaction_id(&self) -> &str {
        self.transaction_id.as_str()
    }

    pub fn get_vout(&self) -> u32 {
        self.vout
    }

    pub fn get_script_signature(&self) -> &str {
        self.script_signature.as_str()
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(&self.transaction_id, self.vout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TXOutput {
    amount: u64,
    n: u32,
    script_pub_key: ScriptPubKey,
}

impl TXOutput {
    pub fn new(amount: u64, n: u32, address: &str) -> Result<TXOutput> {
        if amount == 0 {
            return Err(LedgerError::Validation(
                "Output amount must be positive".to_string(),
            ));
        }
        Ok(TXOutput {
            amount,
            n,
            script_pub_key: ScriptPubKey::p2pkh(address)?,
        })
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_n(&self) -> u32 {
        self.n
    }

    pub fn get_address(&self) -> &str {
        self.script_pub_key.address.as_str()
    }

    pub fn get_script_pub_key(&self) -> &ScriptPubKey {
        &self.script_pub_key
    }

    pub fn is_locked_to(&self, address: &str) -> bool {
        self.script_pub_key.address == address
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: String,
    hash: String,
    timestamp: i64,
    inputs: Vec<TXInput>,
    outputs: Vec<TXOutput>,
    fee: u64,
    #[serde(default)]
    message: String,
    size: usize,
    weight: usize,
}

// Fields covered by the transaction id: outpoints only, no script signatures
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdPreimage<'a> {
    timestamp: i64,
    inputs: Vec<OutPoint>,
    outputs: &'a [TXOutput],
    fee: u64,
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashPreimage<'a> {
    timestamp: i64,
    inputs: &'a [TXInput],
    outputs: &'a [TXOutput],
    fee: u64,
    message: &'a str,
}

impl Transaction {
    /// Block reward: no inputs, a single output
    pub fn new_coinbase_tx(to: &str, reward: u64, message: &str) -> Result<Transaction> {
        let output = TXOutput::new(reward, 0, to)?;
        Self::build(current_timestamp()?, vec![], vec![output], 0, message)
    }

    pub fn new(
        inputs: Vec<TXInput>,
        outputs: Vec<TXOutput>,
        fee: u64,
        message: &str,
    ) -> Result<Transaction> {
        if inputs.is_empty() {
            return Err(LedgerError::Validation(
                "A spend must reference at least one input".to_string(),
            ));
        }
        Self::build(current_timestamp()?, inputs, outputs, fee, message)
    }

    pub fn build(
        timestamp: i64,
        inputs: Vec<TXInput>,
        outputs: Vec<TXOutput>,
        fee: u64,
        message: &str,
    ) -> Result<Transaction> {
        if outputs.is_empty() {
            return Err(LedgerError::Validation(
                "Transaction must have at least one output".to_string(),
            ));
        }
        for (idx, output) in outputs.iter().enumerate() {
            if output.n as usize != idx {
                return Err(LedgerError::Validation(format!(
                    "Output at position {idx} is numbered {}",
                    output.n
                )));
            }
        }

        let mut tx = Transaction {
            id: String::new(),
            hash: String::new(),
            timestamp,
            inputs,
            outputs,
            fee,
            message: message.to_string(),
            size: 0,
            weight: 0,
        };

        let id_bytes = tx.id_preimage()?;
        let hash_bytes = tx.hash_preimage()?;
        tx.id = HEXLOWER.encode(&double_sha256(&id_bytes));
        tx.hash = HEXLOWER.encode(&double_sha256(&hash_bytes));
        tx.size = hash_bytes.len();
        // Same accounting as segwit: base bytes weigh 4, script data weighs 1
        tx.weight = id_bytes.len() * 3 + hash_bytes.len();
        Ok(tx)
    }

    fn id_preimage(&self) -> Result<Vec<u8>> {
        let preimage = IdPreimage {
            timestamp: self.timestamp,
            inputs: self.inputs.iter().map(TXInput::outpoint).collect(),
            outputs: &self.outputs,
            fee: self.fee,
            message: &self.message,
        };
        Ok(serde_json::to_vec(&preimage)?)
    }

    fn hash_preimage(&self) -> Result<Vec<u8>> {
        let preimage = HashPreimage {
            timestamp: self.timestamp,
            inputs: &self.inputs,
            outputs: &self.outputs,
            fee: self.fee,
            message: &self.message,
        };
        Ok(serde_json::to_vec(&preimage)?)
    }

    /// Recomputes id and hash from the content and compares them with the
    /// stored values
    pub fn verify_integrity(&self) -> Result<()> {
        let id = HEXLOWER.encode(&double_sha256(&self.id_preimage()?));
        if id != self.id {
            return Err(LedgerError::Integrity(format!(
                "Transaction id {} does not match its content ({id})",
                self.id
            )));
        }
        let hash = HEXLOWER.encode(&double_sha256(&self.hash_preimage()?));
        if hash != self.hash {
            return Err(LedgerError::Integrity(format!(
                "Transaction hash mismatch for {}",
                self.id
            )));
        }
        Ok(())
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty() && self.outputs.len() == 1
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_inputs(&self) -> &[TXInput] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[TXOutput] {
        self.outputs.as_slice()
    }

    pub fn get_output(&self, vout: u32) -> Option<&TXOutput> {
        self.outputs.get(vout as usize)
    }

    pub fn get_fee(&self) -> u64 {
        self.fee
    }

    pub fn get_message(&self) -> &str {
        self.message.as_str()
    }

    pub fn get_size(&self) -> usize {
        self.size
    }

    pub fn get_weight(&self) -> usize {
        self.weight
    }

    pub fn get_output_value(&self) -> Result<u64> {
        let mut total = 0u64;
        for output in &self.outputs {
            total = total
                .checked_add(output.get_amount())
                .ok_or_else(|| LedgerError::Integrity("Output value overflow".to_string()))?;
        }
        Ok(total)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        serde_json::from_slice(bytes)
            .map_err(|e| LedgerError::Parse(format!("Malformed transaction JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::base58check_encode;

    fn address(byte: u8) -> String {
        base58check_encode(0x00, &[byte; 20])
    }

    #[test]
    fn test_coinbase_shape() {
        let tx = Transaction::new_coinbase_tx(&address(1), 100, "reward").unwrap();
        assert!(tx.is_coinbase());
        assert_eq!(tx.get_inputs().len(), 0);
        assert_eq!(tx.get_outputs().len(), 1);
        assert_eq!(tx.get_outputs()[0].get_amount(), 100);
        assert_eq!(tx.get_fee(), 0);
        assert_eq!(tx.get_id().len(), 64);
    }

    #[test]
    fn test_p2pkh_script() {
        let output = TXOutput::new(5, 0, &address(0xab)).unwrap();
        let script = output.get_script_pub_key();
        assert_eq!(script.script_type, "P2PKH");
        assert_eq!(script.hex, format!("76a914{}88ac", "ab".repeat(20)));
        assert_eq!(script.pub_key_hash_hex(), Some("ab".repeat(20).as_str()));
        assert!(script.assembly.starts_with("OP_DUP OP_HASH160 abab"));
        assert!(output.is_locked_to(&address(0xab)));
    }

    #[test]
    fn test_zero_amount_output_rejected() {
        assert!(TXOutput::new(0, 0, &address(1)).is_err());
    }

    #[test]
    fn test_output_to_invalid_address_rejected() {
        assert!(TXOutput::new(1, 0, "not-an-address").is_err());
    }

    #[test]
    fn test_id_is_deterministic_and_content_bound() {
        let outputs = vec![TXOutput::new(30, 0, &address(2)).unwrap()];
        let inputs = vec![TXInput::new(&OutPoint::new(&"aa".repeat(32), 0), "pk")];
        let a = Transaction::build(1_000, inputs.clone(), outputs.clone(), 1, "").unwrap();
        let b = Transaction::build(1_000, inputs.clone(), outputs.clone(), 1, "").unwrap();
        assert_eq!(a.get_id(), b.get_id());

        let c = Transaction::build(1_000, inputs, outputs, 2, "").unwrap();
        assert_ne!(a.get_id(), c.get_id());
    }

    #[test]
    fn test_script_signature_changes_hash_not_id() {
        let outputs = vec![TXOutput::new(30, 0, &address(2)).unwrap()];
        let outpoint = OutPoint::new(&"aa".repeat(32), 1);
        let a = Transaction::build(
            7,
            vec![TXInput::new(&outpoint, "key-a")],
            outputs.clone(),
            0,
            "",
        )
        .unwrap();
        let b = Transaction::build(7, vec![TXInput::new(&outpoint, "key-b")], outputs, 0, "")
            .unwrap();
        assert_eq!(a.get_id(), b.get_id());
        assert_ne!(a.get_hash(), b.get_hash());
        assert!(a.get_weight() > a.get_size());
    }

    #[test]
    fn test_outputs_must_be_numbered_in_order() {
        let outputs = vec![TXOutput::new(30, 1, &address(2)).unwrap()];
        assert!(Transaction::build(1, vec![], outputs, 0, "").is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_integrity() {
        let tx = Transaction::new_coinbase_tx(&address(3), 50, "hello").unwrap();
        let bytes = tx.serialize().unwrap();
        let json = String::from_utf8(bytes.clone()).unwrap();
        assert!(json.contains("\"scriptPubKey\""));
        assert!(json.contains("\"type\":\"P2PKH\""));

        let decoded = Transaction::deserialize(&bytes).unwrap();
        assert_eq!(decoded, tx);
        decoded.verify_integrity().unwrap();
    }

    #[test]
    fn test_tampered_transaction_fails_integrity() {
        let tx = Transaction::new_coinbase_tx(&address(3), 50, "").unwrap();
        let json = String::from_utf8(tx.serialize().unwrap())
            .unwrap()
            .replace("\"amount\":50", "\"amount\":5000");
        let tampered = Transaction::deserialize(json.as_bytes()).unwrap();
        assert!(matches!(
            tampered.verify_integrity(),
            Err(LedgerError::Integrity(_))
        ));
    }
}
