//! Transaction input referencing a previous output.
//!
//! Contains the previous transaction id, output index, unlocking script,
//! sequence number and a write-once cache of the output being spent.
//! Provides binary serialization/deserialization following the Bitcoin
//! wire format.

use std::sync::OnceLock;

use tracing::debug;

use forkchain_primitives::util::{WireReader, WireWriter};
use forkchain_script::Script;

use crate::error::malformed;
use crate::output::TransactionOutput;
use crate::resolver::UtxoResolver;
use crate::TransactionError;

/// Default sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// Output index carried by the coinbase marker input.
pub const COINBASE_OUTPUT_INDEX: u32 = 0xFFFF_FFFF;

/// A single input in a transaction.
///
/// `prev_tx_id` is kept in display order, the order ids are printed and
/// looked up in. The wire encoding carries it byte-reversed.
///
/// The spent output is resolved at most once and then cached for the
/// lifetime of the input. Concurrent first resolutions may both call the
/// resolver, but only one result is stored and every later read sees it.
///
/// # Wire format
///
/// | Field              | Size                     |
/// |--------------------|--------------------------|
/// | prev_tx_id         | 32 bytes (reversed)      |
/// | prev_output_index  | 4 bytes (LE)             |
/// | script length      | VarInt                   |
/// | unlocking_script   | variable                 |
/// | sequence           | 4 bytes (LE)             |
#[derive(Clone, Debug)]
pub struct TransactionInput {
    /// Id of the transaction holding the spent output, display order.
    pub prev_tx_id: [u8; 32],

    /// Index of the output within the previous transaction.
    pub prev_output_index: u32,

    /// The unlocking script; empty until the input is signed.
    pub unlocking_script: Script,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence: u32,

    resolved: OnceLock<TransactionOutput>,
}

impl TransactionInput {
    /// Create an unsigned input spending `prev_tx_id:prev_output_index`.
    pub fn new(prev_tx_id: [u8; 32], prev_output_index: u32) -> Self {
        TransactionInput {
            prev_tx_id,
            prev_output_index,
            unlocking_script: Script::new(),
            sequence: DEFAULT_SEQUENCE_NUMBER,
            resolved: OnceLock::new(),
        }
    }

    /// Create an input from a display-order hex id.
    pub fn from_prev_hex(prev_tx_id: &str, prev_output_index: u32) -> Result<Self, TransactionError> {
        let bytes = hex::decode(prev_tx_id)
            .map_err(|e| TransactionError::MalformedTransaction(format!("invalid txid hex: {}", e)))?;
        let id: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            TransactionError::MalformedTransaction(format!("txid is {} bytes", bytes.len()))
        })?;
        Ok(TransactionInput::new(id, prev_output_index))
    }

    /// Deserialize a `TransactionInput` from a `WireReader`.
    ///
    /// # Returns
    /// The input, or `MalformedTransaction` if the data is truncated or the
    /// script length runs past the end.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let mut prev_tx_id: [u8; 32] = reader.read_array().map_err(malformed("previous txid"))?;
        prev_tx_id.reverse();
        let prev_output_index = reader.read_u32_le().map_err(malformed("output index"))?;
        let script_bytes = reader.read_var_bytes().map_err(malformed("unlocking script"))?;
        let sequence = reader.read_u32_le().map_err(malformed("sequence number"))?;

        Ok(TransactionInput {
            prev_tx_id,
            prev_output_index,
            unlocking_script: Script::from_bytes(script_bytes),
            sequence,
            resolved: OnceLock::new(),
        })
    }

    /// Serialize this input into a `WireWriter`.
    pub fn write_to(&self, writer: &mut WireWriter) {
        self.write_outpoint(writer);
        writer.write_var_bytes(self.unlocking_script.to_bytes());
        writer.write_u32_le(self.sequence);
    }

    /// Write the 36-byte outpoint: wire-order txid then the output index.
    pub fn write_outpoint(&self, writer: &mut WireWriter) {
        let mut wire_id = self.prev_tx_id;
        wire_id.reverse();
        writer.write_bytes(&wire_id);
        writer.write_u32_le(self.prev_output_index);
    }

    pub fn prev_tx_id_hex(&self) -> String {
        hex::encode(self.prev_tx_id)
    }

    /// All-zero previous id with output index `0xFFFFFFFF`.
    pub fn is_coinbase_marker(&self) -> bool {
        self.prev_tx_id == [0u8; 32] && self.prev_output_index == COINBASE_OUTPUT_INDEX
    }

    /// Seed the cache with the spent output.
    ///
    /// # Returns
    /// `false` if the cache already held an output; the existing value is
    /// kept.
    pub fn set_resolved_output(&self, output: TransactionOutput) -> bool {
        self.resolved.set(output).is_ok()
    }

    /// The cached spent output, if resolution already happened.
    pub fn resolved_output(&self) -> Option<&TransactionOutput> {
        self.resolved.get()
    }

    /// The spent output, resolving it through `resolver` on first use.
    ///
    /// # Returns
    /// The cached output, or `MissingUtxoData` when the resolver fails.
    pub fn resolve(&self, resolver: &dyn UtxoResolver) -> Result<&TransactionOutput, TransactionError> {
        if let Some(output) = self.resolved.get() {
            debug!(prev = %self.prev_tx_id_hex(), index = self.prev_output_index, "utxo cache hit");
            return Ok(output);
        }
        debug!(prev = %self.prev_tx_id_hex(), index = self.prev_output_index, "resolving utxo");
        let output = resolver
            .resolve(&self.prev_tx_id, self.prev_output_index)
            .map_err(|e| match e {
                TransactionError::MissingUtxoData(_) => e,
                other => TransactionError::MissingUtxoData(format!(
                    "{}:{}: {}",
                    self.prev_tx_id_hex(),
                    self.prev_output_index,
                    other
                )),
            })?;
        Ok(self.resolved.get_or_init(|| output))
    }

    /// The signature of a standard unlocking script, split into the DER
    /// bytes and the trailing hash type byte.
    pub fn der_signature(&self) -> Result<(Vec<u8>, u8), TransactionError> {
        let pushes = self.unlocking_script.push_datas()?;
        match pushes.first().and_then(|sig| sig.split_last()) {
            Some((&hash_type, der)) => Ok((der.to_vec(), hash_type)),
            None => Err(TransactionError::InvalidScript(
                "unlocking script has no signature push".to_string(),
            )),
        }
    }

    /// The SEC-encoded public key of a standard unlocking script.
    pub fn sec_pubkey(&self) -> Result<Vec<u8>, TransactionError> {
        let mut pushes = self.unlocking_script.push_datas()?;
        if pushes.len() < 2 {
            return Err(TransactionError::InvalidScript(
                "unlocking script has no public key push".to_string(),
            ));
        }
        Ok(pushes.swap_remove(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MemoryResolver;

    const INPUT_HEX: &str = "813f79011acb80925dfe69b3def355fe914bd1d96a3f5f71bf8303c6a989c7d1000000006b483045022100ed81ff192e75a3fd2304004dcadb746fa5e24c5031ccfcf21320b0277457c98f02207a986d955c6e0cb35d446a89d3f56100f4d7f67801c31967743a9c8e10615bed01210349fc4e631e3624a545de3f89f5d8684c7b8138bd94bdd531d2e213bf016b278afeffffff";
    const PREV_ID: &str = "d1c789a9c60383bf715f3f6ad9d14b91fe55f3deb369fe5d9280cb1a01793f81";

    fn input() -> TransactionInput {
        let bytes = hex::decode(INPUT_HEX).unwrap();
        TransactionInput::read_from(&mut WireReader::new(&bytes)).unwrap()
    }

    #[test]
    fn test_read_reverses_prev_id() {
        let input = input();
        assert_eq!(input.prev_tx_id_hex(), PREV_ID);
        assert_eq!(input.prev_output_index, 0);
        assert_eq!(input.sequence, 0xfffffffe);

        let mut writer = WireWriter::new();
        input.write_to(&mut writer);
        assert_eq!(hex::encode(writer.into_bytes()), INPUT_HEX);
    }

    #[test]
    fn test_signature_and_pubkey_accessors() {
        let input = input();
        let (der, hash_type) = input.der_signature().unwrap();
        assert_eq!(hash_type, 0x01);
        assert_eq!(der.len(), 0x47);
        assert_eq!(der[0], 0x30);
        assert_eq!(
            hex::encode(input.sec_pubkey().unwrap()),
            "0349fc4e631e3624a545de3f89f5d8684c7b8138bd94bdd531d2e213bf016b278a"
        );

        let unsigned = TransactionInput::new([0u8; 32], 0);
        assert!(matches!(unsigned.der_signature(), Err(TransactionError::InvalidScript(_))));
        assert!(matches!(unsigned.sec_pubkey(), Err(TransactionError::InvalidScript(_))));
    }

    #[test]
    fn test_coinbase_marker() {
        assert!(TransactionInput::new([0u8; 32], COINBASE_OUTPUT_INDEX).is_coinbase_marker());
        assert!(!TransactionInput::new([0u8; 32], 0).is_coinbase_marker());
        assert!(!TransactionInput::new([1u8; 32], COINBASE_OUTPUT_INDEX).is_coinbase_marker());
    }

    #[test]
    fn test_resolve_caches_first_result() {
        let input = TransactionInput::from_prev_hex(PREV_ID, 0).unwrap();
        let empty = MemoryResolver::new();
        assert!(matches!(input.resolve(&empty), Err(TransactionError::MissingUtxoData(_))));
        assert!(input.resolved_output().is_none());

        let mut resolver = MemoryResolver::new();
        resolver.insert(input.prev_tx_id, 0, TransactionOutput::new(42, Script::new()));
        assert_eq!(input.resolve(&resolver).unwrap().amount, 42);

        // Cached: an empty resolver no longer matters and seeding is refused.
        assert_eq!(input.resolve(&empty).unwrap().amount, 42);
        assert!(!input.set_resolved_output(TransactionOutput::new(7, Script::new())));
        assert_eq!(input.resolved_output().unwrap().amount, 42);
    }

    #[test]
    fn test_seeded_output_skips_resolver() {
        let input = TransactionInput::from_prev_hex(PREV_ID, 3).unwrap();
        assert!(input.set_resolved_output(TransactionOutput::new(9, Script::new())));
        assert_eq!(input.resolve(&MemoryResolver::new()).unwrap().amount, 9);
    }

    #[test]
    fn test_from_prev_hex_rejects_bad_ids() {
        assert!(TransactionInput::from_prev_hex("zz", 0).is_err());
        assert!(TransactionInput::from_prev_hex("abcd", 0).is_err());
    }
}
