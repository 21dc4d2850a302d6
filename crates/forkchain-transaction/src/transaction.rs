//! Core transaction type.
//!
//! Represents a complete transaction with version, inputs, outputs and
//! locktime, tied to the chain variant whose rules govern its signatures.
//! Supports binary and hex serialization, transaction id computation,
//! coinbase detection, fee calculation, and per-input verification and
//! signing.

use std::cell::RefCell;

use tracing::debug;

use forkchain_primitives::ec::{PrivateKey, PublicKey, Signature};
use forkchain_primitives::hash::sha256d;
use forkchain_primitives::util::{VarInt, WireReader, WireWriter};
use forkchain_script::interpreter::{Engine, InterpreterError, InterpreterErrorCode, TxContext};
use forkchain_script::Script;

use crate::chain::ChainVariant;
use crate::error::malformed;
use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::resolver::UtxoResolver;
use crate::sighash::{self, SighashFlag};
use crate::template::p2pkh;
use crate::TransactionError;

/// Flag byte that follows a zero input count in the segwit encoding.
const SEGWIT_FLAG: u8 = 0x01;

/// A transaction consisting of a version, a set of inputs, a set of
/// outputs, and a lock time.
///
/// The chain variant is not serialized; it selects the signature hash
/// algorithm and the interpreter flags.
///
/// # Wire format
///
/// | Field        | Size                      |
/// |--------------|---------------------------|
/// | version      | 4 bytes (LE)              |
/// | input count  | VarInt                    |
/// | inputs       | variable (per input)      |
/// | output count | VarInt                    |
/// | outputs      | variable (per output)     |
/// | lock_time    | 4 bytes (LE)              |
#[derive(Clone, Debug)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,

    /// Ordered list of transaction inputs.
    pub inputs: Vec<TransactionInput>,

    /// Ordered list of transaction outputs.
    pub outputs: Vec<TransactionOutput>,

    /// Lock time. If non-zero, the transaction is not valid until the
    /// specified block height or Unix timestamp.
    pub lock_time: u32,

    /// The chain whose rules apply.
    pub chain: ChainVariant,
}

impl Transaction {
    /// Create a new empty Bitcoin transaction with version 1 and lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
            chain: ChainVariant::BITCOIN,
        }
    }

    /// Rebind the transaction to another chain variant.
    pub fn with_chain(mut self, chain: ChainVariant) -> Self {
        self.chain = chain;
        self
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    ///
    /// The result is bound to `ChainVariant::BITCOIN`; use `with_chain`
    /// for other chains.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::MalformedTransaction(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// This method requires the byte slice to contain exactly one complete
    /// transaction with no trailing data.
    ///
    /// # Returns
    /// The transaction, `MalformedTransaction` if the data is truncated,
    /// malformed or has trailing bytes, or `UnsupportedEncoding` for the
    /// segwit encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = WireReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::MalformedTransaction(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `WireReader`.
    ///
    /// Reads the version, input count, inputs, output count, outputs, and
    /// lock time in the legacy wire format. At least one input is required.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(malformed("version"))?;

        let input_count = reader.read_varint().map_err(malformed("input count"))?.value();
        if input_count == 0 {
            if reader.peek_u8() == Some(SEGWIT_FLAG) {
                return Err(TransactionError::UnsupportedEncoding(
                    "segwit marker and flag".to_string(),
                ));
            }
            return Err(TransactionError::MalformedTransaction(
                "transaction has no inputs".to_string(),
            ));
        }

        // Counts are untrusted: never reserve more than the bytes left.
        let mut inputs = Vec::with_capacity(input_count.min(reader.remaining() as u64) as usize);
        for _ in 0..input_count {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(malformed("output count"))?.value();
        let mut outputs = Vec::with_capacity(output_count.min(reader.remaining() as u64) as usize);
        for _ in 0..output_count {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(malformed("lock time"))?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            chain: ChainVariant::BITCOIN,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this transaction to raw bytes.
    ///
    /// # Returns
    /// The wire-format bytes:
    /// version(4) + varint(n_in) + inputs + varint(n_out) + outputs + locktime(4).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(256);
        writer.write_u32_le(self.version);

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Return the size of this transaction in bytes.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    // -----------------------------------------------------------------
    // Transaction ID
    // -----------------------------------------------------------------

    /// The transaction id in display order: the double SHA-256 of the
    /// serialized bytes, byte-reversed.
    ///
    /// This is the order `TransactionInput::prev_tx_id` uses.
    pub fn id(&self) -> [u8; 32] {
        let mut id = sha256d(&self.to_bytes());
        id.reverse();
        id
    }

    /// The transaction id as the conventional 64-character hex string.
    pub fn id_hex(&self) -> String {
        hex::encode(self.id())
    }

    // -----------------------------------------------------------------
    // Inputs and outputs
    // -----------------------------------------------------------------

    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn input(&self, index: usize) -> Result<&TransactionInput, TransactionError> {
        self.inputs.get(index).ok_or(TransactionError::InputIndexOutOfRange {
            index,
            inputs: self.inputs.len(),
        })
    }

    /// Compute the sum of all output amounts.
    ///
    /// # Returns
    /// The total, or `AmountOverflow` if it does not fit in a `u64`.
    pub fn total_output_amount(&self) -> Result<u64, TransactionError> {
        sum_amounts(self.outputs.iter().map(|o| o.amount), "outputs")
    }

    /// Compute the sum of the amounts of all spent outputs.
    ///
    /// # Returns
    /// The total, `MissingUtxoData` if any spent output cannot be
    /// resolved, or `AmountOverflow` if it does not fit in a `u64`.
    pub fn total_input_amount(&self, resolver: &dyn UtxoResolver) -> Result<u64, TransactionError> {
        let amounts = self
            .inputs
            .iter()
            .map(|input| input.resolve(resolver).map(|spent| spent.amount))
            .collect::<Result<Vec<_>, _>>()?;
        sum_amounts(amounts, "inputs")
    }

    /// Inputs minus outputs. Negative when the outputs spend more than the
    /// inputs provide.
    pub fn fee(&self, resolver: &dyn UtxoResolver) -> Result<i64, TransactionError> {
        let inputs = self.total_input_amount(resolver)? as i128;
        let outputs = self.total_output_amount()? as i128;
        i64::try_from(inputs - outputs).map_err(|_| {
            TransactionError::AmountOverflow(format!("fee {} does not fit in i64", inputs - outputs))
        })
    }

    // -----------------------------------------------------------------
    // Coinbase detection
    // -----------------------------------------------------------------

    /// A coinbase transaction has exactly one input, the coinbase marker
    /// (all-zero txid, output index `0xFFFFFFFF`).
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase_marker()
    }

    /// The block height committed to by a coinbase transaction (BIP34).
    ///
    /// # Returns
    /// The first push of the coinbase script read as a little-endian
    /// integer, or `None` when this is not a coinbase or that push is
    /// longer than 4 bytes.
    pub fn coinbase_height(&self) -> Option<u32> {
        if !self.is_coinbase() {
            return None;
        }
        let chunk = self.inputs[0].unlocking_script.first_chunk().ok()??;
        let data = chunk.data?;
        if data.len() > 4 {
            return None;
        }
        Some(data.iter().rev().fold(0u32, |acc, &b| (acc << 8) | b as u32))
    }

    // -----------------------------------------------------------------
    // Signature hash
    // -----------------------------------------------------------------

    /// Compute the signature hash for an input.
    ///
    /// Resolves the spent output, then hashes with its locking script as
    /// script code under this transaction's chain rules.
    ///
    /// # Returns
    /// The 32-byte digest to be signed, `MissingUtxoData` if the spent
    /// output cannot be resolved, or `InvalidSighashTarget` for SINGLE
    /// without a matching output on a legacy chain.
    pub fn signature_hash(
        &self,
        input_index: usize,
        flag: SighashFlag,
        resolver: &dyn UtxoResolver,
    ) -> Result<[u8; 32], TransactionError> {
        let spent = self.input(input_index)?.resolve(resolver)?;
        sighash::signature_hash(self, input_index, flag, &spent.locking_script, spent.amount)
    }

    // -----------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------

    /// Run input `input_index`'s unlocking script against the locking
    /// script of the output it spends.
    ///
    /// # Returns
    /// `Ok(true)` if the scripts succeed, `Ok(false)` if they fail to
    /// evaluate, or an error when the spent output is missing, a script is
    /// structurally invalid, or a signature uses SINGLE without a matching
    /// output on a legacy chain. Coinbase inputs are always `Ok(true)`.
    pub fn verify_input(
        &self,
        input_index: usize,
        resolver: &dyn UtxoResolver,
    ) -> Result<bool, TransactionError> {
        let input = self.input(input_index)?;
        if input.is_coinbase_marker() {
            debug!(input = input_index, "coinbase input not script-checked");
            return Ok(true);
        }
        let spent = input.resolve(resolver)?;

        let ctx = InputContext::new(self, spent.amount);
        let result = Engine::new().execute(
            &input.unlocking_script,
            &spent.locking_script,
            self.chain.script_flags(),
            Some(&ctx as &dyn TxContext),
            input_index,
        );
        if let Some(err) = ctx.take_error() {
            return Err(err);
        }

        match result {
            Ok(()) => {
                debug!(input = input_index, chain = %self.chain, "input verified");
                Ok(true)
            }
            Err(e) if e.code.is_structural() => Err(TransactionError::InvalidScript(e.to_string())),
            Err(e) => {
                debug!(input = input_index, code = %e.code, reason = %e.description, "input failed verification");
                Ok(false)
            }
        }
    }

    /// `true` iff every input verifies.
    pub fn verify(&self, resolver: &dyn UtxoResolver) -> Result<bool, TransactionError> {
        for index in 0..self.inputs.len() {
            if !self.verify_input(index, resolver)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // -----------------------------------------------------------------
    // Signing
    // -----------------------------------------------------------------

    /// Sign input `input_index` as a pay-to-public-key-hash spend.
    ///
    /// The fork id of `flag` is replaced by the chain's (cleared on
    /// chains without one). The
    /// resulting `<sig> <pubkey>` script replaces the input's unlocking
    /// script.
    ///
    /// # Returns
    /// Whether the input verifies with the new unlocking script.
    pub fn sign_input(
        &mut self,
        input_index: usize,
        private_key: &PrivateKey,
        flag: SighashFlag,
        resolver: &dyn UtxoResolver,
    ) -> Result<bool, TransactionError> {
        let mut flag = flag;
        flag.fork_id = self.chain.fork_id;

        let digest = self.signature_hash(input_index, flag, resolver)?;
        let signature = private_key.sign(&digest)?;
        let unlocking_script = p2pkh::unlock(&signature, flag, &private_key.pub_key())?;
        debug!(input = input_index, flag = flag.to_u32(), "signed input");

        self.inputs[input_index].unlocking_script = unlocking_script;
        self.verify_input(input_index, resolver)
    }
}

fn sum_amounts(amounts: impl IntoIterator<Item = u64>, side: &str) -> Result<u64, TransactionError> {
    amounts.into_iter().try_fold(0u64, |total, amount| {
        total
            .checked_add(amount)
            .ok_or_else(|| TransactionError::AmountOverflow(format!("sum of {} exceeds u64", side)))
    })
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Interpreter view of one input being verified.
///
/// The interpreter maps any signature check error to a failed check, so
/// errors that must reach the caller are stashed here and re-raised after
/// execution.
struct InputContext<'a> {
    tx: &'a Transaction,
    amount: u64,
    error: RefCell<Option<TransactionError>>,
}

impl<'a> InputContext<'a> {
    fn new(tx: &'a Transaction, amount: u64) -> Self {
        InputContext {
            tx,
            amount,
            error: RefCell::new(None),
        }
    }

    fn take_error(&self) -> Option<TransactionError> {
        self.error.borrow_mut().take()
    }

    fn stash(&self, err: TransactionError) -> InterpreterError {
        let ie = InterpreterError::new(InterpreterErrorCode::InvalidSigHashType, err.to_string());
        let mut slot = self.error.borrow_mut();
        if slot.is_none() {
            *slot = Some(err);
        }
        ie
    }
}

impl TxContext for InputContext<'_> {
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        _sighash_flag: u32,
    ) -> Result<bool, InterpreterError> {
        let Some((&hash_type, der)) = full_sig.split_last() else {
            return Ok(false);
        };
        let Ok(flag) = SighashFlag::from_sig_byte(hash_type, self.tx.chain.fork_id) else {
            return Ok(false);
        };
        let digest = sighash::signature_hash(self.tx, input_idx, flag, sub_script, self.amount)
            .map_err(|e| self.stash(e))?;
        let (Ok(sig), Ok(key)) = (Signature::from_der(der), PublicKey::from_bytes(pub_key)) else {
            return Ok(false);
        };
        Ok(key.verify(&digest, &sig))
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time
    }

    fn tx_version(&self) -> u32 {
        self.tx.version
    }

    fn input_sequence(&self, input_idx: usize) -> u32 {
        self.tx.inputs.get(input_idx).map_or(0, |input| input.sequence)
    }
}
