//! Fork-id signature hash (BIP-143 layout).
//!
//! Commits to the spent amount and uses precomputed digests of the
//! outpoints, sequences and outputs instead of re-serializing the whole
//! transaction per input.

use forkchain_primitives::hash::sha256d;
use forkchain_primitives::util::WireWriter;
use forkchain_script::Script;

use super::{SighashBase, SighashFlag};
use crate::transaction::Transaction;
use crate::TransactionError;

pub(super) fn digest(
    tx: &Transaction,
    input_index: usize,
    flag: SighashFlag,
    script_code: &Script,
    amount: u64,
) -> Result<[u8; 32], TransactionError> {
    Ok(sha256d(&calc_preimage(tx, input_index, flag, script_code, amount)?))
}

/// Compute the preimage bytes before double-hashing.
///
/// The preimage consists of:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes) - sha256d of all outpoints unless ANYONECANPAY
/// 3. hashSequence (32 bytes) - sha256d of all sequences unless ANYONECANPAY/SINGLE/NONE
/// 4. outpoint (32+4 bytes) - txid + vout of the input being signed
/// 5. scriptCode (varint + script) - the locking script being satisfied
/// 6. value (8 bytes LE) - amount of the output being spent
/// 7. nSequence (4 bytes LE) - sequence of the input being signed
/// 8. hashOutputs (32 bytes) - sha256d of all outputs or one output
/// 9. nLocktime (4 bytes LE)
/// 10. sighashType (4 bytes LE) - with the chain's fork id in the upper bits
///
/// # Returns
/// The raw preimage bytes (not yet hashed).
pub fn calc_preimage(
    tx: &Transaction,
    input_index: usize,
    flag: SighashFlag,
    script_code: &Script,
    amount: u64,
) -> Result<Vec<u8>, TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InputIndexOutOfRange {
            index: input_index,
            inputs: tx.inputs.len(),
        });
    }
    let flag = flag.with_fork_id(tx.chain.fork_id.unwrap_or(0));
    let input = &tx.inputs[input_index];

    let hash_prevouts = if !flag.anyone_can_pay {
        prevouts_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_sequence = if !flag.anyone_can_pay && flag.base == SighashBase::All {
        sequence_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_outputs = match flag.base {
        SighashBase::All => outputs_hash(tx, None),
        SighashBase::Single if input_index < tx.outputs.len() => {
            outputs_hash(tx, Some(input_index))
        }
        _ => [0u8; 32],
    };

    let mut writer = WireWriter::with_capacity(256);
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    input.write_outpoint(&mut writer);
    writer.write_var_bytes(script_code.to_bytes());
    writer.write_u64_le(amount);
    writer.write_u32_le(input.sequence);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_bytes(&flag.to_wire());
    Ok(writer.into_bytes())
}

fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = WireWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        input.write_outpoint(&mut writer);
    }
    sha256d(writer.as_bytes())
}

fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = WireWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence);
    }
    sha256d(writer.as_bytes())
}

/// All outputs, or only the one at `single`.
fn outputs_hash(tx: &Transaction, single: Option<usize>) -> [u8; 32] {
    let mut writer = WireWriter::new();
    match single {
        Some(n) => tx.outputs[n].write_to(&mut writer),
        None => {
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
    }
    sha256d(writer.as_bytes())
}
