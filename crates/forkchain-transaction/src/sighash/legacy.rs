//! The original signature hash: a modified copy of the transaction,
//! serialized with the flag appended.

use forkchain_primitives::hash::sha256d;
use forkchain_primitives::util::{VarInt, WireWriter};
use forkchain_script::Script;

use super::{SighashBase, SighashFlag};
use crate::transaction::Transaction;
use crate::TransactionError;

/// Serialize the copy of `tx` that `flag` commits to and hash it.
///
/// Every unlocking script is cleared except the signed input's, which is
/// replaced by `script_code`. NONE drops all outputs; SINGLE keeps outputs
/// up to the signed index with earlier ones nulled. Both zero the other
/// inputs' sequences. Anyone-can-pay keeps only the signed input.
pub(super) fn digest(
    tx: &Transaction,
    input_index: usize,
    flag: SighashFlag,
    script_code: &Script,
) -> Result<[u8; 32], TransactionError> {
    if flag.base == SighashBase::Single && input_index >= tx.outputs.len() {
        return Err(TransactionError::InvalidSighashTarget {
            index: input_index,
            outputs: tx.outputs.len(),
        });
    }

    let mut writer = WireWriter::with_capacity(256);
    writer.write_u32_le(tx.version);

    let signed: Vec<usize> = if flag.anyone_can_pay {
        vec![input_index]
    } else {
        (0..tx.inputs.len()).collect()
    };
    writer.write_varint(VarInt::from(signed.len()));
    for &i in &signed {
        let input = &tx.inputs[i];
        input.write_outpoint(&mut writer);
        if i == input_index {
            writer.write_var_bytes(script_code.to_bytes());
        } else {
            writer.write_varint(VarInt::from(0u64));
        }
        let sequence = if i != input_index && flag.base != SighashBase::All {
            0
        } else {
            input.sequence
        };
        writer.write_u32_le(sequence);
    }

    match flag.base {
        SighashBase::All => {
            writer.write_varint(VarInt::from(tx.outputs.len()));
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
        SighashBase::None => writer.write_varint(VarInt::from(0u64)),
        SighashBase::Single => {
            writer.write_varint(VarInt::from(input_index + 1));
            for _ in 0..input_index {
                // Null output: amount -1, empty script.
                writer.write_u64_le(u64::MAX);
                writer.write_varint(VarInt::from(0u64));
            }
            tx.outputs[input_index].write_to(&mut writer);
        }
    }

    writer.write_u32_le(tx.lock_time);
    writer.write_bytes(&flag.to_wire());
    Ok(sha256d(writer.as_bytes()))
}
