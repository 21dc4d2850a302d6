//! Transaction output with an amount and a locking script.
//!
//! Defines the spending conditions for the output's value. Provides
//! binary serialization/deserialization following the Bitcoin wire format.

use serde::{Deserialize, Serialize};

use forkchain_primitives::util::{WireReader, WireWriter};
use forkchain_script::Script;

use crate::error::malformed;
use crate::TransactionError;

/// A single output in a transaction.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | amount           | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | locking_script   | variable       |
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionOutput {
    /// Value in the chain's smallest unit.
    pub amount: u64,

    /// The locking script that defines spending conditions.
    pub locking_script: Script,
}

impl TransactionOutput {
    pub fn new(amount: u64, locking_script: Script) -> Self {
        TransactionOutput {
            amount,
            locking_script,
        }
    }

    /// Deserialize a `TransactionOutput` from a `WireReader`.
    ///
    /// # Returns
    /// The output, or `MalformedTransaction` if the data is truncated or the
    /// script length runs past the end.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let amount = reader.read_u64_le().map_err(malformed("amount"))?;
        let script_bytes = reader.read_var_bytes().map_err(malformed("locking script"))?;
        Ok(TransactionOutput {
            amount,
            locking_script: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this output into a `WireWriter`.
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u64_le(self.amount);
        writer.write_var_bytes(self.locking_script.to_bytes());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = WireWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}
