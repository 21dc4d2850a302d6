//! Signature hash computation for transaction signing.
//!
//! Computes the digest that is signed by ECDSA to authorize spending an
//! input. Two algorithms exist and the chain variant picks one: the
//! original legacy serialization, and the fork-id preimage construction
//! used by chains with replay protection.
//!
//! See <https://github.com/bitcoincashorg/bitcoincash.org/blob/master/spec/replay-protected-sighash.md>

mod legacy;
mod preimage;

pub use preimage::calc_preimage;

use serde::{Deserialize, Serialize};
use tracing::debug;

use forkchain_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: only sign the current input, allowing other
/// inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Replay-protection bit carried by every signature on a fork-id chain.
pub use forkchain_script::interpreter::SIGHASH_FORKID;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Which outputs a signature commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SighashBase {
    All,
    None,
    Single,
}

impl SighashBase {
    fn to_u32(self) -> u32 {
        match self {
            SighashBase::All => SIGHASH_ALL,
            SighashBase::None => SIGHASH_NONE,
            SighashBase::Single => SIGHASH_SINGLE,
        }
    }
}

/// A sighash flag: the base type, the anyone-can-pay modifier and an
/// optional fork identifier.
///
/// The wire form is a 4-byte little-endian value. Its low byte is the hash
/// type byte appended to signatures (base | 0x40 with a fork id | 0x80 for
/// anyone-can-pay); the fork identifier occupies the upper 24 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SighashFlag {
    pub base: SighashBase,
    pub anyone_can_pay: bool,
    pub fork_id: Option<u32>,
}

impl SighashFlag {
    pub const ALL: SighashFlag = SighashFlag::new(SighashBase::All);
    pub const NONE: SighashFlag = SighashFlag::new(SighashBase::None);
    pub const SINGLE: SighashFlag = SighashFlag::new(SighashBase::Single);

    pub const fn new(base: SighashBase) -> Self {
        SighashFlag {
            base,
            anyone_can_pay: false,
            fork_id: None,
        }
    }

    pub const fn with_anyone_can_pay(mut self) -> Self {
        self.anyone_can_pay = true;
        self
    }

    pub const fn with_fork_id(mut self, fork_id: u32) -> Self {
        self.fork_id = Some(fork_id);
        self
    }

    /// The hash type byte appended to a DER signature.
    pub fn to_byte(&self) -> u8 {
        let mut byte = self.base.to_u32();
        if self.fork_id.is_some() {
            byte |= SIGHASH_FORKID;
        }
        if self.anyone_can_pay {
            byte |= SIGHASH_ANYONECANPAY;
        }
        byte as u8
    }

    /// The full 32-bit value, fork identifier in the upper 24 bits.
    pub fn to_u32(&self) -> u32 {
        self.to_byte() as u32 | (self.fork_id.unwrap_or(0) << 8)
    }

    /// The 4-byte little-endian wire form.
    pub fn to_wire(&self) -> [u8; 4] {
        self.to_u32().to_le_bytes()
    }

    /// Decode a 32-bit flag value.
    ///
    /// # Returns
    /// The flag, or `InvalidSighashFlag` when the base type is not ALL,
    /// NONE or SINGLE, an undefined bit is set, or upper bits are present
    /// without the fork-id bit.
    pub fn from_u32(value: u32) -> Result<Self, TransactionError> {
        let base = match value & SIGHASH_MASK {
            SIGHASH_ALL => SighashBase::All,
            SIGHASH_NONE => SighashBase::None,
            SIGHASH_SINGLE => SighashBase::Single,
            _ => return Err(TransactionError::InvalidSighashFlag(value)),
        };
        if value & 0x20 != 0 {
            return Err(TransactionError::InvalidSighashFlag(value));
        }
        let fork_id = if value & SIGHASH_FORKID != 0 {
            Some(value >> 8)
        } else if value >> 8 != 0 {
            return Err(TransactionError::InvalidSighashFlag(value));
        } else {
            None
        };
        Ok(SighashFlag {
            base,
            anyone_can_pay: value & SIGHASH_ANYONECANPAY != 0,
            fork_id,
        })
    }

    /// Decode the hash type byte of a signature.
    ///
    /// The byte only carries the fork-id bit; the identifier itself comes
    /// from the chain the signature is checked on.
    pub fn from_sig_byte(byte: u8, chain_fork_id: Option<u32>) -> Result<Self, TransactionError> {
        let mut flag = SighashFlag::from_u32(byte as u32)?;
        if flag.fork_id.is_some() {
            flag.fork_id = Some(chain_fork_id.unwrap_or(0));
        }
        Ok(flag)
    }
}

impl Default for SighashFlag {
    fn default() -> Self {
        SighashFlag::ALL
    }
}

impl TryFrom<u32> for SighashFlag {
    type Error = TransactionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        SighashFlag::from_u32(value)
    }
}

/// Compute the digest that signs input `input_index` under `flag`.
///
/// `script_code` is the script committed to for the signed input (the
/// spent locking script, or the part after the last OP_CODESEPARATOR) and
/// `amount` the value of the spent output. The chain variant of `tx`
/// selects the algorithm; the legacy algorithm ignores `amount`.
///
/// # Returns
/// A 32-byte double-SHA256 hash to be signed by ECDSA.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    flag: SighashFlag,
    script_code: &Script,
    amount: u64,
) -> Result<[u8; 32], TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InputIndexOutOfRange {
            index: input_index,
            inputs: tx.inputs.len(),
        });
    }

    let digest = if tx.chain.uses_preimage_algorithm {
        preimage::digest(tx, input_index, flag, script_code, amount)?
    } else {
        legacy::digest(tx, input_index, flag, script_code)?
    };
    debug!(
        input = input_index,
        flag = flag.to_u32(),
        preimage = tx.chain.uses_preimage_algorithm,
        digest = %hex::encode(digest),
        "computed signature hash"
    );
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_bytes() {
        assert_eq!(SighashFlag::ALL.to_byte(), 0x01);
        assert_eq!(SighashFlag::NONE.with_anyone_can_pay().to_byte(), 0x82);
        assert_eq!(SighashFlag::SINGLE.with_fork_id(0).to_byte(), 0x43);
        assert_eq!(SighashFlag::ALL.with_fork_id(0).with_anyone_can_pay().to_byte(), 0xc1);
    }

    #[test]
    fn test_flag_wire_value_merges_fork_id() {
        let flag = SighashFlag::ALL.with_fork_id(79);
        assert_eq!(flag.to_u32(), 0x41 | (79 << 8));
        assert_eq!(flag.to_wire(), [0x41, 0x4f, 0x00, 0x00]);
        assert_eq!(SighashFlag::ALL.to_wire(), [0x01, 0, 0, 0]);
        assert_eq!(SighashFlag::from_u32(flag.to_u32()).unwrap(), flag);
    }

    #[test]
    fn test_from_u32() {
        let flag = SighashFlag::from_u32(0x81).unwrap();
        assert_eq!(flag.base, SighashBase::All);
        assert!(flag.anyone_can_pay);
        assert_eq!(flag.fork_id, None);

        assert_eq!(SighashFlag::from_u32(0x41).unwrap().fork_id, Some(0));
        for bad in [0x00, 0x04, 0x1f, 0x21, 0x0100] {
            assert!(
                matches!(SighashFlag::from_u32(bad), Err(TransactionError::InvalidSighashFlag(v)) if v == bad),
                "{:#x}",
                bad
            );
        }
    }

    #[test]
    fn test_from_sig_byte_takes_chain_fork_id() {
        let flag = SighashFlag::from_sig_byte(0x41, Some(79)).unwrap();
        assert_eq!(flag, SighashFlag::ALL.with_fork_id(79));
        let flag = SighashFlag::from_sig_byte(0x41, None).unwrap();
        assert_eq!(flag.fork_id, Some(0));
        let flag = SighashFlag::from_sig_byte(0x03, Some(79)).unwrap();
        assert_eq!(flag, SighashFlag::SINGLE);
    }

    #[test]
    fn test_serde() {
        let flag = SighashFlag::SINGLE.with_anyone_can_pay();
        let json = serde_json::to_string(&flag).unwrap();
        let back: SighashFlag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flag);
    }
}
