//! Hashing and signature checking operations for the script interpreter.

use forkchain_primitives::hash::{hash160, ripemd160, sha256, sha256d};
use sha1::{Digest, Sha1};

use crate::opcodes::OP_CODESEPARATOR;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::*;
use super::thread::Thread;
use super::TxContext;

/// Sighash bit selecting the fork-id (BIP143 style) digest.
pub const SIGHASH_FORKID: u32 = 0x40;

#[derive(Debug, Clone, Copy)]
pub(crate) enum HashType {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, hash_type: HashType) -> Result<(), InterpreterError> {
        let buf = self.dstack.pop_byte_array()?;
        let result = match hash_type {
            HashType::Ripemd160 => ripemd160(&buf).to_vec(),
            HashType::Sha1 => Sha1::digest(&buf).to_vec(),
            HashType::Sha256 => sha256(&buf).to_vec(),
            HashType::Hash160 => hash160(&buf).to_vec(),
            HashType::Hash256 => sha256d(&buf).to_vec(),
        };
        self.dstack.push_byte_array(result);
        Ok(())
    }

    /// The executing script from just past the last OP_CODESEPARATOR.
    pub(crate) fn sub_script(&self) -> ParsedScript {
        self.scripts[self.script_idx][self.sub_script_start..].to_vec()
    }

    /// Whether signatures are checked with the legacy digest, which signs a
    /// script code with the signatures and code separators removed.
    fn legacy_sighash(&self) -> bool {
        !self.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID)
    }

    /// Under ENABLE_SIGHASH_FORKID every signature must carry the fork-id bit.
    fn check_fork_id(&self, shf: u32) -> Result<(), InterpreterError> {
        if !self.legacy_sighash() && shf & SIGHASH_FORKID == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::IllegalForkID,
                format!("hash type 0x{:02x} does not contain the fork id bit", shf),
            ));
        }
        Ok(())
    }

    fn require_checksig_context(&self) -> Result<&'a dyn TxContext, InterpreterError> {
        self.tx_context.ok_or_else(|| {
            InterpreterError::new(InterpreterErrorCode::InvalidParams, "no tx context for checksig")
        })
    }

    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pk_bytes = self.dstack.pop_byte_array()?;
        let full_sig_bytes = self.dstack.pop_byte_array()?;

        let Some(&shf) = full_sig_bytes.last() else {
            self.dstack.push_bool(false);
            return Ok(());
        };
        let shf = shf as u32;
        self.check_fork_id(shf)?;

        let mut sub_script = self.sub_script();
        if self.legacy_sighash() {
            sub_script = remove_opcode_by_data(&sub_script, &full_sig_bytes);
            sub_script = remove_opcode(&sub_script, OP_CODESEPARATOR);
        }

        let ctx = self.require_checksig_context()?;
        let valid = ctx
            .verify_signature(&full_sig_bytes, &pk_bytes, &unparse(&sub_script), self.input_idx, shf)
            .unwrap_or(false);
        self.dstack.push_bool(valid);
        Ok(())
    }

    /// Keys and signatures are consumed from the top of the stack down; each
    /// signature must match a key further along than the previous match.
    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), InterpreterError> {
        let num_keys = self.dstack.pop_int()?.to_i64();
        if num_keys < 0 || num_keys as usize > self.cfg.max_pub_keys_per_multisig {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!(
                    "number of pubkeys {} outside 0..={}",
                    num_keys, self.cfg.max_pub_keys_per_multisig
                ),
            ));
        }
        let num_keys = num_keys as usize;

        self.num_ops += num_keys;
        if self.num_ops > self.cfg.max_ops {
            return Err(InterpreterError::new(
                InterpreterErrorCode::TooManyOperations,
                format!("exceeded max operation limit of {}", self.cfg.max_ops),
            ));
        }

        let mut pub_keys = Vec::with_capacity(num_keys);
        for _ in 0..num_keys {
            pub_keys.push(self.dstack.pop_byte_array()?);
        }

        let num_sigs = self.dstack.pop_int()?.to_i64();
        if num_sigs < 0 || num_sigs as usize > num_keys {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!("number of signatures {} outside 0..={}", num_sigs, num_keys),
            ));
        }
        let num_sigs = num_sigs as usize;

        let mut signatures = Vec::with_capacity(num_sigs);
        for _ in 0..num_sigs {
            signatures.push(self.dstack.pop_byte_array()?);
        }

        // Extra element consumed by the historical off-by-one.
        let dummy = self.dstack.pop_byte_array()?;
        if self.has_flag(ScriptFlags::STRICT_MULTI_SIG) && !dummy.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNullDummy,
                format!("multisig dummy argument has length {} instead of 0", dummy.len()),
            ));
        }

        let mut scr = self.sub_script();
        if self.legacy_sighash() {
            for sig in &signatures {
                scr = remove_opcode_by_data(&scr, sig);
            }
            scr = remove_opcode(&scr, OP_CODESEPARATOR);
        }
        let script = unparse(&scr);

        let mut success = true;
        let mut key_idx = 0;
        let mut sig_idx = 0;
        while success && sig_idx < signatures.len() {
            let sig = &signatures[sig_idx];
            let matched = match sig.last() {
                None => false,
                Some(&shf) => {
                    let shf = shf as u32;
                    self.check_fork_id(shf)?;
                    let ctx = self.require_checksig_context()?;
                    ctx.verify_signature(sig, &pub_keys[key_idx], &script, self.input_idx, shf)
                        .unwrap_or(false)
                }
            };
            if matched {
                sig_idx += 1;
            }
            key_idx += 1;

            if signatures.len() - sig_idx > pub_keys.len() - key_idx {
                success = false;
            }
        }

        self.dstack.push_bool(success);
        Ok(())
    }
}
