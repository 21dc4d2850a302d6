//! Flow control and lock time operations for the script interpreter.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;
use super::TxContext;

/// Lock times below this are block heights, above it unix timestamps.
const LOCK_TIME_THRESHOLD: i64 = 500_000_000;

/// Sequence value that marks an input final.
const MAX_TX_IN_SEQUENCE_NUM: u32 = 0xffffffff;
/// Sequence lock time disabled bit.
const SEQUENCE_LOCK_TIME_DISABLED: i64 = 1 << 31;
/// Sequence lock time is in units of 512 seconds.
const SEQUENCE_LOCK_TIME_IS_SECONDS: i64 = 1 << 22;
const SEQUENCE_LOCK_TIME_MASK: i64 = 0x0000ffff;

/// Lock time operands may be up to 5 bytes long.
const LOCK_TIME_NUM_LEN: usize = 5;

fn unbalanced(pop: &ParsedOpcode) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::UnbalancedConditional,
        format!(
            "encountered opcode {} with no matching opcode to begin conditional execution",
            pop.name()
        ),
    )
}

impl<'a> Thread<'a> {
    /// OP_IF / OP_NOTIF. In an unexecuted branch nothing is popped and the
    /// new branch is marked unexecuted too.
    pub(crate) fn op_if(&mut self, negate: bool) -> Result<(), InterpreterError> {
        let mut cond = false;
        if self.is_branch_executing() {
            cond = self.dstack.pop_bool()? != negate;
        }
        self.cond_stack.push(cond);
        Ok(())
    }

    pub(crate) fn op_else(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        let top = self.cond_stack.last_mut().ok_or_else(|| unbalanced(pop))?;
        *top = !*top;
        Ok(())
    }

    pub(crate) fn op_endif(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.cond_stack.pop().ok_or_else(|| unbalanced(pop))?;
        Ok(())
    }

    pub(crate) fn abstract_verify(
        &mut self,
        pop: &ParsedOpcode,
        code: InterpreterErrorCode,
    ) -> Result<(), InterpreterError> {
        if !self.dstack.pop_bool()? {
            return Err(InterpreterError::new(code, format!("{} failed", pop.name())));
        }
        Ok(())
    }

    pub(crate) fn op_upgradable_nop(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DiscourageUpgradableNOPs,
                format!("{} reserved for soft-fork upgrades", pop.name()),
            ));
        }
        Ok(())
    }

    fn require_tx_context(&self, op: &str) -> Result<&'a dyn TxContext, InterpreterError> {
        self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                format!("no tx context for {}", op),
            )
        })
    }

    fn peek_lock_time_operand(&self) -> Result<i64, InterpreterError> {
        let so = self.dstack.peek_byte_array(0)?;
        let n = ScriptNumber::from_bytes(
            so,
            LOCK_TIME_NUM_LEN,
            self.has_flag(ScriptFlags::VERIFY_MINIMAL_DATA),
        )?
        .to_i64();
        if n < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative lock time: {}", n),
            ));
        }
        Ok(n)
    }

    pub(crate) fn op_check_locktime_verify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_CHECKLOCKTIMEVERIFY) {
            return self.op_upgradable_nop(pop);
        }

        let lock_time = self.peek_lock_time_operand()?;
        let ctx = self.require_tx_context("OP_CHECKLOCKTIMEVERIFY")?;

        verify_lock_time(ctx.lock_time() as i64, LOCK_TIME_THRESHOLD, lock_time)?;

        if ctx.input_sequence(self.input_idx) == MAX_TX_IN_SEQUENCE_NUM {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "transaction input is finalized",
            ));
        }
        Ok(())
    }

    pub(crate) fn op_check_sequence_verify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_CHECKSEQUENCEVERIFY) {
            return self.op_upgradable_nop(pop);
        }

        let sequence = self.peek_lock_time_operand()?;
        if sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Ok(());
        }

        let ctx = self.require_tx_context("OP_CHECKSEQUENCEVERIFY")?;
        if ctx.tx_version() < 2 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!("invalid transaction version: {}", ctx.tx_version()),
            ));
        }

        let tx_sequence = ctx.input_sequence(self.input_idx) as i64;
        if tx_sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!(
                    "transaction sequence has sequence locktime disabled bit set: 0x{:x}",
                    tx_sequence
                ),
            ));
        }

        let mask = SEQUENCE_LOCK_TIME_IS_SECONDS | SEQUENCE_LOCK_TIME_MASK;
        verify_lock_time(
            tx_sequence & mask,
            SEQUENCE_LOCK_TIME_IS_SECONDS,
            sequence & mask,
        )
    }
}

/// Both lock times must be of the same kind and the required one reached.
pub(crate) fn verify_lock_time(
    tx_lock_time: i64,
    threshold: i64,
    lock_time: i64,
) -> Result<(), InterpreterError> {
    if (tx_lock_time < threshold) != (lock_time < threshold) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "mismatched locktime types -- tx locktime {}, stack locktime {}",
                tx_lock_time, lock_time
            ),
        ));
    }
    if lock_time > tx_lock_time {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "locktime requirement not satisfied -- locktime is greater than the transaction locktime: {} > {}",
                lock_time, tx_lock_time
            ),
        ));
    }
    Ok(())
}
