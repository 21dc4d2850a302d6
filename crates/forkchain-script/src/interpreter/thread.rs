//! Script execution thread: the interpreter's program counter and stacks.

use crate::opcodes::*;
use crate::Script;

use super::config::Config;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::ops_crypto::HashType;
use super::parsed_opcode::*;
use super::scriptnum::ScriptNumber;
use super::stack::Stack;
use super::TxContext;

/// The execution thread for the script interpreter.
///
/// Scripts run in order (unlocking, locking, then the redeem script for
/// pay-to-script-hash) against one data stack; the alt stack is cleared
/// between scripts.
pub struct Thread<'a> {
    pub(crate) dstack: Stack,
    pub(crate) astack: Stack,
    pub(crate) cfg: Config,
    pub(crate) scripts: Vec<ParsedScript>,
    /// One entry per open IF; `true` while the branch executes.
    pub(crate) cond_stack: Vec<bool>,
    /// Data stack after the unlocking script, kept for BIP16.
    pub(crate) saved_first_stack: Vec<Vec<u8>>,
    pub(crate) script_idx: usize,
    pub(crate) script_off: usize,
    /// Offset where the signed subscript starts (just past the last
    /// OP_CODESEPARATOR).
    pub(crate) sub_script_start: usize,
    /// Non-push opcodes executed in the current script.
    pub(crate) num_ops: usize,
    pub(crate) flags: ScriptFlags,
    pub(crate) bip16: bool,
    pub(crate) tx_context: Option<&'a dyn TxContext>,
    pub(crate) input_idx: usize,
}

impl<'a> Thread<'a> {
    /// Create a new execution thread from unlocking and locking scripts.
    ///
    /// Validates script sizes and flag combinations and parses both scripts.
    pub fn new(
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        cfg: Config,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
    ) -> Result<Self, InterpreterError> {
        if flags.has_flag(ScriptFlags::VERIFY_CLEAN_STACK) && !flags.has_flag(ScriptFlags::BIP16) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidFlags,
                "clean stack requires BIP16",
            ));
        }

        for (name, script) in [("unlocking", unlocking_script), ("locking", locking_script)] {
            if script.len() > cfg.max_script_size {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::ScriptTooBig,
                    format!(
                        "{} script size {} is larger than the max allowed size {}",
                        name,
                        script.len(),
                        cfg.max_script_size
                    ),
                ));
            }
        }

        if unlocking_script.is_empty() && locking_script.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution",
            ));
        }

        let uscript = parse_script(unlocking_script)?;
        let lscript = parse_script(locking_script)?;

        if flags.has_flag(ScriptFlags::VERIFY_SIG_PUSH_ONLY) && !is_push_only(&uscript) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "signature script is not push only",
            ));
        }

        let bip16 = flags.has_flag(ScriptFlags::BIP16) && locking_script.is_p2sh();
        if bip16 && !is_push_only(&uscript) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "pay to script hash is not push only",
            ));
        }

        let verify_minimal_data = flags.has_flag(ScriptFlags::VERIFY_MINIMAL_DATA);
        let max_num_len = cfg.max_script_number_length;

        Ok(Thread {
            dstack: Stack::new(max_num_len, verify_minimal_data),
            astack: Stack::new(max_num_len, verify_minimal_data),
            cfg,
            scripts: vec![uscript, lscript],
            cond_stack: Vec::new(),
            saved_first_stack: Vec::new(),
            script_idx: if unlocking_script.is_empty() { 1 } else { 0 },
            script_off: 0,
            sub_script_start: 0,
            num_ops: 0,
            flags,
            bip16,
            tx_context,
            input_idx,
        })
    }

    pub fn has_flag(&self, flag: ScriptFlags) -> bool {
        self.flags.has_flag(flag)
    }

    /// Whether every enclosing conditional branch is executing.
    pub fn is_branch_executing(&self) -> bool {
        self.cond_stack.iter().all(|&v| v)
    }

    /// Run all scripts to completion and check the final stack.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        while !self.step()? {}
        self.check_error_condition(true)
    }

    /// Execute one opcode. Returns true once every script has run.
    pub fn step(&mut self) -> Result<bool, InterpreterError> {
        let opcode = self
            .scripts
            .get(self.script_idx)
            .and_then(|s| s.get(self.script_off))
            .cloned()
            .ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::InvalidParams,
                    format!("program counter {}:{} past end of scripts", self.script_idx, self.script_off),
                )
            })?;

        self.execute_opcode(&opcode)?;
        self.script_off += 1;

        let combined = self.dstack.depth() + self.astack.depth();
        if combined > self.cfg.max_stack_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackOverflow,
                format!(
                    "combined stack size {} > max allowed {}",
                    combined, self.cfg.max_stack_size
                ),
            ));
        }

        if self.script_off < self.scripts[self.script_idx].len() {
            return Ok(false);
        }

        if !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution",
            ));
        }

        self.astack.clear();
        self.shift_script();

        if self.bip16 {
            match self.script_idx {
                1 => self.saved_first_stack = self.dstack.items().to_vec(),
                2 => self.push_redeem_script()?,
                _ => {}
            }
        }

        // Skip a zero-length script.
        if self.script_idx < self.scripts.len() && self.scripts[self.script_idx].is_empty() {
            self.script_idx += 1;
        }

        Ok(self.script_idx >= self.scripts.len())
    }

    /// The locking script of a P2SH spend has run: require it to succeed,
    /// then queue the last unlocking push as a script over the stack the
    /// unlocking script left behind.
    fn push_redeem_script(&mut self) -> Result<(), InterpreterError> {
        self.check_error_condition(false)?;
        let mut stack = std::mem::take(&mut self.saved_first_stack);
        let redeem = stack.pop().ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "no redeem script on stack for pay to script hash",
            )
        })?;
        self.scripts.push(parse_script(&Script::from(redeem))?);
        self.dstack.set_items(stack);
        Ok(())
    }

    fn shift_script(&mut self) {
        self.num_ops = 0;
        self.script_off = 0;
        self.sub_script_start = 0;
        self.script_idx += 1;
    }

    fn check_error_condition(&mut self, final_script: bool) -> Result<(), InterpreterError> {
        if self.dstack.depth() < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "stack empty at end of script execution",
            ));
        }

        if final_script && self.has_flag(ScriptFlags::VERIFY_CLEAN_STACK) && self.dstack.depth() != 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::CleanStack,
                format!("stack contains {} unexpected items", self.dstack.depth() - 1),
            ));
        }

        if !self.dstack.pop_bool()? {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution",
            ));
        }
        Ok(())
    }

    fn execute_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if pop.data.len() > self.cfg.max_script_element_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "element size {} exceeds max allowed size {}",
                    pop.data.len(),
                    self.cfg.max_script_element_size
                ),
            ));
        }

        if pop.opcode > OP_16 {
            self.num_ops += 1;
            if self.num_ops > self.cfg.max_ops {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::TooManyOperations,
                    format!("exceeded max operation limit of {}", self.cfg.max_ops),
                ));
            }
        }

        if pop.is_disabled() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("attempt to execute disabled opcode {}", pop.name()),
            ));
        }

        let executing = self.is_branch_executing();
        if !executing && !pop.is_conditional() {
            return Ok(());
        }

        if executing
            && pop.is_push()
            && self.has_flag(ScriptFlags::VERIFY_MINIMAL_DATA)
            && !pop.is_minimal_push()
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::MinimalData,
                format!("non-minimal push with opcode {}", pop.name()),
            ));
        }

        self.dispatch_opcode(pop)
    }

    fn dispatch_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        match pop.opcode {
            op if op <= OP_PUSHDATA4 => {
                self.dstack.push_byte_array(pop.data.clone());
                Ok(())
            }
            OP_1NEGATE => {
                self.dstack.push_int(ScriptNumber(-1));
                Ok(())
            }
            op @ OP_1..=OP_16 => {
                self.dstack.push_byte_array(vec![op - (OP_1 - 1)]);
                Ok(())
            }

            // Flow control
            OP_NOP => Ok(()),
            OP_IF => self.op_if(false),
            OP_NOTIF => self.op_if(true),
            OP_ELSE => self.op_else(pop),
            OP_ENDIF => self.op_endif(pop),
            OP_VERIFY => self.abstract_verify(pop, InterpreterErrorCode::Verify),
            OP_RETURN => Err(InterpreterError::new(
                InterpreterErrorCode::EarlyReturn,
                "script returned early",
            )),
            OP_CHECKLOCKTIMEVERIFY => self.op_check_locktime_verify(pop),
            OP_CHECKSEQUENCEVERIFY => self.op_check_sequence_verify(pop),

            // Stack
            OP_TOALTSTACK => self.op_to_alt_stack(),
            OP_FROMALTSTACK => self.op_from_alt_stack(),
            OP_2DROP => self.dstack.drop_n(2),
            OP_2DUP => self.dstack.dup_n(2),
            OP_3DUP => self.dstack.dup_n(3),
            OP_2OVER => self.dstack.over_n(2),
            OP_2ROT => self.dstack.rot_n(2),
            OP_2SWAP => self.dstack.swap_n(2),
            OP_IFDUP => self.op_ifdup(),
            OP_DEPTH => {
                let depth = self.dstack.depth() as i64;
                self.dstack.push_int(ScriptNumber(depth));
                Ok(())
            }
            OP_DROP => self.dstack.drop_n(1),
            OP_DUP => self.dstack.dup_n(1),
            OP_NIP => self.dstack.nip(1),
            OP_OVER => self.dstack.over_n(1),
            OP_PICK => self.op_pick(),
            OP_ROLL => self.op_roll(),
            OP_ROT => self.dstack.rot_n(1),
            OP_SWAP => self.dstack.swap_n(1),
            OP_TUCK => self.dstack.tuck(),

            // Data
            OP_SIZE => self.op_size(),
            OP_EQUAL => self.op_equal(),
            OP_EQUALVERIFY => {
                self.op_equal()?;
                self.abstract_verify(pop, InterpreterErrorCode::EqualVerify)
            }

            // Arithmetic
            OP_1ADD => self.op_unary_int(|n| n + 1),
            OP_1SUB => self.op_unary_int(|n| n - 1),
            OP_NEGATE => self.op_unary_int(|n| -n),
            OP_ABS => self.op_unary_int(i64::abs),
            OP_NOT => self.op_unary_int(|n| (n == 0) as i64),
            OP_0NOTEQUAL => self.op_unary_int(|n| (n != 0) as i64),
            OP_ADD => self.op_binary_int(|a, b| a + b),
            OP_SUB => self.op_binary_int(|a, b| a - b),
            OP_BOOLAND => self.op_binary_int(|a, b| (a != 0 && b != 0) as i64),
            OP_BOOLOR => self.op_binary_int(|a, b| (a != 0 || b != 0) as i64),
            OP_NUMEQUAL => self.op_binary_int(|a, b| (a == b) as i64),
            OP_NUMEQUALVERIFY => {
                self.op_binary_int(|a, b| (a == b) as i64)?;
                self.abstract_verify(pop, InterpreterErrorCode::NumEqualVerify)
            }
            OP_NUMNOTEQUAL => self.op_binary_int(|a, b| (a != b) as i64),
            OP_LESSTHAN => self.op_binary_int(|a, b| (a < b) as i64),
            OP_GREATERTHAN => self.op_binary_int(|a, b| (a > b) as i64),
            OP_LESSTHANOREQUAL => self.op_binary_int(|a, b| (a <= b) as i64),
            OP_GREATERTHANOREQUAL => self.op_binary_int(|a, b| (a >= b) as i64),
            OP_MIN => self.op_binary_int(i64::min),
            OP_MAX => self.op_binary_int(i64::max),
            OP_WITHIN => self.op_within(),

            // Crypto
            OP_RIPEMD160 => self.op_hash(HashType::Ripemd160),
            OP_SHA1 => self.op_hash(HashType::Sha1),
            OP_SHA256 => self.op_hash(HashType::Sha256),
            OP_HASH160 => self.op_hash(HashType::Hash160),
            OP_HASH256 => self.op_hash(HashType::Hash256),
            OP_CODESEPARATOR => {
                self.sub_script_start = self.script_off + 1;
                Ok(())
            }
            OP_CHECKSIG => self.op_checksig(),
            OP_CHECKSIGVERIFY => {
                self.op_checksig()?;
                self.abstract_verify(pop, InterpreterErrorCode::CheckSigVerify)
            }
            OP_CHECKMULTISIG => self.op_checkmultisig(),
            OP_CHECKMULTISIGVERIFY => {
                self.op_checkmultisig()?;
                self.abstract_verify(pop, InterpreterErrorCode::CheckMultiSigVerify)
            }

            OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => {
                self.op_upgradable_nop(pop)
            }

            // OP_RESERVED, OP_VER, OP_VERIF, OP_VERNOTIF, OP_RESERVED1,
            // OP_RESERVED2 and every unassigned byte.
            _ => Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute reserved opcode {}", pop.name()),
            )),
        }
    }
}
