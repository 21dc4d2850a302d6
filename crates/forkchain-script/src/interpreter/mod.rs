//! Script interpreter for pre-fork Bitcoin script semantics.
//!
//! Executes an unlocking script followed by a locking script (and, with
//! BIP16, a pay-to-script-hash redeem script) against a shared data stack.
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate. Signature and
//! lock time checks go through a [`TxContext`] implemented by the caller.
//!
//! # Example
//!
//! ```ignore
//! use forkchain_script::interpreter::{Engine, ScriptFlags};
//!
//! let engine = Engine::new();
//! engine.execute(
//!     &unlocking_script,
//!     &locking_script,
//!     ScriptFlags::BIP16,
//!     Some(&tx_context),
//!     0,
//! )?;
//! ```

pub mod config;
pub mod error;
pub mod flags;
pub mod parsed_opcode;
pub mod scriptnum;
pub mod stack;
pub mod thread;

mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;

pub use config::Config;
pub use error::{InterpreterError, InterpreterErrorCode};
pub use flags::ScriptFlags;
pub use ops_crypto::SIGHASH_FORKID;
pub use parsed_opcode::{ParsedOpcode, ParsedScript};
pub use scriptnum::ScriptNumber;
pub use stack::Stack;

use crate::Script;
use thread::Thread;

/// Transaction data the interpreter needs for OP_CHECKSIG,
/// OP_CHECKMULTISIG, OP_CHECKLOCKTIMEVERIFY and OP_CHECKSEQUENCEVERIFY.
pub trait TxContext {
    /// Verify a signature against a public key for the given input.
    ///
    /// `full_sig` is the DER signature followed by the sighash type byte,
    /// which is also passed as `sighash_flag`. `sub_script` is the script
    /// code to sign, already cut at the last OP_CODESEPARATOR.
    ///
    /// Returns `Ok(false)` for a well-formed but wrong signature; the
    /// interpreter treats an error the same way.
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        sighash_flag: u32,
    ) -> Result<bool, InterpreterError>;

    fn lock_time(&self) -> u32;

    fn tx_version(&self) -> u32;

    /// Sequence number of the given input.
    fn input_sequence(&self, input_idx: usize) -> u32;
}

/// The script execution engine.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    cfg: Config,
}

impl Engine {
    pub fn new() -> Self {
        Engine::default()
    }

    pub fn with_config(cfg: Config) -> Self {
        Engine { cfg }
    }

    /// Execute unlocking + locking scripts.
    ///
    /// # Arguments
    /// * `unlocking_script` - The input's unlocking (signature) script.
    /// * `locking_script` - The spent output's locking script.
    /// * `flags` - Verification flags.
    /// * `tx_context` - Transaction context for signature and lock time opcodes.
    /// * `input_idx` - The input index being verified.
    ///
    /// # Returns
    /// `Ok(())` when the scripts leave a true value on the stack.
    pub fn execute(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        let mut thread = Thread::new(
            unlocking_script,
            locking_script,
            flags,
            self.cfg,
            tx_context,
            input_idx,
        )?;
        thread.execute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::config::*;
    use crate::opcodes::*;
    use forkchain_primitives::ec::{PrivateKey, PublicKey, Signature};
    use forkchain_primitives::hash::{hash160, sha256d};

    const OP_DATA_2: u8 = 0x02;

    /// Signs and checks `sha256d(script code || flag byte)`, which is enough
    /// to observe which script code the interpreter hands over.
    struct MockTx {
        lock_time: u32,
        version: u32,
        sequence: u32,
    }

    impl Default for MockTx {
        fn default() -> Self {
            MockTx { lock_time: 0, version: 1, sequence: 0xffffffff }
        }
    }

    fn digest(script: &Script, flag: u8) -> [u8; 32] {
        let mut data = script.to_bytes().to_vec();
        data.push(flag);
        sha256d(&data)
    }

    impl TxContext for MockTx {
        fn verify_signature(
            &self,
            full_sig: &[u8],
            pub_key: &[u8],
            sub_script: &Script,
            _input_idx: usize,
            sighash_flag: u32,
        ) -> Result<bool, InterpreterError> {
            let fail = |e: forkchain_primitives::PrimitivesError| {
                InterpreterError::new(InterpreterErrorCode::InvalidParams, e.to_string())
            };
            let sig = Signature::from_der(&full_sig[..full_sig.len() - 1]).map_err(fail)?;
            let pk = PublicKey::from_bytes(pub_key).map_err(fail)?;
            Ok(pk.verify(&digest(sub_script, sighash_flag as u8), &sig))
        }

        fn lock_time(&self) -> u32 {
            self.lock_time
        }

        fn tx_version(&self) -> u32 {
            self.version
        }

        fn input_sequence(&self, _input_idx: usize) -> u32 {
            self.sequence
        }
    }

    fn key(secret: u64) -> PrivateKey {
        PrivateKey::from_secret(secret).unwrap()
    }

    fn sign(k: &PrivateKey, script_code: &Script, flag: u8) -> Vec<u8> {
        let mut sig = k.sign(&digest(script_code, flag)).unwrap().to_der();
        sig.push(flag);
        sig
    }

    fn pushes(items: &[&[u8]]) -> Script {
        let mut s = Script::new();
        for item in items {
            s.append_push_data(item).unwrap();
        }
        s
    }

    fn run(unlock: &[u8], lock: &[u8], flags: ScriptFlags) -> Result<(), InterpreterError> {
        Engine::new().execute(&Script::from_bytes(unlock), &Script::from_bytes(lock), flags, None, 0)
    }

    fn run_code(unlock: &[u8], lock: &[u8], flags: ScriptFlags) -> Option<InterpreterErrorCode> {
        run(unlock, lock, flags).err().map(|e| e.code)
    }

    fn run_tx(
        unlock: &Script,
        lock: &Script,
        flags: ScriptFlags,
        tx: &MockTx,
    ) -> Result<(), InterpreterError> {
        Engine::new().execute(unlock, lock, flags, Some(tx as &dyn TxContext), 0)
    }

    #[test]
    fn test_op_equal() {
        assert!(run(&[OP_1], &[OP_1, OP_EQUAL], ScriptFlags::NONE).is_ok());
        assert_eq!(
            run_code(&[OP_1], &[OP_2, OP_EQUAL], ScriptFlags::NONE),
            Some(InterpreterErrorCode::EvalFalse)
        );
    }

    #[test]
    fn test_arithmetic() {
        let cases: Vec<(Vec<u8>, Vec<u8>)> = vec![
            (vec![OP_2, OP_3], vec![OP_ADD, OP_5, OP_EQUAL]),
            (vec![OP_5, OP_3], vec![OP_SUB, OP_2, OP_EQUAL]),
            (vec![OP_5], vec![OP_NEGATE, OP_ABS, OP_5, OP_NUMEQUAL]),
            (vec![OP_0], vec![OP_NOT]),
            (vec![OP_7], vec![OP_0NOTEQUAL]),
            (vec![OP_1], vec![OP_1SUB, OP_1ADD]),
            (vec![OP_1, OP_0], vec![OP_BOOLOR]),
            (vec![OP_1, OP_0], vec![OP_BOOLAND, OP_NOT]),
            (vec![OP_3, OP_4], vec![OP_NUMNOTEQUAL]),
            (vec![OP_3, OP_4], vec![OP_LESSTHAN]),
            (vec![OP_4, OP_3], vec![OP_GREATERTHAN]),
            (vec![OP_4, OP_4], vec![OP_LESSTHANOREQUAL]),
            (vec![OP_4, OP_4], vec![OP_GREATERTHANOREQUAL]),
            (vec![OP_3, OP_9], vec![OP_MIN, OP_3, OP_EQUAL]),
            (vec![OP_3, OP_9], vec![OP_MAX, OP_9, OP_EQUAL]),
            (vec![OP_3, OP_3, OP_5], vec![OP_WITHIN]),
            (vec![OP_5, OP_3, OP_5], vec![OP_WITHIN, OP_NOT]),
            (vec![OP_1NEGATE], vec![OP_ABS, OP_1, OP_NUMEQUALVERIFY, OP_1]),
        ];
        for (unlock, lock) in cases {
            assert!(
                run(&unlock, &lock, ScriptFlags::NONE).is_ok(),
                "{} / {}",
                unparse_asm(&unlock),
                unparse_asm(&lock)
            );
        }
    }

    fn unparse_asm(bytes: &[u8]) -> String {
        Script::from_bytes(bytes).to_asm()
    }

    #[test]
    fn test_number_operand_limits() {
        // 5-byte operands are rejected.
        let unlock = pushes(&[&[0, 0, 0, 0x80, 0]]);
        let err = Engine::new()
            .execute(&unlock, &Script::from_bytes(&[OP_1ADD]), ScriptFlags::NONE, None, 0)
            .unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::NumberTooBig);

        // A 4-byte operand may overflow into a 5-byte result.
        let unlock = pushes(&[&[0xff, 0xff, 0xff, 0x7f]]);
        let mut lock = Script::from_bytes(&[OP_1ADD]);
        lock.append_push_data(&[0, 0, 0, 0x80, 0]).unwrap();
        lock.append_opcodes(&[OP_EQUAL]).unwrap();
        assert!(Engine::new().execute(&unlock, &lock, ScriptFlags::NONE, None, 0).is_ok());
    }

    #[test]
    fn test_conditionals() {
        assert!(run(&[], &[OP_1, OP_IF, OP_2, OP_ELSE, OP_0, OP_ENDIF], ScriptFlags::NONE).is_ok());
        assert!(run(&[], &[OP_0, OP_NOTIF, OP_1, OP_ELSE, OP_0, OP_ENDIF], ScriptFlags::NONE).is_ok());
        assert!(run(&[], &[OP_1, OP_1, OP_IF, OP_IF, OP_1, OP_ELSE, OP_0, OP_ENDIF, OP_ENDIF], ScriptFlags::NONE).is_ok());

        // Each ELSE toggles the branch.
        let lock = [OP_0, OP_IF, OP_RETURN, OP_ELSE, OP_1, OP_ELSE, OP_RETURN, OP_ELSE, OP_1, OP_ENDIF];
        assert!(run(&[], &lock, ScriptFlags::NONE).is_ok());

        // Nothing is popped for an IF inside an unexecuted branch.
        assert!(run(&[], &[OP_1, OP_0, OP_IF, OP_IF, OP_ENDIF, OP_ENDIF], ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_unbalanced_conditionals() {
        for lock in [&[OP_1, OP_IF, OP_1][..], &[OP_1, OP_ENDIF], &[OP_1, OP_ELSE]] {
            assert_eq!(
                run_code(&[], lock, ScriptFlags::NONE),
                Some(InterpreterErrorCode::UnbalancedConditional)
            );
        }
        // A conditional cannot span the unlocking and locking scripts.
        assert_eq!(
            run_code(&[OP_1, OP_IF], &[OP_1, OP_ENDIF], ScriptFlags::NONE),
            Some(InterpreterErrorCode::UnbalancedConditional)
        );
    }

    #[test]
    fn test_op_return() {
        assert_eq!(
            run_code(&[OP_1], &[OP_RETURN], ScriptFlags::NONE),
            Some(InterpreterErrorCode::EarlyReturn)
        );
        assert!(run(&[], &[OP_0, OP_IF, OP_RETURN, OP_ENDIF, OP_1], ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_disabled_opcodes_fail_unexecuted() {
        for op in [OP_CAT, OP_SUBSTR, OP_INVERT, OP_XOR, OP_2MUL, OP_MUL, OP_MOD, OP_LSHIFT] {
            assert_eq!(
                run_code(&[], &[OP_0, OP_IF, op, OP_ENDIF, OP_1], ScriptFlags::NONE),
                Some(InterpreterErrorCode::DisabledOpcode)
            );
        }
    }

    #[test]
    fn test_reserved_opcodes() {
        for op in [OP_RESERVED, OP_VER, OP_RESERVED1, OP_RESERVED2, 0xba, 0xff] {
            assert_eq!(
                run_code(&[], &[OP_1, op], ScriptFlags::NONE),
                Some(InterpreterErrorCode::ReservedOpcode)
            );
            // Harmless when skipped.
            assert!(run(&[], &[OP_0, OP_IF, op, OP_ENDIF, OP_1], ScriptFlags::NONE).is_ok());
        }
        // OP_VERIF is a conditional opcode and fails even when skipped.
        for op in [OP_VERIF, OP_VERNOTIF] {
            assert_eq!(
                run_code(&[], &[OP_0, OP_IF, op, OP_ENDIF, OP_1], ScriptFlags::NONE),
                Some(InterpreterErrorCode::ReservedOpcode)
            );
        }
    }

    #[test]
    fn test_op_count_limit() {
        let mut lock = vec![OP_NOP; MAX_OPS_PER_SCRIPT];
        lock.push(OP_1);
        assert!(run(&[], &lock, ScriptFlags::NONE).is_ok());

        let mut lock = vec![OP_NOP; MAX_OPS_PER_SCRIPT + 1];
        lock.push(OP_1);
        assert_eq!(
            run_code(&[], &lock, ScriptFlags::NONE),
            Some(InterpreterErrorCode::TooManyOperations)
        );

        // Unexecuted opcodes still count.
        let mut lock = vec![OP_0, OP_IF];
        lock.extend(vec![OP_NOP; MAX_OPS_PER_SCRIPT]);
        lock.extend([OP_ENDIF, OP_1]);
        assert_eq!(
            run_code(&[], &lock, ScriptFlags::NONE),
            Some(InterpreterErrorCode::TooManyOperations)
        );

        // Pushes do not.
        let lock = vec![OP_1; MAX_OPS_PER_SCRIPT + 50];
        assert!(run(&[], &lock, ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_size_limits() {
        let unlock = vec![OP_1; MAX_STACK_SIZE + 1];
        assert_eq!(
            run_code(&unlock, &[OP_1], ScriptFlags::NONE),
            Some(InterpreterErrorCode::StackOverflow)
        );

        let big_push = pushes(&[&[0u8; MAX_SCRIPT_ELEMENT_SIZE + 1]]);
        let err = Engine::new()
            .execute(&big_push, &Script::from_bytes(&[OP_DROP, OP_1]), ScriptFlags::NONE, None, 0)
            .unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::ElementTooBig);

        let ok_push = pushes(&[&[1u8; MAX_SCRIPT_ELEMENT_SIZE]]);
        assert!(Engine::new()
            .execute(&ok_push, &Script::from_bytes(&[OP_SIZE, OP_NIP]), ScriptFlags::NONE, None, 0)
            .is_ok());

        let huge = vec![OP_NOP; MAX_SCRIPT_SIZE + 1];
        assert_eq!(
            run_code(&[OP_1], &huge, ScriptFlags::NONE),
            Some(InterpreterErrorCode::ScriptTooBig)
        );
    }

    #[test]
    fn test_end_state_errors() {
        assert_eq!(run_code(&[], &[], ScriptFlags::NONE), Some(InterpreterErrorCode::EvalFalse));
        assert_eq!(run_code(&[OP_1], &[OP_DROP], ScriptFlags::NONE), Some(InterpreterErrorCode::EmptyStack));
        assert_eq!(run_code(&[OP_1], &[OP_0], ScriptFlags::NONE), Some(InterpreterErrorCode::EvalFalse));
        assert_eq!(
            run_code(&[OP_1], &[OP_VERIFY, OP_0, OP_VERIFY], ScriptFlags::NONE),
            Some(InterpreterErrorCode::Verify)
        );
        // Malformed push in the locking script.
        assert_eq!(
            run_code(&[OP_1], &[OP_PUSHDATA1, 0x05, 0x01], ScriptFlags::NONE),
            Some(InterpreterErrorCode::MalformedPush)
        );
        // A locking script may be empty.
        assert!(run(&[OP_1], &[], ScriptFlags::NONE).is_ok());
    }

    #[test]
    fn test_stack_opcodes() {
        let cases: Vec<(Vec<u8>, Vec<u8>)> = vec![
            (vec![OP_1, OP_2, OP_3], vec![OP_DEPTH, OP_3, OP_EQUALVERIFY, OP_2DROP]),
            (vec![OP_1, OP_2, OP_3], vec![OP_ROT, OP_1, OP_EQUALVERIFY, OP_2DROP, OP_1]),
            (vec![OP_1, OP_2], vec![OP_TUCK, OP_2, OP_EQUALVERIFY, OP_1, OP_EQUALVERIFY]),
            (vec![OP_1, OP_2], vec![OP_2DUP, OP_2, OP_EQUALVERIFY, OP_1, OP_EQUALVERIFY, OP_2DROP, OP_1]),
            (vec![OP_1, OP_2, OP_3], vec![OP_2, OP_PICK, OP_1, OP_EQUALVERIFY, OP_2DROP]),
            (vec![OP_1, OP_2, OP_3], vec![OP_2, OP_ROLL, OP_1, OP_EQUALVERIFY, OP_DEPTH, OP_2, OP_EQUAL]),
            (vec![OP_1, OP_2], vec![OP_SWAP, OP_1, OP_EQUALVERIFY]),
            (vec![OP_1, OP_2], vec![OP_OVER, OP_1, OP_EQUALVERIFY, OP_DROP]),
            (vec![OP_0], vec![OP_IFDUP, OP_DEPTH, OP_1, OP_EQUALVERIFY, OP_NOT]),
            (vec![OP_5], vec![OP_IFDUP, OP_DEPTH, OP_2, OP_EQUALVERIFY, OP_EQUAL]),
            (vec![OP_1, OP_2, OP_3, OP_4], vec![OP_2SWAP, OP_2, OP_EQUALVERIFY, OP_1, OP_EQUALVERIFY, OP_2DROP, OP_1]),
            (vec![OP_1, OP_2, OP_3, OP_4], vec![OP_2OVER, OP_2, OP_EQUALVERIFY, OP_1, OP_EQUALVERIFY, OP_2DROP, OP_2DROP, OP_1]),
            (vec![OP_1, OP_2, OP_3], vec![OP_3DUP, OP_DEPTH, OP_6, OP_EQUALVERIFY, OP_2DROP, OP_2DROP, OP_2DROP, OP_1]),
            (vec![OP_1, OP_2, OP_3, OP_4, OP_5, OP_6], vec![OP_2ROT, OP_2, OP_EQUALVERIFY, OP_1, OP_EQUALVERIFY, OP_2DROP, OP_2DROP, OP_1]),
            (vec![OP_1, OP_2], vec![OP_NIP, OP_2, OP_EQUAL]),
            (vec![OP_7], vec![OP_TOALTSTACK, OP_1, OP_FROMALTSTACK, OP_7, OP_EQUALVERIFY]),
        ];
        for (unlock, lock) in cases {
            assert!(
                run(&unlock, &lock, ScriptFlags::NONE).is_ok(),
                "{} / {}",
                unparse_asm(&unlock),
                unparse_asm(&lock)
            );
        }

        assert_eq!(
            run_code(&[OP_1, OP_2], &[OP_2, OP_PICK], ScriptFlags::NONE),
            Some(InterpreterErrorCode::InvalidStackOperation)
        );
        assert_eq!(
            run_code(&[OP_1], &[OP_1NEGATE, OP_ROLL], ScriptFlags::NONE),
            Some(InterpreterErrorCode::InvalidStackOperation)
        );
    }

    #[test]
    fn test_alt_stack_cleared_between_scripts() {
        assert_eq!(
            run_code(&[OP_1, OP_TOALTSTACK], &[OP_FROMALTSTACK], ScriptFlags::NONE),
            Some(InterpreterErrorCode::InvalidStackOperation)
        );
    }

    #[test]
    fn test_hash_opcodes() {
        let sha256_empty =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855").unwrap();
        let sha1_empty = hex::decode("da39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap();
        let ripemd_empty = hex::decode("9c1185a5c5e9fc54612808977ee8f548b2258d31").unwrap();
        for (op, expected) in [(OP_SHA256, sha256_empty), (OP_SHA1, sha1_empty), (OP_RIPEMD160, ripemd_empty)] {
            let mut lock = Script::from_bytes(&[op]);
            lock.append_push_data(&expected).unwrap();
            lock.append_opcodes(&[OP_EQUAL]).unwrap();
            assert!(
                Engine::new().execute(&Script::from_bytes(&[OP_0]), &lock, ScriptFlags::NONE, None, 0).is_ok(),
                "{}",
                opcode_to_string(op)
            );
        }
    }

    #[test]
    fn test_minimal_data() {
        let unlock = [OP_DATA_1, 0x05];
        let lock = [OP_5, OP_EQUAL];
        assert!(run(&unlock, &lock, ScriptFlags::NONE).is_ok());
        assert_eq!(
            run_code(&unlock, &lock, ScriptFlags::VERIFY_MINIMAL_DATA),
            Some(InterpreterErrorCode::MinimalData)
        );
        // Non-minimal numeric operand.
        assert_eq!(
            run_code(&[OP_DATA_2, 0x05, 0x00], &[OP_1ADD], ScriptFlags::VERIFY_MINIMAL_DATA),
            Some(InterpreterErrorCode::MinimalData)
        );
    }

    #[test]
    fn test_upgradable_nops() {
        assert!(run(&[OP_1], &[OP_NOP1, OP_NOP10], ScriptFlags::NONE).is_ok());
        assert_eq!(
            run_code(&[OP_1], &[OP_NOP5], ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS),
            Some(InterpreterErrorCode::DiscourageUpgradableNOPs)
        );
        // CLTV/CSV fall back to NOPs without their flags.
        assert!(run(&[OP_1], &[OP_NOP2, OP_NOP3], ScriptFlags::NONE).is_ok());
        assert_eq!(
            run_code(&[OP_1], &[OP_NOP2], ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS),
            Some(InterpreterErrorCode::DiscourageUpgradableNOPs)
        );
        assert!(run(&[OP_1], &[OP_NOP], ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS).is_ok());
    }

    #[test]
    fn test_flag_combinations() {
        assert_eq!(
            run_code(&[OP_1], &[OP_1], ScriptFlags::VERIFY_CLEAN_STACK),
            Some(InterpreterErrorCode::InvalidFlags)
        );
        let clean = ScriptFlags::VERIFY_CLEAN_STACK | ScriptFlags::BIP16;
        assert_eq!(run_code(&[OP_1], &[OP_1], clean), Some(InterpreterErrorCode::CleanStack));
        assert!(run(&[OP_1], &[], clean).is_ok());

        assert_eq!(
            run_code(&[OP_1, OP_DUP], &[OP_EQUAL], ScriptFlags::VERIFY_SIG_PUSH_ONLY),
            Some(InterpreterErrorCode::NotPushOnly)
        );
    }

    fn p2pkh_lock(pk: &[u8]) -> Script {
        let mut lock = Script::from_bytes(&[OP_DUP, OP_HASH160]);
        lock.append_push_data(&hash160(pk)).unwrap();
        lock.append_opcodes(&[OP_EQUALVERIFY, OP_CHECKSIG]).unwrap();
        lock
    }

    #[test]
    fn test_checksig_p2pkh() {
        let k = key(8675309);
        let pk = k.pub_key().to_compressed();
        let lock = p2pkh_lock(&pk);
        let tx = MockTx::default();

        let sig = sign(&k, &lock, 0x01);
        assert!(run_tx(&pushes(&[&sig, &pk]), &lock, ScriptFlags::BIP16, &tx).is_ok());

        // Wrong flag byte changes the digest.
        let mut bad = sig.clone();
        *bad.last_mut().unwrap() = 0x02;
        let err = run_tx(&pushes(&[&bad, &pk]), &lock, ScriptFlags::BIP16, &tx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::EvalFalse);

        // Empty signature pushes false.
        let err = run_tx(&pushes(&[&[], &pk]), &lock, ScriptFlags::BIP16, &tx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::EvalFalse);

        // Key that does not hash to the locked hash.
        let other = key(42).pub_key().to_compressed();
        let err = run_tx(&pushes(&[&sig, &other]), &lock, ScriptFlags::BIP16, &tx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::EqualVerify);
    }

    #[test]
    fn test_checksig_requires_context() {
        let k = key(7);
        let pk = k.pub_key().to_compressed();
        let mut lock = pushes(&[&pk]);
        lock.append_opcodes(&[OP_CHECKSIG]).unwrap();
        let sig = sign(&k, &lock, 0x01);
        let err = Engine::new()
            .execute(&pushes(&[&sig]), &lock, ScriptFlags::NONE, None, 0)
            .unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::InvalidParams);
    }

    #[test]
    fn test_checksigverify() {
        let k = key(11);
        let pk = k.pub_key().to_compressed();
        let mut lock = pushes(&[&pk]);
        lock.append_opcodes(&[OP_CHECKSIGVERIFY, OP_1]).unwrap();
        let tx = MockTx::default();

        let sig = sign(&k, &lock, 0x01);
        assert!(run_tx(&pushes(&[&sig]), &lock, ScriptFlags::NONE, &tx).is_ok());

        let wrong = sign(&key(12), &lock, 0x01);
        let err = run_tx(&pushes(&[&wrong]), &lock, ScriptFlags::NONE, &tx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::CheckSigVerify);
    }

    #[test]
    fn test_code_separator_cuts_script_code() {
        let k = key(99);
        let pk = k.pub_key().to_compressed();
        let mut lock = Script::from_bytes(&[OP_NOP, OP_CODESEPARATOR]);
        lock.append_push_data(&pk).unwrap();
        lock.append_opcodes(&[OP_CHECKSIG]).unwrap();

        let mut script_code = pushes(&[&pk]);
        script_code.append_opcodes(&[OP_CHECKSIG]).unwrap();

        let tx = MockTx::default();
        let sig = sign(&k, &script_code, 0x01);
        assert!(run_tx(&pushes(&[&sig]), &lock, ScriptFlags::NONE, &tx).is_ok());

        let sig_full = sign(&k, &lock, 0x01);
        assert!(run_tx(&pushes(&[&sig_full]), &lock, ScriptFlags::NONE, &tx).is_err());
    }

    #[test]
    fn test_signature_removed_from_script_code() {
        // The locking script itself contains the signature push; the
        // legacy digest signs the script with it removed.
        let k = key(5);
        let pk = k.pub_key().to_compressed();
        let mut script_code = Script::from_bytes(&[OP_DROP]);
        script_code.append_push_data(&pk).unwrap();
        script_code.append_opcodes(&[OP_CHECKSIG]).unwrap();
        let sig = sign(&k, &script_code, 0x01);

        let mut lock = pushes(&[&sig]);
        lock.append_opcodes(&[OP_DROP]).unwrap();
        lock.append_push_data(&pk).unwrap();
        lock.append_opcodes(&[OP_CHECKSIG]).unwrap();

        assert!(run_tx(&pushes(&[&sig]), &lock, ScriptFlags::NONE, &MockTx::default()).is_ok());
    }

    #[test]
    fn test_fork_id_required() {
        let k = key(3);
        let pk = k.pub_key().to_compressed();
        let lock = p2pkh_lock(&pk);
        let tx = MockTx::default();
        let flags = ScriptFlags::BIP16 | ScriptFlags::ENABLE_SIGHASH_FORKID;

        let legacy = sign(&k, &lock, 0x01);
        let err = run_tx(&pushes(&[&legacy, &pk]), &lock, flags, &tx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::IllegalForkID);

        let forkid = sign(&k, &lock, 0x41);
        assert!(run_tx(&pushes(&[&forkid, &pk]), &lock, flags, &tx).is_ok());
    }

    fn multisig_lock(m: u8, keys: &[&PrivateKey]) -> Script {
        let mut lock = Script::from_bytes(&[OP_1 - 1 + m]);
        for k in keys {
            lock.append_push_data(&k.pub_key().to_compressed()).unwrap();
        }
        lock.append_opcodes(&[OP_1 - 1 + keys.len() as u8, OP_CHECKMULTISIG]).unwrap();
        lock
    }

    #[test]
    fn test_checkmultisig() {
        let (k1, k2, k3) = (key(1), key(2), key(3));
        let lock = multisig_lock(2, &[&k1, &k2, &k3]);
        let tx = MockTx::default();
        let s1 = sign(&k1, &lock, 0x01);
        let s2 = sign(&k2, &lock, 0x01);
        let s3 = sign(&k3, &lock, 0x01);

        for (a, b) in [(&s1, &s2), (&s1, &s3), (&s2, &s3)] {
            assert!(run_tx(&pushes(&[&[], a, b]), &lock, ScriptFlags::NONE, &tx).is_ok());
        }

        // Signatures out of key order fail.
        let err = run_tx(&pushes(&[&[], &s2, &s1]), &lock, ScriptFlags::NONE, &tx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::EvalFalse);

        // The dummy element must be present.
        let err = run_tx(&pushes(&[&s1, &s2]), &lock, ScriptFlags::NONE, &tx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::InvalidStackOperation);

        // and empty under STRICT_MULTI_SIG.
        assert!(run_tx(&pushes(&[&[7], &s1, &s2]), &lock, ScriptFlags::NONE, &tx).is_ok());
        let err = run_tx(&pushes(&[&[7], &s1, &s2]), &lock, ScriptFlags::STRICT_MULTI_SIG, &tx)
            .unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::SigNullDummy);
    }

    #[test]
    fn test_checkmultisig_counts() {
        // 0-of-0 succeeds without a context.
        assert!(run(&[OP_0], &[OP_0, OP_0, OP_CHECKMULTISIG], ScriptFlags::NONE).is_ok());

        let mut lock = Script::from_bytes(&[OP_0]);
        lock.append_push_data(&[21]).unwrap();
        lock.append_opcodes(&[OP_CHECKMULTISIG]).unwrap();
        let err = Engine::new()
            .execute(&Script::from_bytes(&[OP_0]), &lock, ScriptFlags::NONE, None, 0)
            .unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::InvalidPubKeyCount);

        assert_eq!(
            run_code(&[OP_0, OP_0], &[OP_2, OP_0, OP_1, OP_CHECKMULTISIG], ScriptFlags::NONE),
            Some(InterpreterErrorCode::InvalidSignatureCount)
        );

        // Each key counts toward the operation limit.
        let mut lock = vec![OP_NOP; MAX_OPS_PER_SCRIPT - 5];
        lock.extend([OP_0, OP_16]);
        lock.extend(vec![OP_0; 16]);
        lock.extend([OP_16, OP_CHECKMULTISIG]);
        let unlock = [OP_0];
        assert_eq!(run_code(&unlock, &lock, ScriptFlags::NONE), Some(InterpreterErrorCode::TooManyOperations));
    }

    #[test]
    fn test_p2sh() {
        let redeem = Script::from_bytes(&[OP_2, OP_EQUAL]);
        let mut lock = Script::from_bytes(&[OP_HASH160]);
        lock.append_push_data(&hash160(redeem.to_bytes())).unwrap();
        lock.append_opcodes(&[OP_EQUAL]).unwrap();
        assert!(lock.is_p2sh());

        let mut unlock = Script::from_bytes(&[OP_2]);
        unlock.append_push_data(redeem.to_bytes()).unwrap();
        let engine = Engine::new();
        assert!(engine.execute(&unlock, &lock, ScriptFlags::BIP16, None, 0).is_ok());

        let mut wrong = Script::from_bytes(&[OP_3]);
        wrong.append_push_data(redeem.to_bytes()).unwrap();
        let err = engine.execute(&wrong, &lock, ScriptFlags::BIP16, None, 0).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::EvalFalse);
        // Without BIP16 only the hash is checked.
        assert!(engine.execute(&wrong, &lock, ScriptFlags::NONE, None, 0).is_ok());

        let mut not_push = Script::from_bytes(&[OP_2, OP_NOP]);
        not_push.append_push_data(redeem.to_bytes()).unwrap();
        let err = engine.execute(&not_push, &lock, ScriptFlags::BIP16, None, 0).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::NotPushOnly);
    }

    #[test]
    fn test_p2sh_multisig() {
        let (k1, k2) = (key(21), key(22));
        let redeem = multisig_lock(1, &[&k1, &k2]);
        let mut lock = Script::from_bytes(&[OP_HASH160]);
        lock.append_push_data(&hash160(redeem.to_bytes())).unwrap();
        lock.append_opcodes(&[OP_EQUAL]).unwrap();

        let sig = sign(&k2, &redeem, 0x01);
        let unlock = pushes(&[&[], &sig, redeem.to_bytes()]);
        assert!(run_tx(&unlock, &lock, ScriptFlags::BIP16, &MockTx::default()).is_ok());
    }

    fn cltv_lock(n: &[u8], op: u8) -> Script {
        let mut lock = pushes(&[n]);
        lock.append_opcodes(&[op, OP_DROP, OP_1]).unwrap();
        lock
    }

    #[test]
    fn test_check_locktime_verify() {
        let flags = ScriptFlags::VERIFY_CHECKLOCKTIMEVERIFY;
        let tx = MockTx { lock_time: 100, version: 1, sequence: 0 };
        let empty = Script::new();

        assert!(run_tx(&empty, &cltv_lock(&[100], OP_CHECKLOCKTIMEVERIFY), flags, &tx).is_ok());
        assert!(run_tx(&empty, &cltv_lock(&[99], OP_CHECKLOCKTIMEVERIFY), flags, &tx).is_ok());

        let err = run_tx(&empty, &cltv_lock(&[101], OP_CHECKLOCKTIMEVERIFY), flags, &tx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::UnsatisfiedLockTime);

        let err = run_tx(&empty, &cltv_lock(&[0x81], OP_CHECKLOCKTIMEVERIFY), flags, &tx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::NegativeLockTime);

        let final_tx = MockTx { lock_time: 100, version: 1, sequence: 0xffffffff };
        let err = run_tx(&empty, &cltv_lock(&[100], OP_CHECKLOCKTIMEVERIFY), flags, &final_tx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::UnsatisfiedLockTime);

        // Ignored without the flag.
        assert!(run_tx(&empty, &cltv_lock(&[101], OP_CHECKLOCKTIMEVERIFY), ScriptFlags::NONE, &tx).is_ok());
    }

    #[test]
    fn test_check_sequence_verify() {
        let flags = ScriptFlags::VERIFY_CHECKSEQUENCEVERIFY;
        let tx = MockTx { lock_time: 0, version: 2, sequence: 10 };
        let empty = Script::new();

        assert!(run_tx(&empty, &cltv_lock(&[5], OP_CHECKSEQUENCEVERIFY), flags, &tx).is_ok());

        let err = run_tx(&empty, &cltv_lock(&[11], OP_CHECKSEQUENCEVERIFY), flags, &tx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::UnsatisfiedLockTime);

        let v1 = MockTx { version: 1, ..tx };
        let err = run_tx(&empty, &cltv_lock(&[5], OP_CHECKSEQUENCEVERIFY), flags, &v1).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::UnsatisfiedLockTime);

        // Disable bit in the operand turns the check off.
        let disabled = [0, 0, 0, 0x80, 0];
        assert!(run_tx(&empty, &cltv_lock(&disabled, OP_CHECKSEQUENCEVERIFY), flags, &v1).is_ok());
    }
}
