//! Interpreter error types.

use std::fmt;

/// Error codes for the script interpreter.
///
/// One code per failure reason. `MalformedPush`, `ScriptTooBig` and
/// `ElementTooBig` describe a structurally defective script; every other
/// code is an ordinary evaluation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterErrorCode {
    InvalidFlags,
    InvalidParams,
    EarlyReturn,
    EmptyStack,
    EvalFalse,
    ScriptTooBig,
    ElementTooBig,
    TooManyOperations,
    StackOverflow,
    InvalidPubKeyCount,
    InvalidSignatureCount,
    NumberTooBig,
    MinimalData,
    Verify,
    EqualVerify,
    NumEqualVerify,
    CheckSigVerify,
    CheckMultiSigVerify,
    DisabledOpcode,
    ReservedOpcode,
    MalformedPush,
    InvalidStackOperation,
    UnbalancedConditional,
    InvalidSigHashType,
    NotPushOnly,
    SigNullDummy,
    CleanStack,
    DiscourageUpgradableNOPs,
    NegativeLockTime,
    UnsatisfiedLockTime,
    IllegalForkID,
}

impl InterpreterErrorCode {
    /// Whether the code describes a structural defect of the script bytes
    /// rather than a failed evaluation.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            InterpreterErrorCode::MalformedPush
                | InterpreterErrorCode::ScriptTooBig
                | InterpreterErrorCode::ElementTooBig
        )
    }
}

impl fmt::Display for InterpreterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A script interpreter error with an error code and description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {description}")]
pub struct InterpreterError {
    pub code: InterpreterErrorCode,
    pub description: String,
}

impl InterpreterError {
    pub fn new(code: InterpreterErrorCode, description: impl Into<String>) -> Self {
        InterpreterError {
            code,
            description: description.into(),
        }
    }
}
