/// Error types for transaction operations.
///
/// A script that merely fails to evaluate is not an error: `verify_input`
/// reports it as `Ok(false)`. Only structural defects surface here.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Truncated bytes, a length running past the end, or trailing data.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),
    /// The previous output an input spends could not be resolved.
    #[error("missing utxo data: {0}")]
    MissingUtxoData(String),
    /// SIGHASH_SINGLE on an input with no output at the same index.
    #[error("sighash single on input {index} but transaction has {outputs} outputs")]
    InvalidSighashTarget { index: usize, outputs: usize },
    /// The unlocking or locking script is structurally defective.
    #[error("invalid script: {0}")]
    InvalidScript(String),
    /// A wire encoding this codec does not handle (segwit marker).
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),
    /// Signing failed or produced an unusable unlocking script.
    #[error("signing error: {0}")]
    Signing(String),
    #[error("input index {index} out of range (tx has {inputs} inputs)")]
    InputIndexOutOfRange { index: usize, inputs: usize },
    /// The 32-bit value does not name a known base sighash type.
    #[error("invalid sighash flag {0:#010x}")]
    InvalidSighashFlag(u32),
    /// Summed amounts, or the fee, left the integer range.
    #[error("amount overflow: {0}")]
    AmountOverflow(String),
    #[error("unknown chain: {0}")]
    UnknownChain(String),
    /// Fork id and digest algorithm disagree.
    #[error("inconsistent chain variant: {0}")]
    InconsistentChain(String),
    /// An underlying script error (forwarded from `forkchain-script`).
    #[error("script error: {0}")]
    Script(#[from] forkchain_script::ScriptError),
    /// An underlying primitives error (forwarded from `forkchain-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] forkchain_primitives::PrimitivesError),
}

/// Map a reader error to `MalformedTransaction`, naming the field read.
pub(crate) fn malformed(
    field: &'static str,
) -> impl FnOnce(forkchain_primitives::PrimitivesError) -> TransactionError {
    move |e| TransactionError::MalformedTransaction(format!("reading {}: {}", field, e))
}
