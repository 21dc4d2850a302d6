/// Errors from building, decoding and templating scripts and addresses.
///
/// Evaluation failures are not here: the interpreter reports those as
/// `InterpreterError`.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A push runs past the end of the script.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data longer than a 4-byte length prefix can describe.
    #[error("data too big")]
    DataTooBig,

    /// Unknown token or bad push in assembly text.
    #[error("invalid opcode data")]
    InvalidOpcodeData,

    /// `append_opcodes` was handed a push opcode.
    #[error("use append_push_data for push data funcs: {0}")]
    InvalidOpcodeType(String),

    #[error("script is empty")]
    EmptyScript,

    #[error("not a P2PKH")]
    NotP2PKH,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The chain has no template for this address version byte.
    #[error("address version {0:#04x} not supported")]
    UnsupportedAddress(u8),

    #[error("primitives error: {0}")]
    Primitives(#[from] forkchain_primitives::PrimitivesError),
}
