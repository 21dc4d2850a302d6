//! Script parsing, address codec and the script interpreter.
//!
//! Provides the `Script` type, opcode definitions, chunk decoding, the
//! Base58Check address codec and a stack-machine interpreter that checks
//! signatures through the `TxContext` seam.

pub mod address;
pub mod chunk;
pub mod interpreter;
pub mod opcodes;
pub mod script;

mod error;
pub use address::Address;
pub use chunk::ScriptChunk;
pub use error::ScriptError;
pub use script::Script;
