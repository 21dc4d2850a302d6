#![deny(missing_docs)]

//! Forkchain SDK.
//!
//! Re-exports the transaction codec, signature-hash engine, script
//! interpreter and signing primitives for single-crate usage.

pub use forkchain_primitives as primitives;
pub use forkchain_script as script;
pub use forkchain_transaction as transaction;
