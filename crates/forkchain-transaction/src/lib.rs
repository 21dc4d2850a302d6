/// Forkchain transactions - codec, signature hashing, verification and signing.
///
/// Provides the Transaction type bound to a chain variant, the legacy and
/// fork-id signature hash algorithms, the UTXO resolver seam, and
/// per-input verification and P2PKH signing.

pub mod chain;
pub mod input;
pub mod output;
pub mod resolver;
pub mod sighash;
pub mod template;
pub mod transaction;

mod error;
pub use chain::ChainVariant;
pub use error::TransactionError;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use resolver::{MemoryResolver, UtxoResolver};
pub use sighash::{SighashBase, SighashFlag};
pub use transaction::Transaction;
