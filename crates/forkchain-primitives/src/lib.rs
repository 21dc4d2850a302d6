/// Forkchain primitives - hashing, binary codec utilities and secp256k1.
///
/// This crate provides the building blocks shared by the script and
/// transaction crates:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160)
/// - Variable-length integers and a little-endian reader/writer pair
/// - Base58Check encoding/decoding
/// - secp256k1 private keys, public keys and DER-encoded ECDSA signatures

pub mod hash;
pub mod util;
pub mod base58;
pub mod ec;

mod error;
pub use error::PrimitivesError;
