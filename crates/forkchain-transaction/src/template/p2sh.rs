//! Pay-to-Script-Hash (P2SH) locking scripts.
//!
//! `OP_HASH160 <hash160(redeem script)> OP_EQUAL`. The unlocking script
//! pushes the arguments and then the redeem script itself.

use forkchain_primitives::hash::hash160;
use forkchain_script::opcodes::*;
use forkchain_script::Script;

/// Lock to a 20-byte script hash.
pub fn lock(script_hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(23);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(script_hash);
    bytes.push(OP_EQUAL);
    Script::from(bytes)
}

/// Lock to the hash of `redeem_script`.
pub fn lock_redeem_script(redeem_script: &Script) -> Script {
    lock(&hash160(redeem_script.to_bytes()))
}
