//! Pay-to-Public-Key-Hash (P2PKH) script template.
//!
//! Creates standard P2PKH locking scripts (`OP_DUP OP_HASH160 <hash>
//! OP_EQUALVERIFY OP_CHECKSIG`) and unlocking scripts (`<sig> <pubkey>`).

use forkchain_primitives::ec::{PublicKey, Signature};
use forkchain_script::opcodes::*;
use forkchain_script::Script;

use crate::sighash::SighashFlag;
use crate::TransactionError;

/// Create a P2PKH locking script from a public key hash.
///
/// Produces: `OP_DUP OP_HASH160 <20-byte pubkey hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn lock(pub_key_hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(25);
    bytes.push(OP_DUP);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(pub_key_hash);
    bytes.push(OP_EQUALVERIFY);
    bytes.push(OP_CHECKSIG);
    Script::from(bytes)
}

/// Build the unlocking script `<DER_sig || hash_type> <compressed_pubkey>`.
///
/// # Arguments
/// * `signature` - The ECDSA signature over the input's digest.
/// * `flag` - The sighash flag the digest was computed with.
/// * `pub_key` - The key matching the locked hash.
pub fn unlock(
    signature: &Signature,
    flag: SighashFlag,
    pub_key: &PublicKey,
) -> Result<Script, TransactionError> {
    let der_sig = signature.to_der();
    let mut sig_buf = Vec::with_capacity(der_sig.len() + 1);
    sig_buf.extend_from_slice(&der_sig);
    sig_buf.push(flag.to_byte());

    let mut script = Script::new();
    script.append_push_data(&sig_buf)?;
    script.append_push_data(&pub_key.to_compressed())?;
    Ok(script)
}
