//! Standard locking and unlocking script templates.
//!
//! `p2pkh` builds pay-to-public-key-hash scripts and the signature +
//! public key unlocking script that `Transaction::sign_input` installs.
//! `p2sh` builds pay-to-script-hash locking scripts.

pub mod p2pkh;
pub mod p2sh;
