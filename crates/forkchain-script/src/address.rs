//! Base58Check address codec.
//!
//! An address is a version byte followed by a 20-byte hash. Which template
//! the hash belongs to (pubkey hash or script hash) depends on the version
//! bytes of the chain the address is used on, so the codec itself does not
//! interpret the version.

use std::fmt;
use std::str::FromStr;

use forkchain_primitives::base58;
use forkchain_primitives::hash::hash160;

use crate::ScriptError;

/// Length of a decoded address payload: version byte plus hash.
const PAYLOAD_LEN: usize = 21;

/// A decoded address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    /// The version byte.
    pub version: u8,
    /// The 20-byte hash160 payload.
    pub hash: [u8; 20],
}

impl Address {
    /// Create an address from a version byte and a 20-byte hash.
    pub fn new(version: u8, hash: [u8; 20]) -> Self {
        Address { version, hash }
    }

    /// Create an address for a SEC1-encoded public key.
    pub fn from_public_key(version: u8, pub_key: &[u8]) -> Self {
        Address::new(version, hash160(pub_key))
    }

    /// Parse a Base58Check address string.
    ///
    /// # Returns
    /// The decoded address, or `InvalidAddress` for a bad checksum,
    /// alphabet violation or wrong payload length.
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        let payload = base58::check_decode(addr)
            .map_err(|e| ScriptError::InvalidAddress(format!("{}: {}", addr, e)))?;
        if payload.len() != PAYLOAD_LEN {
            return Err(ScriptError::InvalidAddress(format!(
                "{}: payload is {} bytes",
                addr,
                payload.len()
            )));
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[1..]);
        Ok(Address { version: payload[0], hash })
    }
}

impl FromStr for Address {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_string(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = self.version;
        payload[1..].copy_from_slice(&self.hash);
        write!(f, "{}", base58::check_encode(&payload))
    }
}
