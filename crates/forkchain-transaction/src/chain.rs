//! Chain variants.
//!
//! Every supported chain shares the legacy transaction wire format and the
//! script opcode set. What differs is plain data: which signature hash
//! algorithm applies, the fork identifier merged into sighash flags, and
//! the address version bytes.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use forkchain_primitives::ec::PublicKey;
use forkchain_script::interpreter::ScriptFlags;
use forkchain_script::{Address, Script, ScriptError};

use crate::sighash::SighashFlag;
use crate::template::{p2pkh, p2sh};
use crate::TransactionError;

/// Parameters of one chain.
///
/// A chain has a fork id exactly when it uses the preimage algorithm;
/// deserializing a variant that breaks this fails with
/// `InconsistentChain`. Can be loaded from JSON:
///
/// ```ignore
/// let chain: ChainVariant = serde_json::from_str(r#"{
///     "name": "bitcoin-gold",
///     "fork_id": 79,
///     "uses_preimage_algorithm": true,
///     "p2pkh_version": 38,
///     "p2sh_version": 23
/// }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ChainVariantFields")]
pub struct ChainVariant {
    pub name: Cow<'static, str>,
    /// Replay-protection identifier; `None` on chains without one.
    #[serde(default)]
    pub fork_id: Option<u32>,
    /// Sign with the fork-id preimage digest instead of the legacy one.
    pub uses_preimage_algorithm: bool,
    pub p2pkh_version: u8,
    pub p2sh_version: u8,
}

/// Unchecked wire form of [`ChainVariant`].
#[derive(Deserialize)]
struct ChainVariantFields {
    name: String,
    #[serde(default)]
    fork_id: Option<u32>,
    uses_preimage_algorithm: bool,
    p2pkh_version: u8,
    p2sh_version: u8,
}

impl TryFrom<ChainVariantFields> for ChainVariant {
    type Error = TransactionError;

    fn try_from(fields: ChainVariantFields) -> Result<Self, Self::Error> {
        let chain = ChainVariant {
            name: Cow::Owned(fields.name),
            fork_id: fields.fork_id,
            uses_preimage_algorithm: fields.uses_preimage_algorithm,
            p2pkh_version: fields.p2pkh_version,
            p2sh_version: fields.p2sh_version,
        };
        chain.validate()?;
        Ok(chain)
    }
}

impl ChainVariant {
    pub const BITCOIN: ChainVariant = ChainVariant {
        name: Cow::Borrowed("bitcoin"),
        fork_id: None,
        uses_preimage_algorithm: false,
        p2pkh_version: 0x00,
        p2sh_version: 0x05,
    };

    pub const BITCOIN_TESTNET: ChainVariant = ChainVariant {
        name: Cow::Borrowed("bitcoin-testnet"),
        fork_id: None,
        uses_preimage_algorithm: false,
        p2pkh_version: 0x6f,
        p2sh_version: 0xc4,
    };

    pub const BITCOIN_CASH: ChainVariant = ChainVariant {
        name: Cow::Borrowed("bitcoin-cash"),
        fork_id: Some(0),
        uses_preimage_algorithm: true,
        p2pkh_version: 0x00,
        p2sh_version: 0x05,
    };

    pub const BITCOIN_SV: ChainVariant = ChainVariant {
        name: Cow::Borrowed("bitcoin-sv"),
        fork_id: Some(0),
        uses_preimage_algorithm: true,
        p2pkh_version: 0x00,
        p2sh_version: 0x05,
    };

    pub const BITCOIN_GOLD: ChainVariant = ChainVariant {
        name: Cow::Borrowed("bitcoin-gold"),
        fork_id: Some(79),
        uses_preimage_algorithm: true,
        p2pkh_version: 38,
        p2sh_version: 23,
    };

    /// All built-in variants.
    pub const BUILTIN: [ChainVariant; 5] = [
        ChainVariant::BITCOIN,
        ChainVariant::BITCOIN_TESTNET,
        ChainVariant::BITCOIN_CASH,
        ChainVariant::BITCOIN_SV,
        ChainVariant::BITCOIN_GOLD,
    ];

    /// Check that the fork id and the digest algorithm agree.
    pub fn validate(&self) -> Result<(), TransactionError> {
        match (self.fork_id, self.uses_preimage_algorithm) {
            (Some(_), true) | (None, false) => Ok(()),
            (Some(id), false) => Err(TransactionError::InconsistentChain(format!(
                "{}: fork id {} without the preimage algorithm",
                self.name, id
            ))),
            (None, true) => Err(TransactionError::InconsistentChain(format!(
                "{}: preimage algorithm without a fork id",
                self.name
            ))),
        }
    }

    /// Interpreter flags for verifying inputs on this chain.
    ///
    /// The final stack must hold exactly one true element. Chains signing
    /// with the preimage algorithm also require the fork-id bit on every
    /// signature.
    pub fn script_flags(&self) -> ScriptFlags {
        let mut flags = ScriptFlags::BIP16 | ScriptFlags::VERIFY_CLEAN_STACK;
        if self.uses_preimage_algorithm {
            flags |= ScriptFlags::ENABLE_SIGHASH_FORKID;
        }
        flags
    }

    /// SIGHASH_ALL, carrying the fork id on fork-id chains.
    pub fn default_sighash(&self) -> SighashFlag {
        match self.fork_id {
            Some(id) => SighashFlag::ALL.with_fork_id(id),
            None => SighashFlag::ALL,
        }
    }

    /// The standard locking script paying to `address`.
    ///
    /// # Returns
    /// A P2PKH or P2SH script according to the address version, or
    /// `UnsupportedAddress` when the version is neither of this chain's.
    pub fn locking_script(&self, address: &Address) -> Result<Script, TransactionError> {
        if address.version == self.p2pkh_version {
            Ok(p2pkh::lock(&address.hash))
        } else if address.version == self.p2sh_version {
            Ok(p2sh::lock(&address.hash))
        } else {
            Err(ScriptError::UnsupportedAddress(address.version).into())
        }
    }

    /// Parse an address string and build its locking script.
    pub fn locking_script_for(&self, address: &str) -> Result<Script, TransactionError> {
        self.locking_script(&Address::from_string(address)?)
    }

    /// The pay-to-public-key-hash address of `pub_key` on this chain.
    pub fn p2pkh_address(&self, pub_key: &PublicKey) -> Address {
        Address::new(self.p2pkh_version, pub_key.hash160())
    }
}

impl Default for ChainVariant {
    fn default() -> Self {
        ChainVariant::BITCOIN
    }
}

impl fmt::Display for ChainVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for ChainVariant {
    type Err = TransactionError;

    /// Look up a built-in variant by name or ticker, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chain = match s.to_ascii_lowercase().as_str() {
            "bitcoin" | "btc" | "mainnet" => ChainVariant::BITCOIN,
            "bitcoin-testnet" | "testnet" | "tbtc" => ChainVariant::BITCOIN_TESTNET,
            "bitcoin-cash" | "bch" => ChainVariant::BITCOIN_CASH,
            "bitcoin-sv" | "bsv" => ChainVariant::BITCOIN_SV,
            "bitcoin-gold" | "btg" => ChainVariant::BITCOIN_GOLD,
            _ => return Err(TransactionError::UnknownChain(s.to_string())),
        };
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_aliases() {
        assert_eq!("BTC".parse::<ChainVariant>().unwrap(), ChainVariant::BITCOIN);
        assert_eq!("testnet".parse::<ChainVariant>().unwrap(), ChainVariant::BITCOIN_TESTNET);
        assert_eq!("bch".parse::<ChainVariant>().unwrap(), ChainVariant::BITCOIN_CASH);
        assert_eq!("Bitcoin-SV".parse::<ChainVariant>().unwrap(), ChainVariant::BITCOIN_SV);
        assert_eq!("btg".parse::<ChainVariant>().unwrap(), ChainVariant::BITCOIN_GOLD);
        assert!(matches!(
            "dogecoin".parse::<ChainVariant>(),
            Err(TransactionError::UnknownChain(name)) if name == "dogecoin"
        ));
        for chain in ChainVariant::BUILTIN {
            assert_eq!(chain.to_string().parse::<ChainVariant>().unwrap(), chain);
        }
    }

    #[test]
    fn test_script_flags() {
        let legacy = ChainVariant::BITCOIN.script_flags();
        assert!(legacy.has_flag(ScriptFlags::BIP16 | ScriptFlags::VERIFY_CLEAN_STACK));
        assert!(!legacy.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID));
        let fork = ChainVariant::BITCOIN_GOLD.script_flags();
        assert!(fork.has_flag(ScriptFlags::BIP16 | ScriptFlags::ENABLE_SIGHASH_FORKID));
    }

    #[test]
    fn test_default_sighash() {
        assert_eq!(ChainVariant::BITCOIN.default_sighash().to_u32(), 0x01);
        assert_eq!(ChainVariant::BITCOIN_CASH.default_sighash().to_u32(), 0x41);
        assert_eq!(ChainVariant::BITCOIN_GOLD.default_sighash().to_u32(), 0x4f41);
    }

    #[test]
    fn test_locking_script_by_version() {
        let p2pkh = ChainVariant::BITCOIN
            .locking_script_for("1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr")
            .unwrap();
        assert_eq!(p2pkh.to_hex(), "76a9148fe80c75c9560e8b56ed64ea3c26e18d2c52211b88ac");

        let hash = [0x11u8; 20];
        let p2sh = ChainVariant::BITCOIN_GOLD
            .locking_script(&Address::new(23, hash))
            .unwrap();
        assert!(p2sh.is_p2sh());

        let err = ChainVariant::BITCOIN_GOLD
            .locking_script(&Address::new(0x00, hash))
            .unwrap_err();
        assert!(matches!(err, TransactionError::Script(ScriptError::UnsupportedAddress(0))));
    }

    #[test]
    fn test_json_roundtrip() {
        let json = r#"{"name":"bitcoin-gold","fork_id":79,"uses_preimage_algorithm":true,"p2pkh_version":38,"p2sh_version":23}"#;
        let chain: ChainVariant = serde_json::from_str(json).unwrap();
        assert_eq!(chain, ChainVariant::BITCOIN_GOLD);
        assert_eq!(serde_json::to_string(&chain).unwrap(), json);

        let legacy: ChainVariant = serde_json::from_str(
            r#"{"name":"regtest","uses_preimage_algorithm":false,"p2pkh_version":111,"p2sh_version":196}"#,
        )
        .unwrap();
        assert_eq!(legacy.fork_id, None);
    }

    #[test]
    fn test_json_rejects_inconsistent_variant() {
        let err = serde_json::from_str::<ChainVariant>(
            r#"{"name":"half-fork","fork_id":7,"uses_preimage_algorithm":false,"p2pkh_version":0,"p2sh_version":5}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("fork id 7 without the preimage algorithm"));

        let err = serde_json::from_str::<ChainVariant>(
            r#"{"name":"no-id","uses_preimage_algorithm":true,"p2pkh_version":0,"p2sh_version":5}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("preimage algorithm without a fork id"));
    }

    #[test]
    fn test_builtins_are_consistent() {
        for chain in ChainVariant::BUILTIN {
            chain.validate().unwrap();
        }
        let mut chain = ChainVariant::BITCOIN;
        chain.fork_id = Some(0);
        assert!(matches!(chain.validate(), Err(TransactionError::InconsistentChain(_))));
    }
}
