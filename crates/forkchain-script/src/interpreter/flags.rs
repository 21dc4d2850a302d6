//! Script verification flags (bitmask).

use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Script verification flags controlling interpreter behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScriptFlags(pub u32);

impl ScriptFlags {
    pub const NONE: ScriptFlags = ScriptFlags(0);
    /// Evaluate pay-to-script-hash redeem scripts.
    pub const BIP16: ScriptFlags = ScriptFlags(1 << 0);
    /// Require the CHECKMULTISIG dummy element to be empty.
    pub const STRICT_MULTI_SIG: ScriptFlags = ScriptFlags(1 << 1);
    pub const DISCOURAGE_UPGRADABLE_NOPS: ScriptFlags = ScriptFlags(1 << 2);
    pub const VERIFY_CHECKLOCKTIMEVERIFY: ScriptFlags = ScriptFlags(1 << 3);
    pub const VERIFY_CHECKSEQUENCEVERIFY: ScriptFlags = ScriptFlags(1 << 4);
    /// Require exactly one stack element after evaluation. Needs BIP16.
    pub const VERIFY_CLEAN_STACK: ScriptFlags = ScriptFlags(1 << 5);
    pub const VERIFY_MINIMAL_DATA: ScriptFlags = ScriptFlags(1 << 6);
    pub const VERIFY_SIG_PUSH_ONLY: ScriptFlags = ScriptFlags(1 << 7);
    /// Signatures must carry the fork-id bit and skip FindAndDelete.
    pub const ENABLE_SIGHASH_FORKID: ScriptFlags = ScriptFlags(1 << 8);

    pub fn has_flag(self, flag: ScriptFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn add_flag(&mut self, flag: ScriptFlags) {
        self.0 |= flag.0;
    }
}

impl BitOr for ScriptFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        ScriptFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ScriptFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ScriptFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        ScriptFlags(self.0 & rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_combination() {
        let mut flags = ScriptFlags::BIP16 | ScriptFlags::ENABLE_SIGHASH_FORKID;
        assert!(flags.has_flag(ScriptFlags::BIP16));
        assert!(!flags.has_flag(ScriptFlags::VERIFY_CLEAN_STACK));
        flags.add_flag(ScriptFlags::VERIFY_CLEAN_STACK);
        assert!(flags.has_flag(ScriptFlags::BIP16 | ScriptFlags::VERIFY_CLEAN_STACK));
        assert_eq!(flags & ScriptFlags::BIP16, ScriptFlags::BIP16);
        assert!(ScriptFlags::NONE.has_flag(ScriptFlags::NONE));
    }
}
