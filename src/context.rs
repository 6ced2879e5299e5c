//! Consensus rule activation flags and per-evaluation execution context.
//!
//! Grounded on `chain_state.cpp`'s `flags` enum: each soft fork is a single
//! bit so a transaction or block can be evaluated against the exact rule
//! set active at its height, including historical rule sets needed to
//! revalidate old blocks.

/// Bitmask of consensus rules active for a given evaluation.
///
/// Each soft fork after BIP16 is additive: later rules only ever restrict
/// behavior that earlier rules allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Forks(u32);

impl Forks {
    pub const NONE: Forks = Forks(0);
    /// BIP16: pay-to-script-hash.
    pub const BIP16: Forks = Forks(1 << 0);
    /// BIP30: reject duplicate unspent coinbase transaction ids.
    pub const BIP30: Forks = Forks(1 << 1);
    /// BIP34: coinbase must commit to block height.
    pub const BIP34: Forks = Forks(1 << 2);
    /// BIP65: `OP_CHECKLOCKTIMEVERIFY`.
    pub const BIP65: Forks = Forks(1 << 3);
    /// BIP66: strict DER signature encoding.
    pub const BIP66: Forks = Forks(1 << 4);
    /// BIP68: relative lock-time using consensus-enforced sequence numbers.
    pub const BIP68: Forks = Forks(1 << 5);
    /// BIP112: `OP_CHECKSEQUENCEVERIFY`.
    pub const BIP112: Forks = Forks(1 << 6);
    /// BIP113: median-time-past as the locktime comparison point.
    pub const BIP113: Forks = Forks(1 << 7);
    /// BIP141: segregated witness.
    pub const BIP141: Forks = Forks(1 << 8);
    /// BIP143: version-0 witness signature hashing.
    pub const BIP143: Forks = Forks(1 << 9);
    /// BIP147: null-dummy (`OP_CHECKMULTISIG` extra item must be empty).
    pub const BIP147: Forks = Forks(1 << 10);
    /// BIP341: taproot.
    pub const BIP341: Forks = Forks(1 << 11);
    /// BIP342: tapscript.
    pub const BIP342: Forks = Forks(1 << 12);

    /// All rules active on current mainnet tip policy.
    pub const ALL: Forks = Forks(
        Self::BIP16.0
            | Self::BIP30.0
            | Self::BIP34.0
            | Self::BIP65.0
            | Self::BIP66.0
            | Self::BIP68.0
            | Self::BIP112.0
            | Self::BIP113.0
            | Self::BIP141.0
            | Self::BIP143.0
            | Self::BIP147.0
            | Self::BIP341.0
            | Self::BIP342.0,
    );

    pub fn contains(self, rule: Forks) -> bool {
        self.0 & rule.0 == rule.0
    }

    pub fn union(self, other: Forks) -> Forks {
        Forks(self.0 | other.0)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Forks {
        Forks(bits)
    }
}

impl std::ops::BitOr for Forks {
    type Output = Forks;
    fn bitor(self, rhs: Forks) -> Forks {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for Forks {
    fn bitor_assign(&mut self, rhs: Forks) {
        *self = self.union(rhs);
    }
}

/// Which segment of a transaction's prevout script is driving the current
/// evaluation, relevant to the sighash algorithm and script-version
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptVersion {
    /// Pre-segwit scriptSig/scriptPubKey evaluation.
    Unversioned,
    /// BIP141/143 version-0 witness program.
    SegwitV0,
    /// BIP341/342 version-1 (taproot) witness program, key-path spend.
    TaprootKeyPath,
    /// BIP341/342 version-1 (taproot) witness program, script-path spend.
    TaprootScriptPath,
}

/// Everything a single script evaluation needs to know about the
/// transaction context it runs in, beyond the script and stack themselves.
///
/// Distinct from [`crate::chain_state::ChainState`]: this is per-input,
/// that is per-block.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext {
    pub forks: Forks,
    pub script_version: ScriptVersion,
    /// Value of the output being spent, required for taproot/segwit
    /// sighash computation and BIP143's input amount commitment.
    pub input_value: u64,
}

impl ExecutionContext {
    pub fn new(forks: Forks, script_version: ScriptVersion, input_value: u64) -> Self {
        ExecutionContext {
            forks,
            script_version,
            input_value,
        }
    }

    pub fn is_enabled(&self, rule: Forks) -> bool {
        self.forks.contains(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_combines_bits() {
        let f = Forks::BIP16 | Forks::BIP66;
        assert!(f.contains(Forks::BIP16));
        assert!(f.contains(Forks::BIP66));
        assert!(!f.contains(Forks::BIP34));
    }

    #[test]
    fn all_contains_every_named_rule() {
        assert!(Forks::ALL.contains(Forks::BIP342));
        assert!(Forks::ALL.contains(Forks::BIP16));
    }

    #[test]
    fn none_contains_nothing() {
        assert!(!Forks::NONE.contains(Forks::BIP16));
    }

    #[test]
    fn bits_round_trip() {
        let f = Forks::BIP141 | Forks::BIP143;
        assert_eq!(Forks::from_bits(f.bits()), f);
    }

    #[test]
    fn execution_context_is_enabled_reflects_forks() {
        let ctx = ExecutionContext::new(Forks::BIP65, ScriptVersion::Unversioned, 1_000);
        assert!(ctx.is_enabled(Forks::BIP65));
        assert!(!ctx.is_enabled(Forks::BIP66));
    }
}
