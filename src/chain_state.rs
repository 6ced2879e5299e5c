//! Chain-state flag derivation: activation, retargeting, and
//! median-time-past (spec.md C5 §4.5.2).
//!
//! `Settings`/`ChainState`, the promotion constructors, and the
//! activation/retarget/median-time-past algorithms are grounded almost 1:1
//! on `chain_state.cpp`'s externally observable behavior.

use std::collections::VecDeque;

use crate::block::{Block, Header};
use crate::context::Forks;

/// Blocks between difficulty retargets.
pub const RETARGET_INTERVAL: u64 = 2_016;
/// Target spacing between blocks, in seconds (10 minutes).
pub const TARGET_SPACING_SECONDS: u64 = 600;
/// Target duration of one retarget period, in seconds (two weeks).
pub const TARGET_TIMESPAN_SECONDS: u64 = RETARGET_INTERVAL * TARGET_SPACING_SECONDS;
/// Window size for the historical BIP34/65/66 version-count rule.
pub const ACTIVATION_WINDOW: u64 = 1_000;
/// Fraction of the window needed to activate a historical rule.
pub const ACTIVATION_THRESHOLD: u64 = 750;
/// Fraction of the window needed to enforce a historical rule's minimum
/// block version.
pub const ENFORCEMENT_THRESHOLD: u64 = 950;
/// Number of trailing timestamps `median_time_past` is computed over.
pub const MEDIAN_TIME_SPAN: usize = 11;

/// The two mainnet heights where BIP30's duplicate-coinbase-id rule is
/// grandfathered rather than enforced, copied verbatim as associated
/// constants (not configuration) per spec.md §9.
pub const BIP30_EXCEPTION_HEIGHTS: [u64; 2] = [91_842, 91_880];

/// Network parameters a `ChainState` is built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// The easiest allowed target, as compact bits.
    pub proof_of_work_limit: u32,
    /// Height at which BIP68/BIP112/BIP113 (relative locktime) activate.
    pub bip68_112_113_height: u64,
    /// Height at which BIP141/BIP143/BIP147 (segwit) activate.
    pub bip141_143_147_height: u64,
    /// Height at which BIP341/BIP342 (taproot) activate.
    pub bip341_342_height: u64,
    /// The block version used before any historical rule raises it.
    pub first_version: u32,
    /// Testnet's "20 minutes without a block" easy-target allowance.
    pub testnet_20_minute_rule: bool,
    /// Divide-then-multiply retarget ordering, avoiding the reference
    /// client's undefined-behavior overflow on very-low-difficulty chains.
    pub retarget_overflow_patch: bool,
    /// Anchor the retarget timespan on the second-to-last timestamp rather
    /// than the last, defeating a timestamp-manipulation attack.
    pub time_warp_patch: bool,
}

impl Settings {
    pub fn mainnet() -> Self {
        Settings {
            proof_of_work_limit: 0x1d00_ffff,
            bip68_112_113_height: 419_328,
            bip141_143_147_height: 481_824,
            bip341_342_height: 709_632,
            first_version: 1,
            testnet_20_minute_rule: false,
            retarget_overflow_patch: false,
            time_warp_patch: false,
        }
    }
}

/// The retargeting/activation working set: rolling windows plus the most
/// recently promoted header's fields. Grounded on `chain_state.cpp`'s
/// `data` member.
#[derive(Debug, Clone)]
struct ChainStateData {
    height: u64,
    bits: u32,
    version: u32,
    timestamp: u32,
    cumulative_work: u128,
    recent_versions: VecDeque<u32>,
    recent_timestamps: VecDeque<u32>,
}

impl ChainStateData {
    fn push(&mut self, version: u32, timestamp: u32, bits: u32) {
        self.recent_versions.push_back(version);
        while self.recent_versions.len() > ACTIVATION_WINDOW as usize {
            self.recent_versions.pop_front();
        }
        self.recent_timestamps.push_back(timestamp);
        while self.recent_timestamps.len() > RETARGET_INTERVAL as usize {
            self.recent_timestamps.pop_front();
        }
        self.version = version;
        self.timestamp = timestamp;
        self.bits = bits;
    }
}

/// An immutable-after-construction snapshot of the derived consensus
/// flags at one height. Built only through the promotion constructors.
#[derive(Debug, Clone)]
pub struct ChainState {
    data: ChainStateData,
    settings: Settings,
    activations: Forks,
    minimum_block_version: u32,
    work_required: u32,
    median_time_past: u32,
}

impl ChainState {
    /// Bootstraps a chain state at height 0 from a genesis header's
    /// fields. Every other state is derived from this one via the
    /// promotion constructors.
    pub fn genesis(settings: Settings, version: u32, timestamp: u32, bits: u32) -> Self {
        let data = ChainStateData {
            height: 0,
            bits,
            version,
            timestamp,
            cumulative_work: block_work(bits),
            recent_versions: VecDeque::from([version]),
            recent_timestamps: VecDeque::from([timestamp]),
        };
        Self::finish(data, settings)
    }

    /// Advances a known tip by one height with no concrete header yet, for
    /// mempool-context checks (e.g. the height a new coinbase would need
    /// to commit to). Rolls the windows forward on the tip's own values
    /// and carries `cumulative_work` unchanged.
    pub fn from_pool(top: &ChainState, settings: Settings) -> Self {
        let mut data = top.data.clone();
        data.height += 1;
        let (version, timestamp, bits) = (data.version, data.timestamp, data.bits);
        data.push(version, timestamp, bits);
        Self::finish(data, settings)
    }

    /// Promotes a parent state by stamping a concrete header's fields.
    pub fn from_header(parent: &ChainState, header: &Header, settings: Settings) -> Self {
        let mut data = parent.data.clone();
        data.height += 1;
        data.push(header.version, header.timestamp, header.bits);
        data.cumulative_work = parent.data.cumulative_work + block_work(header.bits);
        Self::finish(data, settings)
    }

    /// Same as [`ChainState::from_header`], taking a full block so future
    /// extensions can also consult the coinbase.
    pub fn from_block(parent: &ChainState, block: &Block, settings: Settings) -> Self {
        Self::from_header(parent, &block.header, settings)
    }

    fn finish(data: ChainStateData, settings: Settings) -> Self {
        let activations = compute_activations(&data, &settings);
        let minimum_block_version = compute_minimum_version(&data);
        let work_required = compute_work_required(&data, &settings);
        let median_time_past = compute_median_time_past(&data);
        ChainState { data, settings, activations, minimum_block_version, work_required, median_time_past }
    }

    pub fn height(&self) -> u64 {
        self.data.height
    }

    pub fn activations(&self) -> Forks {
        self.activations
    }

    pub fn minimum_block_version(&self) -> u32 {
        self.minimum_block_version
    }

    pub fn work_required(&self) -> u32 {
        self.work_required
    }

    pub fn median_time_past(&self) -> u32 {
        self.median_time_past
    }

    pub fn cumulative_work(&self) -> u128 {
        self.data.cumulative_work
    }

    /// The version a block at the next height should signal: the
    /// highest-numbered pending BIP9 bit group if any is supplied,
    /// otherwise the plain bip65/bip66/bip34 version bump implied by the
    /// currently active rules, otherwise the configured first version.
    pub fn signal_version(&self, pending_bip9_bits: &[u8]) -> u32 {
        if let Some(&bit) = pending_bip9_bits.iter().max() {
            return 0x2000_0000 | (1u32 << bit);
        }
        if self.activations.contains(Forks::BIP65) {
            4
        } else if self.activations.contains(Forks::BIP66) {
            3
        } else if self.activations.contains(Forks::BIP34) {
            2
        } else {
            self.settings.first_version.max(1)
        }
    }
}

fn count_version_at_least(versions: &VecDeque<u32>, threshold: u32) -> u64 {
    versions.iter().filter(|&&v| v >= threshold).count() as u64
}

fn compute_activations(data: &ChainStateData, settings: &Settings) -> Forks {
    let mut forks = Forks::BIP16 | Forks::BIP30;
    if count_version_at_least(&data.recent_versions, 2) >= ACTIVATION_THRESHOLD {
        forks |= Forks::BIP34;
    }
    if count_version_at_least(&data.recent_versions, 3) >= ACTIVATION_THRESHOLD {
        forks |= Forks::BIP66;
    }
    if count_version_at_least(&data.recent_versions, 4) >= ACTIVATION_THRESHOLD {
        forks |= Forks::BIP65;
    }
    if data.height >= settings.bip68_112_113_height {
        forks |= Forks::BIP68 | Forks::BIP112 | Forks::BIP113;
    }
    if data.height >= settings.bip141_143_147_height {
        forks |= Forks::BIP141 | Forks::BIP143 | Forks::BIP147;
    }
    if data.height >= settings.bip341_342_height {
        forks |= Forks::BIP341 | Forks::BIP342;
    }
    forks
}

fn compute_minimum_version(data: &ChainStateData) -> u32 {
    let mut version = 1;
    if count_version_at_least(&data.recent_versions, 2) >= ENFORCEMENT_THRESHOLD {
        version = version.max(2);
    }
    if count_version_at_least(&data.recent_versions, 3) >= ENFORCEMENT_THRESHOLD {
        version = version.max(3);
    }
    if count_version_at_least(&data.recent_versions, 4) >= ENFORCEMENT_THRESHOLD {
        version = version.max(4);
    }
    version
}

fn compute_median_time_past(data: &ChainStateData) -> u32 {
    let mut window: Vec<u32> =
        data.recent_timestamps.iter().rev().take(MEDIAN_TIME_SPAN).copied().collect();
    window.sort_unstable();
    window[window.len() / 2]
}

fn compute_work_required(data: &ChainStateData, settings: &Settings) -> u32 {
    let next_height = data.height + 1;
    if next_height % RETARGET_INTERVAL != 0 {
        return data.bits;
    }

    let window = RETARGET_INTERVAL.min(data.recent_timestamps.len() as u64) as usize;
    if window < 2 {
        return data.bits;
    }
    let timestamps: Vec<u32> = data.recent_timestamps.iter().rev().take(window).rev().copied().collect();
    let first = timestamps[0];
    let mut last = *timestamps.last().unwrap();
    if settings.time_warp_patch && timestamps.len() >= 2 {
        last = timestamps[timestamps.len() - 2];
    }

    let min_timespan = TARGET_TIMESPAN_SECONDS / 4;
    let max_timespan = TARGET_TIMESPAN_SECONDS * 4;
    let actual_timespan =
        (last as i64 - first as i64).max(0) as u64;
    let clamped = actual_timespan.clamp(min_timespan, max_timespan);

    let old_target = bits_to_target(data.bits);
    let new_target = if settings.retarget_overflow_patch {
        let reduced = div_by_u64(&old_target, TARGET_TIMESPAN_SECONDS);
        truncate(&mul_by_u64(&reduced, clamped))
    } else {
        let scaled = mul_by_u64(&old_target, clamped);
        div_by_u64(&scaled, TARGET_TIMESPAN_SECONDS)
    };

    let limit_target = bits_to_target(settings.proof_of_work_limit);
    let capped = if new_target > limit_target { limit_target } else { new_target };
    target_to_bits(&capped)
}

/// Expands Bitcoin's compact "nBits" target encoding into a big-endian
/// 256-bit magnitude.
fn bits_to_target(bits: u32) -> [u8; 32] {
    let exponent = (bits >> 24) as i32;
    let mantissa = (bits & 0x007f_ffff).to_be_bytes();
    let mantissa = &mantissa[1..4];
    let mut target = [0u8; 32];
    let shift = exponent - 3;
    if shift >= 0 {
        let shift = shift as usize;
        if shift <= 29 {
            let start = 32 - shift - 3;
            target[start..start + 3].copy_from_slice(mantissa);
        }
    } else {
        let drop = (-shift) as u32 * 8;
        if drop < 24 {
            let value = u32::from_be_bytes([0, mantissa[0], mantissa[1], mantissa[2]]) >> drop;
            target[29..32].copy_from_slice(&value.to_be_bytes()[1..4]);
        }
    }
    target
}

/// Compresses a big-endian 256-bit magnitude back into compact "nBits".
fn target_to_bits(target: &[u8; 32]) -> u32 {
    let first_nonzero = target.iter().position(|&b| b != 0);
    let Some(first_nonzero) = first_nonzero else {
        return 0;
    };
    let mut size = 32 - first_nonzero;
    let mut mantissa_bytes = [0u8; 3];
    if target[first_nonzero] & 0x80 != 0 {
        // Leading bit set: the compact format reserves the top bit as
        // sign, so widen by one byte of padding.
        size += 1;
        mantissa_bytes[1] = target[first_nonzero];
        if first_nonzero + 1 < 32 {
            mantissa_bytes[2] = target[first_nonzero + 1];
        }
    } else {
        mantissa_bytes[0] = target[first_nonzero];
        if first_nonzero + 1 < 32 {
            mantissa_bytes[1] = target[first_nonzero + 1];
        }
        if first_nonzero + 2 < 32 {
            mantissa_bytes[2] = target[first_nonzero + 2];
        }
    }
    let mantissa = u32::from_be_bytes([0, mantissa_bytes[0], mantissa_bytes[1], mantissa_bytes[2]]);
    ((size as u32) << 24) | mantissa
}

/// Multiplies a 256-bit big-endian magnitude by a `u64` factor, returning
/// a 40-byte big-endian buffer wide enough to hold the product without
/// overflow.
fn mul_by_u64(value: &[u8; 32], factor: u64) -> [u8; 40] {
    let mut result = [0u8; 40];
    let mut carry: u128 = 0;
    for i in (0..32).rev() {
        let product = value[i] as u128 * factor as u128 + carry;
        result[i + 8] = (product & 0xff) as u8;
        carry = product >> 8;
    }
    let mut idx = 8;
    while carry > 0 && idx > 0 {
        idx -= 1;
        result[idx] = (carry & 0xff) as u8;
        carry >>= 8;
    }
    result
}

/// Divides a big-endian byte buffer by a `u64` divisor, returning the
/// trailing 32 bytes of the quotient.
fn div_by_u64(value: &[u8], divisor: u64) -> [u8; 32] {
    let mut remainder: u128 = 0;
    let mut quotient = vec![0u8; value.len()];
    for (i, &byte) in value.iter().enumerate() {
        let current = (remainder << 8) | byte as u128;
        quotient[i] = (current / divisor as u128) as u8;
        remainder = current % divisor as u128;
    }
    truncate(&quotient)
}

fn truncate(buf: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let start = buf.len().saturating_sub(32);
    let copy_len = (buf.len() - start).min(32);
    out[32 - copy_len..].copy_from_slice(&buf[buf.len() - copy_len..]);
    out
}

/// Approximates the proof-of-work contributed by a block at `bits`, used
/// only to keep a running `cumulative_work` total:
/// `work = (~target / (target + 1)) + 1`.
fn block_work(bits: u32) -> u128 {
    let target = bits_to_target(bits);
    let mut inverted = [0u8; 32];
    for (o, t) in inverted.iter_mut().zip(target.iter()) {
        *o = !t;
    }
    let mut divisor = target;
    for byte in divisor.iter_mut().rev() {
        if *byte == 0xff {
            *byte = 0;
        } else {
            *byte += 1;
            break;
        }
    }
    let quotient = div256(&inverted, &divisor);
    let mut low16 = [0u8; 16];
    low16.copy_from_slice(&quotient[16..32]);
    u128::from_be_bytes(low16).saturating_add(1)
}

/// Binary long division of two 256-bit big-endian magnitudes.
fn div256(dividend: &[u8; 32], divisor: &[u8; 32]) -> [u8; 32] {
    if divisor == &[0u8; 32] {
        return [0xff; 32];
    }
    let mut remainder = [0u8; 32];
    let mut quotient = [0u8; 32];
    for bit in 0..256 {
        // shift remainder left by 1, pulling in the next dividend bit
        let mut carry = ((dividend[bit / 8] >> (7 - bit % 8)) & 1) as u16;
        for byte in remainder.iter_mut().rev() {
            let shifted = ((*byte as u16) << 1) | carry;
            *byte = (shifted & 0xff) as u8;
            carry = shifted >> 8;
        }
        if remainder >= *divisor {
            let mut borrow = 0i16;
            for i in (0..32).rev() {
                let diff = remainder[i] as i16 - divisor[i] as i16 - borrow;
                if diff < 0 {
                    remainder[i] = (diff + 256) as u8;
                    borrow = 1;
                } else {
                    remainder[i] = diff as u8;
                    borrow = 0;
                }
            }
            quotient[bit / 8] |= 1 << (7 - bit % 8);
        }
    }
    quotient
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_state_has_no_activations() {
        let state = ChainState::genesis(Settings::mainnet(), 1, 1_231_006_505, 0x1d00_ffff);
        assert_eq!(state.height(), 0);
        assert!(state.activations().contains(Forks::BIP16));
        assert!(!state.activations().contains(Forks::BIP34));
    }

    #[test]
    fn bits_target_roundtrip() {
        for bits in [0x1d00_ffffu32, 0x1b0404cb, 0x207fffff] {
            let target = bits_to_target(bits);
            assert_eq!(target_to_bits(&target), bits);
        }
    }

    #[test]
    fn bip34_activates_after_threshold() {
        let mut state = ChainState::genesis(Settings::mainnet(), 1, 0, 0x1d00_ffff);
        for height in 1..=1_000u64 {
            let header = Header {
                version: 2,
                previous_block_hash: [0u8; 32],
                merkle_root: [0u8; 32],
                timestamp: height as u32,
                bits: 0x1d00_ffff,
                nonce: 0,
            };
            state = ChainState::from_header(&state, &header, Settings::mainnet());
        }
        assert!(state.activations().contains(Forks::BIP34));
        assert_eq!(state.minimum_block_version(), 2);
    }

    #[test]
    fn median_time_past_uses_middle_of_sorted_window() {
        let mut data = ChainStateData {
            height: 0,
            bits: 0x1d00_ffff,
            version: 1,
            timestamp: 0,
            cumulative_work: 0,
            recent_versions: VecDeque::new(),
            recent_timestamps: VecDeque::new(),
        };
        for t in [5, 1, 4, 2, 3, 9, 8, 7, 6, 0, 10] {
            data.push(1, t, 0x1d00_ffff);
        }
        assert_eq!(compute_median_time_past(&data), 5);
    }

    #[test]
    fn retarget_clamps_fast_blocks_to_minimum_timespan() {
        let settings = Settings::mainnet();
        let mut data = ChainStateData {
            height: RETARGET_INTERVAL - 1,
            bits: settings.proof_of_work_limit,
            version: 1,
            timestamp: 0,
            cumulative_work: 0,
            recent_versions: VecDeque::new(),
            recent_timestamps: VecDeque::new(),
        };
        let fast_timespan = 14 * 24 * 3_600 / 5;
        data.recent_timestamps.push_back(0);
        data.recent_timestamps.push_back(fast_timespan as u32);
        let bits = compute_work_required(&data, &settings);
        let new_target = bits_to_target(bits);
        let old_target = bits_to_target(settings.proof_of_work_limit);
        assert!(new_target < old_target);
        assert!(new_target <= old_target);
    }

    #[test]
    fn work_required_never_exceeds_proof_of_work_limit() {
        let settings = Settings::mainnet();
        let mut data = ChainStateData {
            height: RETARGET_INTERVAL - 1,
            bits: settings.proof_of_work_limit,
            version: 1,
            timestamp: 0,
            cumulative_work: 0,
            recent_versions: VecDeque::new(),
            recent_timestamps: VecDeque::new(),
        };
        data.recent_timestamps.push_back(0);
        data.recent_timestamps.push_back((TARGET_TIMESPAN_SECONDS * 100) as u32);
        let bits = compute_work_required(&data, &settings);
        let new_target = bits_to_target(bits);
        let limit_target = bits_to_target(settings.proof_of_work_limit);
        assert!(new_target <= limit_target);
    }

    #[test]
    fn signal_version_prefers_pending_bip9_bit() {
        let state = ChainState::genesis(Settings::mainnet(), 1, 0, 0x1d00_ffff);
        assert_eq!(state.signal_version(&[0, 2]), 0x2000_0000 | (1 << 2));
        assert_eq!(state.signal_version(&[]), 1);
    }

    #[test]
    fn bip30_exception_heights_are_the_two_known_mainnet_collisions() {
        assert_eq!(BIP30_EXCEPTION_HEIGHTS, [91_842, 91_880]);
    }
}
