//! Consensus-precise script number encoding and arithmetic (spec.md C1).
//!
//! A script number is a little-endian signed integer with the sign bit in
//! the most-significant bit of the last byte. Zero is the empty vector.
//! Arithmetic opcodes only accept operands that round-trip through the
//! signed-32-bit range, but compute and may leave results in `i64` domain
//! on the stack (up to 5 bytes) — CONSENSUS: libbitcoin's `machine::number`
//! preserves this overflow-tolerant behavior for `[-, +, +=, -=]`.

use crate::error::OpError;

/// Default operand size limit for arithmetic opcodes (4 bytes -> int32 domain).
pub const MAX_NUMBER_SIZE: usize = 4;

/// Operand size limit for `OP_CHECKLOCKTIMEVERIFY` / `OP_CHECKSEQUENCEVERIFY`
/// (40-bit unsigned values packed into a 5-byte script number).
pub const MAX_CHECKLOCKTIME_SIZE: usize = 5;

/// A decoded script number: the numeric value plus whether minimal
/// encoding was required of its source bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptNumber(i64);

impl ScriptNumber {
    pub fn new(value: i64) -> Self {
        ScriptNumber(value)
    }

    pub fn zero() -> Self {
        ScriptNumber(0)
    }

    pub fn int64(self) -> i64 {
        self.0
    }

    /// The value bounded by the limits of int32 (saturating).
    pub fn int32(self) -> i32 {
        self.0.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    pub fn is_true(self) -> bool {
        self.0 != 0
    }

    pub fn is_false(self) -> bool {
        self.0 == 0
    }

    /// Encodes the value as a minimally-sized little-endian byte vector
    /// with the sign carried in the MSB of the final byte.
    pub fn encode(self) -> Vec<u8> {
        if self.0 == 0 {
            return Vec::new();
        }

        let negative = self.0 < 0;
        let mut absvalue = self.0.unsigned_abs();
        let mut result = Vec::new();

        while absvalue > 0 {
            result.push((absvalue & 0xff) as u8);
            absvalue >>= 8;
        }

        // If the most significant byte already has its sign bit set, an
        // extra byte must be appended to keep the value unambiguous.
        if result.last().map_or(false, |&b| b & 0x80 != 0) {
            result.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            let last = result.last_mut().expect("non-empty for nonzero value");
            *last |= 0x80;
        }

        result
    }

    /// Decodes a script number from bytes, enforcing `max_size` and
    /// (when `require_minimal`) rejecting encodings with a removable
    /// trailing zero/sign byte.
    pub fn decode(
        bytes: &[u8],
        max_size: usize,
        require_minimal: bool,
    ) -> Result<ScriptNumber, OpError> {
        if bytes.len() > max_size {
            return Err(OpError::NumberOverflow);
        }

        if require_minimal && !bytes.is_empty() {
            let last = bytes[bytes.len() - 1];
            if last & 0x7f == 0 {
                // The sign-carrying bit pattern only justifies a trailing
                // zero byte if the next-to-last byte's sign bit is set;
                // otherwise the byte was removable and minimality failed.
                if bytes.len() <= 1 || bytes[bytes.len() - 2] & 0x80 == 0 {
                    return Err(OpError::InvalidNumberRange);
                }
            }
        }

        if bytes.is_empty() {
            return Ok(ScriptNumber(0));
        }

        let mut result: i64 = 0;
        for (i, &byte) in bytes.iter().enumerate() {
            result |= (byte as i64) << (8 * i);
        }

        let last = bytes[bytes.len() - 1];
        if last & 0x80 != 0 {
            // Clear the sign bit from the accumulated magnitude and negate.
            let sign_shift = 8 * (bytes.len() - 1);
            result &= !(0x80i64 << sign_shift);
            result = -result;
        }

        Ok(ScriptNumber(result))
    }

    /// Decodes restricted to the signed-32-bit operand domain required by
    /// arithmetic opcodes.
    pub fn decode_int32(bytes: &[u8], require_minimal: bool) -> Result<ScriptNumber, OpError> {
        let n = Self::decode(bytes, MAX_NUMBER_SIZE, require_minimal)?;
        if n.0 < i32::MIN as i64 || n.0 > i32::MAX as i64 {
            return Err(OpError::InvalidNumberRange);
        }
        Ok(n)
    }

    /// Decodes restricted to the 40-bit unsigned locktime domain used by
    /// `OP_CHECKLOCKTIMEVERIFY` / `OP_CHECKSEQUENCEVERIFY`; rejects negatives.
    pub fn decode_locktime(bytes: &[u8]) -> Result<ScriptNumber, OpError> {
        let n = Self::decode(bytes, MAX_CHECKLOCKTIME_SIZE, true)?;
        if n.0 < 0 {
            return Err(OpError::NegativeNumber);
        }
        Ok(n)
    }

    pub fn checked_add(self, other: ScriptNumber) -> ScriptNumber {
        ScriptNumber(self.0.wrapping_add(other.0))
    }

    pub fn checked_sub(self, other: ScriptNumber) -> ScriptNumber {
        ScriptNumber(self.0.wrapping_sub(other.0))
    }

    pub fn negate(self) -> ScriptNumber {
        ScriptNumber(-self.0)
    }

    pub fn abs(self) -> ScriptNumber {
        ScriptNumber(self.0.abs())
    }
}

impl From<i64> for ScriptNumber {
    fn from(value: i64) -> Self {
        ScriptNumber(value)
    }
}

impl From<i32> for ScriptNumber {
    fn from(value: i32) -> Self {
        ScriptNumber(value as i64)
    }
}
