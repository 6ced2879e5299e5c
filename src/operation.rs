//! Parsed script elements (spec.md C2, `Operation`).
//!
//! Supersedes the teacher's `token.rs`/`tokenizer.rs` pair: the same job
//! (turn raw script bytes into a sequence of executable elements) but
//! generalized to the full opcode table and to round-trip serialization,
//! which subscript extraction and signature hashing both depend on.

use crate::error::ScriptError;
use crate::hex::decode_hex;
use crate::opcode::Opcode;

/// A single parsed script element: either pushed data or an opcode
/// instruction.
///
/// `Push` covers the three length-prefixed encodings (direct push,
/// `OP_PUSHDATA1/2/4`); fixed-value pushes (`OP_0`, `OP_1NEGATE`,
/// `OP_1..OP_16`) are represented as `Op` since they carry no length
/// field of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Push(Vec<u8>),
    Op(Opcode),
}

impl Operation {
    /// Builds the minimally-encoded push operation for arbitrary data,
    /// picking `OP_0`/`OP_1NEGATE`/`OP_1..OP_16` for the handful of values
    /// those opcodes cover and falling back to a length-prefixed push
    /// otherwise. Used when constructing scripts programmatically (e.g.
    /// rebuilding a subscript) rather than parsing one from the wire.
    pub fn from_data(data: &[u8]) -> Operation {
        if data.is_empty() {
            return Operation::Op(Opcode::Op0);
        }
        if data.len() == 1 {
            match data[0] {
                0x81 => return Operation::Op(Opcode::Op1Negate),
                1..=16 => return Operation::Op(Opcode::from_positive(data[0]).unwrap()),
                _ => {}
            }
        }
        Operation::Push(data.to_vec())
    }

    /// True for any push operation, fixed-value or length-prefixed.
    pub fn is_push(&self) -> bool {
        match self {
            Operation::Push(_) => true,
            Operation::Op(opcode) => opcode.is_push(),
        }
    }

    /// The opcode byte this operation serializes to. For `Push`, this is
    /// the *minimal* encoding's leading byte (direct-push length byte, or
    /// one of the `OP_PUSHDATAn` markers for longer data).
    pub fn opcode_byte(&self) -> u8 {
        match self {
            Operation::Push(data) => match data.len() {
                n if n <= 0x4b => n as u8,
                n if n <= 0xff => Opcode::PushData1.to_byte(),
                n if n <= 0xffff => Opcode::PushData2.to_byte(),
                _ => Opcode::PushData4.to_byte(),
            },
            Operation::Op(opcode) => opcode.to_byte(),
        }
    }

    /// The data payload of a push operation, if any.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Operation::Push(data) => Some(data),
            Operation::Op(_) => None,
        }
    }

    /// The number of bytes this operation occupies when serialized.
    pub fn serialized_size(&self) -> usize {
        match self {
            Operation::Push(data) => match data.len() {
                n if n <= 0x4b => 1 + n,
                n if n <= 0xff => 2 + n,
                n if n <= 0xffff => 3 + n,
                n => 5 + n,
            },
            Operation::Op(_) => 1,
        }
    }

    /// True when a `Push` uses the shortest possible encoding for its
    /// data length (BIP62 / tapscript "minimal push" policy).
    ///
    /// `Op` variants are always minimal by construction.
    pub fn is_minimal_push(&self) -> bool {
        match self {
            Operation::Push(data) => {
                if data.is_empty() {
                    return false; // OP_0 is the minimal encoding of empty data.
                }
                if data.len() == 1 && (data[0] == 0x81 || (1..=16).contains(&data[0])) {
                    return false; // OP_1NEGATE / OP_1..OP_16 are minimal instead.
                }
                match data.len() {
                    n if n <= 0x4b => true,
                    n if n <= 0xff => n > 0x4b,
                    n if n <= 0xffff => n > 0xff,
                    _ => true,
                }
            }
            Operation::Op(_) => true,
        }
    }

    /// Serializes this single operation back to its raw byte encoding.
    pub fn to_data(&self) -> Vec<u8> {
        match self {
            Operation::Push(data) => {
                let mut out = Vec::with_capacity(self.serialized_size());
                match data.len() {
                    n if n <= 0x4b => out.push(n as u8),
                    n if n <= 0xff => {
                        out.push(Opcode::PushData1.to_byte());
                        out.push(n as u8);
                    }
                    n if n <= 0xffff => {
                        out.push(Opcode::PushData2.to_byte());
                        out.extend_from_slice(&(n as u16).to_le_bytes());
                    }
                    n => {
                        out.push(Opcode::PushData4.to_byte());
                        out.extend_from_slice(&(n as u32).to_le_bytes());
                    }
                }
                out.extend_from_slice(data);
                out
            }
            Operation::Op(opcode) => vec![opcode.to_byte()],
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Push(data) => {
                write!(f, "<")?;
                for byte in data {
                    write!(f, "{byte:02x}")?;
                }
                write!(f, ">")
            }
            Operation::Op(opcode) => write!(f, "{opcode}"),
        }
    }
}

/// Parses raw script bytes into a sequence of operations.
///
/// Walks the byte slice left-to-right, dispatching on each byte:
/// - `0x01`-`0x4b`: direct push (byte value = data length)
/// - `0x4c`: OP_PUSHDATA1 (1-byte length prefix)
/// - `0x4d`: OP_PUSHDATA2 (2-byte little-endian length prefix)
/// - `0x4e`: OP_PUSHDATA4 (4-byte little-endian length prefix)
/// - All other bytes: looked up via [`Opcode::from_byte`]
///
/// Returns `ScriptError::UnexpectedEndOfScript` if a push-data instruction
/// extends beyond the end of the byte slice, or
/// `ScriptError::ScriptSizeLimit` if `bytes` exceeds the consensus script
/// size limit (10,000 bytes).
pub fn parse_script(bytes: &[u8]) -> Result<Vec<Operation>, ScriptError> {
    if bytes.len() > 10_000 {
        return Err(ScriptError::ScriptSizeLimit);
    }

    let mut ops = Vec::new();
    let mut pos = 0;
    let len = bytes.len();

    while pos < len {
        let byte = bytes[pos];
        pos += 1;

        match byte {
            0x01..=0x4b => {
                let n = byte as usize;
                if pos + n > len {
                    return Err(ScriptError::UnexpectedEndOfScript);
                }
                ops.push(Operation::Push(bytes[pos..pos + n].to_vec()));
                pos += n;
            }
            0x4c => {
                if pos >= len {
                    return Err(ScriptError::UnexpectedEndOfScript);
                }
                let n = bytes[pos] as usize;
                pos += 1;
                if pos + n > len {
                    return Err(ScriptError::UnexpectedEndOfScript);
                }
                ops.push(Operation::Push(bytes[pos..pos + n].to_vec()));
                pos += n;
            }
            0x4d => {
                if pos + 2 > len {
                    return Err(ScriptError::UnexpectedEndOfScript);
                }
                let n = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]) as usize;
                pos += 2;
                if pos + n > len {
                    return Err(ScriptError::UnexpectedEndOfScript);
                }
                ops.push(Operation::Push(bytes[pos..pos + n].to_vec()));
                pos += n;
            }
            0x4e => {
                if pos + 4 > len {
                    return Err(ScriptError::UnexpectedEndOfScript);
                }
                let n = u32::from_le_bytes([
                    bytes[pos],
                    bytes[pos + 1],
                    bytes[pos + 2],
                    bytes[pos + 3],
                ]) as usize;
                pos += 4;
                if pos + n > len {
                    return Err(ScriptError::UnexpectedEndOfScript);
                }
                ops.push(Operation::Push(bytes[pos..pos + n].to_vec()));
                pos += n;
            }
            _ => match Opcode::from_byte(byte) {
                Some(opcode) => ops.push(Operation::Op(opcode)),
                None => return Err(ScriptError::UnsupportedOpcode(byte)),
            },
        }
    }

    Ok(ops)
}

/// Parses a hex-encoded script string into operations.
pub fn parse_script_hex(hex: &str) -> Result<Vec<Operation>, ScriptError> {
    let bytes = decode_hex(hex)?;
    parse_script(&bytes)
}

/// Serializes a sequence of operations back to raw bytes.
pub fn serialize_operations(ops: &[Operation]) -> Vec<u8> {
    let mut out = Vec::new();
    for op in ops {
        out.extend(op.to_data());
    }
    out
}

/// Encodes `value` as a Bitcoin CompactSize varint, used as the length
/// prefix for scripts and vectors throughout the wire transaction/block
/// format that [`crate::transaction`] and [`crate::sighash`] serialize.
pub fn encode_compact_size(value: u64) -> Vec<u8> {
    match value {
        0..=0xfc => vec![value as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&(value as u16).to_le_bytes());
            out
        }
        0x1_0000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&(value as u32).to_le_bytes());
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&value.to_le_bytes());
            out
        }
    }
}

/// Decodes a Bitcoin CompactSize varint, returning the value and the number
/// of bytes consumed.
pub fn decode_compact_size(bytes: &[u8]) -> Result<(u64, usize), ScriptError> {
    match bytes.first() {
        None => Err(ScriptError::UnexpectedEndOfScript),
        Some(0xfd) => {
            let slice = bytes.get(1..3).ok_or(ScriptError::UnexpectedEndOfScript)?;
            Ok((u16::from_le_bytes([slice[0], slice[1]]) as u64, 3))
        }
        Some(0xfe) => {
            let slice = bytes.get(1..5).ok_or(ScriptError::UnexpectedEndOfScript)?;
            Ok((u32::from_le_bytes(slice.try_into().unwrap()) as u64, 5))
        }
        Some(0xff) => {
            let slice = bytes.get(1..9).ok_or(ScriptError::UnexpectedEndOfScript)?;
            Ok((u64::from_le_bytes(slice.try_into().unwrap()), 9))
        }
        Some(&n) => Ok((n as u64, 1)),
    }
}
