//! An ordered script (spec.md C2, `Script`): subscript extraction and
//! standard pattern recognition.
//!
//! Grounded on `interpreter.cpp`'s subscript-building loop inside
//! `op_check_sig_verify` (iterate from `code_begin`, skip codeseparators
//! and endorsement-matching pushes) and on the witness/P2SH/null-data
//! pattern predicates scattered across `script.cpp`.

use crate::error::ScriptError;
use crate::number::ScriptNumber;
use crate::opcode::Opcode;
use crate::operation::{parse_script, parse_script_hex, serialize_operations, Operation};

/// An ordered sequence of script operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    ops: Vec<Operation>,
}

impl Script {
    pub fn new(ops: Vec<Operation>) -> Self {
        Script { ops }
    }

    pub fn parse(bytes: &[u8]) -> Result<Script, ScriptError> {
        Ok(Script::new(parse_script(bytes)?))
    }

    pub fn parse_hex(hex: &str) -> Result<Script, ScriptError> {
        Ok(Script::new(parse_script_hex(hex)?))
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn to_data(&self) -> Vec<u8> {
        serialize_operations(&self.ops)
    }

    pub fn serialized_size(&self) -> usize {
        self.ops.iter().map(Operation::serialized_size).sum()
    }

    /// True when every operation is a push (the "push only" policy rule
    /// applied to scriptSig and to a taproot script-path's `control_block`
    /// companion script).
    pub fn is_push_only(&self) -> bool {
        self.ops.iter().all(Operation::is_push)
    }

    /// Builds the subscript used by the legacy signature hash algorithm:
    /// every operation starting at `start`, with `OP_CODESEPARATOR`
    /// instructions and any push matching one of `signatures` removed
    /// (the historical `FindAndDelete` step; BIP143 never calls this with
    /// a non-empty `signatures`, since segwit v0 skips `FindAndDelete`).
    pub fn subscript(&self, start: usize, signatures: &[&[u8]]) -> Script {
        let kept = self.ops[start.min(self.ops.len())..]
            .iter()
            .filter(|op| !matches!(op, Operation::Op(Opcode::OpCodeSeparator)))
            .filter(|op| match op {
                Operation::Push(data) => !signatures.contains(&data.as_slice()),
                _ => true,
            })
            .cloned()
            .collect();
        Script::new(kept)
    }

    /// Index of the operation immediately after the last
    /// `OP_CODESEPARATOR`, or 0 if none is present. Used to seed
    /// [`Self::subscript`]'s `start` argument from a program's jump
    /// register rather than a mutated copy of the script.
    pub fn last_code_separator(&self) -> usize {
        self.ops
            .iter()
            .rposition(|op| matches!(op, Operation::Op(Opcode::OpCodeSeparator)))
            .map(|idx| idx + 1)
            .unwrap_or(0)
    }

    /// Recognizes `OP_HASH160 <20 bytes> OP_EQUAL` (BIP16 pay-to-script-hash).
    pub fn is_pay_to_script_hash(&self) -> bool {
        matches!(
            self.ops.as_slice(),
            [
                Operation::Op(Opcode::OpHash160),
                Operation::Push(hash),
                Operation::Op(Opcode::OpEqual),
            ] if hash.len() == 20
        )
    }

    /// Recognizes a witness program: a small-integer version push (`OP_0`
    /// or `OP_1..OP_16`) followed by a single 2-40 byte data push, with no
    /// other operations (BIP141). Returns `(version, program)`.
    pub fn witness_program(&self) -> Option<(u8, &[u8])> {
        let [first, second] = self.ops.as_slice() else {
            return None;
        };
        let version = match first {
            Operation::Op(Opcode::Op0) => 0,
            Operation::Op(opcode) => opcode.to_positive()?,
            Operation::Push(_) => return None,
        };
        match second {
            Operation::Push(program) if (2..=40).contains(&program.len()) => {
                Some((version, program.as_slice()))
            }
            _ => None,
        }
    }

    /// Recognizes `OP_RETURN <payload...>` (provably unspendable null-data
    /// output), returning the pushed payload operations.
    pub fn is_null_data(&self) -> bool {
        matches!(self.ops.first(), Some(Operation::Op(Opcode::OpReturn)))
            && self.ops[1..].iter().all(Operation::is_push)
    }

    /// Decodes a leading minimal-encoded push as a block height, per
    /// BIP34's coinbase-input-script commitment. Returns `None` if the
    /// first operation is not a push or does not minimally encode a
    /// non-negative number.
    pub fn coinbase_height(&self) -> Option<i64> {
        let first = self.ops.first()?;
        if !first.is_minimal_push() {
            // OP_0 is minimally-encoded height 0, the one legal exception.
            if !matches!(first, Operation::Op(Opcode::Op0)) {
                return None;
            }
        }
        let data = match first {
            Operation::Push(data) => data.as_slice(),
            Operation::Op(Opcode::Op0) => &[][..],
            Operation::Op(opcode) => {
                return opcode.to_positive().map(|v| v as i64);
            }
        };
        ScriptNumber::decode(data, 5, true).ok().map(ScriptNumber::int64)
    }
}
