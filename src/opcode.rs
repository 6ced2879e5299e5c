/// A Bitcoin Script opcode supported by this engine.
///
/// This is a fieldless enum (plus one catch-all for the large unassigned
/// byte range reserved for tapscript's `OP_SUCCESS` semantics) that maps
/// 1:1 to protocol-defined byte values. It derives `Copy` because it
/// carries no heap data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    // Constants
    Op0,
    PushData1,
    PushData2,
    PushData4,
    Op1Negate,
    OpReserved,
    Op1,
    Op2,
    Op3,
    Op4,
    Op5,
    Op6,
    Op7,
    Op8,
    Op9,
    Op10,
    Op11,
    Op12,
    Op13,
    Op14,
    Op15,
    Op16,

    // Flow control
    OpNop,
    OpVer,
    OpIf,
    OpNotIf,
    OpVerIf,
    OpVerNotIf,
    OpElse,
    OpEndIf,
    OpVerify,
    OpReturn,

    // Stack manipulation
    OpToAltStack,
    OpFromAltStack,
    Op2Drop,
    Op2Dup,
    Op3Dup,
    Op2Over,
    Op2Rot,
    Op2Swap,
    OpIfDup,
    OpDepth,
    OpDrop,
    OpDup,
    OpNip,
    OpOver,
    OpPick,
    OpRoll,
    OpRot,
    OpSwap,
    OpTuck,

    // Splice (disabled)
    OpCat,
    OpSubstr,
    OpLeft,
    OpRight,
    OpSize,

    // Bitwise (disabled, except Equal/EqualVerify)
    OpInvert,
    OpAnd,
    OpOr,
    OpXor,
    OpEqual,
    OpEqualVerify,
    OpReserved1,
    OpReserved2,

    // Arithmetic
    OpAdd1,
    OpSub1,
    OpMul2,
    OpDiv2,
    OpNegate,
    OpAbs,
    OpNot,
    OpNonzero,
    OpAdd,
    OpSub,
    OpMul,
    OpDiv,
    OpMod,
    OpLShift,
    OpRShift,
    OpBoolAnd,
    OpBoolOr,
    OpNumEqual,
    OpNumEqualVerify,
    OpNumNotEqual,
    OpLessThan,
    OpGreaterThan,
    OpLessThanOrEqual,
    OpGreaterThanOrEqual,
    OpMin,
    OpMax,
    OpWithin,

    // Crypto
    OpRipemd160,
    OpSha1,
    OpSha256,
    OpHash160,
    OpHash256,
    OpCodeSeparator,
    OpCheckSig,
    OpCheckSigVerify,
    OpCheckMultisig,
    OpCheckMultisigVerify,

    // Expansion (soft-fork reuse of the historical NOP opcodes)
    OpNop1,
    OpCheckLockTimeVerify,
    OpCheckSequenceVerify,
    OpNop4,
    OpNop5,
    OpNop6,
    OpNop7,
    OpNop8,
    OpNop9,
    OpNop10,

    // Tapscript (bip342)
    OpCheckSigAdd,

    /// One of the large run of unassigned opcodes (0xbb..=0xfe) that
    /// tapscript designates `OP_SUCCESS`: present for forward-compatible
    /// script versions, execution-ending when `bip342_rule` is active.
    Success(u8),

    /// `OP_INVALIDOPCODE` (0xff): never valid to execute.
    OpInvalidOpcode,
}

impl Opcode {
    /// Convert a byte to an `Opcode`, if it maps to a supported opcode.
    ///
    /// Returns `None` only for push-data bytes (`0x01`-`0x4b`), which are
    /// handled by the operation parser rather than by this table.
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        use Opcode::*;
        match byte {
            0x00 => Some(Op0),
            0x01..=0x4b => None,
            0x4c => Some(PushData1),
            0x4d => Some(PushData2),
            0x4e => Some(PushData4),
            0x4f => Some(Op1Negate),
            0x50 => Some(OpReserved),
            0x51 => Some(Op1),
            0x52 => Some(Op2),
            0x53 => Some(Op3),
            0x54 => Some(Op4),
            0x55 => Some(Op5),
            0x56 => Some(Op6),
            0x57 => Some(Op7),
            0x58 => Some(Op8),
            0x59 => Some(Op9),
            0x5a => Some(Op10),
            0x5b => Some(Op11),
            0x5c => Some(Op12),
            0x5d => Some(Op13),
            0x5e => Some(Op14),
            0x5f => Some(Op15),
            0x60 => Some(Op16),
            0x61 => Some(OpNop),
            0x62 => Some(OpVer),
            0x63 => Some(OpIf),
            0x64 => Some(OpNotIf),
            0x65 => Some(OpVerIf),
            0x66 => Some(OpVerNotIf),
            0x67 => Some(OpElse),
            0x68 => Some(OpEndIf),
            0x69 => Some(OpVerify),
            0x6a => Some(OpReturn),
            0x6b => Some(OpToAltStack),
            0x6c => Some(OpFromAltStack),
            0x6d => Some(Op2Drop),
            0x6e => Some(Op2Dup),
            0x6f => Some(Op3Dup),
            0x70 => Some(Op2Over),
            0x71 => Some(Op2Rot),
            0x72 => Some(Op2Swap),
            0x73 => Some(OpIfDup),
            0x74 => Some(OpDepth),
            0x75 => Some(OpDrop),
            0x76 => Some(OpDup),
            0x77 => Some(OpNip),
            0x78 => Some(OpOver),
            0x79 => Some(OpPick),
            0x7a => Some(OpRoll),
            0x7b => Some(OpRot),
            0x7c => Some(OpSwap),
            0x7d => Some(OpTuck),
            0x7e => Some(OpCat),
            0x7f => Some(OpSubstr),
            0x80 => Some(OpLeft),
            0x81 => Some(OpRight),
            0x82 => Some(OpSize),
            0x83 => Some(OpInvert),
            0x84 => Some(OpAnd),
            0x85 => Some(OpOr),
            0x86 => Some(OpXor),
            0x87 => Some(OpEqual),
            0x88 => Some(OpEqualVerify),
            0x89 => Some(OpReserved1),
            0x8a => Some(OpReserved2),
            0x8b => Some(OpAdd1),
            0x8c => Some(OpSub1),
            0x8d => Some(OpMul2),
            0x8e => Some(OpDiv2),
            0x8f => Some(OpNegate),
            0x90 => Some(OpAbs),
            0x91 => Some(OpNot),
            0x92 => Some(OpNonzero),
            0x93 => Some(OpAdd),
            0x94 => Some(OpSub),
            0x95 => Some(OpMul),
            0x96 => Some(OpDiv),
            0x97 => Some(OpMod),
            0x98 => Some(OpLShift),
            0x99 => Some(OpRShift),
            0x9a => Some(OpBoolAnd),
            0x9b => Some(OpBoolOr),
            0x9c => Some(OpNumEqual),
            0x9d => Some(OpNumEqualVerify),
            0x9e => Some(OpNumNotEqual),
            0x9f => Some(OpLessThan),
            0xa0 => Some(OpGreaterThan),
            0xa1 => Some(OpLessThanOrEqual),
            0xa2 => Some(OpGreaterThanOrEqual),
            0xa3 => Some(OpMin),
            0xa4 => Some(OpMax),
            0xa5 => Some(OpWithin),
            0xa6 => Some(OpRipemd160),
            0xa7 => Some(OpSha1),
            0xa8 => Some(OpSha256),
            0xa9 => Some(OpHash160),
            0xaa => Some(OpHash256),
            0xab => Some(OpCodeSeparator),
            0xac => Some(OpCheckSig),
            0xad => Some(OpCheckSigVerify),
            0xae => Some(OpCheckMultisig),
            0xaf => Some(OpCheckMultisigVerify),
            0xb0 => Some(OpNop1),
            0xb1 => Some(OpCheckLockTimeVerify),
            0xb2 => Some(OpCheckSequenceVerify),
            0xb3 => Some(OpNop4),
            0xb4 => Some(OpNop5),
            0xb5 => Some(OpNop6),
            0xb6 => Some(OpNop7),
            0xb7 => Some(OpNop8),
            0xb8 => Some(OpNop9),
            0xb9 => Some(OpNop10),
            0xba => Some(OpCheckSigAdd),
            0xbb..=0xfe => Some(Success(byte)),
            0xff => Some(OpInvalidOpcode),
        }
    }

    /// Convert an `Opcode` back to its canonical byte value.
    pub fn to_byte(self) -> u8 {
        use Opcode::*;
        match self {
            Op0 => 0x00,
            PushData1 => 0x4c,
            PushData2 => 0x4d,
            PushData4 => 0x4e,
            Op1Negate => 0x4f,
            OpReserved => 0x50,
            Op1 => 0x51,
            Op2 => 0x52,
            Op3 => 0x53,
            Op4 => 0x54,
            Op5 => 0x55,
            Op6 => 0x56,
            Op7 => 0x57,
            Op8 => 0x58,
            Op9 => 0x59,
            Op10 => 0x5a,
            Op11 => 0x5b,
            Op12 => 0x5c,
            Op13 => 0x5d,
            Op14 => 0x5e,
            Op15 => 0x5f,
            Op16 => 0x60,
            OpNop => 0x61,
            OpVer => 0x62,
            OpIf => 0x63,
            OpNotIf => 0x64,
            OpVerIf => 0x65,
            OpVerNotIf => 0x66,
            OpElse => 0x67,
            OpEndIf => 0x68,
            OpVerify => 0x69,
            OpReturn => 0x6a,
            OpToAltStack => 0x6b,
            OpFromAltStack => 0x6c,
            Op2Drop => 0x6d,
            Op2Dup => 0x6e,
            Op3Dup => 0x6f,
            Op2Over => 0x70,
            Op2Rot => 0x71,
            Op2Swap => 0x72,
            OpIfDup => 0x73,
            OpDepth => 0x74,
            OpDrop => 0x75,
            OpDup => 0x76,
            OpNip => 0x77,
            OpOver => 0x78,
            OpPick => 0x79,
            OpRoll => 0x7a,
            OpRot => 0x7b,
            OpSwap => 0x7c,
            OpTuck => 0x7d,
            OpCat => 0x7e,
            OpSubstr => 0x7f,
            OpLeft => 0x80,
            OpRight => 0x81,
            OpSize => 0x82,
            OpInvert => 0x83,
            OpAnd => 0x84,
            OpOr => 0x85,
            OpXor => 0x86,
            OpEqual => 0x87,
            OpEqualVerify => 0x88,
            OpReserved1 => 0x89,
            OpReserved2 => 0x8a,
            OpAdd1 => 0x8b,
            OpSub1 => 0x8c,
            OpMul2 => 0x8d,
            OpDiv2 => 0x8e,
            OpNegate => 0x8f,
            OpAbs => 0x90,
            OpNot => 0x91,
            OpNonzero => 0x92,
            OpAdd => 0x93,
            OpSub => 0x94,
            OpMul => 0x95,
            OpDiv => 0x96,
            OpMod => 0x97,
            OpLShift => 0x98,
            OpRShift => 0x99,
            OpBoolAnd => 0x9a,
            OpBoolOr => 0x9b,
            OpNumEqual => 0x9c,
            OpNumEqualVerify => 0x9d,
            OpNumNotEqual => 0x9e,
            OpLessThan => 0x9f,
            OpGreaterThan => 0xa0,
            OpLessThanOrEqual => 0xa1,
            OpGreaterThanOrEqual => 0xa2,
            OpMin => 0xa3,
            OpMax => 0xa4,
            OpWithin => 0xa5,
            OpRipemd160 => 0xa6,
            OpSha1 => 0xa7,
            OpSha256 => 0xa8,
            OpHash160 => 0xa9,
            OpHash256 => 0xaa,
            OpCodeSeparator => 0xab,
            OpCheckSig => 0xac,
            OpCheckSigVerify => 0xad,
            OpCheckMultisig => 0xae,
            OpCheckMultisigVerify => 0xaf,
            OpNop1 => 0xb0,
            OpCheckLockTimeVerify => 0xb1,
            OpCheckSequenceVerify => 0xb2,
            OpNop4 => 0xb3,
            OpNop5 => 0xb4,
            OpNop6 => 0xb5,
            OpNop7 => 0xb6,
            OpNop8 => 0xb7,
            OpNop9 => 0xb8,
            OpNop10 => 0xb9,
            OpCheckSigAdd => 0xba,
            Success(byte) => byte,
            OpInvalidOpcode => 0xff,
        }
    }

    /// True for any push-data opcode: direct-length pushes (`0x01..=0x4b`,
    /// not representable by this enum) plus `OP_PUSHDATA1/2/4`, `OP_0`,
    /// `OP_1NEGATE`, and `OP_1..OP_16`.
    pub fn is_push(self) -> bool {
        matches!(
            self,
            Opcode::Op0
                | Opcode::PushData1
                | Opcode::PushData2
                | Opcode::PushData4
                | Opcode::Op1Negate
                | Opcode::Op1
                | Opcode::Op2
                | Opcode::Op3
                | Opcode::Op4
                | Opcode::Op5
                | Opcode::Op6
                | Opcode::Op7
                | Opcode::Op8
                | Opcode::Op9
                | Opcode::Op10
                | Opcode::Op11
                | Opcode::Op12
                | Opcode::Op13
                | Opcode::Op14
                | Opcode::Op15
                | Opcode::Op16
        )
    }

    /// True for `OP_1..OP_16`: opcodes that push a small positive integer
    /// directly encoded in the opcode byte.
    pub fn is_positive(self) -> bool {
        matches!(
            self,
            Opcode::Op1
                | Opcode::Op2
                | Opcode::Op3
                | Opcode::Op4
                | Opcode::Op5
                | Opcode::Op6
                | Opcode::Op7
                | Opcode::Op8
                | Opcode::Op9
                | Opcode::Op10
                | Opcode::Op11
                | Opcode::Op12
                | Opcode::Op13
                | Opcode::Op14
                | Opcode::Op15
                | Opcode::Op16
        )
    }

    /// The `[1..16]` value of an `OP_1..OP_16` opcode, or `None`.
    pub fn to_positive(self) -> Option<u8> {
        if self.is_positive() {
            Some(self.to_byte() - Opcode::Op1.to_byte() + 1)
        } else {
            None
        }
    }

    /// Converts a `[1..16]` value to its opcode, or `None` if out of range.
    pub fn from_positive(value: u8) -> Option<Opcode> {
        if (1..=16).contains(&value) {
            Opcode::from_byte(Opcode::Op1.to_byte() + value - 1)
        } else {
            None
        }
    }

    /// True for opcodes that must execute even when the enclosing
    /// conditional branch is not taken (`if`, `notif`, `else`, `endif`,
    /// plus the reserved conditional-family opcodes that fail unconditionally).
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            Opcode::OpIf
                | Opcode::OpNotIf
                | Opcode::OpVerIf
                | Opcode::OpVerNotIf
                | Opcode::OpElse
                | Opcode::OpEndIf
        )
    }

    /// True for opcodes whose mere presence fails the script regardless of
    /// which conditional branch is active.
    pub fn is_disabled(self) -> bool {
        matches!(
            self,
            Opcode::OpCat
                | Opcode::OpSubstr
                | Opcode::OpLeft
                | Opcode::OpRight
                | Opcode::OpInvert
                | Opcode::OpAnd
                | Opcode::OpOr
                | Opcode::OpXor
                | Opcode::OpMul2
                | Opcode::OpDiv2
                | Opcode::OpMul
                | Opcode::OpDiv
                | Opcode::OpMod
                | Opcode::OpLShift
                | Opcode::OpRShift
        )
    }

    /// True for opcodes reserved for possible future use; legal to exist
    /// in an unexecuted branch but fail the script if actually executed.
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            Opcode::OpReserved
                | Opcode::OpVer
                | Opcode::OpVerIf
                | Opcode::OpVerNotIf
                | Opcode::OpReserved1
                | Opcode::OpReserved2
        )
    }

    /// True for opcodes that count individually against the legacy
    /// 201-non-push operation-count limit.
    pub fn is_counted(self) -> bool {
        !self.is_push()
    }

    /// True when `bip342_rule` (tapscript) is active and this opcode
    /// unconditionally ends execution successfully, regardless of the
    /// remaining script or stack contents (BIP342 `OP_SUCCESS`).
    pub fn is_success(self) -> bool {
        matches!(self, Opcode::Success(_))
            || self.is_disabled()
            || matches!(
                self,
                Opcode::OpReserved | Opcode::OpVer | Opcode::OpReserved1 | Opcode::OpReserved2
            )
    }

    /// True for opcodes that may be pushed directly as the *last* item of
    /// a scriptSig under the "relaxed push" policy rule (push-only plus
    /// small integers): pushes and `OP_1NEGATE`/`OP_1..OP_16`.
    pub fn is_relaxed_push(self) -> bool {
        self.is_push()
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Opcode::*;
        let name = match self {
            Op0 => "OP_0",
            PushData1 => "OP_PUSHDATA1",
            PushData2 => "OP_PUSHDATA2",
            PushData4 => "OP_PUSHDATA4",
            Op1Negate => "OP_1NEGATE",
            OpReserved => "OP_RESERVED",
            Op1 => "OP_1",
            Op2 => "OP_2",
            Op3 => "OP_3",
            Op4 => "OP_4",
            Op5 => "OP_5",
            Op6 => "OP_6",
            Op7 => "OP_7",
            Op8 => "OP_8",
            Op9 => "OP_9",
            Op10 => "OP_10",
            Op11 => "OP_11",
            Op12 => "OP_12",
            Op13 => "OP_13",
            Op14 => "OP_14",
            Op15 => "OP_15",
            Op16 => "OP_16",
            OpNop => "OP_NOP",
            OpVer => "OP_VER",
            OpIf => "OP_IF",
            OpNotIf => "OP_NOTIF",
            OpVerIf => "OP_VERIF",
            OpVerNotIf => "OP_VERNOTIF",
            OpElse => "OP_ELSE",
            OpEndIf => "OP_ENDIF",
            OpVerify => "OP_VERIFY",
            OpReturn => "OP_RETURN",
            OpToAltStack => "OP_TOALTSTACK",
            OpFromAltStack => "OP_FROMALTSTACK",
            Op2Drop => "OP_2DROP",
            Op2Dup => "OP_2DUP",
            Op3Dup => "OP_3DUP",
            Op2Over => "OP_2OVER",
            Op2Rot => "OP_2ROT",
            Op2Swap => "OP_2SWAP",
            OpIfDup => "OP_IFDUP",
            OpDepth => "OP_DEPTH",
            OpDrop => "OP_DROP",
            OpDup => "OP_DUP",
            OpNip => "OP_NIP",
            OpOver => "OP_OVER",
            OpPick => "OP_PICK",
            OpRoll => "OP_ROLL",
            OpRot => "OP_ROT",
            OpSwap => "OP_SWAP",
            OpTuck => "OP_TUCK",
            OpCat => "OP_CAT",
            OpSubstr => "OP_SUBSTR",
            OpLeft => "OP_LEFT",
            OpRight => "OP_RIGHT",
            OpSize => "OP_SIZE",
            OpInvert => "OP_INVERT",
            OpAnd => "OP_AND",
            OpOr => "OP_OR",
            OpXor => "OP_XOR",
            OpEqual => "OP_EQUAL",
            OpEqualVerify => "OP_EQUALVERIFY",
            OpReserved1 => "OP_RESERVED1",
            OpReserved2 => "OP_RESERVED2",
            OpAdd1 => "OP_1ADD",
            OpSub1 => "OP_1SUB",
            OpMul2 => "OP_2MUL",
            OpDiv2 => "OP_2DIV",
            OpNegate => "OP_NEGATE",
            OpAbs => "OP_ABS",
            OpNot => "OP_NOT",
            OpNonzero => "OP_0NOTEQUAL",
            OpAdd => "OP_ADD",
            OpSub => "OP_SUB",
            OpMul => "OP_MUL",
            OpDiv => "OP_DIV",
            OpMod => "OP_MOD",
            OpLShift => "OP_LSHIFT",
            OpRShift => "OP_RSHIFT",
            OpBoolAnd => "OP_BOOLAND",
            OpBoolOr => "OP_BOOLOR",
            OpNumEqual => "OP_NUMEQUAL",
            OpNumEqualVerify => "OP_NUMEQUALVERIFY",
            OpNumNotEqual => "OP_NUMNOTEQUAL",
            OpLessThan => "OP_LESSTHAN",
            OpGreaterThan => "OP_GREATERTHAN",
            OpLessThanOrEqual => "OP_LESSTHANOREQUAL",
            OpGreaterThanOrEqual => "OP_GREATERTHANOREQUAL",
            OpMin => "OP_MIN",
            OpMax => "OP_MAX",
            OpWithin => "OP_WITHIN",
            OpRipemd160 => "OP_RIPEMD160",
            OpSha1 => "OP_SHA1",
            OpSha256 => "OP_SHA256",
            OpHash160 => "OP_HASH160",
            OpHash256 => "OP_HASH256",
            OpCodeSeparator => "OP_CODESEPARATOR",
            OpCheckSig => "OP_CHECKSIG",
            OpCheckSigVerify => "OP_CHECKSIGVERIFY",
            OpCheckMultisig => "OP_CHECKMULTISIG",
            OpCheckMultisigVerify => "OP_CHECKMULTISIGVERIFY",
            OpNop1 => "OP_NOP1",
            OpCheckLockTimeVerify => "OP_CHECKLOCKTIMEVERIFY",
            OpCheckSequenceVerify => "OP_CHECKSEQUENCEVERIFY",
            OpNop4 => "OP_NOP4",
            OpNop5 => "OP_NOP5",
            OpNop6 => "OP_NOP6",
            OpNop7 => "OP_NOP7",
            OpNop8 => "OP_NOP8",
            OpNop9 => "OP_NOP9",
            OpNop10 => "OP_NOP10",
            OpCheckSigAdd => "OP_CHECKSIGADD",
            Success(byte) => return write!(f, "OP_SUCCESS{byte}"),
            OpInvalidOpcode => "OP_INVALIDOPCODE",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_named_opcodes() -> Vec<Opcode> {
        (0x00u16..=0xffu16)
            .filter(|&b| !(0x01..=0x4b).contains(&b))
            .filter_map(|b| Opcode::from_byte(b as u8))
            .collect()
    }

    #[test]
    fn roundtrip_all_opcodes() {
        for opcode in all_named_opcodes() {
            let byte = opcode.to_byte();
            let recovered = Opcode::from_byte(byte);
            assert_eq!(recovered, Some(opcode), "roundtrip failed for {opcode}");
        }
    }

    #[test]
    fn push_data_bytes_return_none() {
        for byte in 0x01..=0x4bu8 {
            assert_eq!(
                Opcode::from_byte(byte),
                None,
                "byte 0x{byte:02x} should be None"
            );
        }
    }

    #[test]
    fn every_byte_outside_direct_push_range_classifies() {
        for byte in 0x00u16..=0xffu16 {
            if (0x01..=0x4b).contains(&byte) {
                continue;
            }
            assert!(
                Opcode::from_byte(byte as u8).is_some(),
                "byte 0x{byte:02x} should classify to some opcode"
            );
        }
    }

    #[test]
    fn display_formatting() {
        assert_eq!(format!("{}", Opcode::OpDup), "OP_DUP");
        assert_eq!(format!("{}", Opcode::OpHash160), "OP_HASH160");
        assert_eq!(format!("{}", Opcode::Op0), "OP_0");
        assert_eq!(format!("{}", Opcode::OpCheckSig), "OP_CHECKSIG");
        assert_eq!(format!("{}", Opcode::Success(0xbb)), "OP_SUCCESS187");
    }

    #[test]
    fn positive_opcode_round_trip() {
        for v in 1u8..=16 {
            let op = Opcode::from_positive(v).unwrap();
            assert_eq!(op.to_positive(), Some(v));
        }
        assert_eq!(Opcode::from_positive(0), None);
        assert_eq!(Opcode::from_positive(17), None);
    }

    #[test]
    fn disabled_opcodes_are_not_conditional() {
        for op in all_named_opcodes() {
            if op.is_disabled() {
                assert!(!op.is_conditional(), "{op} should not be conditional");
            }
        }
    }

    #[test]
    fn success_range_matches_bip342_unassigned_and_reserved_bytes() {
        assert!(Opcode::from_byte(0x50).unwrap().is_success()); // OP_RESERVED
        assert!(Opcode::from_byte(0x7e).unwrap().is_success()); // OP_CAT (disabled)
        assert!(Opcode::from_byte(0xbb).unwrap().is_success()); // unassigned
        assert!(!Opcode::OpCheckSig.is_success());
        assert!(!Opcode::OpInvalidOpcode.is_success());
    }

    #[test]
    fn op_count_excludes_pushes() {
        assert!(!Opcode::Op0.is_counted());
        assert!(!Opcode::Op16.is_counted());
        assert!(Opcode::OpCheckSig.is_counted());
        assert!(Opcode::OpNop.is_counted());
    }
}
