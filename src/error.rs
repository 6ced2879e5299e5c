/// Errors that arise while parsing or tokenizing a raw script byte stream.
///
/// Distinct from [`OpError`], which covers failures during *execution* of
/// an already-parsed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Stack had fewer elements than the operation required.
    StackUnderflow,

    /// Script byte stream ended mid-instruction.
    UnexpectedEndOfScript,

    /// A push-data length field is malformed or exceeds remaining bytes.
    InvalidPushData,

    /// An opcode byte is valid in Bitcoin but not implemented by this engine.
    UnsupportedOpcode(u8),

    /// OP_VERIFY, OP_EQUALVERIFY, or OP_CHECKSIGVERIFY consumed a false value.
    VerifyFailed,

    /// Execution completed but the stack is empty or the top element is false.
    ScriptFailed,

    /// OP_RETURN was encountered. The script is provably unspendable.
    OpReturnEncountered,

    /// OP_IF / OP_NOTIF / OP_ELSE / OP_ENDIF are not properly balanced.
    UnbalancedConditional,

    /// A hex string could not be decoded (odd length or invalid character).
    InvalidHex,

    /// Script exceeds the 10,000 byte consensus limit.
    ScriptSizeLimit,
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::StackUnderflow => {
                write!(f, "stack underflow: not enough elements on the stack")
            }
            ScriptError::UnexpectedEndOfScript => {
                write!(f, "unexpected end of script")
            }
            ScriptError::InvalidPushData => {
                write!(f, "invalid push data encoding")
            }
            ScriptError::UnsupportedOpcode(b) => {
                write!(f, "unsupported opcode: 0x{b:02x}")
            }
            ScriptError::VerifyFailed => {
                write!(f, "verify failed: top stack element is false")
            }
            ScriptError::ScriptFailed => {
                write!(f, "script failed: final stack state is false")
            }
            ScriptError::OpReturnEncountered => {
                write!(f, "OP_RETURN encountered: script is unspendable")
            }
            ScriptError::UnbalancedConditional => {
                write!(f, "unbalanced conditional: mismatched IF/ELSE/ENDIF")
            }
            ScriptError::InvalidHex => {
                write!(f, "invalid hex string")
            }
            ScriptError::ScriptSizeLimit => {
                write!(f, "script exceeds 10,000 byte consensus limit")
            }
        }
    }
}

impl std::error::Error for ScriptError {}

/// Per-opcode execution failure.
///
/// Every numbered failure branch of a handler gets its own variant so a
/// rejected script can be attributed to the exact rule that rejected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpError {
    StackUnderflow,
    InvalidStackOperation,
    InvalidAltstackOperation,
    UnbalancedConditional,

    OpReturn,
    OpCount,
    PushSize,
    ScriptSize,
    PubkeyCount,
    SigCount,
    StackSize,
    OpDisabled,
    OpNotImplemented,
    OpUnevaluated,
    InvalidOpcode,
    OpReserved,

    VerifyFailed,
    EqualVerify,
    NumEqualVerify,

    InvalidNumberRange,
    NegativeNumber,
    NumberOverflow,

    // Numbered per the handler's sequential failure branches.
    CheckSigVerify1EmptyKeyStack,
    CheckSigVerify2EmptySignatureStack,
    CheckSigVerify3EmptySignature,
    CheckSigVerify4DerStrict,
    CheckSigVerify5BadSighashFlags,
    CheckSigVerify6VerifyFailed,

    CheckMultisigVerify1KeyCountRange,
    CheckMultisigVerify2OpCount,
    CheckMultisigVerify3SigCountRange,
    CheckMultisigVerify4StackUnderflow,
    CheckMultisigVerify5NullDummy,
    CheckMultisigVerify6VerifyFailed,

    CheckSigAddKeyBad,

    CheckLocktimeVerify1NegativeStack,
    CheckLocktimeVerify2DomainMismatch,
    CheckLocktimeVerify3LocktimeNotReached,
    CheckLocktimeVerify4InputFinal,

    CheckSequenceVerify1NegativeStack,
    CheckSequenceVerify2TransactionVersion,
    CheckSequenceVerify3InputDisabled,
    CheckSequenceVerify4DomainMismatch,
    CheckSequenceVerify5SequenceNotReached,

    TaprootSchnorrBadKey,
    TaprootSchnorrBadSignature,
    TapscriptMinimalIf,
    TapscriptCheckMultisigDisabled,
    SigopsBudgetExceeded,
}

impl std::fmt::Display for OpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for OpError {}

pub type OpResult = Result<(), OpError>;

/// Transaction-level rejection codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    EmptyTransaction,
    PreviousOutputNull,
    InvalidCoinbaseScriptSize,
    TransactionInternalDoubleSpend,
    AbsoluteTimeLocked,
    RelativeTimeLocked,
    CoinbaseMaturity,
    SpendExceedsValue,
    MissingPreviousOutput,
    TransactionSizeLimit,
    TransactionWeightLimit,
    TransactionSigopLimit,
    CoinbaseTransaction,
    UnconfirmedSpend,
    ConfirmedDoubleSpend,
    UnexpectedWitnessTransaction,
    ScriptValidationFailed(OpError),
}

impl std::fmt::Display for TransactionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for TransactionError {}

pub type TransactionResult = Result<(), TransactionError>;

/// Block-level rejection codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    BlockSizeLimit,
    BlockWeightLimit,
    FirstNotCoinbase,
    ExtraCoinbases,
    ForwardReference,
    BlockInternalDoubleSpend,
    InvalidTransactionCommitment,
    InvalidWitnessCommitment,
    BlockMalleated,
    CoinbaseHeightMismatch,
    TemporaryHashLimit,
    CoinbaseValueLimit,
    BlockSigopLimit,
    UnspentCoinbaseCollision,
    ProofOfWorkInvalid,
    IncorrectProofOfWork,
    TimestampTooEarly,
    TransactionFailed(TransactionError),
}

impl std::fmt::Display for BlockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for BlockError {}

pub type BlockResult = Result<(), BlockError>;
