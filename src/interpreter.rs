//! The script evaluation loop (spec.md C4) and its per-opcode handlers.
//!
//! Grounded on `interpreter.cpp`'s `run`/`next_operation`/`run_operation`
//! evaluation order: script-size check, op-counter increment, disabled-op
//! check, conditional-skip, push dispatch, handler dispatch, then the
//! final stack-size check. Handler names follow `machine_interpreter.hpp`'s
//! binding convention (`op_add1`, `op_dup2`, `op_nonzero`, ...).

use crate::context::Forks;
use crate::crypto;
use crate::error::OpError;
use crate::number::{ScriptNumber, MAX_CHECKLOCKTIME_SIZE, MAX_NUMBER_SIZE};
use crate::opcode::Opcode;
use crate::operation::Operation;
use crate::program::Program;
use crate::script::Script;
use crate::stack::{is_true, ScriptStack};

/// Maximum number of elements allowed on a stack at any point during
/// execution (data stack + alt stack combined, consensus rule).
pub const MAX_STACK_SIZE: usize = 1_000;

/// Maximum size, in bytes, of a single stack element.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Callbacks the interpreter needs from the enclosing transaction context
/// to evaluate signature-checking and locktime opcodes, without the
/// interpreter itself depending on [`crate::transaction::Transaction`].
///
/// Grounded on the checker abstraction `interpreter.cpp`'s
/// `op_check_sig_verify`/`op_check_locktime_verify` delegate to.
pub trait SignatureChecker {
    /// Verifies `signature` (DER, with trailing sighash-type byte) against
    /// `pubkey` over the hash of `script_code` under this checker's
    /// transaction/input context.
    fn check_ecdsa_signature(
        &self,
        signature: &[u8],
        pubkey: &[u8],
        script_code: &Script,
    ) -> Result<bool, OpError>;

    /// Verifies a BIP340 Schnorr `signature` against an x-only `pubkey`
    /// (tapscript `OP_CHECKSIG`/`OP_CHECKSIGADD`).
    fn check_schnorr_signature(&self, signature: &[u8], pubkey: &[u8]) -> Result<bool, OpError>;

    /// True if `locktime` is satisfied by the spending input
    /// (`OP_CHECKLOCKTIMEVERIFY`).
    fn check_locktime(&self, locktime: i64) -> bool;

    /// True if `sequence` is satisfied by the spending input
    /// (`OP_CHECKSEQUENCEVERIFY`).
    fn check_sequence(&self, sequence: i64) -> bool;
}

/// A checker that accepts every signature and every lock unconditionally.
/// Used for script-logic-only testing, matching the teacher's stub-mode
/// `OP_CHECKSIG` default.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllChecker;

impl SignatureChecker for AcceptAllChecker {
    fn check_ecdsa_signature(&self, _: &[u8], _: &[u8], _: &Script) -> Result<bool, OpError> {
        Ok(true)
    }

    fn check_schnorr_signature(&self, _: &[u8], _: &[u8]) -> Result<bool, OpError> {
        Ok(true)
    }

    fn check_locktime(&self, _locktime: i64) -> bool {
        true
    }

    fn check_sequence(&self, _sequence: i64) -> bool {
        true
    }
}

/// Evaluates `script` to completion against `program`, using `checker` for
/// signature and locktime opcodes.
///
/// Returns `Ok(())` if every operation executed without error and every
/// conditional branch closed; the caller is responsible for the final
/// "top of stack is true" check (multiple scripts may need to run in
/// sequence before that check applies, as with P2SH and two-phase
/// scriptSig/scriptPubKey execution).
pub fn evaluate<S: ScriptStack, C: SignatureChecker>(
    script: &Script,
    program: &mut Program<S>,
    checker: &C,
) -> Result<(), OpError> {
    let span = tracing::debug_span!("evaluate", ops = script.len());
    let _enter = span.enter();

    if script.serialized_size() > 10_000 {
        return Err(OpError::ScriptSize);
    }

    let ops = script.ops();
    let mut index = 0;
    while index < ops.len() {
        step(script, ops, index, program, checker)?;
        index += 1;
        if program.primary().len() + program.alternate().len() > MAX_STACK_SIZE {
            return Err(OpError::StackSize);
        }
    }

    if !program.is_balanced() {
        return Err(OpError::UnbalancedConditional);
    }
    tracing::debug!("script evaluated successfully");
    Ok(())
}

fn step<S: ScriptStack, C: SignatureChecker>(
    script: &Script,
    ops: &[Operation],
    index: usize,
    program: &mut Program<S>,
    checker: &C,
) -> Result<(), OpError> {
    let operation = &ops[index];

    let opcode = match operation {
        Operation::Push(data) => {
            if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                return Err(OpError::PushSize);
            }
            if program.is_executing() {
                program.primary_mut().push(data.clone());
            }
            return Ok(());
        }
        Operation::Op(opcode) => *opcode,
    };

    if opcode.is_counted() {
        program.increment_operation_count()?;
    }

    // Conditional opcodes run regardless of the enclosing branch state;
    // everything else is skipped on a closed branch.
    if opcode.is_conditional() {
        return op_conditional(opcode, program);
    }

    // Disabled/reserved opcodes (and non-tapscript OP_SUCCESS bytes) are
    // rejected even inside an unexecuted branch — consensus checks these
    // before the branch-skip, not after.
    if opcode.is_success() {
        if program.context.is_enabled(Forks::BIP342) {
            return Ok(());
        }
        if matches!(opcode, Opcode::Success(_)) {
            return Err(OpError::InvalidOpcode);
        }
    }
    if opcode.is_disabled() {
        return Err(OpError::OpDisabled);
    }
    if opcode.is_reserved() {
        return Err(OpError::OpReserved);
    }

    if !program.is_executing() {
        return Ok(());
    }

    if let Some(positive) = opcode.to_positive() {
        program.primary_mut().push(vec![positive]);
        return Ok(());
    }

    match opcode {
        Opcode::Op0 => program.primary_mut().push(Vec::new()),
        Opcode::Op1Negate => program.primary_mut().push(vec![0x81]),

        Opcode::OpNop
        | Opcode::OpNop1
        | Opcode::OpNop4
        | Opcode::OpNop5
        | Opcode::OpNop6
        | Opcode::OpNop7
        | Opcode::OpNop8
        | Opcode::OpNop9
        | Opcode::OpNop10 => {}

        Opcode::OpVerify => op_verify(program)?,
        Opcode::OpReturn => return Err(OpError::OpReturn),

        Opcode::OpToAltStack => op_to_alt_stack(program)?,
        Opcode::OpFromAltStack => op_from_alt_stack(program)?,
        Opcode::Op2Drop => op_drop2(program)?,
        Opcode::Op2Dup => op_dup2(program)?,
        Opcode::Op3Dup => op_dup3(program)?,
        Opcode::Op2Over => op_over2(program)?,
        Opcode::Op2Rot => op_rot2(program)?,
        Opcode::Op2Swap => op_swap2(program)?,
        Opcode::OpIfDup => op_if_dup(program)?,
        Opcode::OpDepth => op_depth(program)?,
        Opcode::OpDrop => {
            program.primary_mut().pop()?;
        }
        Opcode::OpDup => op_dup(program)?,
        Opcode::OpNip => op_nip(program)?,
        Opcode::OpOver => program.primary_mut().pick(1)?,
        Opcode::OpPick => op_pick(program)?,
        Opcode::OpRoll => op_roll(program)?,
        Opcode::OpRot => op_rot(program)?,
        Opcode::OpSwap => op_swap(program)?,
        Opcode::OpTuck => op_tuck(program)?,

        Opcode::OpSize => op_size(program)?,

        Opcode::OpEqual => op_equal(program)?,
        Opcode::OpEqualVerify => op_equal_verify(program)?,

        Opcode::OpAdd1 => op_unary_numeric(program, |n| Ok(n.checked_add(ScriptNumber::new(1))))?,
        Opcode::OpSub1 => op_unary_numeric(program, |n| Ok(n.checked_sub(ScriptNumber::new(1))))?,
        Opcode::OpNegate => op_unary_numeric(program, |n| Ok(n.negate()))?,
        Opcode::OpAbs => op_unary_numeric(program, |n| Ok(n.abs()))?,
        Opcode::OpNot => op_unary_numeric(program, |n| {
            Ok(ScriptNumber::new(if n.is_false() { 1 } else { 0 }))
        })?,
        Opcode::OpNonzero => op_unary_numeric(program, |n| {
            Ok(ScriptNumber::new(if n.is_true() { 1 } else { 0 }))
        })?,

        Opcode::OpAdd => op_binary_numeric(program, |a, b| Ok(a.checked_add(b)))?,
        Opcode::OpSub => op_binary_numeric(program, |a, b| Ok(a.checked_sub(b)))?,
        Opcode::OpBoolAnd => {
            op_binary_numeric(program, |a, b| Ok(ScriptNumber::new((a.is_true() && b.is_true()) as i64)))?
        }
        Opcode::OpBoolOr => {
            op_binary_numeric(program, |a, b| Ok(ScriptNumber::new((a.is_true() || b.is_true()) as i64)))?
        }
        Opcode::OpNumEqual => {
            op_binary_numeric(program, |a, b| Ok(ScriptNumber::new((a.int64() == b.int64()) as i64)))?
        }
        Opcode::OpNumEqualVerify => {
            op_binary_numeric(program, |a, b| Ok(ScriptNumber::new((a.int64() == b.int64()) as i64)))?;
            op_verify_mapped(program, OpError::NumEqualVerify)?;
        }
        Opcode::OpNumNotEqual => {
            op_binary_numeric(program, |a, b| Ok(ScriptNumber::new((a.int64() != b.int64()) as i64)))?
        }
        Opcode::OpLessThan => {
            op_binary_numeric(program, |a, b| Ok(ScriptNumber::new((a.int64() < b.int64()) as i64)))?
        }
        Opcode::OpGreaterThan => {
            op_binary_numeric(program, |a, b| Ok(ScriptNumber::new((a.int64() > b.int64()) as i64)))?
        }
        Opcode::OpLessThanOrEqual => {
            op_binary_numeric(program, |a, b| Ok(ScriptNumber::new((a.int64() <= b.int64()) as i64)))?
        }
        Opcode::OpGreaterThanOrEqual => {
            op_binary_numeric(program, |a, b| Ok(ScriptNumber::new((a.int64() >= b.int64()) as i64)))?
        }
        Opcode::OpMin => {
            op_binary_numeric(program, |a, b| Ok(ScriptNumber::new(a.int64().min(b.int64()))))?
        }
        Opcode::OpMax => {
            op_binary_numeric(program, |a, b| Ok(ScriptNumber::new(a.int64().max(b.int64()))))?
        }
        Opcode::OpWithin => op_within(program)?,

        Opcode::OpRipemd160 => op_hash(program, |d| crate::hash::ripemd160(d).to_vec())?,
        Opcode::OpSha1 => op_hash(program, |d| crate::hash::sha1(d).to_vec())?,
        Opcode::OpSha256 => op_hash(program, |d| crate::hash::sha256(d).to_vec())?,
        Opcode::OpHash160 => op_hash(program, |d| crate::hash::hash160(d).to_vec())?,
        Opcode::OpHash256 => op_hash(program, |d| crate::hash::hash256(d).to_vec())?,

        Opcode::OpCodeSeparator => {
            program.set_jump_register(index + 1);
        }

        Opcode::OpCheckSig => op_check_sig(script, program, checker, false)?,
        Opcode::OpCheckSigVerify => op_check_sig(script, program, checker, true)?,
        Opcode::OpCheckMultisig => op_check_multisig(script, program, checker, false)?,
        Opcode::OpCheckMultisigVerify => op_check_multisig(script, program, checker, true)?,
        Opcode::OpCheckSigAdd => op_check_sig_add(program, checker)?,

        Opcode::OpCheckLockTimeVerify => op_check_locktime_verify(program, checker)?,
        Opcode::OpCheckSequenceVerify => op_check_sequence_verify(program, checker)?,

        Opcode::OpInvalidOpcode => return Err(OpError::InvalidOpcode),

        // Constants, conditionals, disabled/reserved/success opcodes are
        // all handled above; push-data and OP_1..16 never reach here.
        _ => return Err(OpError::OpNotImplemented),
    }

    Ok(())
}

// ── Flow control ─────────────────────────────────────────────────────

fn op_conditional<S: ScriptStack>(opcode: Opcode, program: &mut Program<S>) -> Result<(), OpError> {
    match opcode {
        Opcode::OpIf | Opcode::OpNotIf => {
            let condition = if program.is_executing() {
                let value = program.primary_mut().pop()?;
                if program.context.is_enabled(Forks::BIP342)
                    && !matches!(value.as_slice(), [] | [0x01])
                {
                    return Err(OpError::TapscriptMinimalIf);
                }
                let truthy = is_true(&value);
                if opcode == Opcode::OpNotIf {
                    !truthy
                } else {
                    truthy
                }
            } else {
                false
            };
            program.open_condition(condition);
            Ok(())
        }
        Opcode::OpElse => program.negate_condition(),
        Opcode::OpEndIf => program.close_condition(),
        Opcode::OpVerIf | Opcode::OpVerNotIf => Err(OpError::OpReserved),
        _ => unreachable!("only conditional opcodes reach op_conditional"),
    }
}

fn op_verify<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    op_verify_mapped(program, OpError::VerifyFailed)
}

fn op_verify_mapped<S: ScriptStack>(program: &mut Program<S>, err: OpError) -> Result<(), OpError> {
    let value = program.primary_mut().pop()?;
    if is_true(&value) {
        Ok(())
    } else {
        Err(err)
    }
}

// ── Stack manipulation ───────────────────────────────────────────────

fn op_to_alt_stack<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let value = program.primary_mut().pop()?;
    program.alternate_mut().push(value);
    Ok(())
}

fn op_from_alt_stack<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let value = program.alternate_mut().pop().map_err(|_| OpError::InvalidAltstackOperation)?;
    program.primary_mut().push(value);
    Ok(())
}

fn op_drop2<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    program.primary_mut().pop()?;
    program.primary_mut().pop()?;
    Ok(())
}

fn op_dup2<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let stack = program.primary_mut();
    let a = stack.peek_at(1)?.to_vec();
    let b = stack.peek_at(0)?.to_vec();
    stack.push(a);
    stack.push(b);
    Ok(())
}

fn op_dup3<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let stack = program.primary_mut();
    let a = stack.peek_at(2)?.to_vec();
    let b = stack.peek_at(1)?.to_vec();
    let c = stack.peek_at(0)?.to_vec();
    stack.push(a);
    stack.push(b);
    stack.push(c);
    Ok(())
}

fn op_over2<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let stack = program.primary_mut();
    let a = stack.peek_at(3)?.to_vec();
    let b = stack.peek_at(2)?.to_vec();
    stack.push(a);
    stack.push(b);
    Ok(())
}

fn op_rot2<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let stack = program.primary_mut();
    let a = stack.erase_at(5)?;
    let b = stack.erase_at(4)?;
    stack.push(a);
    stack.push(b);
    Ok(())
}

fn op_swap2<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let stack = program.primary_mut();
    let a = stack.erase_at(3)?;
    let b = stack.erase_at(2)?;
    stack.push(a);
    stack.push(b);
    Ok(())
}

fn op_if_dup<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let top = program.primary().peek()?.to_vec();
    if is_true(&top) {
        program.primary_mut().push(top);
    }
    Ok(())
}

fn op_depth<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let depth = program.primary().len() as i64;
    program.primary_mut().push_number(ScriptNumber::new(depth));
    Ok(())
}

fn op_dup<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    program.primary_mut().pick(0)
}

fn op_nip<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    program.primary_mut().erase_at(1)?;
    Ok(())
}

fn op_pick<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let depth = program.primary_mut().pop_number(MAX_NUMBER_SIZE, true)?.int64();
    if depth < 0 {
        return Err(OpError::InvalidStackOperation);
    }
    program.primary_mut().pick(depth as usize)
}

fn op_roll<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let depth = program.primary_mut().pop_number(MAX_NUMBER_SIZE, true)?.int64();
    if depth < 0 {
        return Err(OpError::InvalidStackOperation);
    }
    program.primary_mut().roll(depth as usize)
}

fn op_rot<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    program.primary_mut().roll(2)
}

fn op_swap<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    program.primary_mut().roll(1)
}

fn op_tuck<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let stack = program.primary_mut();
    let top = stack.peek_at(0)?.to_vec();
    stack.insert_at(2, top)
}

fn op_size<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let size = program.primary().peek()?.len() as i64;
    program.primary_mut().push_number(ScriptNumber::new(size));
    Ok(())
}

// ── Comparison ────────────────────────────────────────────────────────

fn op_equal<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let b = program.primary_mut().pop()?;
    let a = program.primary_mut().pop()?;
    program.primary_mut().push_bool(a == b);
    Ok(())
}

fn op_equal_verify<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    op_equal(program)?;
    op_verify_mapped(program, OpError::EqualVerify)
}

// ── Arithmetic ────────────────────────────────────────────────────────

fn op_unary_numeric<S: ScriptStack>(
    program: &mut Program<S>,
    f: impl FnOnce(ScriptNumber) -> Result<ScriptNumber, OpError>,
) -> Result<(), OpError> {
    let n = program.primary_mut().pop_number(MAX_NUMBER_SIZE, true)?;
    let result = f(n)?;
    program.primary_mut().push_number(result);
    Ok(())
}

fn op_binary_numeric<S: ScriptStack>(
    program: &mut Program<S>,
    f: impl FnOnce(ScriptNumber, ScriptNumber) -> Result<ScriptNumber, OpError>,
) -> Result<(), OpError> {
    let b = program.primary_mut().pop_number(MAX_NUMBER_SIZE, true)?;
    let a = program.primary_mut().pop_number(MAX_NUMBER_SIZE, true)?;
    let result = f(a, b)?;
    program.primary_mut().push_number(result);
    Ok(())
}

fn op_within<S: ScriptStack>(program: &mut Program<S>) -> Result<(), OpError> {
    let max = program.primary_mut().pop_number(MAX_NUMBER_SIZE, true)?.int64();
    let min = program.primary_mut().pop_number(MAX_NUMBER_SIZE, true)?.int64();
    let x = program.primary_mut().pop_number(MAX_NUMBER_SIZE, true)?.int64();
    program.primary_mut().push_bool(x >= min && x < max);
    Ok(())
}

// ── Crypto ────────────────────────────────────────────────────────────

fn op_hash<S: ScriptStack>(program: &mut Program<S>, f: impl FnOnce(&[u8]) -> Vec<u8>) -> Result<(), OpError> {
    let data = program.primary_mut().pop()?;
    program.primary_mut().push(f(&data));
    Ok(())
}

/// Builds the subscript passed to an ECDSA check: `OP_CODESEPARATOR`-
/// trimmed, and with `signatures` deleted (the legacy `FindAndDelete`
/// step). BIP143 never runs `FindAndDelete`, so callers pass an empty
/// slice once segwit v0 is active.
fn script_code<S: ScriptStack>(script: &Script, program: &Program<S>, signatures: &[&[u8]]) -> Script {
    if program.context.is_enabled(Forks::BIP143) {
        script.subscript(program.jump_register(), &[])
    } else {
        script.subscript(program.jump_register(), signatures)
    }
}

fn op_check_sig<S: ScriptStack, C: SignatureChecker>(
    script: &Script,
    program: &mut Program<S>,
    checker: &C,
    verify: bool,
) -> Result<(), OpError> {
    let pubkey = program.primary_mut().pop().map_err(|_| OpError::CheckSigVerify1EmptyKeyStack)?;
    let signature = program.primary_mut().pop().map_err(|_| OpError::CheckSigVerify2EmptySignatureStack)?;

    let valid = if signature.is_empty() {
        false
    } else if program.context.is_enabled(Forks::BIP342) {
        if signature.len() != 64 && signature.len() != 65 {
            return Err(OpError::TaprootSchnorrBadSignature);
        }
        checker.check_schnorr_signature(&signature, &pubkey)?
    } else {
        let (der, _hash_type) = crypto::split_ecdsa_signature(&signature)?;
        if program.context.is_enabled(Forks::BIP66) && !crypto::is_strict_der_signature(der) {
            return Err(OpError::CheckSigVerify4DerStrict);
        }
        let code = script_code(script, program, &[&signature]);
        checker.check_ecdsa_signature(&signature, &pubkey, &code)?
    };

    program.primary_mut().push_bool(valid);
    if verify {
        op_verify_mapped(program, OpError::CheckSigVerify6VerifyFailed)?;
    }
    Ok(())
}

fn op_check_sig_add<S: ScriptStack, C: SignatureChecker>(
    program: &mut Program<S>,
    checker: &C,
) -> Result<(), OpError> {
    if !program.context.is_enabled(Forks::BIP342) {
        return Err(OpError::InvalidOpcode);
    }
    let pubkey = program.primary_mut().pop().map_err(|_| OpError::CheckSigVerify1EmptyKeyStack)?;
    let n = program.primary_mut().pop_number(MAX_NUMBER_SIZE, true)?;
    let signature = program.primary_mut().pop().map_err(|_| OpError::CheckSigVerify2EmptySignatureStack)?;

    if pubkey.len() != 32 {
        return Err(OpError::TaprootSchnorrBadKey);
    }

    program.charge_sigops_budget(1)?;

    let valid = if signature.is_empty() {
        false
    } else {
        checker.check_schnorr_signature(&signature, &pubkey)?
    };

    let result = n.checked_add(ScriptNumber::new(valid as i64));
    program.primary_mut().push_number(result);
    Ok(())
}

fn op_check_multisig<S: ScriptStack, C: SignatureChecker>(
    script: &Script,
    program: &mut Program<S>,
    checker: &C,
    verify: bool,
) -> Result<(), OpError> {
    if program.context.is_enabled(Forks::BIP342) {
        return Err(OpError::TapscriptCheckMultisigDisabled);
    }

    let key_count = program.primary_mut().pop_number(MAX_NUMBER_SIZE, true)?.int64();
    if !(0..=20).contains(&key_count) {
        return Err(OpError::CheckMultisigVerify1KeyCountRange);
    }
    for _ in 0..key_count as usize {
        program.increment_operation_count().map_err(|_| OpError::CheckMultisigVerify2OpCount)?;
    }
    let mut pubkeys = Vec::with_capacity(key_count as usize);
    for _ in 0..key_count as usize {
        pubkeys.push(program.primary_mut().pop().map_err(|_| OpError::StackUnderflow)?);
    }

    let sig_count = program.primary_mut().pop_number(MAX_NUMBER_SIZE, true)?.int64();
    if sig_count < 0 || sig_count > key_count {
        return Err(OpError::CheckMultisigVerify3SigCountRange);
    }
    let mut signatures = Vec::with_capacity(sig_count as usize);
    for _ in 0..sig_count as usize {
        signatures.push(program.primary_mut().pop().map_err(|_| OpError::CheckMultisigVerify4StackUnderflow)?);
    }

    // Historical off-by-one bug (CVE-2010-5137 era quirk, consensus-locked
    // forever): one extra stack item is popped and, under BIP147, must be
    // empty.
    let dummy = program.primary_mut().pop().map_err(|_| OpError::CheckMultisigVerify4StackUnderflow)?;
    if program.context.is_enabled(Forks::BIP147) && !dummy.is_empty() {
        return Err(OpError::CheckMultisigVerify5NullDummy);
    }

    let signature_refs: Vec<&[u8]> = signatures.iter().map(Vec::as_slice).collect();
    let code = script_code(script, program, &signature_refs);

    // Single forward pass: each signature must match the next remaining
    // key in order, but not every key need be used.
    let mut key_iter = pubkeys.iter().rev().peekable();
    let mut all_valid = true;
    for signature in signatures.iter().rev() {
        if signature.is_empty() {
            all_valid = false;
            break;
        }
        let mut matched = false;
        while let Some(pubkey) = key_iter.next() {
            let (der, _hash_type) = crypto::split_ecdsa_signature(signature)?;
            if program.context.is_enabled(Forks::BIP66) && !crypto::is_strict_der_signature(der) {
                return Err(OpError::CheckSigVerify4DerStrict);
            }
            if checker.check_ecdsa_signature(signature, pubkey, &code)? {
                matched = true;
                break;
            }
        }
        if !matched {
            all_valid = false;
            break;
        }
    }

    program.primary_mut().push_bool(all_valid);
    if verify {
        op_verify_mapped(program, OpError::CheckMultisigVerify6VerifyFailed)?;
    }
    Ok(())
}

fn op_check_locktime_verify<S: ScriptStack, C: SignatureChecker>(
    program: &mut Program<S>,
    checker: &C,
) -> Result<(), OpError> {
    if !program.context.is_enabled(Forks::BIP65) {
        return Ok(()); // behaves as OP_NOP1 before activation
    }
    let locktime = program.primary().peek()?;
    let n = ScriptNumber::decode(locktime, MAX_CHECKLOCKTIME_SIZE, true)?;
    if n.int64() < 0 {
        return Err(OpError::CheckLocktimeVerify1NegativeStack);
    }
    if !checker.check_locktime(n.int64()) {
        return Err(OpError::CheckLocktimeVerify3LocktimeNotReached);
    }
    Ok(())
}

fn op_check_sequence_verify<S: ScriptStack, C: SignatureChecker>(
    program: &mut Program<S>,
    checker: &C,
) -> Result<(), OpError> {
    if !program.context.is_enabled(Forks::BIP112) {
        return Ok(()); // behaves as OP_NOP3 before activation
    }
    let sequence = program.primary().peek()?;
    let n = ScriptNumber::decode(sequence, MAX_CHECKLOCKTIME_SIZE, true)?;
    if n.int64() < 0 {
        return Err(OpError::CheckSequenceVerify1NegativeStack);
    }
    // Bit 31 disables relative-locktime enforcement for this input.
    if n.int64() & (1 << 31) != 0 {
        return Ok(());
    }
    if !checker.check_sequence(n.int64()) {
        return Err(OpError::CheckSequenceVerify5SequenceNotReached);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ExecutionContext, ScriptVersion};
    use crate::stack::ContiguousStack;

    fn ctx(forks: Forks) -> ExecutionContext {
        ExecutionContext::new(forks, ScriptVersion::Unversioned, 0)
    }

    fn run(ops: Vec<Operation>, forks: Forks) -> Program<ContiguousStack> {
        let script = Script::new(ops);
        let mut program = Program::new(ctx(forks));
        evaluate(&script, &mut program, &AcceptAllChecker).unwrap();
        program
    }

    fn op(o: Opcode) -> Operation {
        Operation::Op(o)
    }

    fn push(data: &[u8]) -> Operation {
        Operation::Push(data.to_vec())
    }

    #[test]
    fn arithmetic_add() {
        let mut program = run(vec![op(Opcode::Op2), op(Opcode::Op3), op(Opcode::OpAdd)], Forks::NONE);
        assert_eq!(program.primary_mut().pop().unwrap(), vec![5]);
    }

    #[test]
    fn arithmetic_within() {
        let mut program = run(
            vec![op(Opcode::Op5), op(Opcode::Op1), op(Opcode::Op10), op(Opcode::OpWithin)],
            Forks::NONE,
        );
        assert!(is_true(&program.primary_mut().pop().unwrap()));
    }

    #[test]
    fn conditionals_take_if_branch() {
        let mut program = run(
            vec![op(Opcode::Op1), op(Opcode::OpIf), op(Opcode::Op2), op(Opcode::OpEndIf)],
            Forks::NONE,
        );
        assert_eq!(program.primary_mut().pop().unwrap(), vec![2]);
    }

    #[test]
    fn conditionals_take_else_branch() {
        let mut program = run(
            vec![
                op(Opcode::Op0),
                op(Opcode::OpIf),
                op(Opcode::Op2),
                op(Opcode::OpElse),
                op(Opcode::Op3),
                op(Opcode::OpEndIf),
            ],
            Forks::NONE,
        );
        assert_eq!(program.primary_mut().pop().unwrap(), vec![3]);
    }

    #[test]
    fn unbalanced_if_rejected() {
        let script = Script::new(vec![op(Opcode::Op1), op(Opcode::OpIf)]);
        let mut program = Program::<ContiguousStack>::new(ctx(Forks::NONE));
        let err = evaluate(&script, &mut program, &AcceptAllChecker).unwrap_err();
        assert_eq!(err, OpError::UnbalancedConditional);
    }

    #[test]
    fn disabled_opcode_fails_even_when_not_executed_is_false() {
        let script = Script::new(vec![op(Opcode::OpCat)]);
        let mut program = Program::<ContiguousStack>::new(ctx(Forks::NONE));
        let err = evaluate(&script, &mut program, &AcceptAllChecker).unwrap_err();
        assert_eq!(err, OpError::OpDisabled);
    }

    #[test]
    fn hash160_matches_primitive() {
        let mut program = run(vec![push(b"test"), op(Opcode::OpHash160)], Forks::NONE);
        let result = program.primary_mut().pop().unwrap();
        assert_eq!(result, crate::hash::hash160(b"test").to_vec());
    }

    #[test]
    fn checksig_accepts_under_stub_checker() {
        let mut program = run(
            vec![push(b"sig"), push(b"pubkey"), op(Opcode::OpCheckSig)],
            Forks::NONE,
        );
        assert!(is_true(&program.primary_mut().pop().unwrap()));
    }

    #[test]
    fn checksig_empty_signature_is_false_not_error() {
        let mut program = run(vec![push(b""), push(b"pubkey"), op(Opcode::OpCheckSig)], Forks::NONE);
        assert!(!is_true(&program.primary_mut().pop().unwrap()));
    }

    #[test]
    fn checklocktimeverify_is_noop_before_activation() {
        let program = run(vec![push(&[1]), op(Opcode::OpCheckLockTimeVerify)], Forks::NONE);
        assert_eq!(program.primary().peek().unwrap(), &[1]);
    }

    #[test]
    fn checklocktimeverify_rejects_negative() {
        let script = Script::new(vec![push(&[0x81]), op(Opcode::OpCheckLockTimeVerify)]);
        let mut program = Program::<ContiguousStack>::new(ctx(Forks::BIP65));
        let err = evaluate(&script, &mut program, &AcceptAllChecker).unwrap_err();
        assert_eq!(err, OpError::CheckLocktimeVerify1NegativeStack);
    }

    #[test]
    fn op_count_limit_enforced_across_script() {
        let ops: Vec<Operation> = (0..=MAX_OPS_THRESHOLD).map(|_| op(Opcode::OpNop)).collect();
        let script = Script::new(ops);
        let mut program = Program::<ContiguousStack>::new(ctx(Forks::NONE));
        let err = evaluate(&script, &mut program, &AcceptAllChecker).unwrap_err();
        assert_eq!(err, OpError::OpCount);
    }
    const MAX_OPS_THRESHOLD: usize = crate::program::MAX_OPS_PER_SCRIPT;

    #[test]
    fn multisig_1_of_2_accepts() {
        let script = Script::new(vec![
            op(Opcode::Op0), // dummy
            push(b"sig1"),
            op(Opcode::Op1), // m
            push(b"key1"),
            push(b"key2"),
            op(Opcode::Op2), // n
            op(Opcode::OpCheckMultisig),
        ]);
        let mut program = Program::<ContiguousStack>::new(ctx(Forks::NONE));
        evaluate(&script, &mut program, &AcceptAllChecker).unwrap();
        assert!(is_true(&program.primary_mut().pop().unwrap()));
    }
}
