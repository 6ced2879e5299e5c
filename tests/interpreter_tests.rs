//! Cross-module scenarios exercising the full evaluate-two-scripts flow:
//! conditional nesting and a complete P2PKH scriptSig/scriptPubKey pair.

use bitcoin_consensus_script::context::{ExecutionContext, Forks, ScriptVersion};
use bitcoin_consensus_script::hash;
use bitcoin_consensus_script::interpreter::{self, AcceptAllChecker};
use bitcoin_consensus_script::opcode::Opcode;
use bitcoin_consensus_script::operation::Operation;
use bitcoin_consensus_script::program::Program;
use bitcoin_consensus_script::script::Script;
use bitcoin_consensus_script::stack::{is_true, ContiguousStack, ScriptStack};

fn run(script: &Script) -> Program<ContiguousStack> {
    let context = ExecutionContext::new(Forks::NONE, ScriptVersion::Unversioned, 0);
    let mut program = Program::<ContiguousStack>::new(context);
    interpreter::evaluate(script, &mut program, &AcceptAllChecker).expect("evaluation succeeded");
    program
}

#[test]
fn nested_if_else_true_branch() {
    // OP_1 OP_IF OP_1 OP_IF OP_2 OP_ELSE OP_3 OP_ENDIF OP_ELSE OP_4 OP_ENDIF
    let script = Script::new(vec![
        Operation::Op(Opcode::Op1),
        Operation::Op(Opcode::OpIf),
        Operation::Op(Opcode::Op1),
        Operation::Op(Opcode::OpIf),
        Operation::Op(Opcode::Op2),
        Operation::Op(Opcode::OpElse),
        Operation::Op(Opcode::Op3),
        Operation::Op(Opcode::OpEndIf),
        Operation::Op(Opcode::OpElse),
        Operation::Op(Opcode::Op4),
        Operation::Op(Opcode::OpEndIf),
    ]);
    let program = run(&script);
    assert_eq!(program.primary().peek().unwrap(), &[0x02]);
}

#[test]
fn nested_if_else_false_outer_branch() {
    // OP_0 OP_IF OP_1 OP_ELSE OP_IF OP_2 OP_ELSE OP_3 OP_ENDIF OP_ENDIF — malformed
    // without an inner condition to skip; use a plain false-outer case instead.
    let script = Script::new(vec![
        Operation::Op(Opcode::Op0),
        Operation::Op(Opcode::OpIf),
        Operation::Op(Opcode::Op1),
        Operation::Op(Opcode::OpElse),
        Operation::Op(Opcode::Op2),
        Operation::Op(Opcode::OpEndIf),
    ]);
    let program = run(&script);
    assert_eq!(program.primary().peek().unwrap(), &[0x02]);
}

#[test]
fn unbalanced_conditional_is_rejected() {
    let script = Script::new(vec![Operation::Op(Opcode::Op1), Operation::Op(Opcode::OpIf)]);
    let context = ExecutionContext::new(Forks::NONE, ScriptVersion::Unversioned, 0);
    let mut program = Program::<ContiguousStack>::new(context);
    assert!(interpreter::evaluate(&script, &mut program, &AcceptAllChecker).is_err());
}

#[test]
fn full_p2pkh_flow_with_stub_signature_checker() {
    let fake_sig = vec![0x30u8; 71];
    let fake_pubkey = vec![0x02u8; 33];
    let pubkey_hash = hash::hash160(&fake_pubkey);

    let script_sig = Script::new(vec![Operation::Push(fake_sig), Operation::Push(fake_pubkey)]);
    let script_pubkey = Script::new(vec![
        Operation::Op(Opcode::OpDup),
        Operation::Op(Opcode::OpHash160),
        Operation::Push(pubkey_hash.to_vec()),
        Operation::Op(Opcode::OpEqualVerify),
        Operation::Op(Opcode::OpCheckSig),
    ]);

    let context = ExecutionContext::new(Forks::NONE, ScriptVersion::Unversioned, 0);
    let mut program = Program::<ContiguousStack>::new(context);
    interpreter::evaluate(&script_sig, &mut program, &AcceptAllChecker).unwrap();
    interpreter::evaluate(&script_pubkey, &mut program, &AcceptAllChecker).unwrap();

    assert!(is_true(program.primary().peek().unwrap()));
}

#[test]
fn p2pkh_fails_when_pubkey_hash_does_not_match() {
    let fake_sig = vec![0x30u8; 71];
    let fake_pubkey = vec![0x02u8; 33];
    let wrong_hash = [0u8; 20];

    let script_sig = Script::new(vec![Operation::Push(fake_sig), Operation::Push(fake_pubkey)]);
    let script_pubkey = Script::new(vec![
        Operation::Op(Opcode::OpDup),
        Operation::Op(Opcode::OpHash160),
        Operation::Push(wrong_hash.to_vec()),
        Operation::Op(Opcode::OpEqualVerify),
        Operation::Op(Opcode::OpCheckSig),
    ]);

    let context = ExecutionContext::new(Forks::NONE, ScriptVersion::Unversioned, 0);
    let mut program = Program::<ContiguousStack>::new(context);
    interpreter::evaluate(&script_sig, &mut program, &AcceptAllChecker).unwrap();
    assert!(interpreter::evaluate(&script_pubkey, &mut program, &AcceptAllChecker).is_err());
}
