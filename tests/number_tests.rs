//! Cross-module scenarios for script-number arithmetic driven through the
//! full interpreter loop (number.rs + opcode.rs + interpreter.rs), rather
//! than number.rs's own inline unit tests of encode/decode in isolation.

use bitcoin_consensus_script::context::{ExecutionContext, Forks, ScriptVersion};
use bitcoin_consensus_script::interpreter::{self, AcceptAllChecker};
use bitcoin_consensus_script::opcode::Opcode;
use bitcoin_consensus_script::operation::Operation;
use bitcoin_consensus_script::program::Program;
use bitcoin_consensus_script::script::Script;
use bitcoin_consensus_script::stack::{ContiguousStack, ScriptStack};

fn evaluate(script: &Script) -> Result<Program<ContiguousStack>, bitcoin_consensus_script::error::OpError> {
    let context = ExecutionContext::new(Forks::NONE, ScriptVersion::Unversioned, 0);
    let mut program = Program::<ContiguousStack>::new(context);
    interpreter::evaluate(script, &mut program, &AcceptAllChecker)?;
    Ok(program)
}

#[test]
fn add_produces_minimally_encoded_result() {
    // OP_2 OP_3 OP_ADD -> 5
    let script = Script::new(vec![
        Operation::Op(Opcode::Op2),
        Operation::Op(Opcode::Op3),
        Operation::Op(Opcode::OpAdd),
    ]);
    let program = evaluate(&script).unwrap();
    assert_eq!(program.primary().peek().unwrap(), [0x05]);
}

#[test]
fn subtract_to_negative_encodes_sign_bit() {
    // OP_2 OP_3 OP_SUB -> -1, encoded as 0x81 (1 with the sign bit set)
    let script = Script::new(vec![
        Operation::Op(Opcode::Op2),
        Operation::Op(Opcode::Op3),
        Operation::Op(Opcode::OpSub),
    ]);
    let program = evaluate(&script).unwrap();
    assert_eq!(program.primary().peek().unwrap(), [0x81]);
}

#[test]
fn non_minimally_encoded_push_is_rejected_as_an_arithmetic_operand() {
    // A redundant zero byte (0x00 0x00) encodes zero non-minimally.
    let script = Script::new(vec![
        Operation::Push(vec![0x00, 0x00]),
        Operation::Op(Opcode::Op1),
        Operation::Op(Opcode::OpAdd),
    ]);
    assert!(evaluate(&script).is_err());
}

#[test]
fn five_byte_operand_exceeds_arithmetic_domain() {
    let script = Script::new(vec![
        Operation::Push(vec![0x01, 0x00, 0x00, 0x00, 0x01]),
        Operation::Op(Opcode::Op1),
        Operation::Op(Opcode::OpAdd),
    ]);
    assert!(evaluate(&script).is_err());
}
