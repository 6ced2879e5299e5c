//! Demonstrates the complete Pay-to-Public-Key-Hash (P2PKH) validation flow:
//! scriptSig runs first, its resulting stack seeds scriptPubKey, and the
//! final top-of-stack value decides whether the spend is authorized.
//!
//! Run with: `cargo run --example p2pkh`

use bitcoin_consensus_script::context::{ExecutionContext, Forks, ScriptVersion};
use bitcoin_consensus_script::hash;
use bitcoin_consensus_script::interpreter::{self, AcceptAllChecker};
use bitcoin_consensus_script::opcode::Opcode;
use bitcoin_consensus_script::operation::Operation;
use bitcoin_consensus_script::program::Program;
use bitcoin_consensus_script::script::Script;
use bitcoin_consensus_script::stack::{is_true, ContiguousStack, ScriptStack};

fn main() {
    // 1. A fake 71-byte signature and 33-byte compressed public key. In a
    //    real spend these would come from the spending input.
    let fake_sig = vec![0x30u8; 71];
    let fake_pubkey = vec![0x02u8; 33];

    // 2. HASH160(pubkey) is the 20-byte "address hash" locked in the
    //    scriptPubKey.
    let pubkey_hash = hash::hash160(&fake_pubkey);

    // 3. scriptSig: <sig> <pubkey>
    let script_sig = Script::new(vec![Operation::Push(fake_sig), Operation::Push(fake_pubkey)]);

    // 4. scriptPubKey: OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG
    let script_pubkey = Script::new(vec![
        Operation::Op(Opcode::OpDup),
        Operation::Op(Opcode::OpHash160),
        Operation::Push(pubkey_hash.to_vec()),
        Operation::Op(Opcode::OpEqualVerify),
        Operation::Op(Opcode::OpCheckSig),
    ]);

    print!("scriptPubKey:");
    for op in script_pubkey.ops() {
        print!(" {op}");
    }
    println!();
    println!();

    // 5. Run both scripts in sequence against one shared stack, using a
    //    checker that accepts any signature (no real key material here).
    let context = ExecutionContext::new(Forks::NONE, ScriptVersion::Unversioned, 0);
    let mut program = Program::<ContiguousStack>::new(context);
    interpreter::evaluate(&script_sig, &mut program, &AcceptAllChecker)
        .expect("scriptSig execution succeeded");
    interpreter::evaluate(&script_pubkey, &mut program, &AcceptAllChecker)
        .expect("scriptPubKey execution succeeded");

    let result = is_true(program.primary().peek().expect("non-empty final stack"));
    println!("P2PKH validation result: {result}");
}
