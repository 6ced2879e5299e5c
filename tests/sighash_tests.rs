//! Cross-module scenarios combining sighash.rs with transaction.rs:
//! algorithm selection by active forks, and the fail-closed signature
//! checker behavior when the `secp256k1` feature is disabled.

use bitcoin_consensus_script::context::Forks;
use bitcoin_consensus_script::error::OpError;
use bitcoin_consensus_script::hash::hash160;
use bitcoin_consensus_script::opcode::Opcode;
use bitcoin_consensus_script::operation::Operation;
use bitcoin_consensus_script::script::Script;
use bitcoin_consensus_script::sighash::{legacy_signature_hash, segwit_v0_signature_hash};
use bitcoin_consensus_script::transaction::{Input, Outpoint, Output, Transaction};

fn p2pkh_spend() -> (Transaction, Output) {
    let pubkey = vec![0x02u8; 33];
    let pubkey_hash = hash160(&pubkey);
    let prevout = Output {
        value: 50_000,
        script_pubkey: Script::new(vec![
            Operation::Op(Opcode::OpDup),
            Operation::Op(Opcode::OpHash160),
            Operation::Push(pubkey_hash.to_vec()),
            Operation::Op(Opcode::OpEqualVerify),
            Operation::Op(Opcode::OpCheckSig),
        ]),
    };
    let tx = Transaction {
        version: 1,
        inputs: vec![Input {
            previous_output: Outpoint { txid: [7u8; 32], index: 0 },
            script_sig: Script::new(vec![
                Operation::Push(vec![0x30u8; 71]),
                Operation::Push(pubkey),
            ]),
            sequence: 0xffff_ffff,
            witness: Vec::new(),
        }],
        outputs: vec![Output { value: 49_000, script_pubkey: Script::new(vec![]) }],
        locktime: 0,
    };
    (tx, prevout)
}

#[test]
fn legacy_and_segwit_v0_sighashes_differ_for_the_same_spend() {
    let (tx, prevout) = p2pkh_spend();
    let script_code = prevout.script_pubkey.clone();
    let legacy = legacy_signature_hash(&tx, 0, &script_code, 0x01);
    let segwit = segwit_v0_signature_hash(&tx, 0, &script_code, prevout.value, 0x01);
    assert_ne!(legacy, segwit);
}

#[cfg(not(feature = "secp256k1"))]
#[test]
fn connect_input_fails_closed_without_secp256k1_feature() {
    let (tx, prevout) = p2pkh_spend();
    let result = tx.connect_input(0, &[prevout], Forks::NONE);
    assert_eq!(result.unwrap_err(), OpError::VerifyFailed);
}

#[test]
fn connect_input_rejects_non_push_only_script_sig_pre_segwit() {
    let (mut tx, prevout) = p2pkh_spend();
    tx.inputs[0].script_sig = Script::new(vec![Operation::Op(Opcode::OpCheckSig)]);
    let result = tx.connect_input(0, &[prevout], Forks::NONE);
    assert_eq!(result.unwrap_err(), OpError::InvalidStackOperation);
}
