//! Transaction signature hashing (spec.md C5): legacy, BIP143 version-0
//! witness, and BIP341/342 taproot.
//!
//! Grounded on `transaction.cpp`'s `signature_hash` dispatcher, which picks
//! between the three algorithms based on the prevout's script version, and
//! on its `output_overflow`/"one_hash" comment documenting the historical
//! SIGHASH_SINGLE bug that consensus must reproduce exactly.

use crate::context::ScriptVersion;
use crate::crypto::{SIGHASH_ANYONECANPAY, SIGHASH_NONE, SIGHASH_SINGLE};
use crate::hash::{hash256, tagged_hash};
use crate::script::Script;
use crate::transaction::{Input, Transaction};

/// The historical "one hash" fallback: when SIGHASH_SINGLE is used but the
/// input index has no matching output, consensus returns this exact 32-byte
/// value (0x01 followed by 31 zero bytes) rather than an error. Preserved
/// verbatim since changing it would be a consensus split.
pub const SIGHASH_SINGLE_BUG_HASH: [u8; 32] = {
    let mut bytes = [0u8; 32];
    bytes[0] = 1;
    bytes
};

fn anyone_can_pay(hash_type: u8) -> bool {
    hash_type & SIGHASH_ANYONECANPAY != 0
}

fn base_type(hash_type: u8) -> u8 {
    hash_type & !SIGHASH_ANYONECANPAY
}

/// Legacy (pre-segwit) signature hash algorithm.
///
/// `script_code` is the prevout script with `OP_CODESEPARATOR`s and the
/// currently-checked signature already removed ([`Script::subscript`]).
pub fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    hash_type: u8,
) -> [u8; 32] {
    if base_type(hash_type) == SIGHASH_SINGLE && input_index >= tx.outputs.len() {
        return SIGHASH_SINGLE_BUG_HASH;
    }

    let mut stripped = tx.clone();
    for (i, input) in stripped.inputs.iter_mut().enumerate() {
        input.script_sig = if i == input_index {
            script_code.clone()
        } else {
            Script::default()
        };
    }

    if anyone_can_pay(hash_type) {
        stripped.inputs = vec![stripped.inputs[input_index].clone()];
    } else if base_type(hash_type) == SIGHASH_NONE || base_type(hash_type) == SIGHASH_SINGLE {
        for (i, input) in stripped.inputs.iter_mut().enumerate() {
            if i != input_index {
                input.sequence = 0;
            }
        }
    }

    match base_type(hash_type) {
        SIGHASH_NONE => stripped.outputs.clear(),
        SIGHASH_SINGLE => {
            stripped.outputs.truncate(input_index + 1);
            for output in stripped.outputs.iter_mut().take(input_index) {
                output.value = u64::MAX;
                output.script_pubkey = Script::default();
            }
        }
        _ => {}
    }

    let mut preimage = stripped.to_data_unsigned();
    preimage.extend_from_slice(&(hash_type as u32).to_le_bytes());
    hash256(&preimage)
}

/// BIP143 version-0 witness program signature hash.
///
/// Unlike the legacy algorithm, this hashes fixed-size digests of the
/// prevouts/sequences/outputs (each cached by the caller across inputs of
/// the same transaction) rather than re-serializing and re-stripping the
/// whole transaction per input — the digest-of-digests construction BIP143
/// introduces specifically to fix legacy's O(n^2) signing cost.
pub fn segwit_v0_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    input_value: u64,
    hash_type: u8,
) -> [u8; 32] {
    let anyone = anyone_can_pay(hash_type);
    let base = base_type(hash_type);

    let hash_prevouts = if anyone {
        [0u8; 32]
    } else {
        let mut data = Vec::new();
        for input in &tx.inputs {
            data.extend_from_slice(&input.previous_output.txid);
            data.extend_from_slice(&input.previous_output.index.to_le_bytes());
        }
        hash256(&data)
    };

    let hash_sequence = if !anyone && base != SIGHASH_SINGLE && base != SIGHASH_NONE {
        let mut data = Vec::new();
        for input in &tx.inputs {
            data.extend_from_slice(&input.sequence.to_le_bytes());
        }
        hash256(&data)
    } else {
        [0u8; 32]
    };

    let hash_outputs = if base != SIGHASH_SINGLE && base != SIGHASH_NONE {
        let mut data = Vec::new();
        for output in &tx.outputs {
            data.extend_from_slice(&output.to_data());
        }
        hash256(&data)
    } else if base == SIGHASH_SINGLE && input_index < tx.outputs.len() {
        hash256(&tx.outputs[input_index].to_data())
    } else {
        [0u8; 32]
    };

    let input = &tx.inputs[input_index];
    let mut preimage = Vec::new();
    preimage.extend_from_slice(&tx.version.to_le_bytes());
    preimage.extend_from_slice(&hash_prevouts);
    preimage.extend_from_slice(&hash_sequence);
    preimage.extend_from_slice(&input.previous_output.txid);
    preimage.extend_from_slice(&input.previous_output.index.to_le_bytes());
    let code = script_code.to_data();
    preimage.extend_from_slice(&crate::operation::encode_compact_size(code.len() as u64));
    preimage.extend_from_slice(&code);
    preimage.extend_from_slice(&input_value.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&hash_outputs);
    preimage.extend_from_slice(&tx.locktime.to_le_bytes());
    preimage.extend_from_slice(&(hash_type as u32).to_le_bytes());

    hash256(&preimage)
}

/// Taproot key-path or script-path signature hash (BIP341/342).
///
/// `leaf_hash` is `Some` for a script-path spend (tapscript), carrying the
/// tagged hash of the executed leaf; `None` for a key-path spend.
#[allow(clippy::too_many_arguments)]
pub fn taproot_signature_hash(
    tx: &Transaction,
    input_index: usize,
    prevouts: &[(u64, Script)],
    hash_type: u8,
    script_version: ScriptVersion,
    leaf_hash: Option<[u8; 32]>,
    code_separator_position: Option<u32>,
) -> [u8; 32] {
    let anyone = anyone_can_pay(hash_type);
    let base = base_type(hash_type);

    let mut data = Vec::new();
    data.push(0u8); // epoch
    data.push(hash_type);
    data.extend_from_slice(&tx.version.to_le_bytes());
    data.extend_from_slice(&tx.locktime.to_le_bytes());

    if !anyone {
        let mut prevouts_data = Vec::new();
        let mut amounts_data = Vec::new();
        let mut scripts_data = Vec::new();
        let mut sequences_data = Vec::new();
        for (input, (value, script)) in tx.inputs.iter().zip(prevouts.iter()) {
            prevouts_data.extend_from_slice(&input.previous_output.txid);
            prevouts_data.extend_from_slice(&input.previous_output.index.to_le_bytes());
            amounts_data.extend_from_slice(&value.to_le_bytes());
            let bytes = script.to_data();
            scripts_data.extend_from_slice(&crate::operation::encode_compact_size(bytes.len() as u64));
            scripts_data.extend_from_slice(&bytes);
            sequences_data.extend_from_slice(&input.sequence.to_le_bytes());
        }
        data.extend_from_slice(&crate::hash::sha256(&prevouts_data));
        data.extend_from_slice(&crate::hash::sha256(&amounts_data));
        data.extend_from_slice(&crate::hash::sha256(&scripts_data));
        data.extend_from_slice(&crate::hash::sha256(&sequences_data));
    }

    if base != SIGHASH_NONE && base != SIGHASH_SINGLE {
        let mut outputs_data = Vec::new();
        for output in &tx.outputs {
            outputs_data.extend_from_slice(&output.to_data());
        }
        data.extend_from_slice(&crate::hash::sha256(&outputs_data));
    }

    let spend_type = (leaf_hash.is_some() as u8) << 1;
    data.push(spend_type);

    if anyone {
        let input = &tx.inputs[input_index];
        data.extend_from_slice(&input.previous_output.txid);
        data.extend_from_slice(&input.previous_output.index.to_le_bytes());
        let (value, script) = &prevouts[input_index];
        data.extend_from_slice(&value.to_le_bytes());
        let bytes = script.to_data();
        data.extend_from_slice(&crate::operation::encode_compact_size(bytes.len() as u64));
        data.extend_from_slice(&bytes);
        data.extend_from_slice(&input.sequence.to_le_bytes());
    } else {
        data.extend_from_slice(&(input_index as u32).to_le_bytes());
    }

    if base == SIGHASH_SINGLE {
        if let Some(output) = tx.outputs.get(input_index) {
            data.extend_from_slice(&crate::hash::sha256(&output.to_data()));
        }
    }

    if let ScriptVersion::TaprootScriptPath = script_version {
        if let Some(leaf) = leaf_hash {
            data.extend_from_slice(&leaf);
            data.push(0u8); // key_version
            data.extend_from_slice(&code_separator_position.unwrap_or(u32::MAX).to_le_bytes());
        }
    }

    tagged_hash("TapSighash", &data)
}

/// Computes the tapscript leaf hash (BIP341 `TapLeaf`) a script-path input
/// signs against.
pub fn tap_leaf_hash(leaf_version: u8, script: &Script) -> [u8; 32] {
    let bytes = script.to_data();
    let mut data = vec![leaf_version];
    data.extend_from_slice(&crate::operation::encode_compact_size(bytes.len() as u64));
    data.extend_from_slice(&bytes);
    tagged_hash("TapLeaf", &data)
}

/// The only leaf version this crate executes tapscript under; any other
/// value in a control block validates trivially (BIP341's future leaf
/// version rule), the same way an unknown witness version does.
pub const TAPSCRIPT_LEAF_VERSION: u8 = 0xc0;

/// Longest Merkle path a control block may carry (BIP341).
const MAX_TAPROOT_PATH_DEPTH: usize = 128;

/// Parses a BIP341 control block: the leaf version (parity bit masked
/// off), the output key's parity, the internal key, and the Merkle path
/// from the executed leaf up to the script tree root.
pub fn parse_control_block(control_block: &[u8]) -> Option<(u8, bool, [u8; 32], Vec<[u8; 32]>)> {
    if control_block.len() < 33
        || (control_block.len() - 33) % 32 != 0
        || (control_block.len() - 33) / 32 > MAX_TAPROOT_PATH_DEPTH
    {
        return None;
    }
    let leaf_version = control_block[0] & 0xfe;
    let parity_odd = control_block[0] & 1 == 1;
    let mut internal_key = [0u8; 32];
    internal_key.copy_from_slice(&control_block[1..33]);
    let path = control_block[33..]
        .chunks_exact(32)
        .map(|chunk| {
            let mut node = [0u8; 32];
            node.copy_from_slice(chunk);
            node
        })
        .collect();
    Some((leaf_version, parity_odd, internal_key, path))
}

/// Folds a Merkle path onto a leaf hash per BIP341 `TapBranch` (sorted
/// pairwise tagged hashing), producing the script tree's Merkle root.
pub fn taproot_merkle_root(leaf_hash: [u8; 32], path: &[[u8; 32]]) -> [u8; 32] {
    path.iter().fold(leaf_hash, |node, sibling| {
        let (a, b) = if node <= *sibling { (node, *sibling) } else { (*sibling, node) };
        let mut data = Vec::with_capacity(64);
        data.extend_from_slice(&a);
        data.extend_from_slice(&b);
        tagged_hash("TapBranch", &data)
    })
}

/// Builds the legacy/segwit-v0 subscript from a prevout script and the
/// input's last-executed `OP_CODESEPARATOR` position, removing the
/// signature under check (the historical `FindAndDelete` step).
pub fn script_code_for(
    prevout_script: &Script,
    code_separator_index: usize,
    signatures: &[&[u8]],
) -> Script {
    prevout_script.subscript(code_separator_index, signatures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use crate::transaction::{Outpoint, Output};

    fn sample_tx() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![Input {
                previous_output: Outpoint { txid: [0u8; 32], index: 0 },
                script_sig: Script::default(),
                sequence: 0xffff_ffff,
                witness: Vec::new(),
            }],
            outputs: vec![Output { value: 5_000, script_pubkey: Script::new(vec![]) }],
            locktime: 0,
        }
    }

    #[test]
    fn legacy_sighash_single_bug_returns_fixed_hash() {
        let mut tx = sample_tx();
        tx.inputs.push(Input {
            previous_output: Outpoint { txid: [1u8; 32], index: 1 },
            script_sig: Script::default(),
            sequence: 0xffff_ffff,
            witness: Vec::new(),
        });
        let hash = legacy_signature_hash(&tx, 1, &Script::default(), SIGHASH_SINGLE);
        assert_eq!(hash, SIGHASH_SINGLE_BUG_HASH);
    }

    #[test]
    fn legacy_sighash_is_deterministic() {
        let tx = sample_tx();
        let script = Script::new(vec![Operation::Op(crate::opcode::Opcode::OpCheckSig)]);
        let a = legacy_signature_hash(&tx, 0, &script, 0x01);
        let b = legacy_signature_hash(&tx, 0, &script, 0x01);
        assert_eq!(a, b);
    }

    #[test]
    fn legacy_sighash_changes_with_hash_type() {
        let tx = sample_tx();
        let script = Script::new(vec![Operation::Op(crate::opcode::Opcode::OpCheckSig)]);
        let all = legacy_signature_hash(&tx, 0, &script, 0x01);
        let none = legacy_signature_hash(&tx, 0, &script, SIGHASH_NONE);
        assert_ne!(all, none);
    }

    #[test]
    fn segwit_v0_sighash_is_deterministic() {
        let tx = sample_tx();
        let script = Script::new(vec![Operation::Op(crate::opcode::Opcode::OpCheckSig)]);
        let a = segwit_v0_signature_hash(&tx, 0, &script, 5_000, 0x01);
        let b = segwit_v0_signature_hash(&tx, 0, &script, 5_000, 0x01);
        assert_eq!(a, b);
    }

    #[test]
    fn segwit_v0_sighash_changes_with_input_value() {
        let tx = sample_tx();
        let script = Script::new(vec![Operation::Op(crate::opcode::Opcode::OpCheckSig)]);
        let a = segwit_v0_signature_hash(&tx, 0, &script, 5_000, 0x01);
        let b = segwit_v0_signature_hash(&tx, 0, &script, 6_000, 0x01);
        assert_ne!(a, b);
    }

    #[test]
    fn taproot_key_path_sighash_is_deterministic() {
        let tx = sample_tx();
        let prevouts = vec![(5_000u64, Script::default())];
        let a = taproot_signature_hash(&tx, 0, &prevouts, 0x00, ScriptVersion::TaprootKeyPath, None, None);
        let b = taproot_signature_hash(&tx, 0, &prevouts, 0x00, ScriptVersion::TaprootKeyPath, None, None);
        assert_eq!(a, b);
    }

    #[test]
    fn taproot_script_path_sighash_differs_from_key_path() {
        let tx = sample_tx();
        let prevouts = vec![(5_000u64, Script::default())];
        let leaf = tap_leaf_hash(0xc0, &Script::new(vec![Operation::Op(crate::opcode::Opcode::OpCheckSig)]));
        let key_path = taproot_signature_hash(&tx, 0, &prevouts, 0x00, ScriptVersion::TaprootKeyPath, None, None);
        let script_path = taproot_signature_hash(
            &tx,
            0,
            &prevouts,
            0x00,
            ScriptVersion::TaprootScriptPath,
            Some(leaf),
            Some(0),
        );
        assert_ne!(key_path, script_path);
    }

    #[test]
    fn tap_leaf_hash_is_deterministic() {
        let script = Script::new(vec![Operation::Op(crate::opcode::Opcode::OpCheckSig)]);
        assert_eq!(tap_leaf_hash(0xc0, &script), tap_leaf_hash(0xc0, &script));
    }
}
