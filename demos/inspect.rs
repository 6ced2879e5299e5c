//! Demonstrates script parsing and human-readable display.
//!
//! Run with: `cargo run --example inspect`

use bitcoin_consensus_script::operation::parse_script_hex;

fn main() {
    // A standard P2PKH scriptPubKey in hex:
    // OP_DUP OP_HASH160 <20-byte pubkey hash> OP_EQUALVERIFY OP_CHECKSIG
    let hex = "76a91489abcdefabbaabbaabbaabbaabbaabbaabbaabba88ac";

    println!("Raw hex: {hex}");
    println!();

    let ops = parse_script_hex(hex).expect("valid hex script");

    println!("Parsed operations:");
    for (i, op) in ops.iter().enumerate() {
        println!("  [{i}] {op}");
    }
}
