//! A Bitcoin Script interpreter and transaction/block validation core.
//!
//! Bitcoin Script is the stack-based programming language used to define
//! spending conditions for Bitcoin transaction outputs. This crate
//! implements the full consensus instruction set — legacy, P2SH, segwit
//! v0, and taproot/tapscript — along with the surrounding transaction and
//! block checks needed to decide whether a candidate belongs on the chain.
//!
//! # Consensus warning
//!
//! **This crate is NOT a drop-in replacement for Bitcoin Core's validation
//! engine.** It implements the same algorithms from the same source
//! material, but has not been fuzzed or cross-checked against mainnet at
//! the scale that would be required to trust it with real funds.
//!
//! **Do not use this crate to validate real transactions or protect real
//! funds without independent review.**
//!
//! This crate is intended for:
//! - **Education** — learning how Bitcoin's consensus rules fit together
//! - **Tooling** — script inspection, debugging, and construction
//! - **Testing** — exercising validation logic against fixtures and
//!   alternative chain parameters
//!
//! # What this crate implements
//!
//! - [`operation`]/[`opcode`]: parsing and classification of the full
//!   opcode set, including push-data encodings and BIP342 `OP_SUCCESS`.
//! - [`program`]/[`interpreter`]: the stack-machine evaluation loop,
//!   covering arithmetic, conditionals, hashing, and both ECDSA and
//!   Schnorr signature checks.
//! - [`sighash`]: legacy, BIP143 (segwit v0), and BIP341/342 (taproot)
//!   signature hash algorithms.
//! - [`transaction`]/[`block`]: structural and consensus checks —
//!   weight/sigop limits, locktime, P2SH/witness-program replay, Merkle
//!   commitments, and block malleability detection.
//! - [`chain_state`]: soft-fork activation, retargeting, and
//!   median-time-past derivation from a rolling window of headers.
//!
//! # Signature verification
//!
//! With the `secp256k1` feature disabled, signature checks fail closed
//! (`check_ecdsa_signature`/`check_schnorr_signature` both return
//! `Ok(false)`) rather than stubbing a result, since this is
//! consensus-critical validation rather than a script-logic demo.
//!
//! # Quick example
//!
//! ```rust
//! use bitcoin_consensus_script::script::Script;
//! use bitcoin_consensus_script::context::{ExecutionContext, Forks, ScriptVersion};
//! use bitcoin_consensus_script::interpreter::{self, AcceptAllChecker};
//! use bitcoin_consensus_script::program::Program;
//! use bitcoin_consensus_script::stack::{ContiguousStack, ScriptStack, is_true};
//!
//! // OP_1 OP_1 OP_EQUAL
//! let script = Script::parse_hex("515187").unwrap();
//! let context = ExecutionContext::new(Forks::NONE, ScriptVersion::Unversioned, 0);
//! let mut program = Program::<ContiguousStack>::new(context);
//! interpreter::evaluate(&script, &mut program, &AcceptAllChecker).unwrap();
//! assert!(is_true(program.primary().peek().unwrap()));
//! ```
//!
//! # Feature flags
//!
//! | Feature     | Description                                           |
//! |-------------|--------------------------------------------------------|
//! | `secp256k1` | Enables real ECDSA/Schnorr signature verification via  |
//! |             | the `secp256k1` crate.                                  |

pub mod block;
pub mod chain_state;
pub mod context;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod hex;
pub mod interpreter;
pub mod number;
pub mod opcode;
pub mod operation;
pub mod program;
pub mod script;
pub mod sighash;
pub mod stack;
pub mod transaction;
