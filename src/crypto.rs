//! Signature parsing and verification.
//!
//! DER strict-encoding validation is grounded on `near-intents/bip322`'s
//! `der.rs` (rewritten in this crate's idiom: no nested error type, the
//! local [`OpError`] is the terminal result). ECDSA/Schnorr verification
//! extends the teacher's feature-gated `verify_ecdsa` to also cover BIP340
//! under the same `secp256k1` feature.

use crate::error::OpError;

/// Hash type byte trailing an ECDSA signature, or the optional trailing
/// byte on a taproot Schnorr signature. `Default` means SIGHASH_ALL.
pub const SIGHASH_ALL: u8 = 0x01;
pub const SIGHASH_NONE: u8 = 0x02;
pub const SIGHASH_SINGLE: u8 = 0x03;
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Splits a legacy/segwit ECDSA signature into its DER-encoded payload and
/// trailing sighash-type byte. Fails on an empty signature.
pub fn split_ecdsa_signature(sig: &[u8]) -> Result<(&[u8], u8), OpError> {
    if sig.is_empty() {
        return Err(OpError::CheckSigVerify3EmptySignature);
    }
    let (der, rest) = sig.split_at(sig.len() - 1);
    Ok((der, rest[0]))
}

/// Validates strict DER encoding of an ECDSA signature body (BIP66),
/// independent of the trailing sighash-type byte.
///
/// Structure: `0x30 len 0x02 rlen r 0x02 slen s`, where `r`/`s` carry no
/// unnecessary leading zero bytes and are never negative (no high bit set
/// without a padding zero).
pub fn is_strict_der_signature(der: &[u8]) -> bool {
    // Minimum: 0x30 len 0x02 0x01 r 0x02 0x01 s = 8 bytes.
    if der.len() < 8 || der.len() > 72 {
        return false;
    }
    if der[0] != 0x30 {
        return false;
    }
    if der[1] as usize != der.len() - 2 {
        return false;
    }

    let rlen = match der.get(3) {
        Some(&n) => n as usize,
        None => return false,
    };
    if der.get(2) != Some(&0x02) || rlen == 0 || 4 + rlen >= der.len() {
        return false;
    }
    let r = &der[4..4 + rlen];
    if !is_strict_der_integer(r) {
        return false;
    }

    let s_tag_idx = 4 + rlen;
    if der.get(s_tag_idx) != Some(&0x02) {
        return false;
    }
    let slen = match der.get(s_tag_idx + 1) {
        Some(&n) => n as usize,
        None => return false,
    };
    if slen == 0 || s_tag_idx + 2 + slen != der.len() {
        return false;
    }
    let s = &der[s_tag_idx + 2..s_tag_idx + 2 + slen];
    is_strict_der_integer(s)
}

fn is_strict_der_integer(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    // No unnecessary leading zero, unless needed to keep the value
    // non-negative (top bit of the following byte set).
    if bytes.len() > 1 && bytes[0] == 0x00 && bytes[1] & 0x80 == 0 {
        return false;
    }
    // Top bit set with no padding byte would make the integer negative.
    bytes[0] & 0x80 == 0
}

/// secp256k1 group order, used by [`is_low_s`].
#[cfg(feature = "secp256k1")]
const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// True when the signature's `s` value is at most half the curve order
/// (BIP146 low-S malleability rule). Only meaningful for well-formed DER.
#[cfg(feature = "secp256k1")]
pub fn is_low_s(der: &[u8]) -> bool {
    if !is_strict_der_signature(der) {
        return false;
    }
    let rlen = der[3] as usize;
    let s_tag_idx = 4 + rlen;
    let slen = der[s_tag_idx + 1] as usize;
    let s = &der[s_tag_idx + 2..s_tag_idx + 2 + slen];

    let mut s_padded = [0u8; 32];
    let offset = 32usize.saturating_sub(s.len());
    s_padded[offset..].copy_from_slice(&s[s.len().saturating_sub(32)..]);

    let mut half_order = CURVE_ORDER;
    // Divide by two in place (big-endian).
    let mut carry = 0u8;
    for byte in half_order.iter_mut() {
        let new_carry = *byte & 1;
        *byte = (*byte >> 1) | (carry << 7);
        carry = new_carry;
    }

    s_padded <= half_order
}

/// Verifies an ECDSA signature over `sighash` by `pubkey`. Returns `false`
/// (never errors) on any malformed input, matching consensus behavior
/// where a bad signature simply fails verification.
#[cfg(feature = "secp256k1")]
pub fn ecdsa_verify(pubkey: &[u8], sighash: &[u8; 32], der_sig: &[u8]) -> bool {
    use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1};

    let secp = Secp256k1::verification_only();

    let signature = match Signature::from_der(der_sig) {
        Ok(s) => s,
        Err(_) => return false,
    };
    let public_key = match PublicKey::from_slice(pubkey) {
        Ok(k) => k,
        Err(_) => return false,
    };
    let message = Message::from_digest(*sighash);

    secp.verify_ecdsa(&message, &signature, &public_key).is_ok()
}

/// Verifies a BIP340 Schnorr signature over `sighash` by an x-only
/// `pubkey` (tapscript/taproot key-path `OP_CHECKSIG`).
#[cfg(feature = "secp256k1")]
pub fn schnorr_verify(pubkey: &[u8; 32], sighash: &[u8; 32], sig: &[u8; 64]) -> bool {
    use secp256k1::{schnorr::Signature, Message, Secp256k1, XOnlyPublicKey};

    let secp = Secp256k1::verification_only();

    let signature = Signature::from_slice(sig).expect("64-byte slice is always well-formed");
    let public_key = match XOnlyPublicKey::from_slice(pubkey) {
        Ok(k) => k,
        Err(_) => return false,
    };
    let message = Message::from_digest(*sighash);

    secp.verify_schnorr(&signature, &message, &public_key).is_ok()
}

/// Verifies a BIP341 taproot output key commits to `internal_key`, tweaked
/// by `merkle_root` when a script tree is present (script-path spend) or
/// by no root at all (key-path spend against a keyless output).
#[cfg(feature = "secp256k1")]
pub fn taproot_tweak_verify(
    internal_key: &[u8; 32],
    merkle_root: Option<&[u8; 32]>,
    output_key: &[u8; 32],
    output_key_parity_odd: bool,
) -> bool {
    use secp256k1::{Parity, Scalar, Secp256k1, XOnlyPublicKey};

    let secp = Secp256k1::verification_only();
    let internal = match XOnlyPublicKey::from_slice(internal_key) {
        Ok(k) => k,
        Err(_) => return false,
    };
    let output = match XOnlyPublicKey::from_slice(output_key) {
        Ok(k) => k,
        Err(_) => return false,
    };

    let mut preimage = internal_key.to_vec();
    if let Some(root) = merkle_root {
        preimage.extend_from_slice(root);
    }
    let tweak_hash = crate::hash::tagged_hash("TapTweak", &preimage);
    let tweak = match Scalar::from_be_bytes(tweak_hash) {
        Ok(s) => s,
        Err(_) => return false,
    };
    let parity = if output_key_parity_odd { Parity::Odd } else { Parity::Even };

    internal.tweak_add_check(&secp, &output, parity, tweak)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_strict_der() -> Vec<u8> {
        // A syntactically well-formed (not cryptographically valid)
        // strict-DER ECDSA signature: 32-byte r, 32-byte s, no padding
        // needed since both start below 0x80.
        let mut r = vec![0x01; 32];
        r[0] = 0x01;
        let mut s = vec![0x02; 32];
        s[0] = 0x02;
        let mut der = vec![0x30, (4 + r.len() + s.len()) as u8];
        der.push(0x02);
        der.push(r.len() as u8);
        der.extend_from_slice(&r);
        der.push(0x02);
        der.push(s.len() as u8);
        der.extend_from_slice(&s);
        der
    }

    #[test]
    fn split_ecdsa_signature_separates_hash_type() {
        let mut sig = sample_strict_der();
        sig.push(SIGHASH_ALL);
        let (der, hash_type) = split_ecdsa_signature(&sig).unwrap();
        assert_eq!(hash_type, SIGHASH_ALL);
        assert_eq!(der, sample_strict_der().as_slice());
    }

    #[test]
    fn split_empty_signature_fails() {
        assert_eq!(
            split_ecdsa_signature(&[]).unwrap_err(),
            OpError::CheckSigVerify3EmptySignature
        );
    }

    #[test]
    fn strict_der_accepts_well_formed_signature() {
        assert!(is_strict_der_signature(&sample_strict_der()));
    }

    #[test]
    fn strict_der_rejects_wrong_outer_length() {
        let mut der = sample_strict_der();
        der[1] += 1;
        assert!(!is_strict_der_signature(&der));
    }

    #[test]
    fn strict_der_rejects_missing_sequence_tag() {
        let mut der = sample_strict_der();
        der[0] = 0x31;
        assert!(!is_strict_der_signature(&der));
    }

    #[test]
    fn strict_der_rejects_negative_integer_without_padding() {
        let mut der = sample_strict_der();
        der[4] = 0x80; // r's first byte now has the sign bit set, unpadded
        assert!(!is_strict_der_signature(&der));
    }

    #[test]
    fn strict_der_rejects_unnecessary_leading_zero() {
        let mut r = vec![0x00, 0x01];
        r.resize(32, 0x01);
        let s = vec![0x02; 32];
        let mut der = vec![0x30, (4 + r.len() + s.len()) as u8];
        der.push(0x02);
        der.push(r.len() as u8);
        der.extend_from_slice(&r);
        der.push(0x02);
        der.push(s.len() as u8);
        der.extend_from_slice(&s);
        assert!(!is_strict_der_signature(&der));
    }

    #[test]
    fn strict_der_rejects_empty_signature() {
        assert!(!is_strict_der_signature(&[]));
    }
}
