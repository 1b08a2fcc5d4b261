//! Record identifiers
//!
//! Every record carries a UID string. Fresh records get a random 128-bit
//! identifier rendered in base58 (Bitcoin alphabet, no `0`, `O`, `I`, `l`),
//! which keeps UIDs short and safe to use as file names in a virtual store.
//! Reproducible identifiers can be derived from label strings instead.

use xxhash_rust::xxh3::xxh3_64;

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Generate a new random UID.
pub fn generate() -> String {
    encode_base58(uuid::Uuid::new_v4().as_bytes())
}

/// Derive a deterministic UID from one or more labels.
///
/// The same labels always produce the same UID. Labels are joined with a
/// unit separator before hashing so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn from_labels(labels: &[&str]) -> String {
    let joined = labels.join("\u{1f}");
    encode_base58(&xxh3_64(joined.as_bytes()).to_be_bytes())
}

/// Encode bytes as base58.
pub fn encode_base58(input: &[u8]) -> String {
    let zeros = input.iter().take_while(|b| **b == 0).count();

    // Little-endian base58 digits of the big-endian input number
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 138 / 100 + 1);
    for &byte in &input[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat('1').take(zeros));
    out.extend(digits.iter().rev().map(|d| ALPHABET[*d as usize] as char));
    out
}
