//! Key-schedule inversion (C4): recover the full round-key schedule, and
//! the round-9 subkey, from a candidate round-10 subkey alone.
//!
//! Grounded directly on `reverseKeyExpansion`/`k9_from_k10` of the
//! reference implementation: the AES-128 key schedule relation runs
//! backwards just as easily as forwards, one word at a time.

use crate::aes::{RCON, SBOX};

/// Rebuild the full 176-byte round-key schedule (round 0 at offset 0, ...,
/// round 10 at offset 160) given only the round-10 subkey.
#[must_use]
pub fn inverse_key_expansion(subkey10: [u8; 16]) -> [u8; 176] {
    let mut schedule = [0u8; 176];
    schedule[160..176].copy_from_slice(&subkey10);

    // Walk the word index backwards from the last word of round 9 (word
    // 39) down to the first word of round 0 (word 0).
    for word in (0..40).rev() {
        let round = word / 4;
        if word % 4 == 0 {
            let prev_word = [
                schedule[4 * (word + 3)],
                schedule[4 * (word + 3) + 1],
                schedule[4 * (word + 3) + 2],
                schedule[4 * (word + 3) + 3],
            ];
            let mut t = [
                SBOX[prev_word[1] as usize],
                SBOX[prev_word[2] as usize],
                SBOX[prev_word[3] as usize],
                SBOX[prev_word[0] as usize],
            ];
            t[0] ^= RCON[round];
            for j in 0..4 {
                schedule[4 * word + j] = schedule[4 * (word + 4) + j] ^ t[j];
            }
        } else {
            for j in 0..4 {
                schedule[4 * word + j] =
                    schedule[4 * (word + 4) + j] ^ schedule[4 * (word + 3) + j];
            }
        }
    }

    schedule
}

/// Derive the round-9 subkey from the round-10 subkey alone (one step of
/// [`inverse_key_expansion`], inlined because round 8's filter needs only
/// this single step rather than the whole schedule).
#[must_use]
pub fn k9_from_k10(subkey10: [u8; 16]) -> [u8; 16] {
    let mut subkey9 = [0u8; 16];
    for i in (4..16).step_by(4) {
        for j in 0..4 {
            subkey9[i + j] = subkey10[i + j] ^ subkey10[i + j - 4];
        }
    }
    subkey9[0] = subkey10[0] ^ SBOX[subkey9[13] as usize] ^ RCON[9];
    subkey9[1] = subkey10[1] ^ SBOX[subkey9[14] as usize];
    subkey9[2] = subkey10[2] ^ SBOX[subkey9[15] as usize];
    subkey9[3] = subkey10[3] ^ SBOX[subkey9[12] as usize];
    subkey9
}
