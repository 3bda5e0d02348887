//! Diagonal candidate generation (C3): given a delta-set, enumerate every
//! 4-byte round-10 subkey fragment consistent with it for one diagonal.

use crate::aes::INV_SBOX;
use crate::error::Error;
use crate::types::{CandidateList, DeltaSet, Pair, POSITIONS};

/// For each word `d` in `delta_set`, find every `(k0, k1, k2, k3)` such
/// that the inverse-S-box difference between the pair's correct and
/// faulty ciphertext bytes on diagonal `col`, each XOR'd with its
/// corresponding key byte, matches `d` byte-for-byte.
///
/// The four nested `0..256` loops are pruned as soon as a byte disagrees,
/// so the expected work is far below the textbook 2^32: each inner loop
/// only runs to completion for the (typically ~1) key bytes consistent
/// with the outer bytes already fixed.
pub fn candidates_for_diagonal(
    pair: &Pair,
    col: usize,
    delta_set: &DeltaSet,
) -> Result<CandidateList, Error> {
    let good: [u8; 4] = std::array::from_fn(|i| pair.ct[POSITIONS[col][i]]);
    let faulty: [u8; 4] = std::array::from_fn(|i| pair.fct[POSITIONS[col][i]]);

    let mut candidates = Vec::new();

    for &d in delta_set.as_slice() {
        let target = d.to_le_bytes();

        for k0 in 0u32..256 {
            if diff_byte(good[0], faulty[0], k0 as u8) != target[0] {
                continue;
            }
            for k1 in 0u32..256 {
                if diff_byte(good[1], faulty[1], k1 as u8) != target[1] {
                    continue;
                }
                for k2 in 0u32..256 {
                    if diff_byte(good[2], faulty[2], k2 as u8) != target[2] {
                        continue;
                    }
                    for k3 in 0u32..256 {
                        if diff_byte(good[3], faulty[3], k3 as u8) != target[3] {
                            continue;
                        }
                        candidates.push(u32::from_le_bytes([
                            k0 as u8, k1 as u8, k2 as u8, k3 as u8,
                        ]));
                    }
                }
            }
        }
    }

    CandidateList::from_vec(candidates)
}

fn diff_byte(good: u8, faulty: u8, key_byte: u8) -> u8 {
    INV_SBOX[(good ^ key_byte) as usize] ^ INV_SBOX[(faulty ^ key_byte) as usize]
}
