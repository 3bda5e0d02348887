//! Round-9 recovery pipeline (C6): a round-9 fault stays within a single
//! ciphertext diagonal, so each pair contributes candidates to exactly
//! one of the four diagonals.

use crate::assembly::assemble;
use crate::candidates::candidates_for_diagonal;
use crate::delta::delta_set;
use crate::error::Error;
use crate::intersect::intersect;
use crate::types::{CandidateList, Diagnostic, FaultPosition, FaultValue, KnownPlaintext, Pair, POSITIONS};

/// Locate the diagonal whose four byte positions are exactly the set of
/// indices where `ct` and `fct` differ. Returns `None` if no diagonal
/// matches (the pair is then incompatible with a single-diagonal fault
/// model).
fn find_faulty_diagonal(ct: &[u8; 16], fct: &[u8; 16]) -> Option<usize> {
    let differing: Vec<usize> = (0..16).filter(|&i| ct[i] != fct[i]).collect();
    if differing.len() != 4 {
        return None;
    }
    (0..4).find(|&d| {
        let mut expected = POSITIONS[d];
        expected.sort_unstable();
        let mut got = differing.clone();
        got.sort_unstable();
        expected.to_vec() == got
    })
}

/// Build the fault-value set in priority order: bitflip beats a known
/// value beats "unknown" (every value `1..=255`).
fn fault_values(fault_value: FaultValue) -> Vec<u8> {
    match fault_value {
        FaultValue::Bitflip => (0..8).map(|b| 1u8 << b).collect(),
        FaultValue::Known(v) => vec![v],
        FaultValue::Unknown => (1..=255).collect(),
    }
}

/// Process one pair: locate its diagonal, build the fault-value set and
/// row hypothesis, and produce that diagonal's candidate list.
///
/// Returns `(diagonal, candidates, diagnostics)`, or `Err` if the pair is
/// incompatible with any single diagonal.
fn candidates_for_pair(
    pair: &Pair,
    pair_index: usize,
) -> Result<(usize, CandidateList, Vec<Diagnostic>), Error> {
    let mut diagnostics = Vec::new();

    let diagonal = match find_faulty_diagonal(&pair.ct, &pair.fct) {
        Some(d) => d,
        None => {
            diagnostics.push(Diagnostic::IncompatiblePair { pair_index });
            return Err(Error::IncompatiblePair);
        }
    };

    let row = match pair.fault_pos {
        FaultPosition::Known(pos) => {
            let (row, col) = (pos % 4, pos / 4);
            if col as usize == diagonal {
                Some(row)
            } else {
                diagnostics.push(Diagnostic::ColumnMismatch {
                    pair_index,
                    declared: col,
                    observed: diagonal as u8,
                });
                None
            }
        }
        FaultPosition::Unknown => None,
    };

    let faults = fault_values(pair.fault_value);
    let delta = delta_set(row, &faults)?;
    let candidates = candidates_for_diagonal(pair, diagonal, &delta)?;

    Ok((diagonal, candidates, diagnostics))
}

/// Recover the AES-128 master key given a set of round-9 fault pairs and
/// an optional known plaintext.
///
/// Each pair's candidates are adopted as the initial list for its
/// diagonal, or intersected into the existing one if another pair already
/// contributed to that diagonal. Diagonals with no contributing pair are
/// left empty, which collapses the final product to zero and is reported
/// through the normal "attack unsuccessful" channel rather than as an
/// error.
pub fn r9_key_recovery(
    pairs: &[Pair],
    known_pt: Option<&KnownPlaintext>,
) -> Result<(Vec<[u8; 16]>, Vec<Diagnostic>), Error> {
    let mut diagnostics = Vec::new();
    let mut per_diagonal: [Option<CandidateList>; 4] = [None, None, None, None];

    for (index, pair) in pairs.iter().enumerate() {
        match candidates_for_pair(pair, index) {
            Ok((diagonal, candidates, mut pair_diagnostics)) => {
                diagnostics.append(&mut pair_diagnostics);
                per_diagonal[diagonal] = Some(match per_diagonal[diagonal].take() {
                    None => candidates,
                    Some(existing) => intersect(&existing, &candidates),
                });
            }
            Err(Error::IncompatiblePair) => {
                diagnostics.push(Diagnostic::IncompatiblePair { pair_index: index });
            }
            Err(other) => return Err(other),
        }
    }

    let mut lists: [CandidateList; 4] = Default::default();
    for (d, slot) in per_diagonal.into_iter().enumerate() {
        lists[d] = match slot {
            Some(list) => list,
            None => {
                diagnostics.push(Diagnostic::EmptyDiagonal { diagonal: d as u8 });
                CandidateList::new()
            }
        };
    }

    let keys = assemble(&lists, known_pt, None)?;
    if keys.is_empty() {
        diagnostics.push(Diagnostic::AttackUnsuccessful);
    }
    Ok((keys, diagnostics))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::aes::{encrypt, key_expansion};

    fn simulate_round9_fault(
        pt: [u8; 16],
        key: [u8; 16],
        row: usize,
        col: usize,
        fault: u8,
    ) -> Pair {
        // Encrypt normally, then re-derive round 9's pre-MixColumns state
        // with a single byte perturbed, and run the last two rounds again
        // to get the faulty ciphertext. This exercises the real AES round
        // structure rather than hand-waving the fault's propagation.
        let schedule = key_expansion(key);
        let ct = encrypt(&pt, &schedule);

        // Re-run encryption, injecting the fault right before round 9's
        // MixColumns (i.e. into round 9's input state at the chosen
        // diagonal/row), mirroring how `dfa8.c`/`dfa9.c` fault models are
        // defined relative to the round-9 state.
        let mut state = pt;
        for b in 0..16 {
            state[b] ^= schedule[b];
        }
        for round in 1..=8 {
            crate::aes::sub_bytes(&mut state);
            crate::aes::shift_rows(&mut state);
            for c in 0..4 {
                let mut column = [
                    state[4 * c],
                    state[4 * c + 1],
                    state[4 * c + 2],
                    state[4 * c + 3],
                ];
                crate::aes::mix_column(&mut column);
                state[4 * c..4 * c + 4].copy_from_slice(&column);
            }
            for b in 0..16 {
                state[b] ^= schedule[round * 16 + b];
            }
        }
        // `state` is now round 9's input. Inject the fault at the
        // requested diagonal position before SubBytes/ShiftRows/round 9
        // key, then MixColumns, then round 10.
        state[POSITIONS[col][row]] ^= fault;

        crate::aes::sub_bytes(&mut state);
        crate::aes::shift_rows(&mut state);
        for c in 0..4 {
            let mut column = [
                state[4 * c],
                state[4 * c + 1],
                state[4 * c + 2],
                state[4 * c + 3],
            ];
            crate::aes::mix_column(&mut column);
            state[4 * c..4 * c + 4].copy_from_slice(&column);
        }
        for b in 0..16 {
            state[b] ^= schedule[9 * 16 + b];
        }
        crate::aes::sub_bytes(&mut state);
        crate::aes::shift_rows(&mut state);
        for b in 0..16 {
            state[b] ^= schedule[10 * 16 + b];
        }

        Pair {
            ct,
            fct: state,
            fault_pos: FaultPosition::Known((col * 4 + row) as u8),
            fault_value: FaultValue::Known(fault),
        }
    }

    #[test]
    fn end_to_end_recovers_known_key() {
        let key: [u8; 16] = [
            0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf,
            0x4f, 0x3c,
        ];
        let pt: [u8; 16] = [
            0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, 0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93,
            0x17, 0x2a,
        ];

        let mut pairs = Vec::new();
        for col in 0..4 {
            pairs.push(simulate_round9_fault(pt, key, 0, col, 0x42));
            pairs.push(simulate_round9_fault(pt, key, 1, col, 0x17));
        }

        let (keys, _diag) = r9_key_recovery(&pairs, None).expect("no overflow");
        assert!(keys.contains(&key), "expected recovered key to include {key:02x?}");
    }

    #[test]
    fn incompatible_pair_is_skipped_with_diagnostic() {
        let mut ct = [0u8; 16];
        let mut fct = [0u8; 16];
        for i in 0..6 {
            fct[i] = ct[i] ^ 0x01;
        }
        ct[0] = 0xAB; // ensure at least one real difference beyond padding
        let pair = Pair {
            ct,
            fct,
            fault_pos: FaultPosition::Unknown,
            fault_value: FaultValue::Unknown,
        };
        let (keys, diagnostics) = r9_key_recovery(&[pair], None).expect("no overflow");
        assert!(keys.is_empty());
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::IncompatiblePair { .. })));
    }
}
