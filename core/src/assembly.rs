//! Final exhaustive assembly (C8): the Cartesian product across the four
//! diagonals' candidate lists, each tuple turned into a full master-key
//! guess and checked.
//!
//! The outer loop (over the first diagonal) is the data-parallel
//! boundary, mirroring the teacher's `engine/parallel.rs` use of
//! `rayon::prelude::*` over the outermost collection: each worker owns a
//! private scratch buffer, and the only shared mutable state is a "found"
//! latch and a mutex-guarded output vector.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[cfg(feature = "multithread")]
use rayon::prelude::*;

use crate::aes::encrypt;
use crate::error::Error;
use crate::keyschedule::inverse_key_expansion;
use crate::types::{scatter_diagonal, CandidateList, KnownPlaintext, MASTER_KEY_CAPACITY};

/// A per-candidate filter applied before the key-schedule inversion and
/// trial encryption. `C8` passes [`None`]; the round-8 filtering search
/// (C9) passes `Some` with the two-round inverse-pass predicate.
pub type Filter<'a> = &'a (dyn Fn(&[u8; 16]) -> bool + Sync);

/// Form the Cartesian product of the four diagonal candidate lists,
/// turning each tuple into a round-10 subkey, optionally filtering it,
/// inverting the key schedule, and collecting the resulting master keys.
///
/// If `known_pt` is present the search terminates as soon as any worker's
/// trial encryption matches; the returned vector then holds exactly one
/// key. Otherwise every key surviving `filter` is collected, bounded by
/// [`MASTER_KEY_CAPACITY`]; exceeding it without a known plaintext is
/// fatal.
pub fn assemble(
    candidates: &[CandidateList; 4],
    known_pt: Option<&KnownPlaintext>,
    filter: Option<Filter<'_>>,
) -> Result<Vec<[u8; 16]>, Error> {
    if candidates.iter().any(CandidateList::is_empty) {
        return Ok(Vec::new());
    }

    let found = AtomicBool::new(false);
    let output: Mutex<Vec<[u8; 16]>> = Mutex::new(Vec::new());

    let run = |c0: u32| -> Result<(), Error> {
        if found.load(Ordering::Acquire) {
            return Ok(());
        }
        assemble_one(c0, candidates, known_pt, filter, &found, &output)
    };

    #[cfg(feature = "multithread")]
    {
        candidates[0]
            .as_slice()
            .par_iter()
            .copied()
            .try_for_each(run)?;
    }
    #[cfg(not(feature = "multithread"))]
    {
        for &c0 in candidates[0].as_slice() {
            run(c0)?;
        }
    }

    Ok(output.into_inner().unwrap_or_default())
}

#[allow(clippy::too_many_lines)]
fn assemble_one(
    c0: u32,
    candidates: &[CandidateList; 4],
    known_pt: Option<&KnownPlaintext>,
    filter: Option<Filter<'_>>,
    found: &AtomicBool,
    output: &Mutex<Vec<[u8; 16]>>,
) -> Result<(), Error> {
    for &c1 in candidates[1].as_slice() {
        for &c2 in candidates[2].as_slice() {
            for &c3 in candidates[3].as_slice() {
                if found.load(Ordering::Acquire) {
                    return Ok(());
                }

                let mut subkey10 = [0u8; 16];
                scatter_diagonal(&mut subkey10, 0, c0);
                scatter_diagonal(&mut subkey10, 1, c1);
                scatter_diagonal(&mut subkey10, 2, c2);
                scatter_diagonal(&mut subkey10, 3, c3);

                if let Some(pred) = filter {
                    if !pred(&subkey10) {
                        continue;
                    }
                }

                let schedule = inverse_key_expansion(subkey10);
                let mut master_key = [0u8; 16];
                master_key.copy_from_slice(&schedule[0..16]);

                match known_pt {
                    Some(kp) => {
                        if encrypt(&kp.pt, &schedule) == kp.ct {
                            let mut guard = output
                                .lock()
                                .unwrap_or_else(std::sync::PoisonError::into_inner);
                            guard.push(master_key);
                            found.store(true, Ordering::Release);
                            return Ok(());
                        }
                    }
                    None => {
                        let mut guard = output
                            .lock()
                            .unwrap_or_else(std::sync::PoisonError::into_inner);
                        if guard.len() >= MASTER_KEY_CAPACITY {
                            return Err(Error::MasterKeyOverflow {
                                len: guard.len() + 1,
                                cap: MASTER_KEY_CAPACITY,
                            });
                        }
                        guard.push(master_key);
                    }
                }
            }
        }
    }
    Ok(())
}
