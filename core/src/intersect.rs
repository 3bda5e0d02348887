//! List intersection (C5), used to reduce per-diagonal candidate lists as
//! additional ciphertext pairs are processed.

use crate::types::CandidateList;

/// `{ x ∈ a : x ∈ b }`, preserving the relative order of `a`. `b`'s
/// ordering never affects the result.
#[must_use]
pub fn intersect(a: &CandidateList, b: &CandidateList) -> CandidateList {
    let kept: Vec<u32> = a
        .as_slice()
        .iter()
        .copied()
        .filter(|x| b.as_slice().contains(x))
        .collect();
    // `kept` can never be larger than `a`, which was already within
    // capacity, so this cannot overflow.
    CandidateList::from_vec(kept).unwrap_or_else(|_| CandidateList::new())
}
