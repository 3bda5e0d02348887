//! Delta-set generation (C2): enumerate every possible `MixColumn` output
//! of a single-byte fault, for use as the target difference set in the
//! diagonal candidate search.

use crate::aes::mix_column;
use crate::error::Error;
use crate::types::DeltaSet;

/// For each `(row, fault)` combination, place `fault` into an otherwise
/// zero column at `row`, run it through `MixColumn`, and pack the result
/// little-endian into a 32-bit word.
///
/// `row = None` means the fault's row is unknown: the cross product over
/// all four rows is taken, so the output has `faults.len() * 4` entries.
/// `row = Some(r)` restricts to that row alone, giving `faults.len()`
/// entries.
pub fn delta_set(row: Option<u8>, faults: &[u8]) -> Result<DeltaSet, Error> {
    let mut out = DeltaSet::new();
    let rows: &[u8] = match row {
        Some(r) => std::slice::from_ref(&r),
        None => &[0, 1, 2, 3],
    };

    for &r in rows {
        for &fault in faults {
            let mut col = [0u8; 4];
            col[r as usize] = fault;
            mix_column(&mut col);
            out.push(u32::from_le_bytes(col))?;
        }
    }

    Ok(out)
}
