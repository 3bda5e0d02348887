//! Input file parsing: ciphertext pairs and an optional known
//! plaintext/ciphertext, one record per line.
//!
//! Line formats (order in the file does not matter):
//! - `pt:<32 hex chars>` / `ct:<32 hex chars>` — the known plaintext and its
//!   matching ciphertext, at most one of each.
//! - `<ct hex>,<fct hex>[,<pos>[,<val>|b]]` — a correct/faulty ciphertext
//!   pair, with an optional fault position (`0..16`) and an optional fault
//!   value (`1..=255`) or the literal `b` for "known single-bit flip".
//! - Lines starting with `#`, and blank lines, are ignored.

use anyhow::{bail, Context, Result};
use dfa_core::{FaultPosition, FaultValue, KnownPlaintext, Pair, PAIRS_CAPACITY};
use std::path::Path;

/// Pairs and known plaintext parsed from an input file.
pub struct ParsedInput {
    /// Ciphertext pairs, capped at [`PAIRS_CAPACITY`].
    pub pairs: Vec<Pair>,
    /// The known plaintext/ciphertext, if both were present.
    pub known_pt: Option<KnownPlaintext>,
    /// Whether pairs beyond [`PAIRS_CAPACITY`] were present and discarded.
    /// A `[!]` warning is also printed to stderr the moment this happens.
    pub truncated: bool,
}

fn parse_block(hex_str: &str, field: &str, line_no: usize) -> Result<[u8; 16]> {
    let bytes = hex::decode(hex_str.trim())
        .with_context(|| format!("malformed {field} on line {line_no}"))?;
    let array: [u8; 16] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("{field} on line {line_no} is not 16 bytes"))?;
    Ok(array)
}

/// Parse an input file into ciphertext pairs and an optional known
/// plaintext/ciphertext, reporting the same `[*]`/`[!]` diagnostics as the
/// reference implementation along the way.
pub fn read_input(path: &Path) -> Result<ParsedInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("input file '{}' cannot be opened", path.display()))?;

    let mut pairs = Vec::new();
    let mut pt: Option<[u8; 16]> = None;
    let mut ct: Option<[u8; 16]> = None;
    let mut capacity_warned = false;

    for (line_no, raw_line) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let line = raw_line.trim_end();
        if line.len() < 35 || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("pt:") {
            if pt.is_none() {
                pt = Some(parse_block(rest, "known plaintext", line_no)?);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("ct:") {
            if ct.is_none() {
                ct = Some(parse_block(rest, "known ciphertext", line_no)?);
            }
            continue;
        }

        if pairs.len() >= PAIRS_CAPACITY {
            if !capacity_warned {
                eprintln!(
                    "[!] Maximum of {PAIRS_CAPACITY} pairs reached, remaining pairs discarded"
                );
                capacity_warned = true;
            }
            continue;
        }

        let mut fields = line.split(',');
        let ct_field = fields
            .next()
            .with_context(|| format!("missing first ciphertext on line {line_no}"))?;
        let fct_field = fields
            .next()
            .with_context(|| format!("missing second ciphertext on line {line_no}"))?;
        let good = parse_block(ct_field, "first ciphertext", line_no)?;
        let faulty = parse_block(fct_field, "second ciphertext", line_no)?;

        let mut fault_pos = FaultPosition::Unknown;
        let mut fault_value = FaultValue::Unknown;
        if let Some(pos_field) = fields.next() {
            let pos: i32 = pos_field
                .trim()
                .parse()
                .with_context(|| format!("malformed fault position on line {line_no}"))?;
            if !(0..16).contains(&pos) {
                bail!("fault position {pos} on line {line_no} is out of range 0..16");
            }
            fault_pos = FaultPosition::Known(pos as u8);

            if let Some(val_field) = fields.next() {
                let val_field = val_field.trim();
                if val_field.starts_with('b') {
                    fault_value = FaultValue::Bitflip;
                } else {
                    let val: i32 = val_field
                        .parse()
                        .with_context(|| format!("malformed fault value on line {line_no}"))?;
                    if !(1..=255).contains(&val) {
                        bail!("fault value {val} on line {line_no} is out of range 1..=255");
                    }
                    fault_value = FaultValue::Known(val as u8);
                }
            }
        }

        pairs.push(Pair {
            ct: good,
            fct: faulty,
            fault_pos,
            fault_value,
        });
    }

    let known_pt = match (pt, ct) {
        (Some(pt), Some(ct)) => {
            eprintln!("[*] Known plaintext/ciphertext provided");
            Some(KnownPlaintext { pt, ct })
        }
        (Some(_), None) => {
            eprintln!("[!] Known plaintext ignored (corresponding ciphertext is absent)");
            None
        }
        (None, Some(_)) => {
            eprintln!("[!] Ciphertext ignored (corresponding known plaintext absent)");
            None
        }
        (None, None) => {
            eprintln!("[*] No known plaintext/ciphertext provided");
            None
        }
    };

    Ok(ParsedInput {
        pairs,
        known_pt,
        truncated: capacity_warned,
    })
}
