//! Result reporting: a single key goes to stderr as a confirmation message
//! plus stdout as bare hex, multiple keys are written one-per-line to an
//! output file (falling back to `/tmp/keys.txt` if the requested path isn't
//! writable), and diagnostics are rendered with the `[*]`/`[!]` tagging the
//! reference tool uses.

use anyhow::{Context, Result};
use dfa_core::Diagnostic;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Print each diagnostic produced by a recovery pipeline to stderr.
pub fn report_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        match diagnostic {
            Diagnostic::IncompatiblePair { pair_index } => {
                eprintln!("[!] Pair {pair_index} is incompatible with a single-diagonal fault model and was skipped");
            }
            Diagnostic::ColumnMismatch {
                pair_index,
                declared,
                observed,
            } => {
                eprintln!("[!] Pair {pair_index}: declared fault column {declared} disagrees with observed column {observed}");
            }
            Diagnostic::EmptyDiagonal { diagonal } => {
                eprintln!("[!] No candidates contributed to diagonal {diagonal}");
            }
            Diagnostic::AttackUnsuccessful => {
                eprintln!("[*] The attack was unsuccessful: check your data");
            }
        }
    }
}

/// Report the recovered master keys: a single key is printed directly, more
/// than one is written to `out_path` (or `/tmp/keys.txt` on a write
/// failure).
pub fn report_keys(keys: &[[u8; 16]], out_path: &Path, known_pt_provided: bool) -> Result<()> {
    match keys.len() {
        0 => {}
        1 => {
            if known_pt_provided {
                eprintln!("[*] Master key found:");
            } else {
                eprintln!("[*] Potential master key found:");
            }
            println!("{}", hex::encode(keys[0]));
        }
        n => {
            let written_to = write_keys_file(keys, out_path)?;
            eprintln!("[*] {n} keys written to file {}", written_to.display());
        }
    }
    Ok(())
}

fn write_keys_file(keys: &[[u8; 16]], out_path: &Path) -> Result<PathBuf> {
    match try_write(keys, out_path) {
        Ok(()) => Ok(out_path.to_path_buf()),
        Err(_) => {
            eprintln!(
                "[!] Cannot write to file '{}', writing to '/tmp/keys.txt'",
                out_path.display()
            );
            let fallback = PathBuf::from("/tmp/keys.txt");
            try_write(keys, &fallback)
                .with_context(|| "cannot write to file '/tmp/keys.txt', giving up")?;
            Ok(fallback)
        }
    }
}

fn try_write(keys: &[[u8; 16]], path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    for key in keys {
        writeln!(file, "{}", hex::encode(key))?;
    }
    Ok(())
}
