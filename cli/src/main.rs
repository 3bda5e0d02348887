//! `dfa-aes` CLI
//!
//! Offline differential fault analysis against AES-128: recover a master
//! key from correct/faulty ciphertext pairs produced by a single-byte fault
//! in round 8 or round 9 of encryption.

mod input;
mod output;

use anyhow::{bail, Result};
use clap::{ArgGroup, Parser};
use dfa_core::{r8_key_recovery, r9_key_recovery};
use input::read_input;
use output::{report_diagnostics, report_keys};
use std::path::PathBuf;

// =============================================================================
// CLI DEFINITION
// =============================================================================

#[derive(Parser)]
#[command(name = "dfa-aes")]
#[command(about = "Recover AES-128 keys via differential fault analysis", long_about = None)]
#[command(version)]
#[command(group(ArgGroup::new("round").args(["round8", "round9"]).required(true)))]
struct Cli {
    /// Analyze pairs produced by a round-8 fault
    #[arg(short = '8', long = "round8")]
    round8: bool,

    /// Analyze pairs produced by a round-9 fault
    #[arg(short = '9', long = "round9")]
    round9: bool,

    /// Input file of ciphertext pairs
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output file for recovered keys (default: keys.txt)
    #[arg(short, long, value_name = "FILE", default_value = "keys.txt")]
    output: PathBuf,
}

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();

    let parsed = read_input(&cli.input)?;
    if parsed.pairs.is_empty() {
        bail!("no ciphertext pairs found in '{}'", cli.input.display());
    }

    let known_pt_provided = parsed.known_pt.is_some();
    let (keys, diagnostics) = if cli.round9 {
        r9_key_recovery(&parsed.pairs, parsed.known_pt.as_ref())?
    } else {
        r8_key_recovery(&parsed.pairs, parsed.known_pt.as_ref())?
    };

    report_diagnostics(&diagnostics);
    report_keys(&keys, &cli.output, known_pt_provided)?;

    Ok(())
}
