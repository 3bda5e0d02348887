//! Offline differential fault analysis against AES-128.
//!
//! Given one or more correct/faulty ciphertext pairs produced by a single
//! byte-level fault injected during round 8 or round 9 of encryption, this
//! crate recovers the AES-128 master key. The two entry points are
//! [`r9::r9_key_recovery`] and [`r8::r8_key_recovery`]; everything else is a
//! building block shared between them:
//!
//! - [`aes`] — the handful of AES-128 primitives the cryptanalysis itself
//!   needs direct access to (S-boxes, `MixColumns`, the forward schedule).
//! - [`types`] — the fault-pair data model and the fixed-capacity buffers
//!   used throughout.
//! - [`delta`] — delta-set generation (C2).
//! - [`candidates`] — per-diagonal candidate enumeration (C3).
//! - [`intersect`] — candidate-list intersection across multiple pairs (C5).
//! - [`keyschedule`] — recovering the full key schedule from a round-10
//!   subkey guess alone (C4).
//! - [`assembly`] — the Cartesian-product final assembly and trial
//!   encryption shared by both recovery pipelines (C8/C9).
//!
//! The `multithread` feature (on by default) parallelizes the final assembly
//! step with `rayon`; disabling it falls back to a plain sequential loop.

pub mod aes;
pub mod assembly;
pub mod candidates;
pub mod delta;
pub mod error;
pub mod intersect;
pub mod keyschedule;
pub mod r8;
pub mod r9;
pub mod types;

pub use error::Error;
pub use r8::r8_key_recovery;
pub use r9::r9_key_recovery;
pub use types::{
    CandidateList, DeltaSet, Diagnostic, FaultPosition, FaultValue, KnownPlaintext, Pair,
    CANDIDATE_CAPACITY, DELTA_SET_CAPACITY, MASTER_KEY_CAPACITY, PAIRS_CAPACITY,
};
