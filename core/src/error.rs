//! Error taxonomy for the core engine.
//!
//! Every fatal condition the pipelines can hit — capacity overflow or an
//! incompatible pair that the caller asked to be treated as fatal — is a
//! variant here. Recoverable conditions (a skippable incompatible pair, a
//! column mismatch) are reported as [`crate::types::Diagnostic`] values
//! instead, never through this type.

use thiserror::Error as ThisError;

/// Errors the core engine can return.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    /// A delta-set grew past its fixed capacity.
    #[error("delta-set overflow: {len} values exceed capacity {cap}")]
    DeltaSetOverflow {
        /// The length that would have resulted.
        len: usize,
        /// The fixed capacity that was exceeded.
        cap: usize,
    },

    /// A per-diagonal candidate list grew past its fixed capacity.
    #[error("candidate list overflow: {len} candidates exceed capacity {cap}")]
    CandidateOverflow {
        /// The length that would have resulted.
        len: usize,
        /// The fixed capacity that was exceeded.
        cap: usize,
    },

    /// The set of assembled master keys grew past its fixed capacity
    /// without a known plaintext present to narrow the search.
    #[error("master key overflow: {len} keys exceed capacity {cap}; provide a known plaintext or more pairs")]
    MasterKeyOverflow {
        /// The length that would have resulted.
        len: usize,
        /// The fixed capacity that was exceeded.
        cap: usize,
    },

    /// A pair's ciphertext difference does not lie on any single diagonal,
    /// and the caller requested this be treated as a hard failure rather
    /// than a skip-with-warning.
    #[error("pair is incompatible with a single-diagonal fault model")]
    IncompatiblePair,
}
