//! Error taxonomy for factorization and adapter operations.
//!
//! All errors are synchronous and reflect caller misuse (bad rank, wrong
//! input shape) or a degenerate input matrix. Nothing is retried and no
//! partial results are returned.

use thiserror::Error;

/// Errors produced by the decomposer and the adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LraError {
    /// Requested rank is outside [1, min(rows, cols)]
    #[error("invalid rank {rank}: must be in [1, {max_rank}]")]
    InvalidRank { rank: usize, max_rank: usize },

    /// Input dimensionality does not match the stored weight
    #[error("shape mismatch: expected dimension {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Non-finite values encountered in {context}
    #[error("numerical instability: non-finite values in {context}")]
    NumericalInstability { context: &'static str },
}

pub type Result<T> = std::result::Result<T, LraError>;
