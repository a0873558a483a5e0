//! Decomposer: rank-r factorization of weight matrices
//!
//! Splits a weight matrix W into two thin factors A (m×r) and B (r×n)
//! via truncated SVD, and analyzes singular-value energy to recommend
//! a rank for a given approximation budget.

mod rank;
mod svd;

pub use rank::{analyze_rank, RankAnalysis};
pub use svd::{decompose, LowRankFactors};
