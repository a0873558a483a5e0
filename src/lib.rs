//! LRA: Low-Rank Adaptation core
//!
//! The two reusable pieces of LoRA-style fine-tuning, free of any deep
//! learning framework:
//!
//! - **Decomposer** ([`factor`]): truncated SVD factorization of a weight
//!   matrix into two thin factors, plus energy-based rank selection.
//! - **Adapter** ([`adapter`]): a frozen linear map carrying two small
//!   trainable factors; the forward pass applies `W + α·A·B` without
//!   mutating the frozen base.
//!
//! Gradients, optimizers, and data loading stay with the caller: the
//! adapter only exposes which of its values are trainable.

pub mod adapter;
pub mod error;
pub mod factor;

pub use adapter::{InitStrategy, LoraAdapter};
pub use error::{LraError, Result};
pub use factor::{analyze_rank, decompose, LowRankFactors, RankAnalysis};
