//! Initialization strategies for the trainable factors.

use serde::{Deserialize, Serialize};

/// How to initialize the trainable factors A and B
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InitStrategy {
    /// Warm-start both factors from the truncated SVD of the base weight:
    /// A = U_r·√Σ_r, B = √Σ_r·V_rᵀ
    SvdWarmStart,
    /// Small uniform random A in [-std, std], zero B. The product A·B is
    /// zero, so the adapter starts as an exact no-op over the base map.
    Random { std: f64 },
}

impl Default for InitStrategy {
    fn default() -> Self {
        InitStrategy::Random { std: 0.01 }
    }
}
