//! Rank selection by singular-value energy analysis.

use log::info;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{LraError, Result};

/// Result of analyzing a matrix's singular spectrum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankAnalysis {
    /// Singular values, descending
    pub singular_values: Vec<f64>,
    /// Cumulative energy ratios (squared singular values)
    pub energy_ratios: Vec<f64>,
    /// Smallest rank whose cumulative energy reaches the threshold
    pub recommended_rank: usize,
    /// Compression ratio at the recommended rank
    pub compression_ratio: f64,
}

/// Analyze `w` to find the smallest rank capturing `energy_threshold`
/// of the total squared-singular-value energy.
pub fn analyze_rank(w: &DMatrix<f64>, energy_threshold: f64) -> Result<RankAnalysis> {
    if w.iter().any(|x| !x.is_finite()) {
        return Err(LraError::NumericalInstability { context: "input matrix" });
    }

    let svd = w.clone().svd(false, false);
    let sv = svd.singular_values;
    let total_energy: f64 = sv.iter().map(|s| s * s).sum();

    let mut cumulative = 0.0;
    let mut energy_ratios = Vec::with_capacity(sv.len());
    let mut recommended_rank = sv.len();

    for (i, s) in sv.iter().enumerate() {
        cumulative += s * s;
        let ratio = if total_energy > 0.0 { cumulative / total_energy } else { 1.0 };
        energy_ratios.push(ratio);
        if ratio >= energy_threshold && recommended_rank == sv.len() {
            recommended_rank = i + 1;
        }
    }

    let (m, n) = (w.nrows(), w.ncols());
    let compression_ratio = (m * n) as f64 / ((m + n) * recommended_rank) as f64;

    info!(
        "rank analysis: {} singular values, recommended rank={} ({:.1}% energy), compression={:.1}x",
        sv.len(),
        recommended_rank,
        energy_threshold * 100.0,
        compression_ratio,
    );

    Ok(RankAnalysis { singular_values: sv.as_slice().to_vec(), energy_ratios, recommended_rank, compression_ratio })
}
