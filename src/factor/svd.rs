//! Truncated SVD factorization: W ≈ A·B with A = U_r·√Σ_r, B = √Σ_r·V_rᵀ
//!
//! Splitting the singular values evenly across both factors keeps A and B
//! at comparable scale, which matters when they are later used as the
//! starting point for gradient updates.

use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{LraError, Result};

/// A rank-r factorization of an m×n matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowRankFactors {
    /// Left factor (m × r)
    pub a: DMatrix<f64>,
    /// Right factor (r × n)
    pub b: DMatrix<f64>,
    /// Shared inner dimension
    pub rank: usize,
    /// Original dimensions
    pub m: usize,
    pub n: usize,
}

/// Factorize `w` into rank-r factors via truncated SVD.
///
/// The product `a * b` is the best rank-r approximation of `w` in
/// Frobenius norm (Eckart–Young). Singular values come out of nalgebra's
/// SVD already sorted descending, so truncation keeps the top r.
///
/// Fails with `InvalidRank` if `rank` is outside [1, min(m, n)], and with
/// `NumericalInstability` if `w` contains non-finite entries.
pub fn decompose(w: &DMatrix<f64>, rank: usize) -> Result<LowRankFactors> {
    let (m, n) = (w.nrows(), w.ncols());
    let max_rank = m.min(n);
    if rank == 0 || rank > max_rank {
        return Err(LraError::InvalidRank { rank, max_rank });
    }
    if w.iter().any(|x| !x.is_finite()) {
        return Err(LraError::NumericalInstability { context: "input matrix" });
    }

    let svd = w.clone().svd(true, true);
    let u = svd.u.ok_or(LraError::NumericalInstability { context: "SVD left basis" })?;
    let v_t = svd.v_t.ok_or(LraError::NumericalInstability { context: "SVD right basis" })?;
    let sigma = svd.singular_values;

    // Split each singular value evenly: A = U_r·√Σ_r, B = √Σ_r·V_rᵀ
    let sqrt_sigma: Vec<f64> = sigma.iter().take(rank).map(|s| s.sqrt()).collect();

    let mut a = u.columns(0, rank).into_owned();
    for (j, s) in sqrt_sigma.iter().enumerate() {
        a.column_mut(j).scale_mut(*s);
    }
    let mut b = v_t.rows(0, rank).into_owned();
    for (i, s) in sqrt_sigma.iter().enumerate() {
        b.row_mut(i).scale_mut(*s);
    }

    if a.iter().chain(b.iter()).any(|x| !x.is_finite()) {
        return Err(LraError::NumericalInstability { context: "factorization output" });
    }

    debug!("decomposed {}x{} at rank {} (top sigma={:.4})", m, n, rank, sigma[0]);

    Ok(LowRankFactors { a, b, rank, m, n })
}

impl LowRankFactors {
    /// Reconstruct the rank-r approximation A·B
    pub fn reconstruct(&self) -> DMatrix<f64> {
        &self.a * &self.b
    }

    /// Frobenius-norm distance between the reconstruction and `original`
    pub fn reconstruction_error(&self, original: &DMatrix<f64>) -> f64 {
        (original - self.reconstruct()).norm()
    }

    /// Parameter compression: (m·n) / ((m + n)·r)
    pub fn compression_ratio(&self) -> f64 {
        (self.m * self.n) as f64 / ((self.m + self.n) * self.rank) as f64
    }

    /// Consume the factorization, yielding (A, B)
    pub fn into_parts(self) -> (DMatrix<f64>, DMatrix<f64>) {
        (self.a, self.b)
    }
}
