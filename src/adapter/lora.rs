//! The LoRA adapter: a frozen linear map plus a scaled low-rank delta.

use log::debug;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::adapter::InitStrategy;
use crate::error::{LraError, Result};
use crate::factor::decompose;

/// A parameter-efficient perturbation of a frozen linear transformation.
///
/// The base weight (out×in) and bias are immutable after construction.
/// Only the factors A (out×r) and B (r×in) are exposed for mutation, via
/// [`LoraAdapter::params_mut`], so an external optimizer can update them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoraAdapter {
    /// Frozen base weight (out_features × in_features)
    base_weight: DMatrix<f64>,
    /// Frozen base bias (out_features)
    base_bias: DVector<f64>,
    /// Trainable left factor (out_features × rank)
    a: DMatrix<f64>,
    /// Trainable right factor (rank × in_features)
    b: DMatrix<f64>,
    /// Shared inner dimension of A and B
    rank: usize,
    /// Fixed multiplier on the low-rank correction
    alpha: f64,
}

impl LoraAdapter {
    /// Build an adapter over a frozen `base_weight`/`base_bias` pair.
    ///
    /// The RNG is only consulted for [`InitStrategy::Random`]; passing it
    /// explicitly keeps initialization reproducible without global state.
    pub fn new<R: Rng>(
        base_weight: DMatrix<f64>,
        base_bias: DVector<f64>,
        rank: usize,
        alpha: f64,
        init: InitStrategy,
        rng: &mut R,
    ) -> Result<Self> {
        let (out_features, in_features) = (base_weight.nrows(), base_weight.ncols());
        let max_rank = out_features.min(in_features);
        if rank == 0 || rank > max_rank {
            return Err(LraError::InvalidRank { rank, max_rank });
        }
        if base_bias.len() != out_features {
            return Err(LraError::ShapeMismatch { expected: out_features, actual: base_bias.len() });
        }

        debug!(
            "adapter {}x{} rank={} alpha={} init={:?}",
            out_features, in_features, rank, alpha, init
        );

        let (a, b) = match init {
            InitStrategy::SvdWarmStart => decompose(&base_weight, rank)?.into_parts(),
            InitStrategy::Random { std } => {
                if base_weight.iter().any(|x| !x.is_finite()) {
                    return Err(LraError::NumericalInstability { context: "base weight" });
                }
                let a = DMatrix::from_fn(out_features, rank, |_, _| {
                    (rng.gen::<f64>() * 2.0 - 1.0) * std
                });
                let b = DMatrix::zeros(rank, in_features);
                (a, b)
            }
        };

        Ok(Self { base_weight, base_bias, a, b, rank, alpha })
    }

    /// Forward pass: `(W + α·A·B)·x + bias`.
    ///
    /// The effective weight is materialized and applied as a plain linear
    /// map, so the result is exactly what the merged weight would give.
    pub fn forward(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
        if x.len() != self.in_features() {
            return Err(LraError::ShapeMismatch { expected: self.in_features(), actual: x.len() });
        }
        Ok(self.effective_weight() * x + &self.base_bias)
    }

    /// Batched forward pass over row-major samples (batch × in_features).
    pub fn forward_batch(&self, xs: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if xs.ncols() != self.in_features() {
            return Err(LraError::ShapeMismatch { expected: self.in_features(), actual: xs.ncols() });
        }
        let mut out = xs * self.effective_weight().transpose();
        for mut row in out.row_iter_mut() {
            row += self.base_bias.transpose();
        }
        Ok(out)
    }

    /// The merged weight `W + α·A·B`, as a fresh matrix. The frozen base
    /// is left untouched.
    pub fn effective_weight(&self) -> DMatrix<f64> {
        &self.base_weight + self.delta()
    }

    /// The scaled low-rank correction `α·A·B`
    pub fn delta(&self) -> DMatrix<f64> {
        (&self.a * &self.b) * self.alpha
    }

    /// Mutable access to the trainable factors (A, B), for an external
    /// gradient-based optimizer. The frozen base is not reachable here.
    pub fn params_mut(&mut self) -> (&mut DMatrix<f64>, &mut DMatrix<f64>) {
        (&mut self.a, &mut self.b)
    }

    /// Number of trainable parameters: (out + in) · rank
    pub fn trainable_params(&self) -> usize {
        (self.out_features() + self.in_features()) * self.rank
    }

    /// Number of frozen parameters: out · in + out
    pub fn frozen_params(&self) -> usize {
        self.out_features() * self.in_features() + self.out_features()
    }

    /// How many frozen weight parameters each trainable parameter stands for
    pub fn compression_ratio(&self) -> f64 {
        (self.out_features() * self.in_features()) as f64 / self.trainable_params() as f64
    }

    pub fn base_weight(&self) -> &DMatrix<f64> {
        &self.base_weight
    }

    pub fn base_bias(&self) -> &DVector<f64> {
        &self.base_bias
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn a_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.a
    }

    pub fn b(&self) -> &DMatrix<f64> {
        &self.b
    }

    pub fn b_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.b
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn in_features(&self) -> usize {
        self.base_weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.base_weight.nrows()
    }

    /// One-line description of the adapter
    pub fn summary(&self) -> String {
        format!(
            "LoRA {}x{} | rank={} | alpha={:.1} | trainable={} | frozen={} | compression={:.1}x",
            self.out_features(),
            self.in_features(),
            self.rank,
            self.alpha,
            self.trainable_params(),
            self.frozen_params(),
            self.compression_ratio(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn random_adapter(out: usize, inp: usize, rank: usize, alpha: f64) -> LoraAdapter {
        let w = DMatrix::new_random(out, inp);
        let bias = DVector::new_random(out);
        LoraAdapter::new(w, bias, rank, alpha, InitStrategy::default(), &mut rng()).unwrap()
    }

    #[test]
    fn test_random_init_starts_as_no_op() {
        // Zero B means A·B = 0, so the adapter must match the base map.
        let adapter = random_adapter(8, 6, 2, 16.0);
        let x = DVector::new_random(6);
        let base = adapter.base_weight() * &x + adapter.base_bias();
        let adapted = adapter.forward(&x).unwrap();
        assert_relative_eq!(base, adapted, epsilon = 1e-12);
    }

    #[test]
    fn test_alpha_zero_is_no_op() {
        let w = DMatrix::new_random(8, 6);
        let bias = DVector::new_random(8);
        let mut adapter =
            LoraAdapter::new(w.clone(), bias.clone(), 3, 0.0, InitStrategy::default(), &mut rng())
                .unwrap();
        // Make both factors dense so only alpha keeps the delta out.
        *adapter.a_mut() = DMatrix::new_random(8, 3);
        *adapter.b_mut() = DMatrix::new_random(3, 6);

        let x = DVector::new_random(6);
        let base = &w * &x + &bias;
        assert_relative_eq!(base, adapter.forward(&x).unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_a_identity_scenario() {
        // baseWeight = I_4, zero bias, A = 0 (4×2), random B (2×4), alpha = 1:
        // forward(x) must equal x.
        let mut adapter = LoraAdapter::new(
            DMatrix::identity(4, 4),
            DVector::zeros(4),
            2,
            1.0,
            InitStrategy::Random { std: 0.01 },
            &mut rng(),
        )
        .unwrap();
        *adapter.a_mut() = DMatrix::zeros(4, 2);
        *adapter.b_mut() = DMatrix::new_random(2, 4);

        let x = DVector::new_random(4);
        assert_relative_eq!(adapter.forward(&x).unwrap(), x, epsilon = 1e-12);
    }

    #[test]
    fn test_forward_matches_materialized_weight() {
        let mut adapter = random_adapter(10, 7, 4, 2.0);
        let (a, b) = adapter.params_mut();
        *a = DMatrix::new_random(10, 4);
        *b = DMatrix::new_random(4, 7);

        let x = DVector::new_random(7);
        let merged = adapter.effective_weight();
        let direct = &merged * &x + adapter.base_bias();
        assert_relative_eq!(direct, adapter.forward(&x).unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_batch_agrees_with_single_forward() {
        let mut adapter = random_adapter(5, 9, 3, 0.5);
        *adapter.b_mut() = DMatrix::new_random(3, 9);

        let xs = DMatrix::new_random(4, 9);
        let batch = adapter.forward_batch(&xs).unwrap();
        for (i, row) in xs.row_iter().enumerate() {
            let single = adapter.forward(&row.transpose()).unwrap();
            assert_relative_eq!(batch.row(i).transpose(), single, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_svd_warm_start_reconstructs_base_at_full_rank() {
        let w = DMatrix::new_random(6, 6);
        let adapter = LoraAdapter::new(
            w.clone(),
            DVector::zeros(6),
            6,
            1.0,
            InitStrategy::SvdWarmStart,
            &mut rng(),
        )
        .unwrap();
        assert_relative_eq!(adapter.a() * adapter.b(), w, epsilon = 1e-9);
    }

    #[test]
    fn test_shape_mismatch_on_wrong_input_length() {
        let adapter = random_adapter(8, 6, 2, 1.0);
        let x = DVector::new_random(5);
        assert_eq!(
            adapter.forward(&x),
            Err(LraError::ShapeMismatch { expected: 6, actual: 5 })
        );
        let xs = DMatrix::new_random(3, 7);
        assert!(adapter.forward_batch(&xs).is_err());
    }

    #[test]
    fn test_invalid_rank_at_construction() {
        let w = DMatrix::new_random(4, 6);
        let bias = DVector::zeros(4);
        for bad in [0, 5] {
            let result = LoraAdapter::new(
                w.clone(),
                bias.clone(),
                bad,
                1.0,
                InitStrategy::default(),
                &mut rng(),
            );
            assert!(matches!(result, Err(LraError::InvalidRank { max_rank: 4, .. })));
        }
    }

    #[test]
    fn test_bias_length_checked() {
        let result = LoraAdapter::new(
            DMatrix::new_random(4, 6),
            DVector::zeros(3),
            2,
            1.0,
            InitStrategy::default(),
            &mut rng(),
        );
        assert_eq!(result.unwrap_err(), LraError::ShapeMismatch { expected: 4, actual: 3 });
    }

    #[test]
    fn test_frozen_base_survives_factor_updates() {
        let mut adapter = random_adapter(6, 6, 2, 4.0);
        let w_before = adapter.base_weight().clone();
        let bias_before = adapter.base_bias().clone();

        let (a, b) = adapter.params_mut();
        *a = DMatrix::new_random(6, 2);
        *b = DMatrix::new_random(2, 6);
        let _ = adapter.forward(&DVector::new_random(6)).unwrap();
        let _ = adapter.effective_weight();

        assert_eq!(adapter.base_weight(), &w_before);
        assert_eq!(adapter.base_bias(), &bias_before);
    }

    #[test]
    fn test_parameter_accounting() {
        let adapter = random_adapter(100, 80, 4, 1.0);
        assert_eq!(adapter.trainable_params(), (100 + 80) * 4);
        assert_eq!(adapter.frozen_params(), 100 * 80 + 100);
        assert!(adapter.compression_ratio() > 10.0);
        println!("{}", adapter.summary());
    }

    #[test]
    fn test_serde_round_trip_preserves_forward() {
        let mut adapter = random_adapter(5, 5, 2, 2.0);
        *adapter.b_mut() = DMatrix::new_random(2, 5);
        let json = serde_json::to_string(&adapter).unwrap();
        let restored: LoraAdapter = serde_json::from_str(&json).unwrap();

        let x = DVector::new_random(5);
        assert_relative_eq!(
            adapter.forward(&x).unwrap(),
            restored.forward(&x).unwrap(),
            epsilon = 1e-12
        );
    }
}
