//! Synthetic datasets for unit tests.

use crate::dataset::Dataset;
use ndarray::{Array1, Array2, Axis, concatenate, s};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Builder for a labelled population whose labels depend on one ordinary
/// feature and on the first sensitive feature.
pub struct SyntheticDataBuilder {
    n_samples: usize,
    n_sensitive: usize,
    n_other: usize,
    sensitive_effect: f64,
    seed: u64,
}

impl SyntheticDataBuilder {
    pub fn new(n_samples: usize) -> Self {
        Self {
            n_samples,
            n_sensitive: 1,
            n_other: 3,
            sensitive_effect: 0.8,
            seed: 42,
        }
    }

    pub fn sensitive(mut self, n_sensitive: usize) -> Self {
        self.n_sensitive = n_sensitive.max(1);
        self
    }

    pub fn other_features(mut self, n_other: usize) -> Self {
        self.n_other = n_other.max(1);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// `X = [sensitive | other]`, `X_prime = sensitive`.
    pub fn build(self) -> Dataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let sensitive = Array2::from_shape_fn((self.n_samples, self.n_sensitive), |_| {
            rng.sample::<f64, _>(StandardNormal)
        });
        let other = Array2::from_shape_fn((self.n_samples, self.n_other), |_| {
            rng.sample::<f64, _>(StandardNormal)
        });

        let mut labels: Array1<f64> = (0..self.n_samples)
            .map(|i| {
                let noise: f64 = rng.sample(StandardNormal);
                let signal = 1.5 * other[[i, 0]] + self.sensitive_effect * sensitive[[i, 0]]
                    - 0.3
                    + 0.5 * noise;
                if signal > 0.0 { 1.0 } else { 0.0 }
            })
            .collect();

        // Guarantee both label values regardless of the draw.
        if self.n_samples >= 2 {
            labels[0] = 0.0;
            labels[self.n_samples - 1] = 1.0;
        }

        let features = concatenate(Axis(1), &[sensitive.view(), other.view()])
            .expect("column counts are consistent");
        let sensitive = features.slice(s![.., ..self.n_sensitive]).to_owned();

        Dataset::new(features, sensitive, labels).expect("synthetic data is well formed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_shapes_and_labels() {
        let data = SyntheticDataBuilder::new(50)
            .sensitive(2)
            .other_features(4)
            .build();

        assert_eq!(data.len(), 50);
        assert_eq!(data.features().ncols(), 6);
        assert_eq!(data.sensitive().ncols(), 2);
        assert!(!data.has_single_label());
        assert_eq!(data.features().column(1), data.sensitive().column(1));
    }

    #[test]
    fn builder_is_deterministic() {
        let a = SyntheticDataBuilder::new(30).seed(9).build();
        let b = SyntheticDataBuilder::new(30).seed(9).build();
        assert_eq!(a.features(), b.features());
        assert_eq!(a.labels(), b.labels());
    }
}
