//! The linear classifier seam of the pipeline, plus a two-class linear
//! discriminant implementation to plug into it.

use ndarray::Array2;
use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::DimensionError;

/// What the cross-validation harness needs from a classifier: fit on a
/// feature matrix with labels, score accuracy on held-out features.
pub trait Classifier {
    fn fit(&mut self, features: &Array2<f64>, labels: &[i32]) -> Result<(), DimensionError>;

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<i32>, DimensionError>;

    /// Fraction of correct predictions, in [0, 1].
    fn score(&self, features: &Array2<f64>, labels: &[i32]) -> Result<f64, DimensionError> {
        if features.nrows() == 0 {
            return Err(DimensionError::EmptyEpochs);
        }
        if labels.len() != features.nrows() {
            return Err(DimensionError::LabelMismatch {
                trials: features.nrows(),
                labels: labels.len(),
            });
        }
        let predicted = self.predict(features)?;
        let correct = predicted
            .iter()
            .zip(labels.iter())
            .filter(|(p, y)| p == y)
            .count();
        Ok(correct as f64 / labels.len() as f64)
    }
}

#[derive(Debug, Clone)]
struct LdaModel {
    weights: DVector<f64>,
    bias: f64,
    classes: (i32, i32),
}

/// Two-class linear discriminant analysis: pooled within-class covariance,
/// class priors from training frequencies, decision by the sign of a single
/// linear score.
#[derive(Debug, Clone, Default)]
pub struct Lda {
    model: Option<LdaModel>,
}

impl Lda {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for Lda {
    fn fit(&mut self, features: &Array2<f64>, labels: &[i32]) -> Result<(), DimensionError> {
        let (n_samples, n_features) = features.dim();
        if n_samples == 0 {
            return Err(DimensionError::EmptyEpochs);
        }
        if labels.len() != n_samples {
            return Err(DimensionError::LabelMismatch {
                trials: n_samples,
                labels: labels.len(),
            });
        }
        let mut classes: Vec<i32> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() != 2 {
            return Err(DimensionError::ClassCount(classes.len()));
        }

        // Class means
        let mut mean_0 = DVector::<f64>::zeros(n_features);
        let mut mean_1 = DVector::<f64>::zeros(n_features);
        let mut counts = [0usize; 2];
        for (row_idx, row) in features.outer_iter().enumerate() {
            let class_idx = usize::from(labels[row_idx] == classes[1]);
            let target = if class_idx == 0 { &mut mean_0 } else { &mut mean_1 };
            for (f, &v) in row.iter().enumerate() {
                target[f] += v;
            }
            counts[class_idx] += 1;
        }
        mean_0 /= counts[0] as f64;
        mean_1 /= counts[1] as f64;

        // Pooled within-class covariance
        let mut pooled = DMatrix::<f64>::zeros(n_features, n_features);
        for (row_idx, row) in features.outer_iter().enumerate() {
            let mean = if labels[row_idx] == classes[1] {
                &mean_1
            } else {
                &mean_0
            };
            let centered =
                DVector::from_iterator(n_features, row.iter().cloned()) - mean;
            pooled += &centered * centered.transpose();
        }
        let dof = (n_samples.saturating_sub(2)).max(1) as f64;
        pooled /= dof;
        // Small ridge keeps the pooled covariance invertible when features
        // are collinear
        let ridge = 1e-10 + 1e-12 * pooled.trace();
        for f in 0..n_features {
            pooled[(f, f)] += ridge;
        }

        let chol = Cholesky::new(pooled).ok_or(DimensionError::SingularCovariance)?;
        let weights = chol.solve(&(&mean_1 - &mean_0));
        let midpoint = (&mean_0 + &mean_1) * 0.5;
        let prior = (counts[1] as f64 / counts[0] as f64).ln();
        let bias = prior - weights.dot(&midpoint);

        self.model = Some(LdaModel {
            weights,
            bias,
            classes: (classes[0], classes[1]),
        });
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<i32>, DimensionError> {
        let model = self.model.as_ref().ok_or(DimensionError::NotFitted)?;
        if features.ncols() != model.weights.len() {
            return Err(DimensionError::FeatureMismatch {
                expected: model.weights.len(),
                actual: features.ncols(),
            });
        }
        let predicted = features
            .outer_iter()
            .map(|row| {
                let score: f64 = row
                    .iter()
                    .zip(model.weights.iter())
                    .map(|(x, w)| x * w)
                    .sum::<f64>()
                    + model.bias;
                if score > 0.0 {
                    model.classes.1
                } else {
                    model.classes.0
                }
            })
            .collect();
        Ok(predicted)
    }
}
