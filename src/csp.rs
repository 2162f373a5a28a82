//! Common Spatial Patterns: class-discriminative spatial filters from
//! two-class trial covariance, reducing each trial to a handful of
//! log-variance features.

use ndarray::{Array2, ArrayBase, ArrayView1, Data, Ix3};
use nalgebra::{Cholesky, DMatrix, SymmetricEigen};

use crate::error::DimensionError;

/// Feature value reported for a filtered signal with zero variance, instead
/// of ln(0). Finite, so a degenerate test trial cannot poison downstream
/// array math.
pub const DEGENERATE_LOG_VAR: f64 = f64::MIN;

/// Spatial filter extractor. `fit` learns `n_components` filters from
/// labeled trials, `transform` turns trials into log-variance features.
#[derive(Debug, Clone)]
pub struct Csp {
    n_components: usize,
    filters: Option<Array2<f64>>,
}

impl Csp {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            filters: None,
        }
    }

    /// The fitted (n_components x n_channels) filter matrix, one filter per
    /// row, or None before fit.
    pub fn filters(&self) -> Option<&Array2<f64>> {
        self.filters.as_ref()
    }

    /// Learn spatial filters from two-class trials.
    ///
    /// Per class the spatial covariance is averaged over trials, each trial
    /// covariance first normalized by its trace so trial-level amplitude
    /// differences cannot bias the estimate. Filters solve the generalized
    /// eigenproblem `Cov_a w = lambda (Cov_a + Cov_b) w` via Cholesky
    /// whitening of the composite covariance and a symmetric
    /// eigendecomposition. The `n_components` filters are picked alternately
    /// from the two ends of the eigenvalue spectrum (largest first) and
    /// scaled to unit variance on the composite covariance.
    ///
    /// Deterministic for identical inputs; the trial data is never mutated.
    pub fn fit<S>(&mut self, epochs: &ArrayBase<S, Ix3>, labels: &[i32]) -> Result<(), DimensionError>
    where
        S: Data<Elem = f64>,
    {
        let (n_trials, n_channels, _n_times) = epochs.dim();
        if n_trials == 0 {
            return Err(DimensionError::EmptyEpochs);
        }
        if labels.len() != n_trials {
            return Err(DimensionError::LabelMismatch {
                trials: n_trials,
                labels: labels.len(),
            });
        }
        let mut classes: Vec<i32> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() != 2 {
            return Err(DimensionError::ClassCount(classes.len()));
        }
        if self.n_components > n_channels {
            return Err(DimensionError::TooManyComponents {
                requested: self.n_components,
                channels: n_channels,
            });
        }

        // Trace-normalized covariance averaged per class
        let mut cov_sum = [
            Array2::<f64>::zeros((n_channels, n_channels)),
            Array2::<f64>::zeros((n_channels, n_channels)),
        ];
        let mut counts = [0usize; 2];
        for (trial_idx, trial) in epochs.outer_iter().enumerate() {
            let cov = trial.dot(&trial.t());
            let trace = cov.diag().sum();
            if trace <= 0.0 {
                return Err(DimensionError::DegenerateTrial { trial: trial_idx });
            }
            let class_idx = usize::from(labels[trial_idx] == classes[1]);
            cov_sum[class_idx] += &(cov / trace);
            counts[class_idx] += 1;
        }
        let cov_a = &cov_sum[0] / counts[0] as f64;
        let cov_b = &cov_sum[1] / counts[1] as f64;
        let composite = &cov_a + &cov_b;

        // Whiten the composite covariance, then the generalized eigenproblem
        // reduces to an ordinary symmetric one
        let comp_na =
            DMatrix::from_row_iterator(n_channels, n_channels, composite.iter().cloned());
        let cov_a_na = DMatrix::from_row_iterator(n_channels, n_channels, cov_a.iter().cloned());
        let chol =
            Cholesky::new(comp_na.clone()).ok_or(DimensionError::SingularCovariance)?;
        let l_inv = chol
            .l()
            .try_inverse()
            .ok_or(DimensionError::SingularCovariance)?;
        let whitened = &l_inv * &cov_a_na * l_inv.transpose();
        let whitened = (whitened.clone() + whitened.transpose()) * 0.5;
        let eig = SymmetricEigen::new(whitened);

        let mut order: Vec<usize> = (0..n_channels).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

        // Alternate the two ends of the spectrum: the top eigenvectors
        // concentrate variance in class A, the bottom ones in class B
        let mut picked = Vec::with_capacity(self.n_components);
        let (mut lo, mut hi) = (0usize, n_channels - 1);
        for j in 0..self.n_components {
            if j % 2 == 0 {
                picked.push(order[lo]);
                lo += 1;
            } else {
                picked.push(order[hi]);
                hi -= 1;
            }
        }

        let unwhiten = l_inv.transpose();
        let mut filters = Array2::<f64>::zeros((self.n_components, n_channels));
        for (row, &col) in picked.iter().enumerate() {
            let v = eig.eigenvectors.column(col).clone_owned();
            let w = &unwhiten * &v;
            // Unit variance on the composite covariance
            let scale = w.dot(&(&comp_na * &w)).sqrt();
            if scale <= 0.0 {
                return Err(DimensionError::SingularCovariance);
            }
            for ch in 0..n_channels {
                filters[[row, ch]] = w[ch] / scale;
            }
        }
        self.filters = Some(filters);
        Ok(())
    }

    /// Project trials through the fitted filters and reduce each filtered
    /// signal to the log of its variance over time. Output is one row per
    /// trial, one column per filter. A zero-variance filtered signal maps to
    /// [`DEGENERATE_LOG_VAR`] so the output shape stays intact.
    pub fn transform<S>(&self, epochs: &ArrayBase<S, Ix3>) -> Result<Array2<f64>, DimensionError>
    where
        S: Data<Elem = f64>,
    {
        let filters = self.filters.as_ref().ok_or(DimensionError::NotFitted)?;
        let (n_trials, n_channels, _n_times) = epochs.dim();
        if n_channels != filters.ncols() {
            return Err(DimensionError::ChannelMismatch {
                expected: filters.ncols(),
                actual: n_channels,
            });
        }
        let mut features = Array2::<f64>::zeros((n_trials, filters.nrows()));
        for (trial_idx, trial) in epochs.outer_iter().enumerate() {
            let filtered = filters.dot(&trial);
            for (comp, signal) in filtered.outer_iter().enumerate() {
                features[[trial_idx, comp]] = log_variance(signal);
            }
        }
        Ok(features)
    }

    pub fn fit_transform<S>(
        &mut self,
        epochs: &ArrayBase<S, Ix3>,
        labels: &[i32],
    ) -> Result<Array2<f64>, DimensionError>
    where
        S: Data<Elem = f64>,
    {
        self.fit(epochs, labels)?;
        self.transform(epochs)
    }
}

fn log_variance(signal: ArrayView1<'_, f64>) -> f64 {
    let n = signal.len() as f64;
    if n == 0.0 {
        return DEGENERATE_LOG_VAR;
    }
    let mean = signal.sum() / n;
    let var = signal
        .iter()
        .map(|&v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    if var > 0.0 {
        var.ln()
    } else {
        DEGENERATE_LOG_VAR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::simulate_epochs;
    use ndarray::{s, Array3};

    fn training_data() -> (Array3<f64>, Vec<i32>) {
        let data = simulate_epochs(10, 8, 100, 0, 3.0, 100.0, 0.0, 11);
        (data.epochs, data.labels)
    }

    #[test]
    fn fit_returns_requested_filter_shape() {
        let (epochs, labels) = training_data();
        let mut csp = Csp::new(4);
        csp.fit(&epochs, &labels).unwrap();
        assert_eq!(csp.filters().unwrap().dim(), (4, 8));

        let features = csp.transform(&epochs).unwrap();
        assert_eq!(features.dim(), (20, 4));
        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn fit_is_deterministic() {
        let (epochs, labels) = training_data();
        let mut a = Csp::new(4);
        let mut b = Csp::new(4);
        a.fit(&epochs, &labels).unwrap();
        b.fit(&epochs, &labels).unwrap();
        assert_eq!(a.filters().unwrap(), b.filters().unwrap());
    }

    #[test]
    fn trial_scale_does_not_change_filter_directions() {
        let (epochs, labels) = training_data();
        let mut scaled = epochs.clone();
        // scale every class 0 trial by a power of two
        for (trial_idx, &label) in labels.iter().enumerate() {
            if label == 0 {
                let mut trial = scaled.slice_mut(s![trial_idx, .., ..]);
                trial *= 4.0;
            }
        }
        let mut plain = Csp::new(4);
        let mut on_scaled = Csp::new(4);
        plain.fit(&epochs, &labels).unwrap();
        on_scaled.fit(&scaled, &labels).unwrap();

        let fa = plain.filters().unwrap();
        let fb = on_scaled.filters().unwrap();
        for (wa, wb) in fa.outer_iter().zip(fb.outer_iter()) {
            let dot: f64 = wa.iter().zip(wb.iter()).map(|(x, y)| x * y).sum();
            let na: f64 = wa.iter().map(|x| x * x).sum::<f64>().sqrt();
            let nb: f64 = wb.iter().map(|x| x * x).sum::<f64>().sqrt();
            let cos = (dot / (na * nb)).abs();
            assert!(cos > 1.0 - 1e-6, "filters diverged, |cos| = {cos}");
        }
    }

    #[test]
    fn first_component_separates_the_classes() {
        let (epochs, labels) = training_data();
        let mut csp = Csp::new(4);
        let features = csp.fit_transform(&epochs, &labels).unwrap();
        let mean_0: f64 = (0..10).map(|t| features[[t, 0]]).sum::<f64>() / 10.0;
        let mean_1: f64 = (10..20).map(|t| features[[t, 0]]).sum::<f64>() / 10.0;
        // component 0 tracks the top eigenvalue, so class 0 variance
        assert!(mean_0 > mean_1 + 0.5, "mean_0 {mean_0} mean_1 {mean_1}");
    }

    #[test]
    fn rejects_more_than_two_classes() {
        let (epochs, mut labels) = training_data();
        labels[0] = 2;
        let mut csp = Csp::new(4);
        assert_eq!(
            csp.fit(&epochs, &labels).unwrap_err(),
            DimensionError::ClassCount(3)
        );
    }

    #[test]
    fn rejects_too_many_components() {
        let (epochs, labels) = training_data();
        let mut csp = Csp::new(9);
        assert_eq!(
            csp.fit(&epochs, &labels).unwrap_err(),
            DimensionError::TooManyComponents {
                requested: 9,
                channels: 8
            }
        );
    }

    #[test]
    fn rejects_label_trial_mismatch() {
        let (epochs, labels) = training_data();
        let mut csp = Csp::new(2);
        assert!(matches!(
            csp.fit(&epochs, &labels[..5]).unwrap_err(),
            DimensionError::LabelMismatch { .. }
        ));
    }

    #[test]
    fn transform_before_fit_fails() {
        let (epochs, _) = training_data();
        let csp = Csp::new(4);
        assert_eq!(
            csp.transform(&epochs).unwrap_err(),
            DimensionError::NotFitted
        );
    }

    #[test]
    fn transform_rejects_wrong_channel_count() {
        let (epochs, labels) = training_data();
        let mut csp = Csp::new(4);
        csp.fit(&epochs, &labels).unwrap();
        let narrow = epochs.slice(s![.., ..4, ..]).to_owned();
        assert_eq!(
            csp.transform(&narrow).unwrap_err(),
            DimensionError::ChannelMismatch {
                expected: 8,
                actual: 4
            }
        );
    }

    #[test]
    fn zero_variance_trial_in_fit_is_rejected() {
        let (mut epochs, labels) = training_data();
        epochs.slice_mut(s![3, .., ..]).fill(0.0);
        let mut csp = Csp::new(4);
        assert_eq!(
            csp.fit(&epochs, &labels).unwrap_err(),
            DimensionError::DegenerateTrial { trial: 3 }
        );
    }

    #[test]
    fn degenerate_test_trial_gets_sentinel_features() {
        let (epochs, labels) = training_data();
        let mut csp = Csp::new(4);
        csp.fit(&epochs, &labels).unwrap();

        let mut test = epochs.slice(s![..2, .., ..]).to_owned();
        test.slice_mut(s![1, .., ..]).fill(0.0);
        let features = csp.transform(&test).unwrap();
        assert!(features.row(0).iter().all(|v| v.is_finite()));
        assert!(features
            .row(1)
            .iter()
            .all(|&v| v == DEGENERATE_LOG_VAR));
    }
}
