//! Shuffle-split folds and the sliding-window cross-validated evaluation of
//! the spatial-filter + classifier pipeline.

use log::{debug, info};
use ndarray::{s, Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::csp::Csp;
use crate::error::{CrossValError, DimensionError};
use crate::lda::Classifier;
use crate::ScoreGrid;

/// One train/test partition of trial indices. Train and test are disjoint.
#[derive(Debug, Clone)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Randomized train/test splitter. The seed is explicit so a run can be
/// reproduced exactly and parallel folds never race on shared generator
/// state.
#[derive(Debug, Clone)]
pub struct ShuffleSplit {
    pub n_splits: usize,
    pub test_fraction: f64,
    pub seed: u64,
}

impl ShuffleSplit {
    pub fn new(n_splits: usize, test_fraction: f64, seed: u64) -> Self {
        Self {
            n_splits,
            test_fraction,
            seed,
        }
    }

    /// Generate the fold sequence for `n_trials` trials. The same splitter
    /// always returns the same folds for the same trial count.
    pub fn split(&self, n_trials: usize) -> Result<Vec<Fold>, CrossValError> {
        if self.n_splits == 0 {
            return Err(CrossValError::NoFolds);
        }
        let n_test = (self.test_fraction * n_trials as f64).ceil() as usize;
        if n_test == 0 {
            return Err(CrossValError::EmptyPartition {
                fraction: self.test_fraction,
                side: "test",
                n_trials,
            });
        }
        if n_test >= n_trials {
            return Err(CrossValError::EmptyPartition {
                fraction: self.test_fraction,
                side: "train",
                n_trials,
            });
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut folds = Vec::with_capacity(self.n_splits);
        for _ in 0..self.n_splits {
            let mut order: Vec<usize> = (0..n_trials).collect();
            order.shuffle(&mut rng);
            let (test, train) = order.split_at(n_test);
            folds.push(Fold {
                train: train.to_vec(),
                test: test.to_vec(),
            });
        }
        Ok(folds)
    }
}

/// Fixed-length sub-range of the time axis, advanced by a fixed step.
#[derive(Debug, Clone, Copy)]
pub struct SlidingWindow {
    /// Window length in samples.
    pub length: usize,
    /// Step between window starts in samples.
    pub step: usize,
}

impl SlidingWindow {
    /// Start offsets 0, step, 2*step, ... for as long as the whole window
    /// still fits inside `n_times`.
    pub fn starts(&self, n_times: usize) -> Vec<usize> {
        (0..)
            .step_by(self.step.max(1))
            .take_while(|start| start + self.length <= n_times)
            .collect()
    }
}

/// Cross-validated classification accuracy as a function of time.
///
/// Spatial filters and the classifier are fit per fold on the training
/// trials of `epochs_crop`, a fixed decision window. Scoring then slides a
/// window over the test trials of the full-duration `epochs_full`. Training
/// on the narrow crop while testing on sliding windows is deliberate: the
/// crop pins the discriminative interval, the sweep shows when in the trial
/// that contrast becomes decodable.
///
/// Folds are independent, so they run in parallel; fold `i` always lands in
/// row `i` of the grid. Any fold error aborts the whole run.
pub fn run_windowed_cv<C, F>(
    epochs_full: &Array3<f64>,
    epochs_crop: &Array3<f64>,
    labels: &[i32],
    n_components: usize,
    cv: &ShuffleSplit,
    window: &SlidingWindow,
    make_classifier: F,
) -> Result<ScoreGrid, CrossValError>
where
    C: Classifier,
    F: Fn() -> C + Sync,
{
    let (n_trials, n_channels, n_times_full) = epochs_full.dim();
    let (n_trials_crop, n_channels_crop, _) = epochs_crop.dim();
    if n_trials != n_trials_crop {
        return Err(CrossValError::TrialMismatch {
            full: n_trials,
            cropped: n_trials_crop,
        });
    }
    if n_channels != n_channels_crop {
        return Err(CrossValError::Dimension(DimensionError::ChannelMismatch {
            expected: n_channels,
            actual: n_channels_crop,
        }));
    }
    if labels.len() != n_trials {
        return Err(CrossValError::Dimension(DimensionError::LabelMismatch {
            trials: n_trials,
            labels: labels.len(),
        }));
    }
    if window.length == 0 || window.step == 0 {
        return Err(CrossValError::ZeroWindow);
    }
    if window.length > n_times_full {
        return Err(CrossValError::WindowTooLong {
            length: window.length,
            n_times: n_times_full,
        });
    }

    let starts = window.starts(n_times_full);
    let folds = cv.split(n_trials)?;
    info!(
        "windowed cross-validation: {} folds, {} window positions, {} components",
        folds.len(),
        starts.len(),
        n_components
    );

    let rows: Result<Vec<Vec<f64>>, CrossValError> = folds
        .par_iter()
        .enumerate()
        .map(|(fold_idx, fold)| {
            let train_labels: Vec<i32> = fold.train.iter().map(|&i| labels[i]).collect();
            let test_labels: Vec<i32> = fold.test.iter().map(|&i| labels[i]).collect();

            // Filters and classifier are fit on the cropped decision window
            let train_epochs = epochs_crop.select(Axis(0), &fold.train);
            let mut csp = Csp::new(n_components);
            csp.fit(&train_epochs, &train_labels)?;
            let train_features = csp.transform(&train_epochs)?;
            let mut classifier = make_classifier();
            classifier.fit(&train_features, &train_labels)?;

            // Scoring slides over the full-duration test trials
            let test_epochs = epochs_full.select(Axis(0), &fold.test);
            let mut row = vec![0.0; starts.len()];
            for (w_idx, &start) in starts.iter().enumerate() {
                let windowed = test_epochs.slice(s![.., .., start..start + window.length]);
                let features = csp.transform(&windowed)?;
                row[w_idx] = classifier.score(&features, &test_labels)?;
            }
            debug!(
                "fold {fold_idx}: {} train / {} test trials scored",
                fold.train.len(),
                fold.test.len()
            );
            Ok(row)
        })
        .collect();

    Ok(ScoreGrid {
        scores: rows_to_grid(rows?),
        starts,
        window_length: window.length,
    })
}

fn rows_to_grid(rows: Vec<Vec<f64>>) -> Array2<f64> {
    if rows.is_empty() {
        return Array2::from_shape_vec((0, 0), Vec::new()).unwrap();
    }
    let nrows = rows.len();
    let ncols = rows[0].len();
    let mut data = Vec::with_capacity(nrows * ncols);
    for row in &rows {
        assert_eq!(row.len(), ncols);
        data.extend_from_slice(row);
    }
    Array2::from_shape_vec((nrows, ncols), data).unwrap()
}
