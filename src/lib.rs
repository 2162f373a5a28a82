#![warn(clippy::all, rust_2018_idioms)]
use ndarray::{s, Array1, Array2, Array3, Axis};

pub mod crossval;
pub mod csp;
pub mod error;
pub mod lda;
pub mod sim;

pub use crossval::{run_windowed_cv, Fold, ShuffleSplit, SlidingWindow};
pub use csp::Csp;
pub use error::{CrossValError, DimensionError};
pub use lda::{Classifier, Lda};

/// Epoched trials: one fixed-size (channel x time) grid per trial with a
/// class label each. The classification core only ever reads this.
#[derive(Debug, Clone)]
pub struct EpochsData {
    /// (trial, channel, time) samples, all trials the same shape.
    pub epochs: Array3<f64>,
    /// One class label per trial, parallel to the trial axis.
    pub labels: Vec<i32>,
    pub ch_names: Vec<String>,
    /// Sampling rate in Hz.
    pub sfreq: f64,
    /// Time of the first sample relative to cue onset, in seconds.
    pub tmin: f64,
}

/// Fold x window grid of classification accuracies in [0, 1].
#[derive(Debug, Clone)]
pub struct ScoreGrid {
    pub scores: Array2<f64>,
    /// Window start offsets in samples, one per column.
    pub starts: Vec<usize>,
    pub window_length: usize,
}

pub fn default_ch_names(n_channels: usize) -> Vec<String> {
    (0..n_channels).map(|i| format!("Ch{}", i + 1)).collect()
}

impl EpochsData {
    pub fn new(
        epochs: Array3<f64>,
        labels: Vec<i32>,
        ch_names: Vec<String>,
        sfreq: f64,
        tmin: f64,
    ) -> Result<Self, DimensionError> {
        let (n_trials, n_channels, _) = epochs.dim();
        if n_trials == 0 {
            return Err(DimensionError::EmptyEpochs);
        }
        if labels.len() != n_trials {
            return Err(DimensionError::LabelMismatch {
                trials: n_trials,
                labels: labels.len(),
            });
        }
        let ch_names = if ch_names.is_empty() {
            default_ch_names(n_channels)
        } else {
            ch_names
        };
        Ok(Self {
            epochs,
            labels,
            ch_names,
            sfreq,
            tmin,
        })
    }

    pub fn n_trials(&self) -> usize {
        self.epochs.dim().0
    }

    pub fn n_channels(&self) -> usize {
        self.epochs.dim().1
    }

    pub fn n_times(&self) -> usize {
        self.epochs.dim().2
    }

    /// Copy out a fixed sub-range of the time axis, `tmin..tmax` in seconds
    /// relative to cue onset. Used to pin the decision window the spatial
    /// filters are fit on.
    pub fn crop(&self, tmin: f64, tmax: f64) -> Result<Self, DimensionError> {
        if tmin < self.tmin || tmax <= tmin {
            return Err(DimensionError::BadCrop { tmin, tmax });
        }
        let start = ((tmin - self.tmin) * self.sfreq).round() as usize;
        let end = ((tmax - self.tmin) * self.sfreq).round() as usize;
        if start >= end || end > self.n_times() {
            return Err(DimensionError::BadCrop { tmin, tmax });
        }
        Ok(Self {
            epochs: self.epochs.slice(s![.., .., start..end]).to_owned(),
            labels: self.labels.clone(),
            ch_names: self.ch_names.clone(),
            sfreq: self.sfreq,
            tmin,
        })
    }
}

impl ScoreGrid {
    pub fn n_folds(&self) -> usize {
        self.scores.nrows()
    }

    pub fn n_windows(&self) -> usize {
        self.scores.ncols()
    }

    /// Fold-averaged accuracy per window position, the curve that gets
    /// plotted against time downstream.
    pub fn mean_curve(&self) -> Array1<f64> {
        let default_curve = Array1::zeros(self.starts.len());
        self.scores.mean_axis(Axis(0)).unwrap_or(default_curve)
    }

    /// Window center times in seconds relative to cue onset.
    pub fn window_times(&self, sfreq: f64, tmin: f64) -> Vec<f64> {
        self.starts
            .iter()
            .map(|&start| (start as f64 + self.window_length as f64 / 2.0) / sfreq + tmin)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn toy_epochs() -> EpochsData {
        let epochs = Array3::from_shape_fn((4, 2, 100), |(t, c, s)| (t * 200 + c * 100 + s) as f64);
        EpochsData::new(epochs, vec![0, 0, 1, 1], Vec::new(), 100.0, -0.5).unwrap()
    }

    #[test]
    fn auto_channel_names() {
        let data = toy_epochs();
        assert_eq!(data.ch_names, vec!["Ch1".to_string(), "Ch2".to_string()]);
    }

    #[test]
    fn label_count_must_match_trials() {
        let epochs = Array3::zeros((4, 2, 10));
        let err = EpochsData::new(epochs, vec![0, 1], Vec::new(), 100.0, 0.0).unwrap_err();
        assert_eq!(
            err,
            DimensionError::LabelMismatch {
                trials: 4,
                labels: 2
            }
        );
    }

    #[test]
    fn crop_selects_expected_samples() {
        let data = toy_epochs();
        // -0.5 s start at 100 Hz: 0.0..0.3 s maps to samples 50..80
        let cropped = data.crop(0.0, 0.3).unwrap();
        assert_eq!(cropped.n_times(), 30);
        assert_eq!(cropped.tmin, 0.0);
        assert_eq!(cropped.epochs[[0, 0, 0]], data.epochs[[0, 0, 50]]);
    }

    #[test]
    fn crop_rejects_out_of_range() {
        let data = toy_epochs();
        assert!(data.crop(-1.0, 0.0).is_err());
        assert!(data.crop(0.3, 0.1).is_err());
        assert!(data.crop(0.0, 2.0).is_err());
    }

    #[test]
    fn window_times_center_on_windows() {
        let grid = ScoreGrid {
            scores: Array2::zeros((2, 3)),
            starts: vec![0, 10, 20],
            window_length: 50,
        };
        let times = grid.window_times(100.0, -1.0);
        assert!((times[0] - (-0.75)).abs() < 1e-12);
        assert!((times[1] - (-0.65)).abs() < 1e-12);
        assert!((times[2] - (-0.55)).abs() < 1e-12);
    }

    #[test]
    fn mean_curve_averages_over_folds() {
        let scores = Array2::from_shape_vec((2, 2), vec![0.4, 1.0, 0.6, 0.0]).unwrap();
        let grid = ScoreGrid {
            scores,
            starts: vec![0, 10],
            window_length: 20,
        };
        let curve = grid.mean_curve();
        assert!((curve[0] - 0.5).abs() < 1e-12);
        assert!((curve[1] - 0.5).abs() < 1e-12);
    }
}
