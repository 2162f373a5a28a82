//! Synthetic two-class motor imagery trials for the demo binary and tests.

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::{default_ch_names, EpochsData};

/// Simulate `2 * n_per_class` trials of unit Gaussian noise where, from the
/// `onset` sample on, class 0 gains extra variance on the first quarter of
/// the channels and class 1 on the last quarter. That variance contrast is
/// the structure a spatial filter extractor is meant to find.
///
/// Trials come out class-blocked (all class 0 first); the shuffle-split
/// folds downstream do not care about trial order. Deterministic per seed.
pub fn simulate_epochs(
    n_per_class: usize,
    n_channels: usize,
    n_times: usize,
    onset: usize,
    gain: f64,
    sfreq: f64,
    tmin: f64,
    seed: u64,
) -> EpochsData {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_trials = 2 * n_per_class;
    let group = (n_channels / 4).max(1);

    let mut epochs = Array3::<f64>::zeros((n_trials, n_channels, n_times));
    let mut labels = Vec::with_capacity(n_trials);

    for trial in 0..n_trials {
        let label = i32::from(trial >= n_per_class);
        labels.push(label);
        for ch in 0..n_channels {
            let reactive = if label == 0 {
                ch < group
            } else {
                ch >= n_channels - group
            };
            for t in 0..n_times {
                let mut sample: f64 = rng.sample(StandardNormal);
                if reactive && t >= onset {
                    sample += gain * rng.sample::<f64, _>(StandardNormal);
                }
                epochs[[trial, ch, t]] = sample;
            }
        }
    }

    EpochsData {
        epochs,
        labels,
        ch_names: default_ch_names(n_channels),
        sfreq,
        tmin,
    }
}
