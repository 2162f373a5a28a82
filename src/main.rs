use clap::Parser;

use reemi::crossval::{run_windowed_cv, ShuffleSplit, SlidingWindow};
use reemi::lda::Lda;
use reemi::sim;

// CLI code
// underscores will be converted to "-" when clap parses the arguments
#[derive(Parser)]
#[command(name = "reemi")]
#[command(version = "0.1.0")]
#[command(about = "Does awesome motor imagery things", long_about = None)]
pub struct Cli {
    /// Simulated trials per class
    #[arg(long, default_value_t = 20)]
    trials: usize,

    /// Number of EEG channels
    #[arg(long, default_value_t = 16)]
    channels: usize,

    /// Sampling rate in Hz
    #[arg(long, default_value_t = 160.0)]
    sfreq: f64,

    /// Epoch start relative to cue onset (s)
    #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
    tmin: f64,

    /// Epoch end relative to cue onset (s)
    #[arg(long, default_value_t = 4.0)]
    tmax: f64,

    /// Start of the decision window the filters are fit on (s)
    #[arg(long, default_value_t = 1.0)]
    fit_tmin: f64,

    /// End of the decision window the filters are fit on (s)
    #[arg(long, default_value_t = 2.0)]
    fit_tmax: f64,

    /// Number of spatial filters to keep
    #[arg(long, default_value_t = 4)]
    components: usize,

    /// Cross-validation folds
    #[arg(long, default_value_t = 10)]
    folds: usize,

    /// Held-out fraction of trials per fold
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,

    /// Sliding window length (s)
    #[arg(long, default_value_t = 0.5)]
    window: f64,

    /// Sliding window step (s)
    #[arg(long, default_value_t = 0.1)]
    step: f64,

    /// Strength of the simulated class effect
    #[arg(long, default_value_t = 3.0)]
    gain: f64,

    /// Seed for both the simulation and the fold shuffling
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let n_times = ((cli.tmax - cli.tmin) * cli.sfreq).round() as usize;
    let onset = ((-cli.tmin) * cli.sfreq).round().max(0.0) as usize;

    let epochs = sim::simulate_epochs(
        cli.trials,
        cli.channels,
        n_times,
        onset,
        cli.gain,
        cli.sfreq,
        cli.tmin,
        cli.seed,
    );
    println!(
        "Simulated {} trials, {} channels, {} samples each ({}..{} s at {} Hz)",
        epochs.n_trials(),
        epochs.n_channels(),
        epochs.n_times(),
        cli.tmin,
        cli.tmax,
        cli.sfreq
    );

    let fit_epochs = epochs.crop(cli.fit_tmin, cli.fit_tmax)?;
    println!(
        "Fitting filters and classifier on the {}..{} s decision window ({} samples)",
        cli.fit_tmin,
        cli.fit_tmax,
        fit_epochs.n_times()
    );

    let cv = ShuffleSplit::new(cli.folds, cli.test_fraction, cli.seed);
    let window = SlidingWindow {
        length: (cli.window * cli.sfreq).round() as usize,
        step: (cli.step * cli.sfreq).round() as usize,
    };

    let grid = run_windowed_cv(
        &epochs.epochs,
        &fit_epochs.epochs,
        &epochs.labels,
        cli.components,
        &cv,
        &window,
        Lda::new,
    )?;

    let times = grid.window_times(cli.sfreq, cli.tmin);
    let curve = grid.mean_curve();

    println!(
        "\nClassification accuracy over time ({} folds, chance = 0.5):",
        grid.n_folds()
    );
    println!("{:>9}  {:>8}", "time (s)", "accuracy");
    for (t, acc) in times.iter().zip(curve.iter()) {
        println!("{:>+9.3}  {:>8.3}", t, acc);
    }

    Ok(())
}
