use thiserror::Error;

/// Shape and cardinality violations. These indicate a broken caller
/// contract, so they are fatal and never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DimensionError {
    #[error("expected exactly two label classes, found {0}")]
    ClassCount(usize),

    #[error("requested {requested} spatial filters but data only has {channels} channels")]
    TooManyComponents { requested: usize, channels: usize },

    #[error("channel count mismatch: fitted for {expected} channels, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("feature count mismatch: fitted for {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("label count {labels} does not match trial count {trials}")]
    LabelMismatch { trials: usize, labels: usize },

    #[error("transform called before fit")]
    NotFitted,

    #[error("epochs array is empty")]
    EmptyEpochs,

    #[error("trial {trial} has zero total variance")]
    DegenerateTrial { trial: usize },

    #[error("covariance matrix is not positive definite")]
    SingularCovariance,

    #[error("invalid crop range {tmin}..{tmax}")]
    BadCrop { tmin: f64, tmax: f64 },
}

/// Failures of the windowed cross-validation harness. A failing fold
/// aborts the whole run, a silently dropped fold would bias the
/// averaged accuracy curve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrossValError {
    #[error("test fraction {fraction} leaves an empty {side} partition for {n_trials} trials")]
    EmptyPartition {
        fraction: f64,
        side: &'static str,
        n_trials: usize,
    },

    #[error("window length {length} exceeds trial duration of {n_times} samples")]
    WindowTooLong { length: usize, n_times: usize },

    #[error("window length and step must be nonzero")]
    ZeroWindow,

    #[error("cross-validation requires at least one fold")]
    NoFolds,

    #[error("full and cropped epochs disagree on trial count: {full} vs {cropped}")]
    TrialMismatch { full: usize, cropped: usize },

    #[error(transparent)]
    Dimension(#[from] DimensionError),
}
