use core::fmt;

/// Result alias for `kmedoids`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by configuration and fitting.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input dataset was empty.
    EmptyInput,

    /// Invalid number of medoids requested.
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of points in the dataset.
        n_items: usize,
    },

    /// Algorithm name is not one of "naive", "FastPAM1", "BanditPAM".
    UnknownAlgorithm(String),

    /// Loss name could not be parsed.
    UnknownLoss(String),

    /// Dataset contains a NaN or infinite entry.
    NonFiniteInput {
        /// Row (feature) index of the offending entry.
        row: usize,
        /// Column (point) index of the offending entry.
        col: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty dataset"),
            Error::InvalidClusterCount { requested, n_items } => {
                write!(f, "cannot select {requested} medoids from {n_items} points")
            }
            Error::UnknownAlgorithm(name) => write!(f, "unrecognized algorithm: {name:?}"),
            Error::UnknownLoss(name) => write!(f, "unrecognized loss function: {name:?}"),
            Error::NonFiniteInput { row, col } => {
                write!(f, "non-finite value in dataset at ({row}, {col})")
            }
        }
    }
}

impl std::error::Error for Error {}
