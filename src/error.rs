use thiserror::Error;

/// Errors raised by the network, population and configuration layers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvoError {
    /// Topology needs at least an input and an output layer, none of them empty.
    #[error("invalid topology {0:?}: need at least 2 non-empty layers")]
    InvalidTopology(Vec<usize>),
    #[error("input size mismatch: expected {expected}, got {actual}")]
    InputSizeMismatch { expected: usize, actual: usize },
    #[error("gene size mismatch: expected {expected}, got {actual}")]
    GeneSizeMismatch { expected: usize, actual: usize },
    #[error("population size must be at least 1")]
    InvalidPopulationSize,
    #[error("index {index} out of range for population of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = std::result::Result<T, EvoError>;
