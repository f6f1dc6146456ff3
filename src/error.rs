//! Error taxonomy for network construction, editing, training and evolution.

use thiserror::Error;

/// Contract violations reported by the network engine.
///
/// Numeric degeneracy (NaN or infinite errors) is never reported here; callers
/// check the returned error values for finiteness.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// A network was requested with zero inputs or zero outputs.
    #[error(
        "network needs at least one input and one output (got {input} inputs, {output} outputs)"
    )]
    InvalidSize { input: usize, output: usize },

    /// An input vector or dataset sample does not match the network input size.
    #[error("expected {expected} input values, got {found}")]
    InputSizeMismatch { expected: usize, found: usize },

    /// A target vector or dataset sample does not match the network output size.
    #[error("expected {expected} output values, got {found}")]
    OutputSizeMismatch { expected: usize, found: usize },

    /// Two networks combined by crossover differ in input or output size.
    #[error("networks differ in shape: {left_input}x{left_output} vs {right_input}x{right_output}")]
    IncompatibleNetworks {
        left_input: usize,
        left_output: usize,
        right_input: usize,
        right_output: usize,
    },

    /// Neither an iteration cap nor an error target was supplied.
    #[error("at least one of `iterations` or `error` must be specified")]
    MissingStopCriterion,

    /// The batch size exceeds the dataset length.
    #[error("batch size {batch_size} exceeds dataset length {len}")]
    BatchTooLarge { batch_size: usize, len: usize },

    /// Training, testing or evolution was given no samples.
    #[error("dataset is empty")]
    EmptyDataset,

    /// Cross-validation hold-out fraction outside (0, 1), or leaving no samples on a side.
    #[error("cross-validation test size {0} must lie in (0, 1) and leave samples on both sides")]
    InvalidCrossValidation(f64),

    /// The node is not part of this network.
    #[error("node is not part of this network")]
    UnknownNode,

    /// The connection is not part of this network.
    #[error("connection is not part of this network")]
    UnknownConnection,

    /// A connection between the two node indices already exists.
    #[error("node {from} already projects a connection to node {to}")]
    AlreadyConnected { from: usize, to: usize },

    /// `ungate` was called on a connection without a gater.
    #[error("connection is not gated")]
    NotGated,

    /// Input and output nodes cannot be removed.
    #[error("node {0} is an input or output node and cannot be removed")]
    ProtectedNode(usize),

    /// A serialized record does not describe a valid network.
    #[error("invalid network record: {0}")]
    InvalidRecord(String),

    /// A JSON record could not be encoded or decoded.
    #[error("network JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tournament selection asked for more contestants than the population holds.
    #[error("tournament size {size} exceeds population size {population}")]
    TournamentTooLarge { size: usize, population: usize },

    /// The population size is zero.
    #[error("population size must be at least 1")]
    EmptyPopulation,

    /// The fitness worker pool could not be created.
    #[error("failed to build fitness worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_cause() {
        let err = NetworkError::AlreadyConnected { from: 1, to: 4 };
        assert!(err.to_string().contains("already projects"));

        let err = NetworkError::BatchTooLarge {
            batch_size: 8,
            len: 4,
        };
        assert_eq!(err.to_string(), "batch size 8 exceeds dataset length 4");
    }
}
