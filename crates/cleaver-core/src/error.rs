use std::io;

use thiserror::Error;

/// Errors that can occur while training, packaging or loading a classifier.
#[derive(Debug, Error)]
pub enum CleaverError {
    /// A required resource is missing or malformed. Raised before any side effects.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An instance could not be written as training data.
    #[error("data error in instance {instance}: {reason}")]
    Data {
        /// Zero-based ordinal of the offending instance in the write stream.
        instance: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A feature value the training formats cannot represent (NaN or infinite).
    #[error("feature {feature:?} has a non-finite value")]
    NonFiniteValue {
        /// The encoded name of the feature.
        feature: String,
    },

    /// An outcome that does not fit the encoder's convention, or was never seen in training.
    #[error("invalid outcome: {0}")]
    InvalidOutcome(String),

    /// The external trainer could not be launched.
    #[error("failed to launch trainer `{command}`: {source}")]
    Process {
        /// The attempted command line.
        command: String,
        /// The underlying launch failure.
        #[source]
        source: io::Error,
    },

    /// The sigmoid fit did not converge.
    #[error("sigmoid fit did not converge: {0}")]
    ConvergenceFailure(String),

    /// Bad manifest, unexpected entry name or order, or an empty model set.
    #[error("archive format error: {0}")]
    ArchiveFormat(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Encoder or calibration JSON could not be (de)serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CleaverError {
    /// Attaches the instance ordinal to an encoding failure.
    pub fn at_instance(self, instance: usize) -> Self {
        match self {
            Self::Data { reason, .. } => Self::Data { instance, reason },
            other => Self::Data {
                instance,
                reason: other.to_string(),
            },
        }
    }
}

/// Result type alias for Cleaver operations.
pub type Result<T> = std::result::Result<T, CleaverError>;
