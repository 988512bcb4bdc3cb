//! Error types for the detection and recognition core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaceError {
    /// A raw tensor does not line up with the anchor-derived length.
    #[error("shape mismatch for {what}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("no detector output with trailing dimension {0}")]
    MissingOutput(usize),

    #[error("more than one detector output with trailing dimension {0}")]
    AmbiguousOutput(usize),

    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),

    #[error("no face detected in the image")]
    NoFaceDetected,
}

pub type Result<T> = std::result::Result<T, FaceError>;
