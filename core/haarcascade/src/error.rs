use thiserror::Error;

/// Errors returned by model construction and detection calls.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The cascade description is malformed or incomplete.
    #[error("failed to parse cascade model: {0}")]
    ModelParse(String),

    /// The input image cannot be scanned (zero area or mismatched buffer).
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// A scan or merge parameter is out of range.
    #[error("invalid detection options: {0}")]
    InvalidOptions(String),

    /// A packed result buffer is truncated or inconsistent.
    #[error("malformed packed result: {0}")]
    MalformedPacked(String),

    /// A value does not fit in the packed `u16` result format.
    #[error("value {0} does not fit in the packed u16 result")]
    WireOverflow(usize),
}
