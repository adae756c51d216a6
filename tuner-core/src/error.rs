//! # Error Module
//!
//! Errors raised by the tuner core. Only construction and frame validation
//! can fail; a frame that simply has no detectable pitch is not an error and
//! is reported as `None` by the estimators and the session.

use thiserror::Error;

/// Result type alias using the tuner's error type.
pub type Result<T> = std::result::Result<T, TunerError>;

/// Errors that can occur while configuring or feeding the tuner.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TunerError {
    /// A configuration value is out of range or inconsistent.
    ///
    /// Raised at construction time so that nonsensical search windows are
    /// never built.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The algorithm name does not match any estimator.
    #[error("Unknown pitch algorithm: {0}")]
    UnknownAlgorithm(String),

    /// A frame was empty or carried a zero sample rate.
    #[error("Invalid audio frame: {0}")]
    InvalidFrame(String),

    /// A frame does not match the length or sample rate the session was built for.
    #[error(
        "Frame mismatch: expected {expected_len} samples at {expected_rate} Hz, \
         got {actual_len} samples at {actual_rate} Hz"
    )]
    FrameMismatch {
        expected_len: usize,
        actual_len: usize,
        expected_rate: u32,
        actual_rate: u32,
    },
}

impl TunerError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        TunerError::InvalidConfig(msg.into())
    }
}
