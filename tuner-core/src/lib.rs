// tuner-core/src/lib.rs

//! The core logic for the instrument tuner.
//! This crate is responsible for pitch estimation, note mapping,
//! smoothing and audio frame handling. It is completely headless
//! and contains no display code.

pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod filter;
pub mod pitch;
pub mod session;
pub mod tuning;

pub use audio::{AudioFrame, FrameAssembler};
pub use config::{Algorithm, TunerConfig};
pub use error::{Result, TunerError};
pub use pitch::{PitchEstimator, build_estimator};
pub use session::Session;

/// Represents the result of a single audio analysis frame with a pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// The detected fundamental frequency in Hz.
    pub detected_frequency: f32,
    /// Index of the nearest equal-tempered note (57 = A 440 Hz).
    pub note_index: i32,
    /// The name of the nearest note.
    pub note_name: &'static str,
    /// Frequency of the nearest note in Hz.
    pub target_frequency: f32,
    /// Raw deviation from the nearest note in cents (positive = sharp).
    pub cents_deviation: f32,
    /// Deviation after the session's smoothing filter.
    ///
    /// The filter runs on raw cents and is not reset when the nearest note
    /// changes, so right after a change this blends offsets measured against
    /// different notes. Call [`Session::reset`] to start the smoothing over.
    pub smoothed_cents: f32,
}
