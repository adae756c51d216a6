//! # Pitch Detection Module
//!
//! This module implements the interchangeable pitch estimators used by the tuner.
//! Each estimator maps one frame of samples to an optional fundamental frequency.
//!
//! ## Features
//! - Window-normalized autocorrelation with an exhaustive, tie-breaking search
//! - Difference-magnitude autocorrelation with early exit and parabolic refinement
//! - AMDF with an adaptive cutoff and a periodicity strength check
//! - YIN with absolute threshold, local-minimum descent and parabolic refinement
//! - Noise gating so silence never produces a pitch
//!
//! Estimators are immutable after construction and allocate their scratch
//! buffers per call, so one instance can serve several threads at once.

pub mod amdf;
pub mod autocorrelation;
pub mod yin;

use std::fmt;

use crate::config::{Algorithm, TunerConfig};
use crate::error::Result;

pub use amdf::Amdf;
pub use autocorrelation::{DifferenceAutocorrelation, NormalizedAutocorrelation};
pub use yin::Yin;

/// A pitch detection algorithm.
pub trait PitchEstimator: Send + Sync + fmt::Debug {
    /// Which algorithm this is.
    fn algorithm(&self) -> Algorithm;

    /// Sample rate the estimator was configured for, in Hz.
    fn sample_rate(&self) -> u32;

    /// Estimates the fundamental frequency of one frame.
    ///
    /// # Returns
    /// * `Some(frequency)` - Strictly positive, finite frequency in Hz
    /// * `None` - Silence, weak periodicity, or no lag met the criteria
    fn estimate(&self, signal: &[f32]) -> Option<f32>;
}

/// Builds the estimator selected by `config.algorithm`.
///
/// Fails with a configuration error when the estimator's parameters are
/// invalid for the configured sample rate and frame size.
pub fn build_estimator(config: &TunerConfig) -> Result<Box<dyn PitchEstimator>> {
    let sample_rate = config.sample_rate;
    let frame_size = config.frame_size;
    let estimator: Box<dyn PitchEstimator> = match config.algorithm {
        Algorithm::NormalizedAutocorrelation => Box::new(NormalizedAutocorrelation::new(
            sample_rate,
            frame_size,
            config.autocorrelation.clone(),
        )?),
        Algorithm::DifferenceAutocorrelation => Box::new(DifferenceAutocorrelation::new(
            sample_rate,
            frame_size,
            config.difference.clone(),
        )?),
        Algorithm::Amdf => Box::new(Amdf::new(sample_rate, frame_size, config.amdf.clone())?),
        Algorithm::Yin => Box::new(Yin::new(sample_rate, frame_size, config.yin.clone())?),
    };
    log::debug!(
        "[PITCH] Built {} estimator ({} samples at {} Hz)",
        estimator.algorithm(),
        frame_size,
        sample_rate
    );
    Ok(estimator)
}

/// Root-mean-square amplitude of a signal.
pub(crate) fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

/// Largest absolute sample value.
pub(crate) fn peak_amplitude(signal: &[f32]) -> f32 {
    signal.iter().fold(0.0_f32, |peak, &s| peak.max(s.abs()))
}

/// Vertex offset of the parabola through three equally spaced points.
///
/// Returns `None` when the points are collinear or the vertex lies further
/// than one step from the middle point.
pub(crate) fn parabolic_offset(y0: f32, y1: f32, y2: f32) -> Option<f32> {
    let denominator = y0 - 2.0 * y1 + y2;
    if !denominator.is_finite() || denominator.abs() < 1e-12 {
        return None;
    }
    let offset = 0.5 * (y0 - y2) / denominator;
    (offset.is_finite() && offset.abs() <= 1.0).then_some(offset)
}

/// Converts a period in samples to a frequency, rejecting non-finite results.
pub(crate) fn frequency_from_period(sample_rate: u32, period: f32) -> Option<f32> {
    if !(period.is_finite() && period > 0.0) {
        return None;
    }
    let frequency = sample_rate as f32 / period;
    (frequency.is_finite() && frequency > 0.0).then_some(frequency)
}

#[cfg(test)]
pub(crate) mod test_signals {
    use std::f32::consts::PI;

    pub fn sine(frequency: f32, sample_rate: u32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    /// Decaying string-like tone with harmonics falling off as 1/n.
    pub fn plucked(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let tone: f32 = (1..=6)
                    .map(|n| {
                        let n = n as f32;
                        (2.0 * PI * n * frequency * t).sin() * (-t * n / 1.5).exp() / n
                    })
                    .sum();
                0.4 * tone
            })
            .collect()
    }

    /// Uniform pseudo-noise in [-amplitude, amplitude] from a fixed seed.
    pub fn noise(len: usize, amplitude: f32, seed: u32) -> Vec<f32> {
        let mut state = seed.max(1);
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                amplitude * (state as f32 / u32::MAX as f32 * 2.0 - 1.0)
            })
            .collect()
    }

    pub fn assert_close(detected: f32, expected: f32) {
        let tolerance = (expected * 0.01).max(1.0);
        assert!(
            (detected - expected).abs() <= tolerance,
            "expected {expected:.2} Hz (±{tolerance:.2}), got {detected:.2} Hz"
        );
    }
}
