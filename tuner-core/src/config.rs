//! # Configuration Module
//!
//! Construction-time parameters for the estimators, the smoothing filter and
//! the session. Every struct has documented defaults and deserializes from a
//! partial JSON document (missing fields fall back to the defaults).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TunerError};

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default number of samples per analysis frame.
pub const DEFAULT_FRAME_SIZE: usize = 2048;

/// Default amplitude floor below which a frame is treated as silence.
pub const DEFAULT_NOISE_FLOOR: f32 = 0.01;

/// Selects which pitch estimator a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Window-normalized dot-product autocorrelation, exhaustive search.
    NormalizedAutocorrelation,
    /// Normalized difference-magnitude autocorrelation, early exit with interpolation.
    DifferenceAutocorrelation,
    /// Average magnitude difference function.
    Amdf,
    /// YIN cumulative-mean-normalized difference.
    Yin,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::NormalizedAutocorrelation,
        Algorithm::DifferenceAutocorrelation,
        Algorithm::Amdf,
        Algorithm::Yin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::NormalizedAutocorrelation => "normalized-autocorrelation",
            Algorithm::DifferenceAutocorrelation => "difference-autocorrelation",
            Algorithm::Amdf => "amdf",
            Algorithm::Yin => "yin",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = TunerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| TunerError::UnknownAlgorithm(s.to_string()))
    }
}

/// An inclusive range of candidate lags (period hypotheses, in samples).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LagWindow {
    pub min_lag: usize,
    pub max_lag: usize,
}

impl LagWindow {
    pub fn new(min_lag: usize, max_lag: usize) -> Result<Self> {
        if min_lag == 0 {
            return Err(TunerError::config("minimum lag must be at least 1"));
        }
        if min_lag >= max_lag {
            return Err(TunerError::config(format!(
                "minimum lag ({min_lag}) must be below maximum lag ({max_lag})"
            )));
        }
        Ok(Self { min_lag, max_lag })
    }

    /// Converts a frequency range into a lag window.
    ///
    /// The shortest period is rounded down and the longest rounded up, so both
    /// exact bounds stay inside the window.
    pub fn from_frequency_range(
        sample_rate: u32,
        min_frequency: f32,
        max_frequency: f32,
    ) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        if !(min_frequency.is_finite() && min_frequency > 0.0) {
            return Err(TunerError::config(format!(
                "minimum frequency must be positive, got {min_frequency}"
            )));
        }
        if !max_frequency.is_finite() || min_frequency >= max_frequency {
            return Err(TunerError::config(format!(
                "minimum frequency ({min_frequency} Hz) must be below maximum frequency ({max_frequency} Hz)"
            )));
        }
        let nyquist = sample_rate as f32 / 2.0;
        if max_frequency > nyquist {
            return Err(TunerError::config(format!(
                "maximum frequency ({max_frequency} Hz) exceeds the Nyquist frequency ({nyquist} Hz)"
            )));
        }
        let min_lag = (sample_rate as f32 / max_frequency).floor() as usize;
        let max_lag = (sample_rate as f32 / min_frequency).ceil() as usize;
        Self::new(min_lag.max(1), max_lag)
    }

    /// Fails unless every lag leaves at least one overlapping sample in a frame.
    pub fn check_fits(&self, frame_size: usize) -> Result<()> {
        if self.max_lag >= frame_size {
            return Err(TunerError::config(format!(
                "maximum lag ({}) must be shorter than the frame ({frame_size} samples)",
                self.max_lag
            )));
        }
        Ok(())
    }

    /// Highest lag frequency, i.e. the frequency of `min_lag`.
    pub fn max_frequency(&self, sample_rate: u32) -> f32 {
        sample_rate as f32 / self.min_lag as f32
    }

    /// Lowest lag frequency, i.e. the frequency of `max_lag`.
    pub fn min_frequency(&self, sample_rate: u32) -> f32 {
        sample_rate as f32 / self.max_lag as f32
    }
}

/// Window-normalized dot-product autocorrelation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocorrelationConfig {
    /// Shortest lag scanned (default: 24, ~1837 Hz at 44.1 kHz).
    pub min_lag: usize,
    /// Longest lag scanned (default: 580, ~76 Hz at 44.1 kHz).
    pub max_lag: usize,
    /// Peak amplitude below which the frame is silence (default: 0.01).
    pub noise_floor: f32,
    /// Local peaks scoring at least this fraction of the global maximum are
    /// ties, resolved toward the shortest lag (default: 0.9).
    pub peak_tolerance: f32,
    /// Minimum raw correlation of the selected lag (default: 0.0001).
    pub confidence_floor: f32,
}

impl Default for AutocorrelationConfig {
    fn default() -> Self {
        Self {
            min_lag: 24,
            max_lag: 580,
            noise_floor: DEFAULT_NOISE_FLOOR,
            peak_tolerance: 0.9,
            confidence_floor: 0.0001,
        }
    }
}

impl AutocorrelationConfig {
    pub fn validate(&self, frame_size: usize) -> Result<LagWindow> {
        let window = LagWindow::new(self.min_lag, self.max_lag)?;
        window.check_fits(frame_size)?;
        validate_noise_floor(self.noise_floor)?;
        validate_unit_interval("peak tolerance", self.peak_tolerance)?;
        validate_non_negative("confidence floor", self.confidence_floor)?;
        Ok(window)
    }
}

/// Normalized difference-magnitude autocorrelation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferenceConfig {
    /// Shortest lag scanned (default: 8).
    pub min_lag: usize,
    /// Longest lag scanned (default: 1000, ~44 Hz at 44.1 kHz).
    pub max_lag: usize,
    /// RMS amplitude below which the frame is silence (default: 0.01).
    pub noise_floor: f32,
    /// Score that ends the search once the following local maximum is reached (default: 0.9).
    pub good_enough: f32,
    /// Minimum score of the selected lag (default: 0.5).
    pub confidence_floor: f32,
}

impl Default for DifferenceConfig {
    fn default() -> Self {
        Self {
            min_lag: 8,
            max_lag: 1000,
            noise_floor: DEFAULT_NOISE_FLOOR,
            good_enough: 0.9,
            confidence_floor: 0.5,
        }
    }
}

impl DifferenceConfig {
    pub fn validate(&self, frame_size: usize) -> Result<LagWindow> {
        let window = LagWindow::new(self.min_lag, self.max_lag)?;
        window.check_fits(frame_size)?;
        validate_noise_floor(self.noise_floor)?;
        validate_unit_interval("good-enough threshold", self.good_enough)?;
        validate_unit_interval("confidence floor", self.confidence_floor)?;
        Ok(window)
    }
}

/// Average magnitude difference function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmdfConfig {
    /// Lowest detectable frequency in Hz (default: 82.0, low E on a guitar).
    pub min_frequency: f32,
    /// Highest detectable frequency in Hz (default: 1000.0).
    pub max_frequency: f32,
    /// Position of the adaptive cutoff between the window's min and max difference (default: 0.1).
    pub sensitivity: f32,
    /// The minimum difference times this ratio must stay below the maximum (default: 5.0).
    pub ratio: f32,
    /// RMS amplitude below which the frame is silence (default: 0.01).
    pub noise_floor: f32,
}

impl Default for AmdfConfig {
    fn default() -> Self {
        Self {
            min_frequency: 82.0,
            max_frequency: 1000.0,
            sensitivity: 0.1,
            ratio: 5.0,
            noise_floor: DEFAULT_NOISE_FLOOR,
        }
    }
}

impl AmdfConfig {
    pub fn validate(&self, sample_rate: u32, frame_size: usize) -> Result<LagWindow> {
        let window =
            LagWindow::from_frequency_range(sample_rate, self.min_frequency, self.max_frequency)?;
        window.check_fits(frame_size)?;
        validate_unit_interval("sensitivity", self.sensitivity)?;
        if !(self.ratio.is_finite() && self.ratio > 0.0) {
            return Err(TunerError::config(format!(
                "AMDF ratio must be positive, got {}",
                self.ratio
            )));
        }
        validate_noise_floor(self.noise_floor)?;
        Ok(window)
    }
}

/// YIN estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YinConfig {
    /// Absolute threshold on the normalized difference (default: 0.10).
    pub threshold: f32,
    /// Minimum periodicity `1 - d'(tau)` to report a pitch (default: 0.10).
    pub probability_threshold: f32,
    /// RMS amplitude below which the frame is silence (default: 0.01).
    pub noise_floor: f32,
}

impl Default for YinConfig {
    fn default() -> Self {
        Self {
            threshold: 0.10,
            probability_threshold: 0.10,
            noise_floor: DEFAULT_NOISE_FLOOR,
        }
    }
}

impl YinConfig {
    pub fn validate(&self, frame_size: usize) -> Result<()> {
        validate_unit_interval("YIN threshold", self.threshold)?;
        if !(0.0..1.0).contains(&self.probability_threshold) {
            return Err(TunerError::config(format!(
                "YIN probability threshold must be in [0, 1), got {}",
                self.probability_threshold
            )));
        }
        validate_noise_floor(self.noise_floor)?;
        // The half-length buffer needs room for tau - 1, tau and tau + 1 past tau = 2.
        if frame_size < 8 {
            return Err(TunerError::config(format!(
                "YIN needs frames of at least 8 samples, got {frame_size}"
            )));
        }
        Ok(())
    }
}

/// Process and measurement noise of the smoothing filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Q: variance added to the estimate covariance every frame (default: 0.05).
    pub process_noise: f32,
    /// R: variance of a single raw measurement (default: 1.0).
    pub measurement_noise: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.05,
            measurement_noise: 1.0,
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        validate_non_negative("process noise", self.process_noise)?;
        if !(self.measurement_noise.is_finite() && self.measurement_noise > 0.0) {
            return Err(TunerError::config(format!(
                "measurement noise must be positive, got {}",
                self.measurement_noise
            )));
        }
        Ok(())
    }
}

/// Top-level tuner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Sample rate of incoming frames in Hz (default: 44100).
    pub sample_rate: u32,
    /// Samples per analysis frame (default: 2048).
    pub frame_size: usize,
    /// Estimator run by the session (default: YIN).
    pub algorithm: Algorithm,
    pub autocorrelation: AutocorrelationConfig,
    pub difference: DifferenceConfig,
    pub amdf: AmdfConfig,
    pub yin: YinConfig,
    pub filter: FilterConfig,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_size: DEFAULT_FRAME_SIZE,
            algorithm: Algorithm::Yin,
            autocorrelation: AutocorrelationConfig::default(),
            difference: DifferenceConfig::default(),
            amdf: AmdfConfig::default(),
            yin: YinConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl TunerConfig {
    /// Validates the shared settings, the selected estimator and the filter.
    pub fn validate(&self) -> Result<()> {
        validate_sample_rate(self.sample_rate)?;
        if self.frame_size == 0 {
            return Err(TunerError::config("frame size must be positive"));
        }
        match self.algorithm {
            Algorithm::NormalizedAutocorrelation => {
                self.autocorrelation.validate(self.frame_size)?;
            }
            Algorithm::DifferenceAutocorrelation => {
                self.difference.validate(self.frame_size)?;
            }
            Algorithm::Amdf => {
                self.amdf.validate(self.sample_rate, self.frame_size)?;
            }
            Algorithm::Yin => self.yin.validate(self.frame_size)?,
        }
        self.filter.validate()
    }
}

pub(crate) fn validate_sample_rate(sample_rate: u32) -> Result<()> {
    if sample_rate == 0 {
        return Err(TunerError::config("sample rate must be positive"));
    }
    Ok(())
}

fn validate_noise_floor(noise_floor: f32) -> Result<()> {
    validate_non_negative("noise floor", noise_floor)
}

fn validate_non_negative(name: &str, value: f32) -> Result<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(TunerError::config(format!(
            "{name} must be a non-negative number, got {value}"
        )));
    }
    Ok(())
}

fn validate_unit_interval(name: &str, value: f32) -> Result<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(TunerError::config(format!(
            "{name} must be in (0, 1), got {value}"
        )));
    }
    Ok(())
}
