//! Short-term autocorrelation estimators.
//!
//! Both variants score every candidate lag by comparing the frame with a
//! lag-shifted copy of itself over the overlapping `N - lag` samples:
//!
//! - [`NormalizedAutocorrelation`] uses the raw dot product divided by the
//!   overlap length, scans the whole lag window and interpolates the winner.
//! - [`DifferenceAutocorrelation`] uses a normalized difference magnitude,
//!   stops at the first strong peak and refines it to sub-sample precision.
//!
//! Reference: <http://www.nyu.edu/classes/bello/MIR_files/periodicity.pdf>

use std::f32::consts::PI;

use crate::config::{
    Algorithm, AutocorrelationConfig, DifferenceConfig, LagWindow, validate_sample_rate,
};
use crate::error::Result;

use super::{PitchEstimator, frequency_from_period, parabolic_offset, peak_amplitude, rms};

/// Dot-product autocorrelation with an exhaustive lag search.
///
/// Multiples of the true period score almost identically on a periodic
/// signal, so the global maximum alone is unreliable. Every interior local
/// peak within `peak_tolerance` of the global maximum counts as a tie, and
/// the shortest such lag wins.
#[derive(Debug, Clone)]
pub struct NormalizedAutocorrelation {
    sample_rate: u32,
    window: LagWindow,
    config: AutocorrelationConfig,
}

impl NormalizedAutocorrelation {
    pub fn new(sample_rate: u32, frame_size: usize, config: AutocorrelationConfig) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        let window = config.validate(frame_size)?;
        Ok(Self {
            sample_rate,
            window,
            config,
        })
    }

    /// Window-normalized correlation of the frame with itself at `lag`.
    fn correlation(signal: &[f32], lag: usize) -> f32 {
        let overlap = signal.len() - lag;
        let sum: f32 = signal[..overlap]
            .iter()
            .zip(&signal[lag..])
            .map(|(a, b)| a * b)
            .sum();
        sum / overlap as f32
    }
}

impl PitchEstimator for NormalizedAutocorrelation {
    fn algorithm(&self) -> Algorithm {
        Algorithm::NormalizedAutocorrelation
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn estimate(&self, signal: &[f32]) -> Option<f32> {
        // --- Noise Gate: the loudest sample must clear the floor ---
        if peak_amplitude(signal) < self.config.noise_floor {
            log::debug!("[AUTOCORR] Frame below noise floor");
            return None;
        }

        let min_lag = self.window.min_lag;
        let max_lag = self.window.max_lag.min(signal.len().saturating_sub(1));
        if max_lag < min_lag + 2 {
            return None;
        }

        // --- Step 1: Correlation for every candidate lag ---
        let scores: Vec<f32> = (min_lag..=max_lag)
            .map(|lag| Self::correlation(signal, lag))
            .collect();

        let global_max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        if !(global_max > self.config.confidence_floor) {
            log::debug!("[AUTOCORR] Weak periodicity: best score {global_max:.6}");
            return None;
        }

        // --- Step 2: Shortest interior peak tied with the global maximum ---
        let cutoff = global_max * self.config.peak_tolerance;
        let best = (1..scores.len() - 1).find(|&i| {
            scores[i] >= cutoff && scores[i] > scores[i - 1] && scores[i] >= scores[i + 1]
        })?;

        if scores[best] < self.config.confidence_floor {
            return None;
        }

        // --- Step 3: Parabolic interpolation between neighbouring lags ---
        let lag = min_lag + best;
        let period = match parabolic_offset(scores[best - 1], scores[best], scores[best + 1]) {
            Some(offset) => lag as f32 + offset,
            None => lag as f32,
        };

        log::debug!(
            "[AUTOCORR] Selected lag {lag} (score {:.6}), refined to {period:.3}",
            scores[best]
        );
        frequency_from_period(self.sample_rate, period)
    }
}

/// Difference-magnitude autocorrelation with early exit.
///
/// The score `1 - Σ|x[i] - x[i+k]| / Σ(|x[i]| + |x[i+k]|)` is 1 for a perfect
/// match and 0 for a phase-inverted copy, independent of loudness. The scan
/// runs upward from `min_lag`; once a rising score passes `good_enough` it
/// climbs to the local maximum and stops there.
#[derive(Debug, Clone)]
pub struct DifferenceAutocorrelation {
    sample_rate: u32,
    window: LagWindow,
    config: DifferenceConfig,
}

impl DifferenceAutocorrelation {
    pub fn new(sample_rate: u32, frame_size: usize, config: DifferenceConfig) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        let window = config.validate(frame_size)?;
        Ok(Self {
            sample_rate,
            window,
            config,
        })
    }

    /// Prefers a whole sub-multiple of `lag` that is itself a strong peak.
    ///
    /// Short periods fall between integer lags, so the score at the true
    /// period can miss `good_enough` while a later multiple lands closer to
    /// a whole number of samples and passes. A peak at `lag / d` is accepted
    /// when it misses the threshold by no more than the score a sine loses
    /// half a sample away from its period.
    fn sub_multiple(&self, signal: &[f32], lag: usize, max_lag: usize) -> usize {
        for divisor in [4, 3, 2] {
            let low = (lag / divisor).saturating_sub(1).max(self.window.min_lag);
            let high = (lag.div_ceil(divisor) + 1).min(max_lag);
            if low > high {
                continue;
            }
            let Some((candidate, score)) = (low..=high)
                .map(|k| (k, Self::score(signal, k)))
                .max_by(|a, b| a.1.total_cmp(&b.1))
            else {
                continue;
            };
            let sampling_loss = (PI / (2.0 * candidate as f32)).sin();
            if score > Self::score(signal, candidate - 1)
                && score >= Self::score(signal, candidate + 1)
                && score >= self.config.good_enough - sampling_loss
            {
                log::debug!("[DIFF-AUTOCORR] Lag {lag} reduced to sub-multiple {candidate}");
                return candidate;
            }
        }
        lag
    }

    fn score(signal: &[f32], lag: usize) -> f32 {
        let overlap = signal.len() - lag;
        let (difference, magnitude) = signal[..overlap].iter().zip(&signal[lag..]).fold(
            (0.0_f32, 0.0_f32),
            |(difference, magnitude), (a, b)| {
                (difference + (a - b).abs(), magnitude + a.abs() + b.abs())
            },
        );
        if magnitude > 0.0 {
            1.0 - difference / magnitude
        } else {
            0.0
        }
    }
}

impl PitchEstimator for DifferenceAutocorrelation {
    fn algorithm(&self) -> Algorithm {
        Algorithm::DifferenceAutocorrelation
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn estimate(&self, signal: &[f32]) -> Option<f32> {
        // --- Noise Gate: Calculate RMS to filter out silence/noise ---
        if rms(signal) < self.config.noise_floor {
            log::debug!("[DIFF-AUTOCORR] Frame below noise floor");
            return None;
        }

        let min_lag = self.window.min_lag;
        // Keep one lag of headroom for the right-hand interpolation neighbour.
        let max_lag = self.window.max_lag.min(signal.len().saturating_sub(2));
        if max_lag <= min_lag {
            return None;
        }

        // --- Step 1: Scan upward until a strong peak has been climbed ---
        let mut previous = 1.0_f32; // lag 0 matches perfectly
        let mut armed = false;
        let mut selected = None;
        let mut best_lag = min_lag;
        let mut best_score = f32::NEG_INFINITY;

        for lag in min_lag..=max_lag {
            let score = Self::score(signal, lag);
            if score > best_score {
                best_score = score;
                best_lag = lag;
            }
            if armed {
                if score < previous {
                    selected = Some(lag - 1);
                    break;
                }
            } else if score > self.config.good_enough && score > previous {
                armed = true;
            }
            previous = score;
        }

        // --- Step 2: Fall back to the global maximum when no peak qualified ---
        let lag = match selected {
            Some(lag) => lag,
            None if armed => max_lag,
            None => best_lag,
        };
        let lag = self.sub_multiple(signal, lag, max_lag);
        let score = Self::score(signal, lag);
        if score < self.config.confidence_floor {
            log::debug!("[DIFF-AUTOCORR] Weak periodicity: best score {score:.4}");
            return None;
        }

        // --- Step 3: Parabolic interpolation for sub-sample precision ---
        let below = Self::score(signal, lag - 1);
        let above = Self::score(signal, lag + 1);
        let period = match parabolic_offset(below, score, above) {
            Some(offset) => lag as f32 + offset,
            None => lag as f32,
        };

        log::debug!("[DIFF-AUTOCORR] Selected lag {lag}, refined to {period:.3}");
        frequency_from_period(self.sample_rate, period)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_signals::*;
    use super::*;

    fn normalized() -> NormalizedAutocorrelation {
        NormalizedAutocorrelation::new(44100, 2048, AutocorrelationConfig::default()).unwrap()
    }

    fn difference() -> DifferenceAutocorrelation {
        DifferenceAutocorrelation::new(44100, 2048, DifferenceConfig::default()).unwrap()
    }

    #[test]
    fn test_normalized_tracks_sines_across_range() {
        let estimator = normalized();
        for frequency in [110.0, 196.0, 330.0, 440.0, 660.0] {
            let signal = sine(frequency, 44100, 2048, 0.5);
            let detected = estimator.estimate(&signal).expect("pitch expected");
            assert_close(detected, frequency);
        }
    }

    #[test]
    fn test_normalized_prefers_fundamental_over_period_multiples() {
        // 220 Hz has several period multiples inside the 24..580 window.
        let estimator = normalized();
        let signal = sine(220.0, 44100, 2048, 0.8);
        let detected = estimator.estimate(&signal).unwrap();
        assert_close(detected, 220.0);
    }

    #[test]
    fn test_normalized_period_on_whole_lag() {
        let estimator = normalized();
        // 44100 / 100 = 441.
        let signal = sine(441.0, 44100, 2048, 0.5);
        let detected = estimator.estimate(&signal).unwrap();
        assert!((detected - 441.0).abs() < 1.0, "got {detected}");
    }

    #[test]
    fn test_normalized_interpolates_short_periods() {
        // Periods of 25 to 42 samples, where whole lags are more than 1% apart.
        let estimator = normalized();
        for frequency in [1046.5, 1144.0, 1407.0, 1500.0, 1568.0, 1760.0] {
            let signal = sine(frequency, 44100, 2048, 0.5);
            let detected = estimator.estimate(&signal).expect("pitch expected");
            assert_close(detected, frequency);
        }
    }

    #[test]
    fn test_normalized_rejects_quiet_frame() {
        let estimator = normalized();
        let signal = sine(440.0, 44100, 2048, 0.005);
        assert_eq!(estimator.estimate(&signal), None);
    }

    #[test]
    fn test_difference_tracks_sines_with_sub_sample_precision() {
        let estimator = difference();
        for frequency in [82.41, 110.0, 246.94, 440.0, 880.0] {
            let signal = sine(frequency, 44100, 2048, 0.5);
            let detected = estimator.estimate(&signal).expect("pitch expected");
            assert_close(detected, frequency);
        }
    }

    #[test]
    fn test_difference_stays_on_the_octave_above_2khz() {
        // Periods of 10 to 21 samples; the second period multiple scores
        // higher than the first for most of these.
        let estimator = difference();
        for frequency in [2093.0, 3043.0, 3528.0, 4186.0, 4213.0] {
            let signal = sine(frequency, 44100, 2048, 0.5);
            let detected = estimator.estimate(&signal).expect("pitch expected");
            assert_close(detected, frequency);
        }
    }

    #[test]
    fn test_difference_keeps_plucked_fundamentals() {
        let estimator = difference();
        for frequency in [82.41, 110.0, 196.0, 329.63, 440.0] {
            let signal = plucked(frequency, 44100, 4096);
            let detected = estimator.estimate(&signal).expect("pitch expected");
            assert_close(detected, frequency);
        }
    }

    #[test]
    fn test_difference_is_loudness_independent() {
        let estimator = difference();
        let quiet = estimator.estimate(&sine(330.0, 44100, 2048, 0.05)).unwrap();
        let loud = estimator.estimate(&sine(330.0, 44100, 2048, 0.9)).unwrap();
        assert!((quiet - loud).abs() < 0.01, "quiet {quiet}, loud {loud}");
    }

    #[test]
    fn test_difference_rejects_noise() {
        let estimator = difference();
        let signal = noise(2048, 0.5, 7);
        assert_eq!(estimator.estimate(&signal), None);
    }

    #[test]
    fn test_short_frames_do_not_panic() {
        let signal = sine(440.0, 44100, 16, 0.5);
        assert_eq!(normalized().estimate(&signal), None);
        let detected = difference().estimate(&signal);
        assert!(detected.is_none_or(|f| f.is_finite() && f > 0.0));
    }
}
