//! Average Magnitude Difference Function (AMDF) estimator.
//!
//! The AMDF dips toward zero at lags equal to the signal period. Instead of a
//! fixed threshold the search uses an adaptive cutoff placed between the
//! smallest and largest difference over the lag window, then looks for the
//! true minimum in a short neighbourhood after the first crossing.

use crate::config::{Algorithm, AmdfConfig, LagWindow, validate_sample_rate};
use crate::error::Result;

use super::{PitchEstimator, frequency_from_period, rms};

#[derive(Debug, Clone)]
pub struct Amdf {
    sample_rate: u32,
    window: LagWindow,
    config: AmdfConfig,
}

impl Amdf {
    pub fn new(sample_rate: u32, frame_size: usize, config: AmdfConfig) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        let window = config.validate(sample_rate, frame_size)?;
        Ok(Self {
            sample_rate,
            window,
            config,
        })
    }

    /// The lag window derived from the configured frequency range.
    pub fn window(&self) -> LagWindow {
        self.window
    }

    fn mean_abs_difference(signal: &[f32], lag: usize) -> f32 {
        let overlap = signal.len() - lag;
        let sum: f32 = signal[..overlap]
            .iter()
            .zip(&signal[lag..])
            .map(|(a, b)| (a - b).abs())
            .sum();
        sum / overlap as f32
    }
}

impl PitchEstimator for Amdf {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Amdf
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn estimate(&self, signal: &[f32]) -> Option<f32> {
        if rms(signal) < self.config.noise_floor {
            log::debug!("[AMDF] Frame below noise floor");
            return None;
        }

        let min_lag = self.window.min_lag;
        let max_lag = self.window.max_lag.min(signal.len().saturating_sub(1));
        if max_lag <= min_lag {
            return None;
        }

        // --- Step 1: Mean absolute difference for every lag in the window ---
        let differences: Vec<f32> = (min_lag..=max_lag)
            .map(|lag| Self::mean_abs_difference(signal, lag))
            .collect();
        let (min_value, max_value) = differences
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &d| {
                (lo.min(d), hi.max(d))
            });

        // --- Step 2: First lag at or below the adaptive cutoff ---
        let cutoff = self.config.sensitivity * (max_value - min_value) + min_value;
        let crossing = differences.iter().position(|&d| d <= cutoff)?;

        // --- Step 3: True local minimum within half the shortest period ---
        let search_length = (min_lag / 2).max(1);
        let start = crossing.saturating_sub(1);
        let end = (crossing + search_length).min(differences.len());
        let mut best = crossing;
        for i in start..end {
            if differences[i] < differences[best] {
                best = i;
            }
        }

        // --- Step 4: Periodicity strength check ---
        if differences[best] * self.config.ratio >= max_value {
            log::debug!(
                "[AMDF] Weak periodicity: min {:.5} x {} >= max {:.5}",
                differences[best],
                self.config.ratio,
                max_value
            );
            return None;
        }

        let lag = min_lag + best;
        log::debug!("[AMDF] Selected lag {lag}");
        frequency_from_period(self.sample_rate, lag as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_signals::*;
    use super::*;

    fn amdf() -> Amdf {
        Amdf::new(44100, 2048, AmdfConfig::default()).unwrap()
    }

    #[test]
    fn test_amdf_tracks_guitar_range() {
        let estimator = amdf();
        for frequency in [82.41, 110.0, 146.83, 196.0, 246.94, 329.63, 440.0, 880.0] {
            let signal = sine(frequency, 44100, 2048, 0.5);
            let detected = estimator.estimate(&signal).expect("pitch expected");
            assert_close(detected, frequency);
        }
    }

    #[test]
    fn test_amdf_handles_harmonic_tones() {
        let estimator = amdf();
        let signal = plucked(196.0, 44100, 2048);
        assert_close(estimator.estimate(&signal).unwrap(), 196.0);
    }

    #[test]
    fn test_amdf_rejects_noise() {
        let estimator = amdf();
        assert_eq!(estimator.estimate(&noise(2048, 0.5, 99)), None);
    }

    #[test]
    fn test_amdf_rejects_flat_dc_signal() {
        // A constant offset passes the RMS gate but has no period at all.
        let estimator = amdf();
        assert_eq!(estimator.estimate(&vec![0.3_f32; 2048]), None);
    }

    #[test]
    fn test_window_follows_frequency_bounds() {
        let config = AmdfConfig {
            min_frequency: 100.0,
            max_frequency: 500.0,
            ..AmdfConfig::default()
        };
        let estimator = Amdf::new(48000, 2048, config).unwrap();
        assert_eq!(estimator.window().min_lag, 96);
        assert_eq!(estimator.window().max_lag, 480);
    }

    #[test]
    fn test_invalid_configuration_fails_fast() {
        let inverted = AmdfConfig {
            min_frequency: 900.0,
            max_frequency: 100.0,
            ..AmdfConfig::default()
        };
        assert!(Amdf::new(44100, 2048, inverted).is_err());
        assert!(Amdf::new(0, 2048, AmdfConfig::default()).is_err());
        // Window of 538 lags cannot fit in a 512-sample frame.
        assert!(Amdf::new(44100, 512, AmdfConfig::default()).is_err());
    }
}
