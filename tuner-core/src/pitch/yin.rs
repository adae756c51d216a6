//! YIN pitch estimator.
//!
//! Based on *YIN, a fundamental frequency estimator for speech and music*
//! (de Cheveigné & Kawahara, 2002): difference function, cumulative mean
//! normalization, absolute threshold and parabolic interpolation.

use crate::config::{Algorithm, YinConfig, validate_sample_rate};
use crate::error::Result;

use super::{PitchEstimator, frequency_from_period, parabolic_offset, rms};

#[derive(Debug, Clone)]
pub struct Yin {
    sample_rate: u32,
    config: YinConfig,
}

impl Yin {
    pub fn new(sample_rate: u32, frame_size: usize, config: YinConfig) -> Result<Self> {
        validate_sample_rate(sample_rate)?;
        config.validate(frame_size)?;
        Ok(Self {
            sample_rate,
            config,
        })
    }

    /// Length of the difference buffer for a frame of `frame_len` samples:
    /// half of the largest power of two that fits in the frame.
    pub fn buffer_len(frame_len: usize) -> usize {
        if frame_len == 0 {
            return 0;
        }
        (1_usize << (usize::BITS - 1 - frame_len.leading_zeros())) / 2
    }

    /// Computes the cumulative mean normalized difference d'(tau).
    fn normalized_difference(signal: &[f32], buffer_len: usize) -> Vec<f32> {
        let mut yin_buffer = vec![0.0_f32; buffer_len];

        // --- Step 1 & 2: Difference function and squared difference ---
        for tau in 1..buffer_len {
            let mut diff = 0.0;
            for i in 0..buffer_len {
                let delta = signal[i] - signal[i + tau];
                diff += delta * delta;
            }
            yin_buffer[tau] = diff;
        }

        // --- Step 3: Cumulative mean normalized difference ---
        let mut running_sum = 0.0;
        yin_buffer[0] = 1.0;
        for tau in 1..buffer_len {
            running_sum += yin_buffer[tau];
            if running_sum > 0.0 {
                yin_buffer[tau] *= tau as f32 / running_sum;
            } else {
                yin_buffer[tau] = 1.0;
            }
        }
        yin_buffer[1] = 1.0;
        yin_buffer
    }

    /// Parabolic refinement of `tau`; at the buffer edges the smaller of the
    /// two available values wins.
    fn refine(yin_buffer: &[f32], tau: usize) -> f32 {
        let x0 = if tau < 1 { tau } else { tau - 1 };
        let x2 = if tau + 1 < yin_buffer.len() { tau + 1 } else { tau };

        if x0 == tau {
            if yin_buffer[tau] <= yin_buffer[x2] { tau as f32 } else { x2 as f32 }
        } else if x2 == tau {
            if yin_buffer[tau] <= yin_buffer[x0] { tau as f32 } else { x0 as f32 }
        } else {
            match parabolic_offset(yin_buffer[x0], yin_buffer[tau], yin_buffer[x2]) {
                Some(shift) => tau as f32 + shift,
                None => tau as f32,
            }
        }
    }
}

impl PitchEstimator for Yin {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Yin
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn estimate(&self, signal: &[f32]) -> Option<f32> {
        let buffer_len = Self::buffer_len(signal.len());
        if buffer_len < 4 {
            return None;
        }

        // --- Noise Gate: Calculate RMS to filter out silence/noise ---
        if rms(&signal[..2 * buffer_len]) < self.config.noise_floor {
            log::debug!("[YIN] Frame below noise floor");
            return None;
        }

        let yin_buffer = Self::normalized_difference(signal, buffer_len);

        // --- Step 4: Absolute threshold, then descend to the local minimum ---
        let mut period = None;
        for tau in 2..buffer_len {
            if yin_buffer[tau] < self.config.threshold {
                let mut tau = tau;
                while tau + 1 < buffer_len && yin_buffer[tau + 1] < yin_buffer[tau] {
                    tau += 1;
                }
                period = Some(tau);
                break;
            }
        }
        let Some(tau) = period else {
            log::debug!("[YIN] No dip below threshold {}", self.config.threshold);
            return None;
        };

        // --- Step 5: Clarity check to reject weak periodicity ---
        let probability = 1.0 - yin_buffer[tau];
        if probability < self.config.probability_threshold {
            log::debug!("[YIN] Periodicity {probability:.3} below probability threshold");
            return None;
        }

        // --- Step 6: Parabolic interpolation for better precision ---
        let refined = Self::refine(&yin_buffer, tau);
        log::debug!("[YIN] tau {tau} refined to {refined:.3} (probability {probability:.3})");
        frequency_from_period(self.sample_rate, refined)
    }
}
