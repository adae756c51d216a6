//! # Smoothing Filter Module
//!
//! A scalar Kalman filter for stabilizing the per-frame cents reading.
//! The state model is a constant value disturbed by process noise `Q` and
//! observed through measurement noise `R`.

use crate::config::FilterConfig;
use crate::error::Result;

/// Running estimate and error covariance of one filter instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    pub estimate: f32,
    pub covariance: f32,
}

/// Scalar recursive filter. One instance belongs to one tuning session and
/// must be fed by a single caller, one measurement per frame.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    process_noise: f32,
    measurement_noise: f32,
    state: Option<FilterState>,
}

impl KalmanFilter {
    pub fn new(config: &FilterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            process_noise: config.process_noise,
            measurement_noise: config.measurement_noise,
            state: None,
        })
    }

    /// Blends one measurement into the running estimate and returns it.
    ///
    /// The first measurement after construction or [`reset`](Self::reset)
    /// seeds the estimate directly, with covariance equal to `R`.
    pub fn filter(&mut self, measurement: f32) -> f32 {
        let next = match self.state {
            None => FilterState {
                estimate: measurement,
                covariance: self.measurement_noise,
            },
            Some(FilterState {
                estimate,
                covariance,
            }) => {
                // Predict
                let predicted_covariance = covariance + self.process_noise;
                // Update
                let gain = predicted_covariance / (predicted_covariance + self.measurement_noise);
                FilterState {
                    estimate: estimate + gain * (measurement - estimate),
                    covariance: (1.0 - gain) * predicted_covariance,
                }
            }
        };
        self.state = Some(next);
        next.estimate
    }

    /// Current state, or `None` before the first measurement.
    pub fn state(&self) -> Option<FilterState> {
        self.state
    }

    /// Latest smoothed value, if any.
    pub fn estimate(&self) -> Option<f32> {
        self.state.map(|s| s.estimate)
    }

    /// Forgets all history; the next measurement seeds the filter again.
    pub fn reset(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(q: f32, r: f32) -> KalmanFilter {
        KalmanFilter::new(&FilterConfig {
            process_noise: q,
            measurement_noise: r,
        })
        .unwrap()
    }

    #[test]
    fn test_first_measurement_seeds_estimate() {
        let mut kf = filter(0.05, 1.0);
        assert_eq!(kf.estimate(), None);
        assert_eq!(kf.filter(12.5), 12.5);
        assert_eq!(
            kf.state(),
            Some(FilterState {
                estimate: 12.5,
                covariance: 1.0
            })
        );
    }

    #[test]
    fn test_constant_input_stays_constant() {
        let mut kf = filter(0.05, 1.0);
        for _ in 0..50 {
            assert_eq!(kf.filter(-7.0), -7.0);
        }
    }

    #[test]
    fn test_step_converges_without_overshoot() {
        let mut kf = filter(0.05, 1.0);
        kf.filter(0.0);
        let mut previous = 0.0;
        for _ in 0..40 {
            let value = kf.filter(10.0);
            assert!(value >= previous, "estimate must approach monotonically");
            assert!(value <= 10.0, "estimate must not overshoot");
            previous = value;
        }
        assert!((previous - 10.0).abs() < 0.1, "converged to {previous}");
    }

    #[test]
    fn test_covariance_settles_to_steady_state() {
        let (q, r) = (0.05_f32, 1.0_f32);
        let mut kf = filter(q, r);
        for _ in 0..200 {
            kf.filter(1.0);
        }
        // Riccati fixed point for the predicted covariance.
        let predicted = (q + (q * q + 4.0 * q * r).sqrt()) / 2.0;
        let expected = predicted * r / (predicted + r);
        let covariance = kf.state().unwrap().covariance;
        assert!((covariance - expected).abs() < 1e-4);
    }

    #[test]
    fn test_noisy_measurements_are_damped() {
        let mut kf = filter(0.01, 4.0);
        let readings = [3.0, -3.0, 3.0, -3.0, 3.0, -3.0, 3.0, -3.0, 3.0, -3.0];
        let mut last = 0.0;
        for reading in readings {
            last = kf.filter(reading);
        }
        assert!(last.abs() < 1.5, "alternating noise should be damped, got {last}");
    }

    #[test]
    fn test_reset_reseeds() {
        let mut kf = filter(0.05, 1.0);
        kf.filter(5.0);
        kf.filter(6.0);
        kf.reset();
        assert_eq!(kf.state(), None);
        assert_eq!(kf.filter(-20.0), -20.0);
    }

    #[test]
    fn test_invalid_noise_is_rejected() {
        assert!(
            KalmanFilter::new(&FilterConfig {
                process_noise: -1.0,
                measurement_noise: 1.0
            })
            .is_err()
        );
    }
}
