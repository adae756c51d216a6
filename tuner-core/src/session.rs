//! # Tuning Session Module
//!
//! A session owns one pitch estimator and one smoothing filter and turns
//! frames into readings: frame -> estimator -> nearest note and raw cents ->
//! filter -> smoothed cents.

use crate::AnalysisResult;
use crate::audio::AudioFrame;
use crate::config::TunerConfig;
use crate::error::{Result, TunerError};
use crate::filter::KalmanFilter;
use crate::pitch::{PitchEstimator, build_estimator};
use crate::tuning;

/// One tuning session. Not shared across threads; feed it from one producer.
#[derive(Debug)]
pub struct Session {
    estimator: Box<dyn PitchEstimator>,
    filter: KalmanFilter,
    frame_size: usize,
    sample_rate: u32,
    frames_processed: u64,
    latest: Option<AnalysisResult>,
}

impl Session {
    /// Validates `config` and builds the configured estimator and filter.
    pub fn new(config: &TunerConfig) -> Result<Self> {
        config.validate()?;
        let estimator = build_estimator(config)?;
        let filter = KalmanFilter::new(&config.filter)?;
        log::info!(
            "[SESSION] Started with {} ({} samples at {} Hz)",
            config.algorithm,
            config.frame_size,
            config.sample_rate
        );
        Ok(Self {
            estimator,
            filter,
            frame_size: config.frame_size,
            sample_rate: config.sample_rate,
            frames_processed: 0,
            latest: None,
        })
    }

    /// Analyses one frame.
    ///
    /// # Returns
    /// * `Ok(Some(result))` - A pitch was found; the filter advanced one step
    /// * `Ok(None)` - No pitch in this frame; the filter is left untouched
    /// * `Err(FrameMismatch)` - Frame length or rate differ from the configuration
    pub fn process(&mut self, frame: &AudioFrame) -> Result<Option<AnalysisResult>> {
        if frame.len() != self.frame_size || frame.sample_rate() != self.sample_rate {
            return Err(TunerError::FrameMismatch {
                expected_len: self.frame_size,
                actual_len: frame.len(),
                expected_rate: self.sample_rate,
                actual_rate: frame.sample_rate(),
            });
        }
        self.frames_processed += 1;

        let Some(frequency) = self.estimator.estimate(frame.samples()) else {
            return Ok(None);
        };

        let note = tuning::find_nearest_note(frequency);
        let cents_deviation = tuning::cents(note.frequency, frequency);
        let smoothed_cents = self.filter.filter(cents_deviation);

        let result = AnalysisResult {
            detected_frequency: frequency,
            note_index: note.index,
            note_name: note.name,
            target_frequency: note.frequency,
            cents_deviation,
            smoothed_cents,
        };
        log::debug!(
            "[SESSION] {:.2} Hz -> {} ({:+.1} cents, smoothed {:+.1})",
            frequency,
            note.name,
            cents_deviation,
            smoothed_cents
        );
        self.latest = Some(result.clone());
        Ok(Some(result))
    }

    /// Most recent successful reading.
    pub fn latest(&self) -> Option<&AnalysisResult> {
        self.latest.as_ref()
    }

    /// Frames accepted so far, with or without a pitch.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn estimator(&self) -> &dyn PitchEstimator {
        self.estimator.as_ref()
    }

    /// Starts over: clears the filter state and the latest reading.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.latest = None;
        self.frames_processed = 0;
    }
}
