//! # Audio Capture Module
//!
//! This module handles the frames fed to the tuner and real-time audio
//! capture using CPAL (Cross-Platform Audio Library).
//!
//! ## Features
//! - Validated, immutable analysis frames
//! - Frame assembly from arbitrary-size, possibly multi-channel chunks
//! - Automatic audio device and format selection
//! - Non-blocking delivery: frames are dropped rather than queued when the
//!   analysis side falls behind

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Sender, TrySendError};

use crate::error::TunerError;

/// Preferred capture sample rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// A fixed-length block of mono samples, roughly in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> crate::error::Result<Self> {
        if sample_rate == 0 {
            return Err(TunerError::InvalidFrame("sample rate must be positive".into()));
        }
        if samples.is_empty() {
            return Err(TunerError::InvalidFrame("frame has no samples".into()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Frame duration in seconds.
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Accumulates interleaved audio chunks into complete mono frames.
///
/// Channels are averaged. With a hop equal to the frame size the emitted
/// frames are back to back; a smaller hop makes them overlap.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    frame_size: usize,
    hop_size: usize,
    channels: usize,
    sample_rate: u32,
    buffer: Vec<f32>,
    // Interleaved samples of an incomplete multi-channel frame.
    partial: Vec<f32>,
}

impl FrameAssembler {
    pub fn new(
        frame_size: usize,
        hop_size: usize,
        channels: usize,
        sample_rate: u32,
    ) -> crate::error::Result<Self> {
        if frame_size == 0 {
            return Err(TunerError::InvalidConfig("frame size must be positive".into()));
        }
        if hop_size == 0 || hop_size > frame_size {
            return Err(TunerError::InvalidConfig(format!(
                "hop size must be in 1..={frame_size}, got {hop_size}"
            )));
        }
        if channels == 0 {
            return Err(TunerError::InvalidConfig("channel count must be positive".into()));
        }
        if sample_rate == 0 {
            return Err(TunerError::InvalidConfig("sample rate must be positive".into()));
        }
        Ok(Self {
            frame_size,
            hop_size,
            channels,
            sample_rate,
            buffer: Vec::with_capacity(frame_size * 2),
            partial: Vec::with_capacity(channels),
        })
    }

    /// Appends one interleaved chunk and returns every frame it completes.
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<AudioFrame> {
        if self.channels == 1 {
            self.buffer.extend_from_slice(interleaved);
        } else {
            // Chunks need not end on a frame boundary; carry the tail over.
            self.partial.extend_from_slice(interleaved);
            let whole = self.partial.len() - self.partial.len() % self.channels;
            let channels = self.channels as f32;
            self.buffer.extend(
                self.partial[..whole]
                    .chunks_exact(self.channels)
                    .map(|chunk| chunk.iter().sum::<f32>() / channels),
            );
            self.partial.drain(..whole);
        }

        let mut frames = Vec::new();
        // While we have enough data for a full frame, process it.
        while self.buffer.len() >= self.frame_size {
            frames.push(AudioFrame {
                samples: self.buffer[..self.frame_size].to_vec(),
                sample_rate: self.sample_rate,
            });
            // Remove the consumed samples from the front of the buffer.
            self.buffer.drain(..self.hop_size);
        }
        frames
    }

    /// Samples waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks an f32 configuration with the fewest channels near 44.1 kHz
/// 3. Sets up a callback that assembles `frame_size` frames and sends them
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and sample rate
/// * `Err(e)` - Error if audio setup fails
pub fn start_audio_capture(
    frame_size: usize,
    sender: Sender<AudioFrame>,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("[AUDIO] Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let config: cpal::StreamConfig = config.into();

    log::info!("[AUDIO] Selected sample rate: {sample_rate} Hz, {channels} channel(s)");

    let mut assembler = FrameAssembler::new(frame_size, frame_size, channels, sample_rate)?;
    let err_fn = |err| log::error!("[AUDIO] An error occurred on the audio stream: {err}");

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            for frame in assembler.push(data) {
                // Never block the audio thread; a full channel drops the frame.
                match sender.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => log::warn!("[AUDIO] Analysis behind, frame dropped"),
                    Err(TrySendError::Disconnected(_)) => return,
                }
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only 32-bit float formats qualify. Fewer channels win, then the range
/// closest to the target rate.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_rate = c.min_sample_rate().0;
            let max_rate = c.max_sample_rate().0;
            let rate_distance = if (min_rate..=max_rate).contains(&target_rate) {
                0
            } else {
                min_rate.abs_diff(target_rate).min(max_rate.abs_diff(target_rate))
            };
            (c.channels(), rate_distance)
        })
}
