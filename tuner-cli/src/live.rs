//! Live tuning from the default input device.
//!
//! Frames arrive from the capture callback over a bounded channel. When the
//! analysis falls behind, stale frames are skipped so the display always shows
//! the newest reading.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use cpal::traits::StreamTrait;
use crossbeam_channel::Receiver;
use tuner_core::{AnalysisResult, AudioFrame, Session, TunerConfig, audio};

/// Frames buffered between the audio callback and the analysis loop.
const FRAME_QUEUE_DEPTH: usize = 4;

pub fn run(config: TunerConfig) -> Result<()> {
    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<AudioFrame>(FRAME_QUEUE_DEPTH);
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .context("installing Ctrl-C handler")?;

    let (stream, sample_rate) = audio::start_audio_capture(config.frame_size, frame_tx)
        .context("starting audio capture")?;

    // The device decides the rate; everything else comes from the configuration.
    let config = TunerConfig {
        sample_rate,
        ..config
    };
    let mut session = Session::new(&config)?;
    log::info!("[LIVE] Listening. Press Ctrl-C to stop.");

    let mut stdout = io::stdout();
    loop {
        crossbeam_channel::select! {
            recv(frame_rx) -> msg => match msg {
                Ok(frame) => {
                    let (frame, skipped) = newest_frame(frame, &frame_rx);
                    if skipped > 0 {
                        log::debug!("[LIVE] Skipped {skipped} stale frame(s)");
                    }
                    let line = match session.process(&frame) {
                        Ok(Some(result)) => Some(format_reading(&result)),
                        Ok(None) => Some(format_idle()),
                        Err(e) => {
                            log::warn!("[LIVE] Frame rejected: {e}");
                            None
                        }
                    };
                    if let Some(line) = line {
                        write!(stdout, "\r{line}")?;
                        stdout.flush()?;
                    }
                }
                Err(_) => {
                    log::warn!("[LIVE] Audio channel closed");
                    break;
                }
            },
            recv(shutdown_rx) -> _ => {
                log::info!("[LIVE] Received shutdown signal");
                break;
            },
        }
    }

    writeln!(stdout)?;
    if let Err(e) = stream.pause() {
        log::warn!("[LIVE] Error pausing stream: {e}");
    }
    // Give the stream a moment to fully stop
    std::thread::sleep(Duration::from_millis(50));
    drop(stream);
    log::info!(
        "[LIVE] Stopped after {} frames",
        session.frames_processed()
    );
    Ok(())
}

/// Drains the queue and keeps only the most recent frame.
fn newest_frame(first: AudioFrame, receiver: &Receiver<AudioFrame>) -> (AudioFrame, usize) {
    let mut newest = first;
    let mut skipped = 0;
    while let Ok(frame) = receiver.try_recv() {
        newest = frame;
        skipped += 1;
    }
    (newest, skipped)
}

pub fn format_reading(result: &AnalysisResult) -> String {
    format!(
        "{:<2} {:>8.2} Hz  raw {:>+6.1} cents  smoothed {:>+6.1} cents",
        result.note_name, result.detected_frequency, result.cents_deviation, result.smoothed_cents
    )
}

fn format_idle() -> String {
    format!("{:<2} {:>8} Hz  {:<40}", "-", "---", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_frame_skips_backlog() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        for i in 1..=3 {
            tx.send(AudioFrame::new(vec![i as f32; 4], 8000).unwrap()).unwrap();
        }
        let first = AudioFrame::new(vec![0.0; 4], 8000).unwrap();
        let (frame, skipped) = newest_frame(first, &rx);
        assert_eq!(skipped, 3);
        assert_eq!(frame.samples(), &[3.0; 4]);
    }

    #[test]
    fn test_reading_line_shows_signed_cents() {
        let result = AnalysisResult {
            detected_frequency: 442.0,
            note_index: 57,
            note_name: "A",
            target_frequency: 440.0,
            cents_deviation: 7.85,
            smoothed_cents: -1.2,
        };
        let line = format_reading(&result);
        assert!(line.starts_with("A "));
        assert!(line.contains("442.00 Hz"));
        assert!(line.contains("+7.8") || line.contains("+7.9"));
        assert!(line.contains("-1.2"));
    }
}
