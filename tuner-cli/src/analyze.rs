//! Offline analysis of WAV files.
//!
//! The file is cut into frames exactly as the live path would deliver them and
//! fed through one session, so the smoothing behaves the same as when tuning
//! live.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tuner_core::{AnalysisResult, FrameAssembler, Session, TunerConfig, fft};

use crate::live::format_reading;

/// Decoded WAV contents: interleaved samples scaled to [-1, 1].
#[derive(Debug, Clone)]
pub struct WavData {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

/// One analysed frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub index: usize,
    pub time_seconds: f32,
    pub result: Option<AnalysisResult>,
    pub spectral_peak: Option<f32>,
}

/// Whole-file summary over the frames that had a pitch.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub frames: usize,
    pub voiced_frames: usize,
    pub median_frequency: Option<f32>,
    pub most_common_note: Option<&'static str>,
}

/// Load a WAV file, keeping integer and float formats.
pub fn load_wav(path: &Path) -> Result<WavData> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("opening WAV file {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    if spec.channels == 0 {
        bail!("WAV file {} declares zero channels", path.display());
    }
    log::info!(
        "[ANALYZE] {}: {} Hz, {} channel(s), {} samples",
        path.display(),
        spec.sample_rate,
        spec.channels,
        samples.len()
    );

    Ok(WavData {
        samples,
        channels: spec.channels as usize,
        sample_rate: spec.sample_rate,
    })
}

/// Runs every complete frame of `wav` through `session`.
pub fn analyze_samples(
    session: &mut Session,
    wav: &WavData,
    hop: usize,
    with_spectrum: bool,
) -> Result<Vec<FrameReport>> {
    let mut assembler =
        FrameAssembler::new(session.frame_size(), hop, wav.channels, wav.sample_rate)?;

    let mut reports = Vec::new();
    for (index, frame) in assembler.push(&wav.samples).into_iter().enumerate() {
        let result = session.process(&frame)?;
        let spectral_peak = if with_spectrum {
            fft::dominant_frequency(&fft::magnitude_spectrum(frame.samples()), wav.sample_rate)
        } else {
            None
        };
        reports.push(FrameReport {
            index,
            time_seconds: (index * hop) as f32 / wav.sample_rate as f32,
            result,
            spectral_peak,
        });
    }
    Ok(reports)
}

pub fn summarize(reports: &[FrameReport]) -> Summary {
    let voiced: Vec<&AnalysisResult> = reports.iter().filter_map(|r| r.result.as_ref()).collect();

    let mut frequencies: Vec<f32> = voiced.iter().map(|r| r.detected_frequency).collect();
    frequencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_frequency = match frequencies.len() {
        0 => None,
        n if n % 2 == 1 => Some(frequencies[n / 2]),
        n => Some((frequencies[n / 2 - 1] + frequencies[n / 2]) / 2.0),
    };

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for result in &voiced {
        *counts.entry(result.note_name).or_default() += 1;
    }
    let most_common_note = counts
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .map(|(name, _)| name);

    Summary {
        frames: reports.len(),
        voiced_frames: voiced.len(),
        median_frequency,
        most_common_note,
    }
}

pub fn run(path: &Path, config: TunerConfig, hop: Option<usize>, with_spectrum: bool) -> Result<()> {
    let wav = load_wav(path)?;
    let config = TunerConfig {
        sample_rate: wav.sample_rate,
        ..config
    };
    let mut session = Session::new(&config)?;
    let hop = hop.unwrap_or(config.frame_size);
    log::info!(
        "[ANALYZE] {} over {}-sample frames, hop {hop}",
        session.estimator().algorithm(),
        session.frame_size()
    );

    let reports = analyze_samples(&mut session, &wav, hop, with_spectrum)?;
    for report in &reports {
        let reading = match &report.result {
            Some(result) => format_reading(result),
            None => "-".to_string(),
        };
        match report.spectral_peak {
            Some(peak) => println!(
                "{:>5} {:>8.3}s  {reading}  peak {peak:>8.2} Hz",
                report.index, report.time_seconds
            ),
            None => println!("{:>5} {:>8.3}s  {reading}", report.index, report.time_seconds),
        }
    }

    let summary = summarize(&reports);
    println!(
        "{} frames, {} with pitch, median {}, most common note {}",
        summary.frames,
        summary.voiced_frames,
        summary
            .median_frequency
            .map_or_else(|| "-".to_string(), |f| format!("{f:.2} Hz")),
        summary.most_common_note.unwrap_or("-")
    );
    Ok(())
}
