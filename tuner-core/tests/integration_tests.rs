//! End-to-end tests: synthetic frames through estimators and sessions.

mod common;

use common::*;
use tuner_core::{
    Algorithm, AudioFrame, FrameAssembler, Session, TunerConfig, build_estimator, tuning,
};

fn config(algorithm: Algorithm, frame_size: usize) -> TunerConfig {
    TunerConfig {
        algorithm,
        frame_size,
        ..TunerConfig::default()
    }
}

#[test]
fn test_autocorrelation_detects_plucked_guitar_strings() {
    // Fundamentals of the reference guitar recordings; the B string there
    // sounded at ~249 Hz rather than the nominal 246.94 Hz.
    let cases = [(82.41, 82.0), (110.0, 110.0), (146.83, 147.0), (249.0, 249.0)];
    let estimator = build_estimator(&config(Algorithm::NormalizedAutocorrelation, 16384)).unwrap();

    for (fundamental, expected) in cases {
        let window = plucked_string(fundamental, 16384);
        let detected = estimator
            .estimate(&window)
            .unwrap_or_else(|| panic!("no pitch for {fundamental} Hz"));
        assert_eq!(detected.round(), expected, "string at {fundamental} Hz read {detected}");
    }
}

#[test]
fn test_every_estimator_tracks_plucked_strings() {
    for algorithm in Algorithm::ALL {
        let estimator = build_estimator(&config(algorithm, 4096)).unwrap();
        for fundamental in [110.0, 196.0, 329.63] {
            let window = plucked_string(fundamental, 4096);
            let detected = estimator
                .estimate(&window)
                .unwrap_or_else(|| panic!("{algorithm} found no pitch at {fundamental} Hz"));
            assert_within_one_percent(detected, fundamental);
        }
    }
}

#[test]
fn test_every_estimator_tracks_pure_sines() {
    for algorithm in Algorithm::ALL {
        let estimator = build_estimator(&config(algorithm, 2048)).unwrap();
        for frequency in [110.0, 220.0, 440.0] {
            let detected = estimator
                .estimate(&sine(frequency, 2048, 0.5))
                .unwrap_or_else(|| panic!("{algorithm} found no pitch at {frequency} Hz"));
            assert_within_one_percent(detected, frequency);
        }
    }
}

#[test]
fn test_silence_yields_no_estimate_anywhere() {
    let silent = vec![0.0_f32; 4096];
    let hiss: Vec<f32> = (0..4096).map(|i| if i % 2 == 0 { 1e-4 } else { -1e-4 }).collect();
    for algorithm in Algorithm::ALL {
        let estimator = build_estimator(&config(algorithm, 4096)).unwrap();
        assert_eq!(estimator.estimate(&silent), None, "{algorithm}");
        assert_eq!(estimator.estimate(&hiss), None, "{algorithm}");
    }
}

#[test]
fn test_streamed_tone_settles_on_one_note() {
    let mut session = Session::new(&TunerConfig::default()).unwrap();
    let mut assembler = FrameAssembler::new(2048, 2048, 1, SAMPLE_RATE).unwrap();
    // One second of an A that is 10 cents sharp, delivered in small callback chunks.
    let frequency = tuning::note_frequency(57) * 2.0_f32.powf(10.0 / 1200.0);
    let audio = sine(frequency, SAMPLE_RATE as usize, 0.5);

    let mut readings = Vec::new();
    for chunk in audio.chunks(128) {
        for frame in assembler.push(chunk) {
            if let Some(result) = session.process(&frame).unwrap() {
                readings.push(result);
            }
        }
    }

    assert_eq!(readings.len(), 21);
    assert!(readings.iter().all(|r| r.note_name == "A" && r.note_index == 57));
    let last = session.latest().unwrap();
    assert!((last.smoothed_cents - 10.0).abs() < 1.5, "smoothed {}", last.smoothed_cents);
}

#[test]
fn test_session_per_algorithm_reports_note_and_cents() {
    // D4 tuned 20 cents flat.
    let target = tuning::note_frequency(50);
    let played = target * 2.0_f32.powf(-20.0 / 1200.0);
    for algorithm in Algorithm::ALL {
        let mut session = Session::new(&config(algorithm, 4096)).unwrap();
        let frame = AudioFrame::new(plucked_string(played, 4096), SAMPLE_RATE).unwrap();
        let result = session.process(&frame).unwrap().unwrap();
        assert_eq!(result.note_name, "D", "{algorithm}");
        assert_eq!(result.note_index, 50, "{algorithm}");
        assert!(result.cents_deviation < 0.0, "{algorithm}: {result:?}");
    }
}

#[test]
fn test_sessions_are_independent() {
    let mut first = Session::new(&TunerConfig::default()).unwrap();
    let mut second = Session::new(&TunerConfig::default()).unwrap();
    let sharp = AudioFrame::new(sine(445.0, 2048, 0.5), SAMPLE_RATE).unwrap();
    let flat = AudioFrame::new(sine(435.0, 2048, 0.5), SAMPLE_RATE).unwrap();

    first.process(&sharp).unwrap();
    second.process(&flat).unwrap();
    let a = first.process(&sharp).unwrap().unwrap();
    let b = second.process(&flat).unwrap().unwrap();
    assert!(a.smoothed_cents > 0.0);
    assert!(b.smoothed_cents < 0.0);
}
