//! Synthetic signals shared by the integration tests.

use std::f32::consts::PI;

pub const SAMPLE_RATE: u32 = 44100;

pub fn sine(frequency: f32, len: usize, amplitude: f32) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

/// A decaying string tone: six harmonics at 1/n amplitude, higher ones dying faster.
pub fn plucked_string(frequency: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let tone: f32 = (1..=6)
                .map(|n| {
                    let n = n as f32;
                    (2.0 * PI * n * frequency * t).sin() * (-t * n / 1.5).exp() / n
                })
                .sum();
            0.4 * tone
        })
        .collect()
}

pub fn assert_within_one_percent(detected: f32, expected: f32) {
    let tolerance = (expected * 0.01).max(1.0);
    assert!(
        (detected - expected).abs() <= tolerance,
        "expected {expected:.2} Hz (±{tolerance:.2}), got {detected:.2} Hz"
    );
}
