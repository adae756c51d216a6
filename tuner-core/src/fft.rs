//! # Fast Fourier Transform (FFT) Module
//!
//! Magnitude spectra and spectral peak picking for frame reports. The pitch
//! estimators work in the lag domain; this module gives a second, independent
//! view of the strongest partial in a frame.
//!
//! ## Features
//! - High-performance FFT using RustFFT
//! - Hann windowing for reduced spectral leakage
//! - DC offset removal for accurate analysis
//! - Log-parabolic sub-bin refinement of the strongest bin

use rustfft::{FftPlanner, num_complex::Complex};

/// Removes the DC offset from a signal by making its average value zero.
fn remove_dc_offset(signal: &mut [f32]) {
    let len = signal.len();
    if len == 0 {
        return;
    }
    let avg = signal.iter().sum::<f32>() / len as f32;
    if avg.abs() > 1e-6 {
        for sample in signal.iter_mut() {
            *sample -= avg;
        }
    }
}

/// Applies a Hann window to the input buffer to reduce spectral leakage.
fn apply_hann_window(buffer: &mut [f32]) {
    let n = buffer.len();
    if n < 2 {
        return;
    }
    let n_minus_1 = (n - 1) as f32;
    for (i, sample) in buffer.iter_mut().enumerate() {
        let multiplier = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos());
        *sample *= multiplier;
    }
}

/// Magnitude spectrum of a frame, up to (not including) the Nyquist bin.
///
/// The signal is DC-corrected and Hann-windowed first. Bin `k` is centred at
/// `k * sample_rate / signal.len()` Hz.
pub fn magnitude_spectrum(signal: &[f32]) -> Vec<f32> {
    let len = signal.len();
    if len == 0 {
        return Vec::new();
    }

    let mut processed_signal = signal.to_vec();
    remove_dc_offset(&mut processed_signal);
    apply_hann_window(&mut processed_signal);

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(len);

    let mut buffer: Vec<Complex<f32>> = processed_signal
        .into_iter()
        .map(|sample| Complex { re: sample, im: 0.0 })
        .collect();

    fft.process(&mut buffer);
    buffer
        .iter()
        .take(len / 2)
        .map(|c| c.norm()) // .norm() is sqrt(re^2 + im^2)
        .collect()
}

/// Frequency of the strongest spectral bin, refined between bins.
///
/// `magnitudes` is the output of [`magnitude_spectrum`] for a frame of
/// `2 * magnitudes.len()` samples. The DC bin is ignored.
///
/// # Returns
/// * `Some(frequency)` - Peak frequency in Hz
/// * `None` - Empty or silent spectrum
pub fn dominant_frequency(magnitudes: &[f32], sample_rate: u32) -> Option<f32> {
    if magnitudes.len() < 3 || sample_rate == 0 {
        return None;
    }
    let buffer_size = magnitudes.len() * 2;

    let (peak_bin, &peak) = magnitudes
        .iter()
        .enumerate()
        .skip(1)
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    if !(peak > 0.0) {
        return None;
    }

    let bin_frequency = |bin: f32| bin * sample_rate as f32 / buffer_size as f32;
    if peak_bin >= magnitudes.len() - 1 {
        return Some(bin_frequency(peak_bin as f32));
    }

    let y1 = magnitudes[peak_bin - 1].ln();
    let y2 = magnitudes[peak_bin].ln();
    let y3 = magnitudes[peak_bin + 1].ln();

    if !y1.is_finite() || !y2.is_finite() || !y3.is_finite() {
        return Some(bin_frequency(peak_bin as f32));
    }

    let denominator = 2.0 * y2 - y1 - y3;
    if denominator.abs() < 1e-6 {
        return Some(bin_frequency(peak_bin as f32));
    }

    let peak_shift = (y3 - y1) / (2.0 * denominator);
    let final_freq = bin_frequency(peak_bin as f32 + peak_shift);

    if final_freq.is_finite() && final_freq > 0.0 {
        Some(final_freq)
    } else {
        Some(bin_frequency(peak_bin as f32))
    }
}
