//! # Musical Tuning Module
//!
//! Pure conversions between frequencies, equal-tempered note indices, note
//! names and cent deviations.
//!
//! ## Conventions
//! - Twelve-tone equal temperament with A = 440 Hz at note index 57
//!   (index 0 is the C four octaves and nine semitones below it)
//! - Note names repeat every 12 indices; no octave number is attached
//! - Cents are measured from a reference to a measured frequency:
//!   positive values mean the measured frequency is sharp

/// Reference frequency in Hz.
pub const REFERENCE_FREQUENCY: f32 = 440.0;

/// Note index of the reference frequency.
pub const REFERENCE_INDEX: i32 = 57;

/// Chromatic note names, starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A note of the equal-tempered scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// Signed index relative to the reference (57 = A 440 Hz).
    pub index: i32,
    /// Chromatic name, e.g. "A" or "C#".
    pub name: &'static str,
    /// Exact equal-tempered frequency in Hz.
    pub frequency: f32,
}

impl Note {
    pub fn from_index(index: i32) -> Self {
        Self {
            index,
            name: note_name(index),
            frequency: note_frequency(index),
        }
    }
}

/// Index of the equal-tempered note nearest to `frequency`.
///
/// `frequency` must be positive and finite.
pub fn note_index(frequency: f32) -> i32 {
    let semitones = 12.0 * (frequency / REFERENCE_FREQUENCY).log2();
    semitones.round() as i32 + REFERENCE_INDEX
}

/// Equal-tempered frequency of a note index, in Hz.
pub fn note_frequency(index: i32) -> f32 {
    REFERENCE_FREQUENCY * 2.0_f32.powf((index - REFERENCE_INDEX) as f32 / 12.0)
}

/// Chromatic name of a note index. Negative indices wrap like positive ones.
pub fn note_name(index: i32) -> &'static str {
    NOTE_NAMES[index.rem_euclid(12) as usize]
}

/// Finds the closest musical note to a given frequency.
pub fn find_nearest_note(frequency: f32) -> Note {
    Note::from_index(note_index(frequency))
}

/// Pitch distance from `reference` to `measured`, in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values mean `measured` is sharp of `reference`
pub fn cents(reference: f32, measured: f32) -> f32 {
    1200.0 * (measured / reference).log2()
}
