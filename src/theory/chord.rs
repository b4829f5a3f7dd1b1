//! Chord quality tables — expand a tonic + quality into a MIDI pitch list.

use super::note::{normalize_symbol, note_to_midi};

/// Interval set for a chord quality name.
///
/// Quality names are case-sensitive ("M7" is major-seventh, "m7" is
/// minor-seventh). Unknown qualities fall back to the major triad.
pub fn chord_intervals(quality: &str) -> &'static [i32] {
    match quality {
        "m" | "minor" => &[0, 3, 7],
        "m7" => &[0, 3, 7, 10],
        "7" | "dom7" => &[0, 4, 7, 10],
        "major7" | "M7" => &[0, 4, 7, 11],
        "sus2" => &[0, 2, 7],
        "sus4" => &[0, 5, 7],
        "6" => &[0, 4, 7, 9],
        "m6" => &[0, 3, 7, 9],
        "9" => &[0, 4, 7, 10, 14],
        "m9" => &[0, 3, 7, 10, 14],
        "maj9" => &[0, 4, 7, 11, 14],
        "add9" => &[0, 4, 7, 14],
        "11" => &[0, 4, 7, 10, 14, 17],
        "13" => &[0, 4, 7, 10, 14, 21],
        "dim" => &[0, 3, 6],
        "dim7" => &[0, 3, 6, 9],
        "aug" => &[0, 4, 8],
        // "major" and anything unrecognized
        _ => &[0, 4, 7],
    }
}

/// Expand `chord(tonic, quality)` into MIDI pitches.
///
/// An unparsable tonic yields an empty list.
pub fn chord_to_midis(tonic: &str, quality: &str) -> Vec<f64> {
    let Some(root) = note_to_midi(tonic) else {
        return Vec::new();
    };
    let quality = normalize_symbol(quality).trim_matches(|c| c == '\'' || c == '"');
    chord_intervals(quality)
        .iter()
        .map(|interval| root + *interval as f64)
        .collect()
}
