//! Scale mode tables and scale generation.

use super::note::{normalize_symbol, note_to_midi};

/// Interval set for a scale mode name. Unknown modes fall back to the
/// minor pentatonic.
pub fn scale_intervals(mode: &str) -> &'static [i32] {
    match mode {
        "major_pentatonic" => &[0, 2, 4, 7, 9],
        "minor" => &[0, 2, 3, 5, 7, 8, 10],
        "major" => &[0, 2, 4, 5, 7, 9, 11],
        // "minor_pentatonic" and anything unrecognized
        _ => &[0, 3, 5, 7, 10],
    }
}

/// Build an ascending note sequence for a scale: the mode's degrees
/// relative to the root, repeated over `octaves` octaves (at least one),
/// each offset by 12 semitones. An unparsable root yields an empty list.
pub fn build_scale(root: &str, mode: &str, octaves: u32) -> Vec<f64> {
    let Some(root) = note_to_midi(root) else {
        return Vec::new();
    };
    let intervals = scale_intervals(normalize_symbol(mode));
    let mut notes = Vec::with_capacity(intervals.len() * octaves.max(1) as usize);
    for octave in 0..octaves.max(1) {
        let base = root + (octave * 12) as f64;
        notes.extend(intervals.iter().map(|interval| base + *interval as f64));
    }
    notes
}
