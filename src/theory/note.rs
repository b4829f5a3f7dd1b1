//! Note symbol parsing — converts ":e2", "fs3" or "Bb4" to MIDI numbers.

/// Octave assumed when a note symbol omits one (":c" → C4).
pub const DEFAULT_OCTAVE: i32 = 4;

/// Strip a leading `:` and surrounding whitespace from a Sonic Pi symbol.
pub fn normalize_symbol(input: &str) -> &str {
    input.trim().trim_start_matches(':').trim()
}

/// Parse a note symbol into a MIDI number at the default octave.
///
/// Format: `[:]<letter><accidental?><octave?>` where the accidental accepts
/// the spellings `#`, `s`, `sh`, `sharp` (sharp) and `b`, `fl`, `flat`
/// (flat). Returns `None` for unrecognized letters or spellings that do not
/// name a pitch class (e.g. "es", "ff").
pub fn note_to_midi(symbol: &str) -> Option<f64> {
    note_to_midi_with_octave(symbol, DEFAULT_OCTAVE)
}

/// Same as [`note_to_midi`] with an explicit fallback octave.
pub fn note_to_midi_with_octave(symbol: &str, default_octave: i32) -> Option<f64> {
    let clean = normalize_symbol(symbol).to_ascii_lowercase();
    let letter = clean.chars().next()?;
    if !letter.is_ascii_lowercase() || !('a'..='g').contains(&letter) {
        return None;
    }

    // Longest accidental spelling first, so "sharp" wins over "s".
    let rest = &clean[1..];
    let (accidental, rest) = if let Some(r) = rest.strip_prefix("sharp") {
        ('s', r)
    } else if let Some(r) = rest.strip_prefix("flat") {
        ('f', r)
    } else if let Some(r) = rest.strip_prefix("sh") {
        ('s', r)
    } else if let Some(r) = rest.strip_prefix("fl") {
        ('f', r)
    } else if let Some(r) = rest.strip_prefix('#') {
        ('s', r)
    } else if let Some(r) = rest.strip_prefix('s') {
        ('s', r)
    } else if let Some(r) = rest.strip_prefix('b') {
        ('f', r)
    } else {
        (' ', rest)
    };

    let octave: i32 = if rest.is_empty() {
        default_octave
    } else if rest.chars().all(|c| c.is_ascii_digit()) {
        rest.parse().ok()?
    } else {
        return None;
    };

    let semitone = pitch_class(letter, accidental)?;
    Some((12 * (octave + 1) + semitone) as f64)
}

/// Semitone of a (letter, accidental) pair within the octave. Enharmonic
/// spellings (cs/df, ds/ef, ...) share semitones; spellings that do not name
/// a pitch class (es, bs, cf, ff) are rejected.
fn pitch_class(letter: char, accidental: char) -> Option<i32> {
    let semitone = match (letter, accidental) {
        ('c', ' ') => 0,
        ('c', 's') | ('d', 'f') => 1,
        ('d', ' ') => 2,
        ('d', 's') | ('e', 'f') => 3,
        ('e', ' ') => 4,
        ('f', ' ') => 5,
        ('f', 's') | ('g', 'f') => 6,
        ('g', ' ') => 7,
        ('g', 's') | ('a', 'f') => 8,
        ('a', ' ') => 9,
        ('a', 's') | ('b', 'f') => 10,
        ('b', ' ') => 11,
        _ => return None,
    };
    Some(semitone)
}
