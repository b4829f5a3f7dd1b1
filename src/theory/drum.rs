//! Sample-name → percussion voice mapping.
//!
//! Sonic Pi drum samples (":drum_bass_hard", ":drum_cymbal_closed", ...)
//! map onto a small set of General-MIDI-pitched percussion voices so that
//! preview consumers can render them without the actual sample library.

/// A percussion voice with a fixed preview pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrumVoice {
    pub id: &'static str,
    pub midi: u8,
}

impl DrumVoice {
    /// Minimum playable duration in beats. Cymbal and snare envelopes get
    /// audibly truncated below these floors.
    pub fn min_duration_beats(&self) -> f64 {
        match self.id {
            "hat_open" | "cymbal" | "ride" => 0.5,
            "hat_closed" | "snare" | "clap" => 0.2,
            _ => 0.1,
        }
    }
}

const fn voice(id: &'static str, midi: u8) -> DrumVoice {
    DrumVoice { id, midi }
}

/// Map a sample name (leading `:` already stripped) to a drum voice.
/// Unknown samples return `None` and are played as plain samples.
pub fn map_sample_to_drum(name: &str) -> Option<DrumVoice> {
    // Specific cymbal names must win over the generic crash.
    if name.contains("cymbal_closed") || name.contains("cymbal_pedal") {
        return Some(voice("hat_closed", 42));
    }
    if name.contains("cymbal_open") {
        return Some(voice("hat_open", 46));
    }
    if name.contains("ride") {
        return Some(voice("ride", 51));
    }
    if name.contains("cymbal") || name.contains("splash") {
        return Some(voice("cymbal", 49));
    }
    if name.contains("snare") || name.starts_with("sn_") {
        return Some(voice("snare", 38));
    }
    if name.contains("clap") || name.contains("snap") {
        return Some(voice("clap", 39));
    }
    if name.contains("drum_bass") || name.starts_with("bd_") || name.contains("kick") {
        return Some(voice("kick", 36));
    }
    if name.contains("tom_lo") {
        return Some(voice("tom_low", 45));
    }
    if name.contains("tom_mid") {
        return Some(voice("tom_mid", 47));
    }
    if name.contains("tom_hi") {
        return Some(voice("tom_high", 50));
    }
    if name.contains("cowbell") {
        return Some(voice("cowbell", 56));
    }
    None
}
