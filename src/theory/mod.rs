//! Music theory tables — pure, total functions with no state.

pub mod chord;
pub mod drum;
pub mod dynamics;
pub mod note;
pub mod scale;

pub use chord::chord_to_midis;
pub use drum::{map_sample_to_drum, DrumVoice};
pub use dynamics::{clamp_duration, velocity_from_amp};
pub use note::{normalize_symbol, note_to_midi};
pub use scale::build_scale;
