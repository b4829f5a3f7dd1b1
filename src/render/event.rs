//! Timed preview events and their assembly from play/sample statements.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::theory::{clamp_duration, map_sample_to_drum, velocity_from_amp};

use super::context::EvalContext;
use super::statement::NoteArgs;
use super::DEFAULT_DURATION_BEATS;

/// What produces the sound: a mapped drum voice, a raw sample, or a synth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentId {
    Drum(String),
    Sample(String),
    Synth(String),
}

impl InstrumentId {
    /// Synth instrument from the context, falling back to the default synth.
    pub fn synth_or_default(synth: Option<&str>) -> Self {
        InstrumentId::Synth(synth.unwrap_or("default").to_string())
    }

    pub fn is_percussion(&self) -> bool {
        matches!(self, InstrumentId::Drum(_))
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentId::Drum(id) => write!(f, "drum:{id}"),
            InstrumentId::Sample(name) => write!(f, "sample:{name}"),
            InstrumentId::Synth(name) => write!(f, "synth:{name}"),
        }
    }
}

impl Serialize for InstrumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One scheduled sound with dual beat/second timestamps.
///
/// `start_beat`/`start_sec` are relative to the script origin once the
/// event leaves the renderer; inside evaluation they are loop-local until
/// the scope offset is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub pitches: Vec<f64>,
    pub instrument: InstrumentId,
    pub is_percussion: bool,
    pub start_beat: f64,
    pub duration_beats: f64,
    pub start_sec: f64,
    pub duration_sec: f64,
    pub velocity: f64,
    pub loop_name: String,
    pub bpm: f64,
}

impl Event {
    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.duration_beats
    }

    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec
    }

    /// Shift both timestamps by a beat/second offset pair.
    pub fn shifted(&self, beats: f64, secs: f64) -> Event {
        let mut out = self.clone();
        out.start_beat += beats;
        out.start_sec += secs;
        out
    }
}

/// Build a synth note event at a scope-local time. Returns `None` when no
/// pitch resolved, in which case nothing is scheduled.
pub fn assemble_note(
    pitches: Vec<f64>,
    loop_name: &str,
    ctx: &EvalContext,
    time_beats: f64,
    time_sec: f64,
    args: &NoteArgs,
) -> Option<Event> {
    if pitches.is_empty() {
        return None;
    }
    let duration_beats = clamp_duration(
        args.release
            .or(args.sustain)
            .unwrap_or(ctx.defaults.duration_beats),
    );
    let velocity = args
        .amp
        .map(velocity_from_amp)
        .unwrap_or(ctx.defaults.velocity);
    Some(Event {
        pitches,
        instrument: InstrumentId::synth_or_default(ctx.synth.as_deref()),
        is_percussion: false,
        start_beat: time_beats,
        duration_beats,
        start_sec: time_sec,
        duration_sec: duration_beats * 60.0 / ctx.bpm,
        velocity,
        loop_name: loop_name.to_string(),
        bpm: ctx.bpm,
    })
}

/// Build a sample event. Mapped drum samples get their voice's preview
/// pitch and duration floor; unmapped samples play as middle C.
pub fn assemble_sample(
    name: &str,
    loop_name: &str,
    ctx: &EvalContext,
    time_beats: f64,
    time_sec: f64,
    args: &NoteArgs,
) -> Event {
    let base = clamp_duration(args.release.unwrap_or(DEFAULT_DURATION_BEATS));
    let (pitches, instrument, duration_beats) = match map_sample_to_drum(name) {
        Some(voice) => (
            vec![f64::from(voice.midi)],
            InstrumentId::Drum(voice.id.to_string()),
            base.max(voice.min_duration_beats()),
        ),
        None => (vec![60.0], InstrumentId::Sample(name.to_string()), base),
    };
    let velocity = args
        .amp
        .map(velocity_from_amp)
        .unwrap_or(ctx.defaults.velocity);
    let is_percussion = instrument.is_percussion();
    Event {
        pitches,
        instrument,
        is_percussion,
        start_beat: time_beats,
        duration_beats,
        start_sec: time_sec,
        duration_sec: duration_beats * 60.0 / ctx.bpm,
        velocity,
        loop_name: loop_name.to_string(),
        bpm: ctx.bpm,
    }
}
