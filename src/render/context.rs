//! Evaluation context — the mutable state a block body evaluates against.
//!
//! Nested blocks run in a fork of their parent context. Tempo, synth,
//! defaults and the active scale are scope-local and die with the fork;
//! variable bindings and tick cursors survive, carried back explicitly
//! through a [`ScopeExit`].

use std::collections::HashMap;

use super::{DEFAULT_DURATION_BEATS, DEFAULT_VELOCITY};

/// A bound variable: either a single value or a pitch sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Scalar(f64),
    Sequence(Vec<f64>),
}

/// Per-scope note defaults, updated by `use_synth_defaults`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Defaults {
    pub velocity: f64,
    pub duration_beats: f64,
}

impl Default for Defaults {
    fn default() -> Self {
        Defaults {
            velocity: DEFAULT_VELOCITY,
            duration_beats: DEFAULT_DURATION_BEATS,
        }
    }
}

/// The scale currently bound by a `(scale …)` assignment, kept alongside
/// its root for `.choose` fallback resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveScale {
    pub root: String,
    pub notes: Vec<f64>,
}

/// State threaded through the evaluation of one block body.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub bpm: f64,
    pub synth: Option<String>,
    pub defaults: Defaults,
    pub scale: Option<ActiveScale>,
    pub bindings: HashMap<String, Binding>,
    pub tick_cursors: HashMap<String, usize>,
    /// Start of this scope relative to the loop origin, in beats.
    pub offset_beats: f64,
    /// Start of this scope relative to the loop origin, in seconds.
    pub offset_sec: f64,
}

impl EvalContext {
    pub fn new(bpm: f64) -> Self {
        EvalContext {
            bpm,
            synth: None,
            defaults: Defaults::default(),
            scale: None,
            bindings: HashMap::new(),
            tick_cursors: HashMap::new(),
            offset_beats: 0.0,
            offset_sec: 0.0,
        }
    }

    /// Fork for a nested block starting at the given absolute position.
    pub fn fork(&self, offset_beats: f64, offset_sec: f64) -> Self {
        let mut child = self.clone();
        child.offset_beats = offset_beats;
        child.offset_sec = offset_sec;
        child
    }

    /// Fork for a `with_bpm` block. The child runs at the new tempo with a
    /// fresh time origin; the caller re-anchors returned events.
    pub fn fork_with_bpm(&self, bpm: f64) -> Self {
        let mut child = self.clone();
        child.bpm = bpm;
        child.offset_beats = 0.0;
        child.offset_sec = 0.0;
        child
    }

    /// Carry bindings and tick cursors back from a finished child scope.
    pub fn absorb(&mut self, exit: ScopeExit) {
        self.bindings = exit.bindings;
        self.tick_cursors = exit.tick_cursors;
    }

    /// Read the next value of a sequence binding round-robin, advancing
    /// its cursor. `None` if the name is unbound, scalar, or empty.
    pub fn next_tick(&mut self, name: &str) -> Option<f64> {
        let seq = match self.bindings.get(name) {
            Some(Binding::Sequence(values)) if !values.is_empty() => values,
            _ => return None,
        };
        let index = self.tick_cursors.get(name).copied().unwrap_or(0);
        let value = seq[index % seq.len()];
        let next = (index + 1) % seq.len();
        self.tick_cursors.insert(name.to_string(), next);
        Some(value)
    }

    /// Snapshot the state that outlives this scope.
    pub fn exit(self) -> ScopeExit {
        ScopeExit {
            bindings: self.bindings,
            tick_cursors: self.tick_cursors,
        }
    }
}

/// The portion of a child scope's state that flows back to its parent.
#[derive(Debug, Clone, Default)]
pub struct ScopeExit {
    pub bindings: HashMap<String, Binding>,
    pub tick_cursors: HashMap<String, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_wraps_around_the_sequence() {
        let mut ctx = EvalContext::new(120.0);
        ctx.bindings.insert(
            "melody".into(),
            Binding::Sequence(vec![40.0, 43.0, 45.0]),
        );
        let picks: Vec<f64> = (0..5).filter_map(|_| ctx.next_tick("melody")).collect();
        assert_eq!(picks, vec![40.0, 43.0, 45.0, 40.0, 43.0]);
    }

    #[test]
    fn tick_on_unbound_or_scalar_names_is_none() {
        let mut ctx = EvalContext::new(120.0);
        assert_eq!(ctx.next_tick("nothing"), None);
        ctx.bindings.insert("x".into(), Binding::Scalar(60.0));
        assert_eq!(ctx.next_tick("x"), None);
        ctx.bindings.insert("empty".into(), Binding::Sequence(vec![]));
        assert_eq!(ctx.next_tick("empty"), None);
    }

    #[test]
    fn fork_keeps_scope_local_state_isolated() {
        let mut parent = EvalContext::new(90.0);
        parent.synth = Some("fm".into());
        let mut child = parent.fork(4.0, 2.0);
        child.bpm = 180.0;
        child.synth = Some("tb303".into());
        child.bindings.insert("n".into(), Binding::Scalar(50.0));
        let exit = child.exit();
        parent.absorb(exit);
        // Tempo and synth are unchanged; bindings came back.
        assert_eq!(parent.bpm, 90.0);
        assert_eq!(parent.synth.as_deref(), Some("fm"));
        assert_eq!(parent.bindings.get("n"), Some(&Binding::Scalar(50.0)));
    }

    #[test]
    fn fork_with_bpm_resets_time_origin() {
        let mut parent = EvalContext::new(60.0);
        parent.offset_beats = 8.0;
        parent.offset_sec = 8.0;
        let child = parent.fork_with_bpm(120.0);
        assert_eq!(child.bpm, 120.0);
        assert_eq!(child.offset_beats, 0.0);
        assert_eq!(child.offset_sec, 0.0);
    }

    #[test]
    fn tick_cursor_survives_absorb() {
        let mut ctx = EvalContext::new(120.0);
        ctx.bindings
            .insert("m".into(), Binding::Sequence(vec![1.0, 2.0]));
        let mut child = ctx.fork(0.0, 0.0);
        assert_eq!(child.next_tick("m"), Some(1.0));
        ctx.absorb(child.exit());
        assert_eq!(ctx.next_tick("m"), Some(2.0));
    }
}
