//! Block evaluation — walks classified statements, advancing the dual
//! beat/second clock and emitting events at loop-relative positions.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::theory::{build_scale, chord_to_midis, note_to_midi};

use super::context::{ActiveScale, Binding, EvalContext, ScopeExit};
use super::event::{assemble_note, assemble_sample, Event};
use super::statement::{classify, PlayTarget, Statement};

/// The outcome of evaluating one block body: its events (positioned
/// relative to the loop origin), its span on both clocks, and the state
/// that flows back to the enclosing scope.
#[derive(Debug, Clone)]
pub struct BlockResult {
    pub events: Vec<Event>,
    pub length_beats: f64,
    pub length_secs: f64,
    pub exit: ScopeExit,
}

/// Evaluate a block body in the given context.
///
/// Time is tracked scope-locally; emitted events carry absolute positions
/// (scope offset plus local time). Nested blocks evaluate in a fork of the
/// context, and their bindings and tick cursors are absorbed back.
pub fn eval_block(
    lines: &[String],
    loop_name: &str,
    mut ctx: EvalContext,
    rng: &mut ChaCha8Rng,
    warnings: &mut Vec<String>,
) -> BlockResult {
    let mut events: Vec<Event> = Vec::new();
    let mut time_beats = 0.0;
    let mut time_secs = 0.0;

    let mut i = 0;
    while i < lines.len() {
        let (stmt, next) = classify(lines, i);
        i = next;
        match stmt {
            Statement::Blank => {}
            Statement::UseBpm(bpm) => {
                if bpm > 0.0 {
                    ctx.bpm = bpm;
                }
            }
            Statement::UseSynth(name) => ctx.synth = Some(name),
            Statement::UseSynthDefaults(args) => {
                if let Some(d) = args.release.or(args.sustain) {
                    ctx.defaults.duration_beats = crate::theory::clamp_duration(d);
                }
                if let Some(amp) = args.amp {
                    ctx.defaults.velocity = crate::theory::velocity_from_amp(amp);
                }
            }
            Statement::SeqAssign { name, values } => {
                ctx.tick_cursors.remove(&name);
                ctx.bindings.insert(name, Binding::Sequence(values));
            }
            Statement::ScaleAssign {
                name,
                root,
                mode,
                octaves,
            } => {
                let notes = build_scale(&root, &mode, octaves);
                ctx.scale = Some(ActiveScale {
                    root: root.clone(),
                    notes: notes.clone(),
                });
                ctx.tick_cursors.remove(&name);
                ctx.bindings.insert(name, Binding::Sequence(notes));
            }
            Statement::RandAssign { name, low, high } => {
                let value = uniform_draw(rng, low, high);
                ctx.bindings.insert(name, Binding::Scalar(value));
            }
            Statement::TickAssign { target, source } => {
                if let Some(value) = ctx.next_tick(&source) {
                    ctx.bindings.insert(target, Binding::Scalar(value));
                }
            }
            Statement::Sleep(beats) => {
                time_beats += beats;
                time_secs += beats * 60.0 / ctx.bpm;
            }
            Statement::Repeat { count, body } => {
                for _ in 0..count {
                    let child = ctx.fork(
                        ctx.offset_beats + time_beats,
                        ctx.offset_sec + time_secs,
                    );
                    let sub = eval_block(&body, loop_name, child, rng, warnings);
                    events.extend(sub.events);
                    ctx.absorb(sub.exit);
                    time_beats += sub.length_beats;
                    time_secs += sub.length_secs;
                }
            }
            Statement::WithBpm { bpm, body } => {
                let child = ctx.fork_with_bpm(bpm.unwrap_or(ctx.bpm));
                let sub = eval_block(&body, loop_name, child, rng, warnings);
                let beat_off = ctx.offset_beats + time_beats;
                let sec_off = ctx.offset_sec + time_secs;
                events.extend(sub.events.iter().map(|e| e.shifted(beat_off, sec_off)));
                ctx.absorb(sub.exit);
                time_beats += sub.length_beats;
                time_secs += sub.length_secs;
            }
            Statement::OneIn { chance, body } => {
                if rng.gen_range(0..chance.max(1)) == 0 {
                    let child = ctx.fork(
                        ctx.offset_beats + time_beats,
                        ctx.offset_sec + time_secs,
                    );
                    let sub = eval_block(&body, loop_name, child, rng, warnings);
                    events.extend(sub.events);
                    ctx.absorb(sub.exit);
                    time_beats += sub.length_beats;
                    time_secs += sub.length_secs;
                }
            }
            Statement::Play { target, args } => {
                let pitches = resolve_play(&target, &mut ctx, rng);
                if let Some(event) =
                    assemble_note(pitches, loop_name, &ctx, time_beats, time_secs, &args)
                {
                    events.push(event.shifted(ctx.offset_beats, ctx.offset_sec));
                }
            }
            Statement::Sample { name, args } => {
                let event = assemble_sample(&name, loop_name, &ctx, time_beats, time_secs, &args);
                events.push(event.shifted(ctx.offset_beats, ctx.offset_sec));
            }
            Statement::Unrecognized(line) => {
                warnings.push(format!("skipped line in {loop_name}: \"{line}\""));
            }
        }
    }

    // A block is as long as its clock, or its latest-ending event if a
    // long release outlives the last sleep.
    let length_beats = events
        .iter()
        .map(|e| e.end_beat() - ctx.offset_beats)
        .fold(time_beats, f64::max);
    let length_secs = events
        .iter()
        .map(|e| e.end_sec() - ctx.offset_sec)
        .fold(time_secs, f64::max);

    BlockResult {
        events,
        length_beats,
        length_secs,
        exit: ctx.exit(),
    }
}

/// Resolve the pitch set a `play` statement refers to. An empty result
/// means nothing is scheduled.
fn resolve_play(target: &PlayTarget, ctx: &mut EvalContext, rng: &mut ChaCha8Rng) -> Vec<f64> {
    match target {
        PlayTarget::Chord { tonic, quality } => chord_to_midis(tonic, quality),
        PlayTarget::Tick(name) => ctx.next_tick(name).map(|v| vec![v]).unwrap_or_default(),
        PlayTarget::Choose(name) => vec![resolve_choose(name, ctx, rng)],
        PlayTarget::Name(name) => match ctx.bindings.get(name.as_str()) {
            Some(Binding::Scalar(value)) => vec![*value],
            Some(Binding::Sequence(values)) => values.clone(),
            None => name
                .parse::<f64>()
                .ok()
                .or_else(|| note_to_midi(name))
                .map(|v| vec![v])
                .unwrap_or_default(),
        },
    }
}

/// `.choose` picks a random element of the named sequence, falling back to
/// the active scale, then the scale's root, then a fixed low C.
fn resolve_choose(name: &str, ctx: &mut EvalContext, rng: &mut ChaCha8Rng) -> f64 {
    if let Some(Binding::Sequence(values)) = ctx.bindings.get(name) {
        if !values.is_empty() {
            return values[rng.gen_range(0..values.len())];
        }
    }
    if let Some(scale) = &ctx.scale {
        if !scale.notes.is_empty() {
            return scale.notes[rng.gen_range(0..scale.notes.len())];
        }
        if let Some(root) = note_to_midi(&scale.root) {
            return root;
        }
    }
    note_to_midi(":c2").unwrap_or(36.0)
}

/// One uniform draw over [low, high); swapped bounds are reordered and a
/// degenerate range collapses to its single value.
fn uniform_draw(rng: &mut ChaCha8Rng, low: f64, high: f64) -> f64 {
    let (lo, hi) = if low <= high { (low, high) } else { (high, low) };
    if lo == hi {
        lo
    } else {
        rng.gen_range(lo..hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;

    fn run(src: &str, bpm: f64) -> (BlockResult, Vec<String>) {
        let lines: Vec<String> = src.lines().map(String::from).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut warnings = Vec::new();
        let result = eval_block(&lines, "test", EvalContext::new(bpm), &mut rng, &mut warnings);
        (result, warnings)
    }

    #[test]
    fn sleep_advances_both_clocks() {
        let (result, _) = run("sleep 1\nsleep 0.5", 120.0);
        assert_approx_eq!(result.length_beats, 1.5);
        assert_approx_eq!(result.length_secs, 0.75);
    }

    #[test]
    fn play_schedules_at_current_time() {
        let (result, _) = run("sleep 1\nplay :e2, release: 0.25\nsleep 1", 60.0);
        assert_eq!(result.events.len(), 1);
        let e = &result.events[0];
        assert_approx_eq!(e.start_beat, 1.0);
        assert_approx_eq!(e.start_sec, 1.0);
        assert_eq!(e.pitches, vec![40.0]);
        assert_approx_eq!(result.length_beats, 2.0);
    }

    #[test]
    fn repeat_multiplies_body_span() {
        let (result, _) = run("4.times do\n  sample :drum_bass_hard\n  sleep 0.5\nend", 120.0);
        assert_eq!(result.events.len(), 4);
        assert_approx_eq!(result.length_beats, 2.0);
        let starts: Vec<f64> = result.events.iter().map(|e| e.start_beat).collect();
        assert_eq!(starts, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn use_bpm_changes_seconds_mid_block() {
        let (result, _) = run("sleep 1\nuse_bpm 120\nsleep 1", 60.0);
        assert_approx_eq!(result.length_beats, 2.0);
        assert_approx_eq!(result.length_secs, 1.5);
    }

    #[test]
    fn tempo_change_in_nested_scope_does_not_leak() {
        let (result, _) = run("1.times do\n  use_bpm 240\n  sleep 1\nend\nsleep 1", 60.0);
        // First beat at 240 BPM (0.25s), second at the outer 60 BPM (1s).
        assert_approx_eq!(result.length_secs, 1.25);
    }

    #[test]
    fn with_bpm_runs_body_at_its_own_tempo() {
        let (result, _) = run(
            "sleep 1\nwith_bpm 120 do\n  play :c4\n  sleep 1\nend",
            60.0,
        );
        assert_eq!(result.events.len(), 1);
        let e = &result.events[0];
        assert_approx_eq!(e.start_sec, 1.0);
        assert_eq!(e.bpm, 120.0);
        assert_approx_eq!(e.duration_sec, 0.5);
        assert_approx_eq!(result.length_secs, 1.5);
    }

    #[test]
    fn bindings_survive_nested_blocks() {
        let (result, _) = run(
            "melody = (ring :e2, :g2)\n2.times do\n  play melody.tick\n  sleep 1\nend",
            60.0,
        );
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[0].pitches, vec![40.0]);
        assert_eq!(result.events[1].pitches, vec![43.0]);
    }

    #[test]
    fn rand_assign_is_a_single_draw() {
        let (result, _) = run(
            "cutoff = rrand(60, 90)\n3.times do\n  play cutoff\n  sleep 1\nend",
            60.0,
        );
        assert_eq!(result.events.len(), 3);
        let first = result.events[0].pitches[0];
        assert!((60.0..90.0).contains(&first));
        assert!(result.events.iter().all(|e| e.pitches[0] == first));
    }

    #[test]
    fn one_in_one_always_fires() {
        let (result, _) = run("if one_in(1)\n  play :c4\nend", 60.0);
        assert_eq!(result.events.len(), 1);
    }

    #[test]
    fn choose_picks_from_the_bound_scale() {
        let (result, _) = run(
            "notes = (scale :e2, :minor_pentatonic, num_octaves: 2)\nplay notes.choose",
            60.0,
        );
        assert_eq!(result.events.len(), 1);
        let pitch = result.events[0].pitches[0];
        let scale = build_scale(":e2", ":minor_pentatonic", 2);
        assert!(scale.contains(&pitch));
    }

    #[test]
    fn chord_play_emits_all_pitches_in_one_event() {
        let (result, _) = run("play chord(:e3, :minor), release: 0.25", 60.0);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].pitches, vec![52.0, 55.0, 59.0]);
    }

    #[test]
    fn unknown_lines_become_warnings() {
        let (result, warnings) = run("cue :beat\nsleep 1", 60.0);
        assert!(result.events.is_empty());
        assert_eq!(warnings, vec!["skipped line in test: \"cue :beat\""]);
    }

    #[test]
    fn unresolvable_play_emits_nothing() {
        let (result, warnings) = run("play ghost.tick", 60.0);
        assert!(result.events.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn long_release_extends_block_length() {
        let (result, _) = run("play :c4, release: 4\nsleep 1", 60.0);
        assert_approx_eq!(result.length_beats, 4.0);
        assert_approx_eq!(result.length_secs, 4.0);
    }

    #[test]
    fn same_seed_reproduces_random_choices() {
        let src = "notes = (scale :e2, :minor_pentatonic)\n4.times do\n  play notes.choose\n  sleep 1\nend";
        let (a, _) = run(src, 60.0);
        let (b, _) = run(src, 60.0);
        let pa: Vec<f64> = a.events.iter().map(|e| e.pitches[0]).collect();
        let pb: Vec<f64> = b.events.iter().map(|e| e.pitches[0]).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn synth_defaults_apply_to_later_notes() {
        let (result, _) = run(
            "use_synth_defaults release: 0.3, amp: 0.6\nplay :c4",
            60.0,
        );
        let e = &result.events[0];
        assert_approx_eq!(e.duration_beats, 0.3);
        assert_approx_eq!(e.velocity, 0.8);
    }
}
