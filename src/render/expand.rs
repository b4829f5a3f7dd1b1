//! Loop horizon expansion — repeating one evaluated cycle until it covers
//! the requested preview window.

use super::eval::BlockResult;
use super::event::Event;
use super::BEATS_PER_BAR;

/// Tile one loop cycle across the preview horizon.
///
/// A degenerate cycle (no sleeps, no events with duration) would repeat
/// forever at instant zero, so it is widened to one bar. Repetitions are
/// scheduled until the cycle start passes `target_secs`; events starting
/// at or beyond the horizon are dropped.
pub fn expand_loop(cycle: &BlockResult, bpm: f64, target_secs: f64) -> Vec<Event> {
    let span_beats = if cycle.length_beats > 0.0 {
        cycle.length_beats
    } else {
        BEATS_PER_BAR
    };
    let span_secs = if cycle.length_secs > 0.0 {
        cycle.length_secs
    } else {
        span_beats * 60.0 / bpm
    };

    let iterations = (target_secs / span_secs).ceil().max(1.0) as u64;
    let mut out = Vec::with_capacity(cycle.events.len() * iterations as usize);
    for n in 0..iterations {
        let beat_off = span_beats * n as f64;
        let sec_off = span_secs * n as f64;
        for event in &cycle.events {
            let shifted = event.shifted(beat_off, sec_off);
            if shifted.start_sec < target_secs {
                out.push(shifted);
            }
        }
    }
    out
}
