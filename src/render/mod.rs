//! Script rendering — compiles a live-coding script into a deterministic
//! timeline of preview events.
//!
//! The pipeline runs in three stages: [`block`] splits the script into
//! `live_loop` blocks, [`eval`] walks each block's statements once to
//! produce a single cycle, and [`expand`] tiles that cycle across the
//! requested horizon. Randomness is drawn from one seedable generator so
//! the same script and seed always produce the same timeline.

pub mod block;
pub mod context;
pub mod eval;
pub mod event;
pub mod expand;
pub mod statement;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use self::context::EvalContext;
use self::eval::eval_block;
use self::expand::expand_loop;
pub use self::event::{Event, InstrumentId};

/// Tempo assumed when the script never sets one.
pub const DEFAULT_BPM: f64 = 60.0;
/// Preview horizons are measured in four-beat bars.
pub const BEATS_PER_BAR: f64 = 4.0;
pub const DEFAULT_BARS: u32 = 4;
pub const MAX_BARS: u32 = 64;
/// Note length when neither the statement nor the defaults specify one.
pub const DEFAULT_DURATION_BEATS: f64 = 1.0;
pub const DEFAULT_VELOCITY: f64 = 0.8;

/// Caller-facing knobs for one render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Preview length in bars, clamped to [1, MAX_BARS].
    pub bars: u32,
    /// Overrides the script's `use_bpm`; non-positive values are ignored.
    pub bpm_override: Option<f64>,
    /// Seeds the random generator for reproducible previews.
    pub seed: Option<u64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            bars: DEFAULT_BARS,
            bpm_override: None,
            seed: None,
        }
    }
}

/// A rendered preview: the effective tempo, the event timeline sorted by
/// beat, and any lines the renderer skipped.
#[derive(Debug, Clone, Serialize)]
pub struct RenderResult {
    pub bpm: f64,
    pub events: Vec<Event>,
    pub warnings: Vec<String>,
    pub target_beats: f64,
    pub target_secs: f64,
}

/// Render a script into a timed event preview.
///
/// Every `live_loop` evaluates against a fresh context seeded with the
/// effective tempo, so a `bpm_override` rescales the whole timeline. A
/// script without loops renders as a single implicit pass over its lines.
pub fn render_script(source: &str, options: &RenderOptions) -> RenderResult {
    let bars = options.bars.clamp(1, MAX_BARS);
    let script_bpm = extract_global_bpm(source);
    let bpm = options
        .bpm_override
        .filter(|b| *b > 0.0)
        .unwrap_or(script_bpm);

    let target_beats = f64::from(bars) * BEATS_PER_BAR;
    let target_secs = target_beats * 60.0 / bpm;

    let mut rng = match options.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let mut loops = block::split_live_loops(source);
    if loops.is_empty() {
        loops.push(block::NamedBlock {
            name: "main".to_string(),
            body: block::script_lines(source),
        });
    }

    let mut events = Vec::new();
    let mut warnings = Vec::new();
    for named in &loops {
        let cycle = eval_block(
            &named.body,
            &named.name,
            EvalContext::new(bpm),
            &mut rng,
            &mut warnings,
        );
        events.extend(expand_loop(&cycle, bpm, target_secs));
    }

    events.retain(|e| e.start_sec < target_secs);
    events.sort_by(|a, b| a.start_beat.total_cmp(&b.start_beat));

    RenderResult {
        bpm,
        events,
        warnings,
        target_beats,
        target_secs,
    }
}

/// First valid top-level `use_bpm` in the script, before any loop bodies
/// override it locally.
fn extract_global_bpm(source: &str) -> f64 {
    for line in block::script_lines(source) {
        let code = block::code_text(&line);
        let trimmed = code.trim();
        if let Some(rest) = trimmed.strip_prefix("use_bpm") {
            if rest.starts_with(char::is_whitespace) {
                if let Ok(bpm) = rest.trim().parse::<f64>() {
                    if bpm > 0.0 {
                        return bpm;
                    }
                }
            }
        }
    }
    DEFAULT_BPM
}
