//! Line classifier — turns raw script lines into a closed set of statements.
//!
//! Classification is deliberately separate from evaluation: this module
//! decides what a line *means*, `eval` decides how time and state evolve.
//! Multi-line list literals and nested block bodies are consumed here, so
//! the evaluator only ever sees whole statements.

use crate::theory::{chord_to_midis, note_to_midi, normalize_symbol};

use super::block;

/// Inline `key: value` arguments on play/sample/defaults lines.
/// Only the keys the renderer honors are retained.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NoteArgs {
    pub amp: Option<f64>,
    pub release: Option<f64>,
    pub sustain: Option<f64>,
}

/// Pitch source of a `play` statement, resolved against the context at
/// evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayTarget {
    /// Inline `chord(tonic, quality)` expression.
    Chord { tonic: String, quality: String },
    /// Round-robin read: `play melody.tick`.
    Tick(String),
    /// Random scale degree: `play notes.choose`.
    Choose(String),
    /// A bound variable if one exists, otherwise a note symbol.
    Name(String),
}

/// One classified statement of a block body.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Blank line or comment; no effect.
    Blank,
    UseBpm(f64),
    UseSynth(String),
    UseSynthDefaults(NoteArgs),
    /// `x = (ring …)` or `x = [ … ]`, chords flattened into the sequence.
    SeqAssign { name: String, values: Vec<f64> },
    /// `x = (scale :root, :mode, num_octaves: n)`.
    ScaleAssign {
        name: String,
        root: String,
        mode: String,
        octaves: u32,
    },
    /// `x = rrand(low, high)` — a single uniform draw.
    RandAssign { name: String, low: f64, high: f64 },
    /// `x = y.tick` — round-robin read that advances y's cursor.
    TickAssign { target: String, source: String },
    /// `n.times do … end`.
    Repeat { count: u32, body: Vec<String> },
    /// `with_bpm n do … end`; `None` keeps the current tempo.
    WithBpm { bpm: Option<f64>, body: Vec<String> },
    /// `if one_in(n) … end` — included with probability 1/n.
    OneIn { chance: u32, body: Vec<String> },
    Sleep(f64),
    Play { target: PlayTarget, args: NoteArgs },
    Sample { name: String, args: NoteArgs },
    /// Anything the subset does not understand; reported as a warning.
    Unrecognized(String),
}

/// Classify the line at `index`, returning the statement and the index of
/// the next unconsumed line. Multi-line constructs (list literals, nested
/// blocks) consume everything they span.
pub fn classify(lines: &[String], index: usize) -> (Statement, usize) {
    let raw = lines[index].trim();
    if raw.is_empty() || raw.starts_with('#') {
        return (Statement::Blank, index + 1);
    }
    let line = block::code_text(raw);
    let line = line.trim();

    if let Some(stmt) = parse_use_synth_defaults(line)
        .or_else(|| parse_use_bpm(line))
        .or_else(|| parse_use_synth(line))
        .or_else(|| parse_scale_assign(line))
        .or_else(|| parse_rand_assign(line))
        .or_else(|| parse_tick_assign(line))
        .or_else(|| parse_sleep(line))
        .or_else(|| parse_play(line))
        .or_else(|| parse_sample(line))
    {
        return (stmt, index + 1);
    }

    if let Some((name, close, remainder)) = parse_seq_open(line) {
        return classify_seq(lines, index, name, close, remainder);
    }

    if let Some(count) = parse_times_header(line) {
        let (body, next) = block::collect_block(lines, index + 1);
        return (Statement::Repeat { count, body }, next);
    }
    if let Some(bpm) = parse_with_bpm_header(line) {
        let (body, next) = block::collect_block(lines, index + 1);
        return (Statement::WithBpm { bpm, body }, next);
    }
    if let Some(chance) = parse_one_in_header(line) {
        let (body, next) = block::collect_block(lines, index + 1);
        return (Statement::OneIn { chance, body }, next);
    }

    (Statement::Unrecognized(raw.to_string()), index + 1)
}

fn parse_use_bpm(line: &str) -> Option<Statement> {
    let rest = strip_keyword(line, "use_bpm")?;
    rest.parse::<f64>().ok().map(Statement::UseBpm)
}

fn parse_use_synth(line: &str) -> Option<Statement> {
    let rest = strip_keyword(line, "use_synth")?;
    let name = normalize_symbol(rest.split_whitespace().next()?);
    if name.is_empty() || !name.chars().all(is_word_char) {
        return None;
    }
    Some(Statement::UseSynth(name.to_string()))
}

fn parse_use_synth_defaults(line: &str) -> Option<Statement> {
    let rest = strip_keyword(line, "use_synth_defaults")?;
    Some(Statement::UseSynthDefaults(parse_key_args(rest)))
}

fn parse_sleep(line: &str) -> Option<Statement> {
    let rest = strip_keyword(line, "sleep")?;
    let beats = rest.split_whitespace().next()?.parse::<f64>().ok()?;
    // Negative sleeps would move time backward; reject so they surface
    // as warnings instead.
    (beats.is_finite() && beats >= 0.0).then_some(Statement::Sleep(beats))
}

fn parse_scale_assign(line: &str) -> Option<Statement> {
    let (name, rhs) = split_assignment(line)?;
    let rest = rhs.strip_prefix("(scale")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let inner = rest.split(')').next().unwrap_or(rest).trim();
    let mut parts = inner.split(',').map(str::trim);
    let root = parts.next().filter(|r| !r.is_empty())?.to_string();
    let mode = parts.next().filter(|m| !m.is_empty())?.to_string();
    let octaves = parts
        .find_map(|p| p.strip_prefix("num_octaves:"))
        .and_then(|n| n.trim().parse::<u32>().ok())
        .unwrap_or(1);
    Some(Statement::ScaleAssign {
        name,
        root,
        mode,
        octaves,
    })
}

fn parse_rand_assign(line: &str) -> Option<Statement> {
    let (name, rhs) = split_assignment(line)?;
    let inner = rhs.strip_prefix("rrand(")?.split(')').next()?;
    let (low_str, high_str) = inner.split_once(',')?;
    // Unparsable bounds fall back: low to 0, high to low.
    let low = low_str.trim().parse::<f64>().unwrap_or(0.0);
    let high = high_str.trim().parse::<f64>().unwrap_or(low);
    Some(Statement::RandAssign { name, low, high })
}

fn parse_tick_assign(line: &str) -> Option<Statement> {
    let (target, rhs) = split_assignment(line)?;
    let (source, rest) = rhs.split_once('.')?;
    if !is_ident(source) {
        return None;
    }
    let rest = rest.trim_end();
    if rest != "tick" && !rest.starts_with("tick ") {
        return None;
    }
    Some(Statement::TickAssign {
        target,
        source: source.to_string(),
    })
}

fn parse_times_header(line: &str) -> Option<u32> {
    let (count, rest) = line.split_once(".times")?;
    let count = count.trim().parse::<u32>().ok()?;
    let rest = rest.trim_start();
    (rest == "do" || rest.starts_with("do ")).then_some(count)
}

fn parse_with_bpm_header(line: &str) -> Option<Option<f64>> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "with_bpm" {
        return None;
    }
    let value = tokens.next()?;
    if tokens.next()? != "do" {
        return None;
    }
    Some(value.parse::<f64>().ok().filter(|b| *b > 0.0))
}

fn parse_one_in_header(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("if")?.trim_start();
    let inner = rest.strip_prefix("one_in(")?.split(')').next()?;
    inner.trim().parse::<u32>().ok()
}

fn parse_play(line: &str) -> Option<Statement> {
    let rest = strip_keyword(line, "play")?;

    if let Some(at) = rest.find("chord(") {
        let inner_start = at + "chord(".len();
        let close = rest[inner_start..].find(')')? + inner_start;
        let mut parts = rest[inner_start..close].split(',').map(str::trim);
        let tonic = parts.next()?.to_string();
        let quality = parts.next().unwrap_or("major").to_string();
        let args = parse_key_args(&rest[close + 1..]);
        return Some(Statement::Play {
            target: PlayTarget::Chord { tonic, quality },
            args,
        });
    }

    let token: String = rest
        .chars()
        .take_while(|c| is_word_char(*c) || matches!(c, ':' | '#' | '.'))
        .collect();
    if token.is_empty() {
        return None;
    }
    let args = parse_key_args(&rest[token.len()..]);
    let target = if let Some(base) = token.strip_suffix(".tick") {
        PlayTarget::Tick(base.to_string())
    } else if let Some(base) = token.strip_suffix(".choose") {
        PlayTarget::Choose(base.to_string())
    } else {
        PlayTarget::Name(token)
    };
    Some(Statement::Play { target, args })
}

fn parse_sample(line: &str) -> Option<Statement> {
    let rest = strip_keyword(line, "sample")?;
    let token: String = rest
        .chars()
        .take_while(|c| is_word_char(*c) || *c == ':')
        .collect();
    if token.is_empty() {
        return None;
    }
    let args = parse_key_args(&rest[token.len()..]);
    Some(Statement::Sample {
        name: normalize_symbol(&token).to_string(),
        args,
    })
}

/// Detect the opening of a `(ring …)` or `[…]` sequence assignment.
/// Returns the binding name, the closing delimiter, and the remainder of
/// the opening line.
fn parse_seq_open(line: &str) -> Option<(String, char, String)> {
    let (name, rhs) = split_assignment(line)?;
    if let Some(rest) = rhs.strip_prefix("(ring") {
        if rest.starts_with(char::is_whitespace) {
            return Some((name, ')', rest.trim_start().to_string()));
        }
        return None;
    }
    rhs.strip_prefix('[')
        .map(|rest| (name, ']', rest.to_string()))
}

/// Accumulate continuation lines until the closing delimiter appears, then
/// parse the item list.
fn classify_seq(
    lines: &[String],
    index: usize,
    name: String,
    close: char,
    mut remainder: String,
) -> (Statement, usize) {
    let mut i = index;
    while !remainder.contains(close) && i + 1 < lines.len() {
        i += 1;
        remainder.push(' ');
        remainder.push_str(block::code_text(lines[i].trim()).trim());
    }
    let cleaned = remainder
        .trim_end()
        .strip_suffix(close)
        .unwrap_or(remainder.trim_end());
    let values = parse_list_values(cleaned);
    (Statement::SeqAssign { name, values }, i + 1)
}

/// Resolve a comma-separated item list into pitches: note symbols, literal
/// numbers, or `chord(tonic, quality)` expansions flattened in place.
/// Unresolvable items are dropped.
fn parse_list_values(list: &str) -> Vec<f64> {
    let mut values = Vec::new();
    for token in split_top_level(list) {
        if let Some(inner) = token
            .strip_prefix("chord(")
            .and_then(|t| t.strip_suffix(')'))
        {
            let mut parts = inner.split(',').map(str::trim);
            let Some(tonic) = parts.next() else { continue };
            let quality = parts.next().unwrap_or("major");
            values.extend(chord_to_midis(tonic, quality));
        } else if let Ok(num) = token.parse::<f64>() {
            values.push(num);
        } else if let Some(midi) = note_to_midi(&token) {
            values.push(midi);
        }
    }
    values
}

/// Split a list on commas that are not nested inside parentheses.
fn split_top_level(list: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0u32;
    for ch in list.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                if !current.trim().is_empty() {
                    items.push(current.trim().to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }
    items
}

/// Parse `key: value` pairs from an argument tail, keeping the keys the
/// renderer honors. Unknown keys and unparsable values are ignored.
pub fn parse_key_args(tail: &str) -> NoteArgs {
    let mut args = NoteArgs::default();
    for part in tail.split(',') {
        let Some((key, value)) = part.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || !key.chars().all(is_word_char) {
            continue;
        }
        let Ok(num) = value.trim().parse::<f64>() else {
            continue;
        };
        match key {
            "amp" => args.amp = Some(num),
            "release" => args.release = Some(num),
            "sustain" => args.sustain = Some(num),
            _ => {}
        }
    }
    args
}

/// Strip a leading keyword followed by whitespace; `use_synth` must not
/// match `use_synth_defaults`.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim_start())
}

/// Split `name = rhs` where name is a plain identifier.
fn split_assignment(line: &str) -> Option<(String, &str)> {
    let (lhs, rhs) = line.split_once('=')?;
    let name = lhs.trim();
    if !is_ident(name) {
        return None;
    }
    Some((name.to_string(), rhs.trim_start()))
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(is_word_char)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
