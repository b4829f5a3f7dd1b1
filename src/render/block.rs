//! Block extraction — depth-balanced scanning of `do … end` constructs.
//!
//! The same scan serves two jobs: pulling top-level `live_loop` blocks out
//! of a script, and collecting the body of any nested construct
//! (`N.times do`, `with_bpm … do`, `if one_in(…)`). Depth tracking operates
//! on a comment- and string-stripped view of each line, so keywords inside
//! `#` comments or quoted strings never change depth.

/// A top-level named `live_loop` block.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedBlock {
    pub name: String,
    pub body: Vec<String>,
}

/// Split a script into newline-separated lines, normalizing CRLF.
pub fn script_lines(source: &str) -> Vec<String> {
    source.replace("\r\n", "\n").split('\n').map(String::from).collect()
}

/// Extract every top-level `live_loop :name do … end` block, in order.
pub fn split_live_loops(source: &str) -> Vec<NamedBlock> {
    let lines = script_lines(source);
    let mut loops = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let code = code_text(&lines[i]);
        match parse_live_loop_header(code.trim()) {
            Some(name) => {
                let (body, next) = collect_block(&lines, i + 1);
                loops.push(NamedBlock { name, body });
                i = next;
            }
            None => i += 1,
        }
    }
    loops
}

/// Collect the body of a block whose opener was the line before `start`.
///
/// Depth starts at 1; block-opening lines increment it, bare `end` lines
/// decrement it. Returns the body lines and the index just past the
/// closing `end` (or past the last line if the block never closes).
pub fn collect_block(lines: &[String], start: usize) -> (Vec<String>, usize) {
    let mut body = Vec::new();
    let mut depth = 1u32;
    let mut i = start;
    while i < lines.len() {
        let code = code_text(&lines[i]);
        if opens_block(&code) {
            depth += 1;
        }
        if closes_block(&code) {
            depth -= 1;
            if depth == 0 {
                return (body, i + 1);
            }
        }
        body.push(lines[i].clone());
        i += 1;
    }
    (body, i)
}

/// Strip the contents of quoted strings and a trailing `#` comment from a
/// line, keeping everything that matters for keyword matching. A `#` only
/// starts a comment at the beginning of the line or after whitespace, so
/// sharp note spellings like `chord(:c#4, ...)` survive.
pub fn code_text(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    for ch in line.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                    out.push(ch);
                }
            }
            None => match ch {
                '#' if prev.map_or(true, char::is_whitespace) => break,
                '"' | '\'' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                _ => out.push(ch),
            },
        }
        prev = Some(ch);
    }
    out
}

/// Does this (comment-stripped) line open a nested block?
/// `do` anywhere as a word, or a line-leading `if`.
pub fn opens_block(code: &str) -> bool {
    if contains_word(code, "do") {
        return true;
    }
    let trimmed = code.trim_start();
    trimmed == "if" || trimmed.starts_with("if ") || trimmed.starts_with("if(")
}

/// Does this (comment-stripped) line close a block? A bare leading `end`.
pub fn closes_block(code: &str) -> bool {
    let trimmed = code.trim_start();
    trimmed == "end"
        || trimmed
            .strip_prefix("end")
            .is_some_and(|rest| rest.starts_with(|c: char| !is_word_char(c)))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn contains_word(text: &str, word: &str) -> bool {
    let mut search_from = 0;
    while let Some(pos) = text[search_from..].find(word) {
        let at = search_from + pos;
        let before_ok = at == 0
            || !text[..at]
                .chars()
                .next_back()
                .is_some_and(is_word_char);
        let after = at + word.len();
        let after_ok = after >= text.len()
            || !text[after..].chars().next().is_some_and(is_word_char);
        if before_ok && after_ok {
            return true;
        }
        search_from = at + 1;
    }
    false
}

/// Parse `live_loop :name do` headers, tolerating trailing text.
fn parse_live_loop_header(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "live_loop" {
        return None;
    }
    let name = tokens.next()?.strip_prefix(':')?;
    if name.is_empty() || !name.chars().all(is_word_char) {
        return None;
    }
    if tokens.next()? != "do" {
        return None;
    }
    Some(name.to_string())
}
