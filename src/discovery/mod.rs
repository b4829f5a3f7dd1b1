//! Server discovery — locating a running Sonic Pi server by reading the
//! log files it writes on startup.
//!
//! v4 servers log their OSC port and auth token in `spider.log`; v3
//! servers log a plain listen port in `server-output.log` and accept a
//! string client id instead of a token. Both are tried, newest protocol
//! first.

use std::fs;
use std::path::{Path, PathBuf};

/// Everything needed to address a running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub port: u16,
    /// v4+ auth token; absent on v3.
    pub token: Option<i32>,
    pub version: String,
    pub protocol_major: u8,
}

/// Default Sonic Pi log directory for the current user.
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sonic-pi").join("log"))
}

/// Discover a running server from its log directory, preferring a v4
/// `spider.log` over a v3 `server-output.log`. `None` when neither log
/// yields a usable port.
pub fn discover(log_dir: Option<&Path>) -> Option<ConnectionParams> {
    let dir = match log_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_log_dir()?,
    };
    parse_v4_log(&dir).or_else(|| parse_v3_log(&dir))
}

/// v4 spider.log: port from `:server_port=>NNNN`, token from `Token: N`.
/// Both must be present. Later occurrences override earlier ones, so a
/// restarted server's values win.
fn parse_v4_log(dir: &Path) -> Option<ConnectionParams> {
    let text = fs::read_to_string(dir.join("spider.log")).ok()?;
    let mut port = None;
    let mut token = None;
    let mut version = None;
    for line in text.lines() {
        if let Some(at) = line.find(":server_port=>") {
            let digits: String = line[at + ":server_port=>".len()..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(p) = digits.parse::<u16>() {
                port = Some(p);
            }
        }
        if let Some(at) = line.find("Token:") {
            let tail = line[at + "Token:".len()..].trim_start();
            let signed: String = tail
                .chars()
                .enumerate()
                .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '-'))
                .map(|(_, c)| c)
                .collect();
            if let Ok(t) = signed.parse::<i32>() {
                token = Some(t);
            }
        }
        if let Some(at) = line.find("version ") {
            let tail = &line[at + "version ".len()..];
            let v: String = tail
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if !v.is_empty() {
                version = Some(v);
            }
        }
    }
    Some(ConnectionParams {
        port: port?,
        token: Some(token?),
        version: version.unwrap_or_else(|| "unknown".to_string()),
        protocol_major: 4,
    })
}

/// v3 server-output.log: port from a `Listen port: N` line, version from
/// `This is version X.Y.Z`. No token on this protocol.
fn parse_v3_log(dir: &Path) -> Option<ConnectionParams> {
    let text = fs::read_to_string(dir.join("server-output.log")).ok()?;
    let mut port = None;
    let mut version = None;
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("Listen port:") {
            if let Ok(p) = rest.trim().parse::<u16>() {
                port = Some(p);
            }
        }
        if let Some(rest) = trimmed.strip_prefix("This is version ") {
            let v: String = rest
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if !v.is_empty() {
                version = Some(v);
            }
        }
    }
    Some(ConnectionParams {
        port: port?,
        token: None,
        version: version.unwrap_or_else(|| "unknown".to_string()),
        protocol_major: 3,
    })
}
