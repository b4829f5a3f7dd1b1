//! Sonic Render — offline preview rendering for Sonic Pi scripts.
//!
//! Compiles a supported subset of the Sonic Pi live-coding notation into a
//! deterministic, time-stamped event list suitable for preview rendering,
//! plus thin collaborators for talking to a running Sonic Pi server:
//! log-file discovery of its UDP port/token and an OSC relay for running or
//! stopping scripts.

pub mod discovery;
pub mod osc;
pub mod render;
pub mod theory;

pub use discovery::{discover, ConnectionParams};
pub use osc::SonicPiClient;
pub use render::{render_script, Event, RenderOptions, RenderResult};
