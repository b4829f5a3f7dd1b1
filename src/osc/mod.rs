//! OSC transport for driving a running Sonic Pi server.

mod client;

pub use client::SonicPiClient;

/// Client id sent as the identity argument on v3 servers.
pub const CLIENT_ID: &str = "SONIC_RENDER";
