//! Amplitude and duration policy shared by all event assembly.

/// Map a Sonic Pi `amp:` value to a velocity.
///
/// Amplitude is clamped to [0, 2] and mapped linearly so that amp 1.0 gives
/// velocity 1.0 and amp 0 gives 0.5; the result always lands in [0.05, 1.0].
pub fn velocity_from_amp(amp: f64) -> f64 {
    let amp = amp.clamp(0.0, 2.0);
    (amp / 2.0 + 0.5).clamp(0.05, 1.0)
}

/// Clamp a beat duration into the playable range [0.05, 16.0].
pub fn clamp_duration(beats: f64) -> f64 {
    beats.clamp(0.05, 16.0)
}
