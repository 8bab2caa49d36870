//! Bar and phrase timing utilities
//!
//! DJ mixes happen on musical boundaries: a bar is 4 beats, and a phrase is
//! a fixed count of bars (8, 16, 32). Cue points and transition starts are
//! snapped to phrase boundaries measured from track start.
//!
//! All timestamps are `f64` seconds. Boundary checks use an explicit
//! epsilon so a timestamp that is a phrase multiple up to rounding error is
//! treated as already on the boundary instead of being pushed a full phrase
//! later.

use crate::analysis::DEFAULT_BPM;

/// Tolerance for "already on a phrase boundary" checks (1 ms)
pub const PHRASE_EPSILON: f64 = 1e-3;

/// Seconds per 4-beat bar at the given tempo
///
/// Non-positive or non-finite tempos fall back to the default 120 BPM.
pub fn bar_duration(bpm: f64) -> f64 {
    let bpm = if bpm.is_finite() && bpm > 0.0 {
        bpm
    } else {
        DEFAULT_BPM
    };
    60.0 / bpm * 4.0
}

/// Smallest time >= `t` that is an exact multiple of `phrase_bars` bars
///
/// Measured from track start 0. If `t` already lies on a boundary (within
/// [`PHRASE_EPSILON`]) it is returned as the exact multiple. Idempotent:
/// snapping a snapped value returns it unchanged.
pub fn phrase_snap(t: f64, phrase_bars: u32, bar_duration: f64) -> f64 {
    let phrase = phrase_bars as f64 * bar_duration;
    if phrase <= 0.0 || t <= 0.0 {
        return t.max(0.0);
    }

    let phrases = t / phrase;
    let rounded = phrases.round();
    if (phrases - rounded).abs() * phrase <= PHRASE_EPSILON {
        // Already on a boundary up to rounding error
        return rounded * phrase;
    }
    phrases.ceil() * phrase
}

/// Convert a duration in seconds to a frame count at the given rate
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> usize {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as usize
}

/// Convert a frame count to seconds at the given rate
pub fn frames_to_seconds(frames: usize, sample_rate: u32) -> f64 {
    frames as f64 / sample_rate as f64
}
