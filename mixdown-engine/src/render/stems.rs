//! Per-stem render path
//!
//! Each track may carry isolated stems (vocals, drums, bass, other) from the
//! upstream separation service. During a transition the selected stem style
//! mutes, solos, or hard-swaps individual stems so the outgoing and incoming
//! material do not mask each other; outside the overlap every usable stem
//! plays at its configured volume. Missing or failed stems are silent, never
//! an error.

use std::collections::HashMap;

use mixdown_common::fade_curves::FadeCurve;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::audio::buffer::{AudioBuffer, CHANNELS};
use crate::audio::TARGET_SAMPLE_RATE;

/// Stem vocabulary produced by the separation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StemType {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl StemType {
    pub const ALL: [StemType; 4] = [
        StemType::Vocals,
        StemType::Drums,
        StemType::Bass,
        StemType::Other,
    ];
}

/// Separation progress for one stem, as reported by the stems collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One isolated stem for one track
#[derive(Debug, Clone)]
pub struct Stem {
    pub audio: Option<AudioBuffer>,
    pub status: StemStatus,
    /// Playback volume in [0, 1]
    pub volume: f32,
    pub enabled: bool,
}

impl Stem {
    pub fn completed(audio: AudioBuffer) -> Self {
        Self {
            audio: Some(audio),
            status: StemStatus::Completed,
            volume: 1.0,
            enabled: true,
        }
    }

    /// Only completed, enabled stems with audio contribute to the mix
    pub fn is_usable(&self) -> bool {
        self.enabled && self.status == StemStatus::Completed && self.audio.is_some()
    }
}

/// All stems for one track, keyed by stem type; absent entries are silent
#[derive(Debug, Clone, Default)]
pub struct StemSet {
    stems: HashMap<StemType, Stem>,
}

impl StemSet {
    pub fn insert(&mut self, kind: StemType, stem: Stem) {
        self.stems.insert(kind, stem);
    }

    pub fn get(&self, kind: StemType) -> Option<&Stem> {
        self.stems.get(&kind)
    }

    pub fn usable_count(&self) -> usize {
        self.stems.values().filter(|s| s.is_usable()).count()
    }

    /// Extract one stem's window at the engine rate, silent if unusable
    fn stem_window(&self, kind: StemType, start_frame: usize, frames: usize) -> AudioBuffer {
        match self.stems.get(&kind) {
            Some(stem) if stem.is_usable() => {
                // is_usable() guarantees audio is present
                let Some(audio) = stem.audio.as_ref() else {
                    return AudioBuffer::silent(frames, TARGET_SAMPLE_RATE);
                };
                let mut window = audio.window(start_frame, frames);
                if stem.volume != 1.0 {
                    let volume = stem.volume.clamp(0.0, 1.0);
                    for sample in &mut window.samples {
                        *sample *= volume;
                    }
                }
                window
            }
            _ => AudioBuffer::silent(frames, TARGET_SAMPLE_RATE),
        }
    }
}

/// How stems are treated inside a transition window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StemTransitionStyle {
    /// All stems crossfade together (equivalent to a full-mix blend)
    #[default]
    Standard,
    /// Incoming vocals ride in over the outgoing instrumental
    VocalsOnly,
    /// Vocals muted on both sides, instrumental-only bridge
    InstrumentalBridge,
    /// Drums hard-swap at the overlap midpoint, rest crossfades
    DrumSwap,
    /// Bass swaps early, drums at the midpoint, melodic content crossfades
    ThreeBandSwap,
}

/// Which side of a transition a stem lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Outgoing,
    Incoming,
}

/// Gain for one stem at normalized transition position `t` in [0, 1]
///
/// Hard-swap styles deliberately bypass the fade curve for the swapped
/// stem: a drum or bass handover is a cut, not a fade.
fn transition_gain(
    style: StemTransitionStyle,
    side: Side,
    stem: StemType,
    t: f64,
    curve: FadeCurve,
) -> f32 {
    let curve_gain = match side {
        Side::Outgoing => curve.fade_out(t as f32),
        Side::Incoming => curve.fade_in(t as f32),
    };
    let swap_at = |threshold: f64| -> f32 {
        match side {
            Side::Outgoing if t < threshold => 1.0,
            Side::Incoming if t >= threshold => 1.0,
            _ => 0.0,
        }
    };

    match style {
        StemTransitionStyle::Standard => curve_gain,
        StemTransitionStyle::VocalsOnly => match (side, stem) {
            (Side::Outgoing, StemType::Vocals) => 0.0,
            (Side::Incoming, StemType::Vocals) => curve_gain,
            (Side::Outgoing, _) => curve_gain,
            (Side::Incoming, _) => 0.0,
        },
        StemTransitionStyle::InstrumentalBridge => match stem {
            StemType::Vocals => 0.0,
            _ => curve_gain,
        },
        StemTransitionStyle::DrumSwap => match stem {
            StemType::Drums => swap_at(0.5),
            _ => curve_gain,
        },
        StemTransitionStyle::ThreeBandSwap => match stem {
            StemType::Bass => swap_at(0.25),
            StemType::Drums => swap_at(0.5),
            _ => curve_gain,
        },
    }
}

/// One track's stem contribution to the mix
pub struct StemSegment {
    pub start_seconds: f64,
    pub length_seconds: f64,
    pub stems: StemSet,
}

impl StemSegment {
    fn start_frame(&self) -> usize {
        (self.start_seconds * TARGET_SAMPLE_RATE as f64) as usize
    }

    fn frames(&self) -> usize {
        (self.length_seconds * TARGET_SAMPLE_RATE as f64) as usize
    }

    /// Per-stem windows in StemType::ALL order
    fn stem_windows(&self) -> [AudioBuffer; 4] {
        let start = self.start_frame();
        let frames = self.frames();
        StemType::ALL.map(|kind| self.stems.stem_window(kind, start, frames))
    }
}

/// Blend stem segments into a single continuous buffer
///
/// Mirrors the full-mix assembly but applies per-stem transition gains
/// inside each overlap before summing stems into the output.
pub fn assemble_stems(
    segments: &[StemSegment],
    overlaps: &[f64],
    curve: FadeCurve,
    style: StemTransitionStyle,
) -> AudioBuffer {
    let Some(first) = segments.first() else {
        return AudioBuffer::silent(0, TARGET_SAMPLE_RATE);
    };

    let mut prev_windows = first.stem_windows();
    let mut output = sum_windows(&prev_windows);

    for (i, segment) in segments.iter().enumerate().skip(1) {
        let windows = segment.stem_windows();
        let incoming_frames = segment.frames();
        let overlap_seconds = overlaps.get(i - 1).copied().unwrap_or(0.0).max(0.0);
        let overlap_frames = ((overlap_seconds * TARGET_SAMPLE_RATE as f64) as usize)
            .min(prev_windows[0].frames())
            .min(incoming_frames);
        trace!(
            "Blending stem segment {} over {} frames ({:?})",
            i,
            overlap_frames,
            style
        );

        let out_frames = output.frames();
        let blend_start = out_frames - overlap_frames;
        let prev_frames = prev_windows[0].frames();
        let prev_tail_start = prev_frames - overlap_frames;

        for frame in 0..overlap_frames {
            let t = if overlap_frames > 1 {
                frame as f64 / (overlap_frames - 1) as f64
            } else {
                1.0
            };
            for channel in 0..CHANNELS {
                let out_idx = (blend_start + frame) * CHANNELS + channel;
                let mut mixed = 0.0f32;
                for (s, kind) in StemType::ALL.iter().enumerate() {
                    let tail_idx = (prev_tail_start + frame) * CHANNELS + channel;
                    let head_idx = frame * CHANNELS + channel;
                    mixed += prev_windows[s].samples[tail_idx]
                        * transition_gain(style, Side::Outgoing, *kind, t, curve);
                    mixed += windows[s].samples[head_idx]
                        * transition_gain(style, Side::Incoming, *kind, t, curve);
                }
                output.samples[out_idx] = mixed;
            }
        }

        // Append the remainder of the incoming segment at full stem sum
        for frame in overlap_frames..incoming_frames {
            for channel in 0..CHANNELS {
                let idx = frame * CHANNELS + channel;
                let sum: f32 = windows.iter().map(|w| w.samples[idx]).sum();
                output.samples.push(sum);
            }
        }

        prev_windows = windows;
    }
    output
}

fn sum_windows(windows: &[AudioBuffer; 4]) -> AudioBuffer {
    let frames = windows[0].frames();
    let mut samples = vec![0.0f32; frames * CHANNELS];
    for window in windows {
        for (out, s) in samples.iter_mut().zip(&window.samples) {
            *out += s;
        }
    }
    AudioBuffer::new(samples, TARGET_SAMPLE_RATE)
}
