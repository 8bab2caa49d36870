//! Crossfade assembly for the full-mix render path
//!
//! Each track contributes one playback window starting at its planned
//! mix-in position. Consecutive windows are blended by applying the fade-out
//! curve to the tail of the running output and the fade-in curve to the head
//! of the incoming window over the planned overlap, then summing. An overlap
//! of zero degenerates to plain concatenation.

use mixdown_common::config::BeatAlignMode;
use mixdown_common::fade_curves::FadeCurve;
use mixdown_common::TrackAnalysis;
use tracing::trace;

use crate::audio::buffer::{AudioBuffer, CHANNELS};
use crate::audio::TARGET_SAMPLE_RATE;

/// Beat-grid entries per downbeat (4/4 assumed throughout)
const BEATS_PER_BAR: usize = 4;

/// Snap a transition position to the nearest beat of the incoming track
///
/// Only moves the position if a grid entry lies within half a beat
/// (30/bpm seconds); otherwise the planned position stands. In `Downbeat`
/// mode only every fourth grid entry is a candidate.
pub fn align_to_beat(
    position: f64,
    analysis: &TrackAnalysis,
    mode: BeatAlignMode,
) -> f64 {
    if analysis.beat_grid.is_empty() {
        return position;
    }
    let half_beat = 30.0 / analysis.effective_bpm();

    let step = match mode {
        BeatAlignMode::Downbeat => BEATS_PER_BAR,
        BeatAlignMode::Any => 1,
    };

    let mut best: Option<f64> = None;
    for beat in analysis.beat_grid.iter().step_by(step) {
        let distance = (beat - position).abs();
        if distance <= half_beat {
            match best {
                Some(b) if (b - position).abs() <= distance => {}
                _ => best = Some(*beat),
            }
        }
    }
    best.unwrap_or(position)
}

/// One track's contribution to the mix
pub struct MixSegment {
    /// Window start within the source track, seconds
    pub start_seconds: f64,
    /// Window length, seconds
    pub length_seconds: f64,
    /// Source audio at the engine rate
    pub audio: AudioBuffer,
}

impl MixSegment {
    /// Extract the window as an engine-rate buffer (zero-padded past EOF)
    fn window(&self) -> AudioBuffer {
        let rate = self.audio.sample_rate;
        let start = (self.start_seconds * rate as f64) as usize;
        let frames = (self.length_seconds * rate as f64) as usize;
        self.audio.window(start, frames)
    }
}

/// Blend segments into a single continuous buffer
///
/// `overlaps[i]` is the crossfade length in seconds between segment `i`
/// and segment `i + 1`; it is clamped to what both windows can supply.
pub fn assemble(
    segments: &[MixSegment],
    overlaps: &[f64],
    curve: FadeCurve,
) -> AudioBuffer {
    let mut output = match segments.first() {
        Some(first) => first.window(),
        None => return AudioBuffer::silent(0, TARGET_SAMPLE_RATE),
    };
    // The blend may only reach into the previous segment's window, never
    // into audio finalized before it
    let mut prev_frames = output.frames();

    for (i, segment) in segments.iter().enumerate().skip(1) {
        let incoming = segment.window();
        let overlap_seconds = overlaps.get(i - 1).copied().unwrap_or(0.0).max(0.0);
        let overlap_frames = ((overlap_seconds * output.sample_rate as f64) as usize)
            .min(prev_frames)
            .min(incoming.frames());
        trace!(
            "Blending segment {} over {} frames ({} curve)",
            i,
            overlap_frames,
            curve.as_str()
        );
        crossfade_append(&mut output, &incoming, overlap_frames, curve);
        prev_frames = incoming.frames();
    }
    output
}

/// Append `incoming` to `output`, crossfading the last `overlap_frames`
fn crossfade_append(
    output: &mut AudioBuffer,
    incoming: &AudioBuffer,
    overlap_frames: usize,
    curve: FadeCurve,
) {
    let out_frames = output.frames();
    let blend_start = out_frames - overlap_frames;

    for frame in 0..overlap_frames {
        // Normalized progress through the crossfade
        let t = if overlap_frames > 1 {
            frame as f64 / (overlap_frames - 1) as f64
        } else {
            1.0
        };
        let gain_out = curve.fade_out(t as f32);
        let gain_in = curve.fade_in(t as f32);
        for channel in 0..CHANNELS {
            let out_idx = (blend_start + frame) * CHANNELS + channel;
            let in_idx = frame * CHANNELS + channel;
            output.samples[out_idx] =
                output.samples[out_idx] * gain_out + incoming.samples[in_idx] * gain_in;
        }
    }

    output
        .samples
        .extend_from_slice(&incoming.samples[overlap_frames * CHANNELS..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn constant(value: f32, frames: usize) -> AudioBuffer {
        AudioBuffer::new(vec![value; frames * CHANNELS], TARGET_SAMPLE_RATE)
    }

    fn segment(value: f32, seconds: f64) -> MixSegment {
        let frames = (seconds * TARGET_SAMPLE_RATE as f64) as usize;
        MixSegment {
            start_seconds: 0.0,
            length_seconds: seconds,
            audio: constant(value, frames),
        }
    }

    fn analysis_with_grid(bpm: f64, beats: usize) -> TrackAnalysis {
        let interval = 60.0 / bpm;
        TrackAnalysis {
            track_id: Uuid::new_v4(),
            bpm: Some(bpm),
            camelot_key: None,
            beat_grid: (0..beats).map(|i| i as f64 * interval).collect(),
            structure: Vec::new(),
            duration_seconds: beats as f64 * interval,
            waveform_envelope: Vec::new(),
            drop_moments: Vec::new(),
        }
    }

    #[test]
    fn test_align_snaps_within_half_beat() {
        // 120 BPM: beats every 0.5s, half beat = 0.25s
        let analysis = analysis_with_grid(120.0, 64);
        let aligned = align_to_beat(10.1, &analysis, BeatAlignMode::Any);
        assert!((aligned - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_align_leaves_far_positions_alone() {
        let analysis = analysis_with_grid(120.0, 8);
        // Way past the end of the grid
        let aligned = align_to_beat(100.0, &analysis, BeatAlignMode::Any);
        assert_eq!(aligned, 100.0);
    }

    #[test]
    fn test_align_downbeat_uses_every_fourth_beat() {
        let analysis = analysis_with_grid(120.0, 64);
        // 10.0s is beat 20, a downbeat; 10.5s is beat 21, which is not.
        // In downbeat mode 10.4 should not snap to 10.5.
        let aligned = align_to_beat(10.4, &analysis, BeatAlignMode::Downbeat);
        assert_eq!(aligned, 10.4);
        let aligned = align_to_beat(10.1, &analysis, BeatAlignMode::Downbeat);
        assert!((aligned - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_align_empty_grid_is_noop() {
        let mut analysis = analysis_with_grid(120.0, 0);
        analysis.beat_grid.clear();
        assert_eq!(align_to_beat(42.0, &analysis, BeatAlignMode::Any), 42.0);
    }

    #[test]
    fn test_zero_overlap_concatenates() {
        let segments = [segment(0.25, 1.0), segment(0.5, 1.0)];
        let out = assemble(&segments, &[0.0], FadeCurve::EqualPower);
        assert_eq!(out.frames(), 2 * TARGET_SAMPLE_RATE as usize);
        // First half untouched, second half untouched
        assert_eq!(out.samples[0], 0.25);
        let last = out.samples.len() - 1;
        assert_eq!(out.samples[last], 0.5);
    }

    #[test]
    fn test_overlap_shortens_total_length() {
        let segments = [segment(0.25, 2.0), segment(0.5, 2.0)];
        let out = assemble(&segments, &[1.0], FadeCurve::Linear);
        // 2s + 2s - 1s overlap
        assert_eq!(out.frames(), 3 * TARGET_SAMPLE_RATE as usize);
    }

    #[test]
    fn test_linear_crossfade_midpoint_mixes_evenly() {
        let segments = [segment(1.0, 2.0), segment(0.0, 2.0)];
        let out = assemble(&segments, &[1.0], FadeCurve::Linear);
        // Midpoint of the blend region: outgoing at gain 0.5
        let blend_start = TARGET_SAMPLE_RATE as usize; // 1.0s in
        let mid = blend_start + TARGET_SAMPLE_RATE as usize / 2;
        let v = out.samples[mid * CHANNELS];
        assert!((v - 0.5).abs() < 0.01, "got {v}");
    }

    #[test]
    fn test_long_overlap_never_reaches_past_previous_segment() {
        // Middle segment is shorter than the requested overlap; the blend
        // must clamp to it and leave the first segment untouched
        let segments = [segment(1.0, 2.0), segment(1.0, 1.0), segment(0.0, 3.0)];
        let out = assemble(&segments, &[0.0, 3.0], FadeCurve::Linear);
        // Overlap clamps to the 1s middle window: 2 + 1 + 3 - 1 = 5s
        assert_eq!(out.frames(), 5 * TARGET_SAMPLE_RATE as usize);
        // Inside the first segment, well before any blend region
        let half_second = TARGET_SAMPLE_RATE as usize / 2;
        assert_eq!(out.samples[half_second * CHANNELS], 1.0);
        // End of the first segment is still untouched
        let last_of_first = 2 * TARGET_SAMPLE_RATE as usize - 1;
        assert_eq!(out.samples[last_of_first * CHANNELS], 1.0);
    }

    #[test]
    fn test_overlap_clamped_to_window_length() {
        let segments = [segment(0.25, 0.5), segment(0.5, 0.5)];
        // Requested overlap exceeds both windows; clamps to 0.5s
        let out = assemble(&segments, &[4.0], FadeCurve::EqualPower);
        assert_eq!(out.frames(), TARGET_SAMPLE_RATE as usize / 2);
    }

    #[test]
    fn test_empty_plan_yields_empty_buffer() {
        let out = assemble(&[], &[], FadeCurve::EqualPower);
        assert_eq!(out.frames(), 0);
    }

    #[test]
    fn test_window_zero_pads_past_end() {
        let seg = MixSegment {
            start_seconds: 0.5,
            length_seconds: 2.0,
            audio: constant(0.5, TARGET_SAMPLE_RATE as usize),
        };
        let w = seg.window();
        assert_eq!(w.frames(), 2 * TARGET_SAMPLE_RATE as usize);
        let last = w.samples.len() - 1;
        assert_eq!(w.samples[last], 0.0);
    }
}
