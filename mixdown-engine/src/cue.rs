//! Cue point detection from track structure
//!
//! Derives where a track should be mixed in and out of, and where its drop
//! and breakdown land, from the analyzer's structure sections. Mix points
//! are snapped up to 8-bar phrase boundaries so transitions land on musical
//! phrases rather than mid-bar.
//!
//! Detection is a pure function with no failure mode: missing structure or
//! beat data degrades to heuristic defaults with reduced confidence, so the
//! planner never blocks on incomplete analysis.

use mixdown_common::analysis::{SectionLabel, TrackAnalysis};
use mixdown_common::timing::{bar_duration, phrase_snap};

/// Phrase length used for mix-point snapping, in bars
const MIX_PHRASE_BARS: u32 = 8;

/// Confidence reported when structure sections are available
const STRUCTURED_CONFIDENCE: f64 = 0.8;

/// Confidence reported for heuristic-only cue sets
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Derived cue points for one track, all in seconds from track start
#[derive(Debug, Clone, PartialEq)]
pub struct CuePoints {
    /// Where an incoming transition should start using this track
    pub mix_in: f64,
    /// First drop, when known
    pub drop: Option<f64>,
    /// First breakdown, when known
    pub breakdown: Option<f64>,
    /// Where an outgoing transition should stop using this track
    pub mix_out: f64,
    /// 0.0 to 1.0; lower when derived from heuristics alone
    pub confidence: f64,
}

/// Derive cue points from a track's analysis summary
///
/// Invariant on the output: `0 <= mix_in <= mix_out <= duration`.
pub fn detect(analysis: &TrackAnalysis) -> CuePoints {
    let duration = analysis.duration_seconds.max(0.0);
    let bar = bar_duration(analysis.effective_bpm());
    let sections = analysis.section_map();

    let mix_in = if let Some(intro) = sections.get(SectionLabel::Intro) {
        phrase_snap(intro.end, MIX_PHRASE_BARS, bar)
    } else if let Some(verse) = sections.get(SectionLabel::Verse) {
        phrase_snap(verse.start, MIX_PHRASE_BARS, bar)
    } else if let Some(buildup) = sections.get(SectionLabel::Buildup) {
        phrase_snap(buildup.start, MIX_PHRASE_BARS, bar)
    } else {
        (16.0 * bar).min(duration * 0.1)
    };
    let mix_in = mix_in.max(0.0);

    let drop = sections
        .get(SectionLabel::Drop)
        .or_else(|| sections.get(SectionLabel::Chorus))
        .map(|s| s.start);

    let breakdown = sections.get(SectionLabel::Breakdown).map(|s| s.start);

    let mix_out = if let Some(outro) = sections.get(SectionLabel::Outro) {
        phrase_snap(outro.start, MIX_PHRASE_BARS, bar)
    } else {
        (duration - 32.0 * bar).max(0.0)
    };
    let mix_out = mix_out.min(duration);

    let confidence = if analysis.structure.is_empty() {
        FALLBACK_CONFIDENCE
    } else {
        STRUCTURED_CONFIDENCE
    };

    CuePoints {
        // Snapping can push mix_in past a short track's mix_out; keep the
        // ordering invariant by pulling mix_in back
        mix_in: mix_in.min(mix_out),
        drop,
        breakdown,
        mix_out,
        confidence,
    }
}
