//! BPM/key compatibility scoring
//!
//! Scores how mixable a candidate track is against an anchor track, for
//! ordering and recommendation. Deterministic and side-effect free; the
//! anchor is semantically "fixed", so the relative BPM difference is taken
//! against the anchor's tempo.
//!
//! Key compatibility dominates the weighting: an off-key mix is more
//! jarring than a slightly off-tempo one, so `KEY_WEIGHT >= BPM_WEIGHT`.

use mixdown_common::camelot::CamelotKey;

/// Weight of the key score in the overall result
const KEY_WEIGHT: f64 = 0.6;

/// Weight of the BPM score in the overall result
const BPM_WEIGHT: f64 = 0.4;

/// Key score when either key is unknown (neutral, not failing)
const NEUTRAL_KEY_SCORE: f64 = 0.5;

/// One side of a compatibility comparison
#[derive(Debug, Clone, Copy)]
pub struct TrackProfile {
    pub bpm: f64,
    pub key: Option<CamelotKey>,
}

/// Result of scoring a candidate against an anchor
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibilityResult {
    /// Overall mixability, 0.0 to 1.0
    pub score: f64,
    /// Relative BPM difference, |candidate - anchor| / anchor
    pub bpm_diff: f64,
    /// True only when both keys are known and wheel-compatible
    pub key_ok: bool,
}

/// Score a candidate track against an anchor
///
/// `bpm_tolerance` is the relative BPM difference at which the BPM score
/// reaches zero (the engine default is 8%). The BPM score decays linearly
/// from 1.0 at equal tempo, so it is monotonically non-increasing in
/// `bpm_diff` as required for stable ordering.
pub fn score(anchor: TrackProfile, candidate: TrackProfile, bpm_tolerance: f64) -> CompatibilityResult {
    let (key_score, key_ok) = match (anchor.key, candidate.key) {
        (Some(a), Some(c)) => {
            if a.is_compatible(&c) {
                (1.0, true)
            } else {
                (0.0, false)
            }
        }
        // Unknown keys score neutral rather than failing the pair
        _ => (NEUTRAL_KEY_SCORE, false),
    };

    let anchor_bpm = if anchor.bpm > 0.0 { anchor.bpm } else { mixdown_common::analysis::DEFAULT_BPM };
    let candidate_bpm = if candidate.bpm > 0.0 {
        candidate.bpm
    } else {
        mixdown_common::analysis::DEFAULT_BPM
    };
    let bpm_diff = (candidate_bpm - anchor_bpm).abs() / anchor_bpm;

    let bpm_score = if bpm_tolerance > 0.0 {
        (1.0 - bpm_diff / bpm_tolerance).clamp(0.0, 1.0)
    } else if bpm_diff == 0.0 {
        1.0
    } else {
        0.0
    };

    let score = (KEY_WEIGHT * key_score + BPM_WEIGHT * bpm_score).clamp(0.0, 1.0);

    CompatibilityResult {
        score,
        bpm_diff,
        key_ok,
    }
}
