//! Track analysis data model
//!
//! Read-only records produced by the upstream audio analyzer: tempo, key,
//! beat grid, structure sections, duration, and an optional coarse waveform
//! envelope. The engine consumes these; it never writes them back.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camelot::CamelotKey;

/// Tempo assumed when the analyzer reported no BPM (or a non-positive one)
pub const DEFAULT_BPM: f64 = 120.0;

/// Structure section labels, fixed vocabulary
///
/// The analyzer emits free-form label strings; anything outside this
/// vocabulary is dropped at the model boundary rather than carried along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionLabel {
    Intro,
    Verse,
    Buildup,
    Drop,
    Chorus,
    Breakdown,
    Outro,
}

impl SectionLabel {
    /// Parse an analyzer label string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "intro" => Some(SectionLabel::Intro),
            "verse" => Some(SectionLabel::Verse),
            "buildup" | "build-up" | "build_up" => Some(SectionLabel::Buildup),
            "drop" => Some(SectionLabel::Drop),
            "chorus" => Some(SectionLabel::Chorus),
            "breakdown" => Some(SectionLabel::Breakdown),
            "outro" => Some(SectionLabel::Outro),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionLabel::Intro => "intro",
            SectionLabel::Verse => "verse",
            SectionLabel::Buildup => "buildup",
            SectionLabel::Drop => "drop",
            SectionLabel::Chorus => "chorus",
            SectionLabel::Breakdown => "breakdown",
            SectionLabel::Outro => "outro",
        }
    }
}

/// One labelled region of a track, in seconds from track start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSection {
    pub label: SectionLabel,
    pub start: f64,
    pub end: f64,
    /// Analyzer confidence for this section, 0.0 to 1.0
    #[serde(default)]
    pub confidence: f64,
}

/// Per-track analysis summary from the upstream analyzer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackAnalysis {
    pub track_id: Uuid,

    /// Detected tempo; None when the analyzer could not determine one
    pub bpm: Option<f64>,

    /// Camelot key notation; None when key detection failed
    pub camelot_key: Option<CamelotKey>,

    /// Strictly increasing beat timestamps in seconds
    #[serde(default)]
    pub beat_grid: Vec<f64>,

    /// Labelled structure sections (unordered, may repeat labels)
    #[serde(default)]
    pub structure: Vec<StructureSection>,

    pub duration_seconds: f64,

    /// Coarse amplitude envelope for waveform display (optional)
    #[serde(default)]
    pub waveform_envelope: Vec<f32>,

    /// Detected drop moments in seconds (optional)
    #[serde(default)]
    pub drop_moments: Vec<f64>,
}

impl TrackAnalysis {
    /// Effective tempo, defaulting when absent or non-positive
    pub fn effective_bpm(&self) -> f64 {
        match self.bpm {
            Some(bpm) if bpm > 0.0 => bpm,
            _ => DEFAULT_BPM,
        }
    }

    /// Build the per-label section lookup for this track
    pub fn section_map(&self) -> SectionMap<'_> {
        SectionMap::build(&self.structure)
    }
}

/// Per-label section lookup, built once per track
///
/// The first section carrying each label wins; later duplicates are ignored.
/// This replaces repeated linear scans over the section list with a single
/// O(n) build and O(1) lookups.
#[derive(Debug)]
pub struct SectionMap<'a> {
    slots: [Option<&'a StructureSection>; 7],
}

impl<'a> SectionMap<'a> {
    pub fn build(sections: &'a [StructureSection]) -> Self {
        let mut slots: [Option<&'a StructureSection>; 7] = [None; 7];
        for section in sections {
            let idx = Self::slot(section.label);
            if slots[idx].is_none() {
                slots[idx] = Some(section);
            }
        }
        Self { slots }
    }

    /// First section with the given label, if any
    pub fn get(&self, label: SectionLabel) -> Option<&'a StructureSection> {
        self.slots[Self::slot(label)]
    }

    fn slot(label: SectionLabel) -> usize {
        match label {
            SectionLabel::Intro => 0,
            SectionLabel::Verse => 1,
            SectionLabel::Buildup => 2,
            SectionLabel::Drop => 3,
            SectionLabel::Chorus => 4,
            SectionLabel::Breakdown => 5,
            SectionLabel::Outro => 6,
        }
    }
}
