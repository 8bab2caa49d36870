//! Render engine: executes a `MixPlan` against materialized audio
//!
//! Rendering is CPU-bound and synchronous over the job's private buffers;
//! the job layer runs it on a blocking thread. All input audio must be
//! fully materialized before `render` is called, so nothing in here touches
//! storage or the network. Cancellation is cooperative and checked between
//! per-track steps, never mid-blend.

pub mod loudness;
pub mod mixer;
pub mod stems;

use std::collections::HashMap;
use std::time::Instant;

use mixdown_common::config::{BeatAlignMode, EngineConfig};
use mixdown_common::fade_curves::FadeCurve;
use mixdown_common::{MixPlan, MixdownEvent, TrackAnalysis};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::audio::buffer::AudioBuffer;
use crate::audio::encode::{encode_wav, OUTPUT_MIME_TYPE};
use crate::audio::TARGET_SAMPLE_RATE;
use crate::error::{Error, Result};
use crate::render::mixer::MixSegment;
use crate::render::stems::{StemSegment, StemSet, StemTransitionStyle};

/// Broadcast channel capacity for render events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Shortest segment the engine will cut a track down to, seconds
const MIN_SEGMENT_SECONDS: f64 = 1.0;

/// How each track's audio arrives at the engine
pub enum TrackAudio {
    /// One decoded full-mix buffer
    Full(AudioBuffer),
    /// Isolated stems from the separation service
    Stems(StemSet),
}

/// Requested blend mode for the whole job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixMode {
    /// Full-mix crossfades
    #[default]
    Standard,
    /// Incoming vocals ride over the outgoing instrumental (requires stems)
    VocalsOverInstrumental,
    /// Stem-aware transitions with a selectable per-stem style
    PerStem { style: StemTransitionStyle },
}

/// Per-job render parameters, resolved from config plus job overrides
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub crossfade_curve: FadeCurve,
    pub beat_align: bool,
    pub beat_align_mode: BeatAlignMode,
    pub target_lufs: f64,
    /// Desired output length; None lets each track play out to its end
    pub target_duration_seconds: Option<f64>,
    pub mix_mode: MixMode,
}

impl RenderOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            crossfade_curve: config.crossfade_curve,
            beat_align: config.beat_align,
            beat_align_mode: config.beat_align_mode,
            target_lufs: config.target_lufs,
            target_duration_seconds: None,
            mix_mode: MixMode::Standard,
        }
    }
}

/// Outcome counters reported alongside the rendered bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderMetrics {
    pub processing_time_ms: u64,
    pub output_size_bytes: usize,
    pub stems_processed: usize,
    pub transitions_applied: usize,
}

/// A finished render: encoded bytes plus metrics
#[derive(Debug)]
pub struct RenderOutput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub metrics: RenderMetrics,
}

/// Executes plans and broadcasts progress events
pub struct RenderEngine {
    event_tx: broadcast::Sender<MixdownEvent>,
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { event_tx }
    }

    /// Subscribe to render events (progress UI, job dispatcher)
    pub fn subscribe(&self) -> broadcast::Receiver<MixdownEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit(&self, event: MixdownEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    /// Render one plan to an encoded output buffer
    ///
    /// `audio` must be in plan order, one entry per track. Checks the
    /// cancellation signal between per-track steps; a cancelled job
    /// produces no partial output.
    pub fn render(
        &self,
        mashup_id: Uuid,
        plan: &MixPlan,
        analyses: &HashMap<Uuid, TrackAnalysis>,
        audio: Vec<TrackAudio>,
        options: &RenderOptions,
        cancel: &watch::Receiver<bool>,
    ) -> Result<RenderOutput> {
        let started = Instant::now();

        if !plan.is_consistent() {
            return Err(Error::Render(
                "plan transitions do not match track order".to_string(),
            ));
        }
        if audio.len() != plan.track_order.len() {
            return Err(Error::Render(format!(
                "plan names {} tracks but {} audio sources were supplied",
                plan.track_order.len(),
                audio.len()
            )));
        }
        if plan.track_order.is_empty() {
            return Err(Error::Render("plan contains no tracks".to_string()));
        }

        self.emit(MixdownEvent::RenderStarted {
            mashup_id,
            track_count: plan.track_order.len(),
            timestamp: chrono::Utc::now(),
        });

        let layout = self.segment_layout(plan, analyses, &audio, options);
        let overlaps: Vec<f64> = plan
            .transitions
            .iter()
            .map(|t| t.overlap_seconds)
            .collect();
        let stems_processed: usize = audio
            .iter()
            .map(|a| match a {
                TrackAudio::Stems(set) => set.usable_count(),
                TrackAudio::Full(_) => 0,
            })
            .sum();

        // Cut any track-level work short as soon as cancellation is seen
        let check_cancel = |stage: &str| -> Result<()> {
            if *cancel.borrow() {
                info!("Render {} cancelled during {}", mashup_id, stage);
                self.emit(MixdownEvent::RenderCancelled {
                    mashup_id,
                    timestamp: chrono::Utc::now(),
                });
                return Err(Error::Cancelled);
            }
            Ok(())
        };

        // Per-track progress is reported as each segment is processed
        let track_done = |index: usize| {
            if index > 0 {
                let transition = &plan.transitions[index - 1];
                self.emit(MixdownEvent::TransitionApplied {
                    mashup_id,
                    from_track_id: transition.from_track_id,
                    to_track_id: transition.to_track_id,
                    overlap_seconds: transition.overlap_seconds,
                    timestamp: chrono::Utc::now(),
                });
            }
            self.emit(MixdownEvent::RenderProgress {
                mashup_id,
                tracks_done: index + 1,
                tracks_total: plan.track_order.len(),
                timestamp: chrono::Utc::now(),
            });
        };

        let mut output = match self.resolve_stem_style(&audio, options)? {
            Some(style) => {
                let mut segments = Vec::with_capacity(audio.len());
                for (index, (source, (start, length))) in
                    audio.into_iter().zip(&layout).enumerate()
                {
                    check_cancel("segment preparation")?;
                    let TrackAudio::Stems(stems) = source else {
                        return Err(Error::Render(
                            "per-stem mode requires stems for every track".to_string(),
                        ));
                    };
                    segments.push(StemSegment {
                        start_seconds: *start,
                        length_seconds: *length,
                        stems,
                    });
                    track_done(index);
                }
                check_cancel("stem blend")?;
                stems::assemble_stems(&segments, &overlaps, options.crossfade_curve, style)
            }
            None => {
                let mut segments = Vec::with_capacity(audio.len());
                for (index, (source, (start, length))) in
                    audio.into_iter().zip(&layout).enumerate()
                {
                    check_cancel("segment preparation")?;
                    let buffer = match source {
                        TrackAudio::Full(buffer) => buffer,
                        // Stems supplied to a standard job: flatten them
                        TrackAudio::Stems(stems) => flatten_stems(&stems),
                    };
                    segments.push(MixSegment {
                        start_seconds: *start,
                        length_seconds: *length,
                        audio: buffer,
                    });
                    track_done(index);
                }
                check_cancel("blend")?;
                mixer::assemble(&segments, &overlaps, options.crossfade_curve)
            }
        };

        check_cancel("loudness pass")?;
        loudness::normalize_to_lufs(&mut output, options.target_lufs);

        check_cancel("encode")?;
        let bytes = encode_wav(&output)?;

        let metrics = RenderMetrics {
            processing_time_ms: started.elapsed().as_millis() as u64,
            output_size_bytes: bytes.len(),
            stems_processed,
            transitions_applied: plan.transitions.len(),
        };
        info!(
            "Render {} complete: {} bytes, {} transitions, {} ms",
            mashup_id,
            metrics.output_size_bytes,
            metrics.transitions_applied,
            metrics.processing_time_ms
        );
        self.emit(MixdownEvent::RenderCompleted {
            mashup_id,
            processing_time_ms: metrics.processing_time_ms,
            output_size_bytes: metrics.output_size_bytes,
            timestamp: chrono::Utc::now(),
        });

        Ok(RenderOutput {
            bytes,
            mime_type: OUTPUT_MIME_TYPE,
            metrics,
        })
    }

    /// Per-stem style for this job, or None for the full-mix path
    fn resolve_stem_style(
        &self,
        audio: &[TrackAudio],
        options: &RenderOptions,
    ) -> Result<Option<StemTransitionStyle>> {
        match options.mix_mode {
            MixMode::Standard => Ok(None),
            MixMode::PerStem { style } => Ok(Some(style)),
            MixMode::VocalsOverInstrumental => {
                if audio.iter().any(|a| matches!(a, TrackAudio::Full(_))) {
                    return Err(Error::Render(
                        "vocals_over_instrumental requires stems for every track".to_string(),
                    ));
                }
                Ok(Some(StemTransitionStyle::VocalsOnly))
            }
        }
    }

    /// (start, length) in seconds for each track's playback window
    ///
    /// The first track starts at zero; every later track starts at its
    /// planned mix-in position, beat-aligned when enabled. With a target
    /// duration the total is split evenly, compensating for overlap loss;
    /// otherwise each track plays out from its start point.
    fn segment_layout(
        &self,
        plan: &MixPlan,
        analyses: &HashMap<Uuid, TrackAnalysis>,
        audio: &[TrackAudio],
        options: &RenderOptions,
    ) -> Vec<(f64, f64)> {
        let n = plan.track_order.len();
        let total_overlap: f64 = plan.transitions.iter().map(|t| t.overlap_seconds).sum();

        let shared_length = options
            .target_duration_seconds
            .map(|target| ((target + total_overlap) / n as f64).max(MIN_SEGMENT_SECONDS));

        plan.track_order
            .iter()
            .enumerate()
            .map(|(i, track_id)| {
                let mut start = if i == 0 {
                    0.0
                } else {
                    plan.transitions[i - 1].mix_in_point.position
                };
                let analysis = analyses.get(track_id);
                if options.beat_align && i > 0 {
                    if let Some(analysis) = analysis {
                        let aligned =
                            mixer::align_to_beat(start, analysis, options.beat_align_mode);
                        if aligned != start {
                            debug!(
                                "Beat-aligned track {} mix-in {:.3}s -> {:.3}s",
                                track_id, start, aligned
                            );
                            start = aligned;
                        }
                    }
                }

                let length = shared_length.unwrap_or_else(|| {
                    let source_duration = analysis
                        .map(|a| a.duration_seconds)
                        .unwrap_or_else(|| source_duration_seconds(&audio[i]));
                    (source_duration - start).max(MIN_SEGMENT_SECONDS)
                });
                (start, length)
            })
            .collect()
    }
}

fn source_duration_seconds(audio: &TrackAudio) -> f64 {
    match audio {
        TrackAudio::Full(buffer) => buffer.duration_seconds(),
        TrackAudio::Stems(stems) => stems::StemType::ALL
            .iter()
            .filter_map(|kind| stems.get(*kind))
            .filter(|s| s.is_usable())
            .filter_map(|s| s.audio.as_ref())
            .map(|a| a.duration_seconds())
            .fold(0.0, f64::max),
    }
}

/// Sum a stem set into one full-mix buffer (for standard-mode jobs that
/// only have stems available)
fn flatten_stems(stems: &StemSet) -> AudioBuffer {
    let frames = (source_duration_seconds(&TrackAudio::Stems(stems.clone()))
        * TARGET_SAMPLE_RATE as f64) as usize;
    let segment = StemSegment {
        start_seconds: 0.0,
        length_seconds: frames as f64 / TARGET_SAMPLE_RATE as f64,
        stems: stems.clone(),
    };
    stems::assemble_stems(
        std::slice::from_ref(&segment),
        &[],
        FadeCurve::EqualPower,
        StemTransitionStyle::Standard,
    )
}
