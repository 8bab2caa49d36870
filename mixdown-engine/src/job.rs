//! Render job lifecycle
//!
//! A job is validated fail-fast before any audio is touched, then planned
//! and rendered on a blocking worker thread. The handle returned by
//! `spawn_render` carries a cooperative cancellation signal and a one-shot
//! result; the job dispatcher guarantees at most one active render per
//! mashup id, so nothing here locks across jobs.
//!
//! State machine: `queued -> rendering -> {completed | failed | cancelled}`.
//! Cancellation is terminal; a cancelled job must be re-submitted.

use std::collections::HashMap;
use std::sync::Arc;

use mixdown_common::config::{BeatAlignMode, EngineConfig};
use mixdown_common::{FadeCurve, JobStatus, MixdownEvent, TrackAnalysis, TransitionStyle};
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::planner::{self, EventType, PlanConfig};
use crate::render::{MixMode, RenderEngine, RenderOptions, RenderOutput, TrackAudio};

/// One render job as submitted by the dispatcher
///
/// Optional fields override the process-wide config for this job only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub mashup_id: Uuid,
    /// Tracks in playback order
    pub track_ids: Vec<Uuid>,

    #[serde(default)]
    pub target_duration_seconds: Option<f64>,
    #[serde(default)]
    pub mix_mode: MixMode,
    #[serde(default)]
    pub transition_style: Option<TransitionStyle>,
    #[serde(default)]
    pub event_type: Option<EventType>,
    #[serde(default)]
    pub overlap_seconds: Option<f64>,
    #[serde(default)]
    pub crossfade_curve: Option<FadeCurve>,
    #[serde(default)]
    pub beat_align: Option<bool>,
    #[serde(default)]
    pub beat_align_mode: Option<BeatAlignMode>,
    #[serde(default)]
    pub target_lufs: Option<f64>,

    /// Accepted in the wire format but rejected at validation; no
    /// time-stretching DSP exists in this engine
    #[serde(default)]
    pub pitch_shift_semitones: Option<f64>,
    #[serde(default)]
    pub target_bpm: Option<f64>,
}

impl JobRequest {
    /// Reject malformed jobs before any audio work starts
    pub fn validate(
        &self,
        config: &EngineConfig,
        analyses: &HashMap<Uuid, TrackAnalysis>,
    ) -> Result<()> {
        if self.track_ids.is_empty() {
            return Err(Error::Config("job names no tracks".to_string()));
        }
        for track_id in &self.track_ids {
            if !analyses.contains_key(track_id) {
                return Err(Error::NotFound(format!(
                    "no analysis for track {track_id}"
                )));
            }
        }
        if let Some(overlap) = self.overlap_seconds {
            if overlap <= 0.0 || !overlap.is_finite() {
                return Err(Error::Config(format!(
                    "overlap_seconds must be positive, got {overlap}"
                )));
            }
        }
        if let Some(duration) = self.target_duration_seconds {
            if !(config.min_duration_seconds..=config.max_duration_seconds).contains(&duration) {
                return Err(Error::Config(format!(
                    "target duration {duration}s outside allowed range [{}, {}]",
                    config.min_duration_seconds, config.max_duration_seconds
                )));
            }
        }
        if let Some(lufs) = self.target_lufs {
            if lufs > 0.0 {
                return Err(Error::Config(format!(
                    "target_lufs must be non-positive, got {lufs}"
                )));
            }
        }
        if self.pitch_shift_semitones.is_some() {
            return Err(Error::Config(
                "pitch_shift_semitones is not supported: no time-stretch DSP is available"
                    .to_string(),
            ));
        }
        if self.target_bpm.is_some() {
            return Err(Error::Config(
                "target_bpm is not supported: no time-stretch DSP is available".to_string(),
            ));
        }
        Ok(())
    }

    fn plan_config(&self, config: &EngineConfig) -> PlanConfig {
        PlanConfig {
            transition_style: self.transition_style.unwrap_or(config.transition_style),
            event_type: self.event_type.unwrap_or_default(),
            overlap_seconds: self.overlap_seconds,
        }
    }

    fn render_options(&self, config: &EngineConfig) -> RenderOptions {
        RenderOptions {
            crossfade_curve: self.crossfade_curve.unwrap_or(config.crossfade_curve),
            beat_align: self.beat_align.unwrap_or(config.beat_align),
            beat_align_mode: self.beat_align_mode.unwrap_or(config.beat_align_mode),
            target_lufs: self.target_lufs.unwrap_or(config.target_lufs),
            target_duration_seconds: self.target_duration_seconds,
            mix_mode: self.mix_mode,
        }
    }
}

/// Cloneable cancellation trigger for one job
#[derive(Clone)]
pub struct JobCanceller {
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl JobCanceller {
    /// Request cooperative cancellation; the job stops between track steps
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }
}

/// Control surface for one in-flight render
pub struct JobHandle {
    pub mashup_id: Uuid,
    canceller: JobCanceller,
    status_rx: watch::Receiver<JobStatus>,
    result_rx: oneshot::Receiver<Result<RenderOutput>>,
}

impl JobHandle {
    /// Request cooperative cancellation; the job stops between track steps
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// A trigger that outlives the handle (signal handlers, dispatchers)
    pub fn canceller(&self) -> JobCanceller {
        self.canceller.clone()
    }

    pub fn status(&self) -> JobStatus {
        *self.status_rx.borrow()
    }

    /// Wait for the next status change and return the new status
    ///
    /// Once the job is terminal the current status is returned immediately.
    pub async fn status_changed(&mut self) -> JobStatus {
        // A closed channel means the worker already sent its terminal
        // status; borrow returns it
        let _ = self.status_rx.changed().await;
        *self.status_rx.borrow()
    }

    /// Wait for the job to reach a terminal state
    pub async fn wait(self) -> Result<RenderOutput> {
        self.result_rx
            .await
            .map_err(|_| Error::Internal("render task dropped before completing".to_string()))?
    }
}

/// Validate, plan and render a job on a blocking worker thread
///
/// Inputs must be fully materialized: one `TrackAudio` per track id, in
/// job order. Validation failures surface through the handle with the job
/// already in `Failed`; nothing is rendered.
pub fn spawn_render(
    engine: Arc<RenderEngine>,
    request: JobRequest,
    config: EngineConfig,
    analyses: HashMap<Uuid, TrackAnalysis>,
    audio: Vec<TrackAudio>,
) -> JobHandle {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (status_tx, status_rx) = watch::channel(JobStatus::Queued);
    let (result_tx, result_rx) = oneshot::channel();
    let mashup_id = request.mashup_id;

    tokio::task::spawn_blocking(move || {
        let _ = status_tx.send(JobStatus::Rendering);
        let result = run_job(&engine, &request, &config, &analyses, audio, &cancel_rx);
        let terminal = match &result {
            Ok(_) => JobStatus::Completed,
            Err(Error::Cancelled) => JobStatus::Cancelled,
            Err(e) => {
                warn!("Render job {} failed: {}", mashup_id, e);
                engine.emit(MixdownEvent::RenderFailed {
                    mashup_id,
                    reason: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                JobStatus::Failed
            }
        };
        let _ = status_tx.send(terminal);
        let _ = result_tx.send(result);
    });

    JobHandle {
        mashup_id,
        canceller: JobCanceller {
            cancel_tx: Arc::new(cancel_tx),
        },
        status_rx,
        result_rx,
    }
}

fn run_job(
    engine: &RenderEngine,
    request: &JobRequest,
    config: &EngineConfig,
    analyses: &HashMap<Uuid, TrackAnalysis>,
    audio: Vec<TrackAudio>,
    cancel: &watch::Receiver<bool>,
) -> Result<RenderOutput> {
    request.validate(config, analyses)?;
    if audio.len() != request.track_ids.len() {
        return Err(Error::Config(format!(
            "job names {} tracks but {} audio sources were supplied",
            request.track_ids.len(),
            audio.len()
        )));
    }

    info!(
        "Render job {} starting: {} tracks",
        request.mashup_id,
        request.track_ids.len()
    );

    // validate() guarantees every id has an analysis
    let ordered: Vec<TrackAnalysis> = request
        .track_ids
        .iter()
        .filter_map(|id| analyses.get(id).cloned())
        .collect();
    let plan = planner::plan(&ordered, &request.plan_config(config));

    engine.render(
        request.mashup_id,
        &plan,
        analyses,
        audio,
        &request.render_options(config),
        cancel,
    )
}
