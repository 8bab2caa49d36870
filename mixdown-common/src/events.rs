//! Event types for the mixdown engine
//!
//! Emitted over a broadcast channel during a render job so external
//! collaborators (job dispatcher, progress UI) can observe it without
//! reaching into the engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal and in-flight states of a render job
///
/// `Rendering` is only ever left via `Completed`, `Failed` or `Cancelled`.
/// There is no resume path: a cancelled job must be re-submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Rendering,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Mixdown engine event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MixdownEvent {
    /// Render job started executing
    RenderStarted {
        mashup_id: Uuid,
        track_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One transition was blended into the output
    TransitionApplied {
        mashup_id: Uuid,
        from_track_id: Uuid,
        to_track_id: Uuid,
        overlap_seconds: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic progress update (per processed track)
    RenderProgress {
        mashup_id: Uuid,
        tracks_done: usize,
        tracks_total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Render job finished successfully
    RenderCompleted {
        mashup_id: Uuid,
        processing_time_ms: u64,
        output_size_bytes: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Render job failed; `reason` is suitable for user display
    RenderFailed {
        mashup_id: Uuid,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Render job was cancelled cooperatively (not a failure)
    RenderCancelled {
        mashup_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl MixdownEvent {
    /// The mashup this event refers to
    pub fn mashup_id(&self) -> Uuid {
        match self {
            MixdownEvent::RenderStarted { mashup_id, .. }
            | MixdownEvent::TransitionApplied { mashup_id, .. }
            | MixdownEvent::RenderProgress { mashup_id, .. }
            | MixdownEvent::RenderCompleted { mashup_id, .. }
            | MixdownEvent::RenderFailed { mashup_id, .. }
            | MixdownEvent::RenderCancelled { mashup_id, .. } => *mashup_id,
        }
    }
}
