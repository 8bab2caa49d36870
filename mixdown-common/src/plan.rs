//! Shared transition plan data model
//!
//! These types cross the boundary between the planner and the render
//! engine, and appear in job files and event payloads, so they live in the
//! common crate. A plan is created once, is immutable afterward, and is
//! consumed exactly once by the render step.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall transition flavour requested for the mashup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionStyle {
    /// Long, beat-matched blends
    #[default]
    Smooth,
    /// Cut the incoming track in at its drop
    Drop,
    /// Hard cuts with minimal overlap
    Cut,
    /// Energy-aware blends following the event arc
    Energy,
}

impl TransitionStyle {
    /// Default overlap used when the job specifies none
    pub fn default_overlap_seconds(&self) -> f64 {
        match self {
            TransitionStyle::Smooth => 16.0,
            TransitionStyle::Energy => 8.0,
            TransitionStyle::Drop => 4.0,
            TransitionStyle::Cut => 0.5,
        }
    }
}

/// Where in the incoming track a transition lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixInStrategy {
    Intro,
    PostIntro,
    Buildup,
    Drop,
    Verse,
    Custom,
}

/// Chosen mix-in point for one transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixInPoint {
    /// Position in the incoming track, seconds from its start
    pub position: f64,
    pub strategy: MixInStrategy,
    /// Human-readable rationale for the choice
    pub reason: String,
}

/// One planned transition between consecutive tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTransition {
    pub from_track_id: Uuid,
    pub to_track_id: Uuid,
    /// Blend duration, always > 0
    pub overlap_seconds: f64,
    pub style: TransitionStyle,
    pub mix_in_point: MixInPoint,
}

/// Complete plan for a mashup: track order plus one transition per pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixPlan {
    pub track_order: Vec<Uuid>,
    pub transitions: Vec<PlannedTransition>,
}

impl MixPlan {
    /// A plan is internally consistent when it has exactly one transition
    /// per consecutive track pair
    pub fn is_consistent(&self) -> bool {
        if self.track_order.len() < 2 {
            return self.transitions.is_empty();
        }
        self.transitions.len() == self.track_order.len() - 1
            && self
                .transitions
                .iter()
                .zip(self.track_order.windows(2))
                .all(|(t, pair)| t.from_track_id == pair[0] && t.to_track_id == pair[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_overlaps_by_style() {
        assert_eq!(TransitionStyle::Smooth.default_overlap_seconds(), 16.0);
        assert_eq!(TransitionStyle::Energy.default_overlap_seconds(), 8.0);
        assert_eq!(TransitionStyle::Drop.default_overlap_seconds(), 4.0);
        assert_eq!(TransitionStyle::Cut.default_overlap_seconds(), 0.5);
    }

    #[test]
    fn test_plan_consistency() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let transition = PlannedTransition {
            from_track_id: a,
            to_track_id: b,
            overlap_seconds: 8.0,
            style: TransitionStyle::Smooth,
            mix_in_point: MixInPoint {
                position: 15.0,
                strategy: MixInStrategy::PostIntro,
                reason: "standard transition".to_string(),
            },
        };

        let plan = MixPlan {
            track_order: vec![a, b],
            transitions: vec![transition.clone()],
        };
        assert!(plan.is_consistent());

        let single = MixPlan {
            track_order: vec![a],
            transitions: vec![],
        };
        assert!(single.is_consistent());

        let broken = MixPlan {
            track_order: vec![b, a],
            transitions: vec![transition],
        };
        assert!(!broken.is_consistent());
    }
}
