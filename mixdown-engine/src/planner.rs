//! Transition planning
//!
//! Turns an ordered track list into a [`MixPlan`]: one [`PlannedTransition`]
//! per consecutive pair, each carrying overlap duration, style and mix-in
//! point. Planning is pure and deterministic: the same ordered input
//! always yields the same plan, which previews and caching rely on.
//!
//! Mix-in strategy selection is a fixed-precedence rule cascade. The rules
//! live in an ordered table evaluated front to back, first match wins, so
//! the precedence contract is data rather than control flow buried in
//! nested conditionals.

use serde::{Deserialize, Serialize};

use mixdown_common::analysis::{SectionLabel, TrackAnalysis};
use mixdown_common::plan::{MixInPoint, MixInStrategy, MixPlan, PlannedTransition, TransitionStyle};
use mixdown_common::timing::bar_duration;

use crate::cue::{self, CuePoints};

/// Overall arc of the event the mashup is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Warmup into a sustained peak (classic club night)
    #[default]
    BuildToPeak,
    /// Short warmup, then peak throughout (festival slot)
    SteadyPeak,
    /// Never reaches peak energy (lounge, background)
    Chill,
}

/// Energy phase of the set at a given position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyPhase {
    Warmup,
    Build,
    Peak,
    Cooldown,
}

impl EnergyPhase {
    /// Coarse intensity ordering used to check phase progressions
    pub fn intensity(&self) -> u8 {
        match self {
            EnergyPhase::Warmup => 0,
            EnergyPhase::Build => 1,
            EnergyPhase::Cooldown => 2,
            EnergyPhase::Peak => 3,
        }
    }
}

/// Phase for transition `index` of `total` under the given event arc
///
/// For `BuildToPeak` the phase is monotonically non-decreasing in intensity
/// as `index` grows.
pub fn energy_phase(index: usize, total: usize, event_type: EventType) -> EnergyPhase {
    let progress = if total == 0 {
        0.0
    } else {
        index as f64 / total as f64
    };

    match event_type {
        EventType::BuildToPeak => {
            if progress < 0.2 {
                EnergyPhase::Warmup
            } else if progress < 0.5 {
                EnergyPhase::Build
            } else {
                EnergyPhase::Peak
            }
        }
        EventType::SteadyPeak => {
            if progress < 0.1 {
                EnergyPhase::Warmup
            } else {
                EnergyPhase::Peak
            }
        }
        EventType::Chill => {
            if progress < 0.3 {
                EnergyPhase::Warmup
            } else if progress < 0.7 {
                EnergyPhase::Build
            } else {
                EnergyPhase::Cooldown
            }
        }
    }
}

/// Per-job planning configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanConfig {
    pub transition_style: TransitionStyle,
    pub event_type: EventType,
    /// Overlap for every transition; per-style default when None
    pub overlap_seconds: Option<f64>,
}

/// Everything a mix-in rule may consult about one transition
struct RuleContext<'a> {
    style: TransitionStyle,
    phase: EnergyPhase,
    overlap_seconds: f64,
    /// Bar duration of the incoming track
    to_bar: f64,
    to_cues: &'a CuePoints,
    /// Buildup section start on the incoming track, when present
    to_buildup_start: Option<f64>,
}

/// One entry in the mix-in cascade: first rule to return Some wins
struct MixInRule {
    name: &'static str,
    apply: fn(&RuleContext) -> Option<MixInPoint>,
}

/// The cascade, in contract order. Order here IS the precedence.
const MIX_IN_RULES: &[MixInRule] = &[
    MixInRule {
        name: "drop_style_with_drop_cue",
        apply: |ctx| {
            if ctx.style == TransitionStyle::Drop {
                if let Some(drop) = ctx.to_cues.drop {
                    return Some(MixInPoint {
                        position: drop,
                        strategy: MixInStrategy::Drop,
                        reason: "drop mixing".to_string(),
                    });
                }
            }
            None
        },
    },
    MixInRule {
        name: "peak_phase_buildup",
        apply: |ctx| {
            if ctx.phase == EnergyPhase::Peak {
                if let Some(buildup_start) = ctx.to_buildup_start {
                    return Some(MixInPoint {
                        position: buildup_start,
                        strategy: MixInStrategy::Buildup,
                        reason: "peak phase energy match".to_string(),
                    });
                }
            }
            None
        },
    },
    MixInRule {
        name: "short_overlap_skips_intro",
        apply: |ctx| {
            if ctx.overlap_seconds < 8.0 * ctx.to_bar {
                return Some(MixInPoint {
                    position: ctx.to_cues.mix_in,
                    strategy: MixInStrategy::PostIntro,
                    reason: "short transition, skip intro".to_string(),
                });
            }
            None
        },
    },
    MixInRule {
        name: "long_overlap_full_intro",
        apply: |ctx| {
            if ctx.overlap_seconds >= 16.0 * ctx.to_bar {
                return Some(MixInPoint {
                    position: 0.0,
                    strategy: MixInStrategy::Intro,
                    reason: "long transition, full intro blend".to_string(),
                });
            }
            None
        },
    },
];

fn default_mix_in(cues: &CuePoints) -> MixInPoint {
    MixInPoint {
        position: cues.mix_in,
        strategy: MixInStrategy::PostIntro,
        reason: "standard transition".to_string(),
    }
}

fn select_mix_in(ctx: &RuleContext) -> (MixInPoint, &'static str) {
    for rule in MIX_IN_RULES {
        if let Some(point) = (rule.apply)(ctx) {
            return (point, rule.name);
        }
    }
    (default_mix_in(ctx.to_cues), "default")
}

/// Plan transitions for an ordered track list
///
/// Never fails on missing cue data: cue detection always degrades to
/// usable defaults, so a plan is producible for any input. Fewer than two
/// tracks yields a plan with no transitions.
pub fn plan(tracks: &[TrackAnalysis], config: &PlanConfig) -> MixPlan {
    let track_order = tracks.iter().map(|t| t.track_id).collect();
    let total = tracks.len();

    let overlap_seconds = config
        .overlap_seconds
        .unwrap_or_else(|| config.transition_style.default_overlap_seconds());

    let mut transitions = Vec::with_capacity(total.saturating_sub(1));
    for (index, pair) in tracks.windows(2).enumerate() {
        let (from, to) = (&pair[0], &pair[1]);
        let to_cues = cue::detect(to);
        let phase = energy_phase(index, total, config.event_type);

        let ctx = RuleContext {
            style: config.transition_style,
            phase,
            overlap_seconds,
            to_bar: bar_duration(to.effective_bpm()),
            to_cues: &to_cues,
            to_buildup_start: to
                .section_map()
                .get(SectionLabel::Buildup)
                .map(|s| s.start),
        };

        let (mix_in_point, rule_name) = select_mix_in(&ctx);
        tracing::debug!(
            from = %from.track_id,
            to = %to.track_id,
            ?phase,
            rule = rule_name,
            position = mix_in_point.position,
            "planned transition"
        );

        transitions.push(PlannedTransition {
            from_track_id: from.track_id,
            to_track_id: to.track_id,
            overlap_seconds,
            style: config.transition_style,
            mix_in_point,
        });
    }

    MixPlan {
        track_order,
        transitions,
    }
}
