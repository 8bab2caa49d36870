//! # Mixdown Common Library
//!
//! Shared code for the mixdown engine including:
//! - Track analysis data model (BPM, key, beat grid, structure sections)
//! - Camelot wheel key notation and harmonic compatibility
//! - Event types (MixdownEvent enum)
//! - Configuration loading
//! - Fade curve definitions and calculations
//! - Bar/phrase timing utilities

pub mod analysis;
pub mod camelot;
pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;
pub mod plan;
pub mod timing;

pub use analysis::{SectionLabel, StructureSection, TrackAnalysis};
pub use camelot::CamelotKey;
pub use error::{Error, Result};
pub use events::{JobStatus, MixdownEvent};
pub use fade_curves::FadeCurve;
pub use plan::{MixInPoint, MixInStrategy, MixPlan, PlannedTransition, TransitionStyle};
