//! # Mixdown Engine Library
//!
//! Transition planning and mixing engine for continuous mashups.
//!
//! **Purpose:** Derive cue points from track structure, score BPM/key
//! compatibility, plan overlap/style/mix-in for every consecutive track
//! pair, and render the plan into one continuous audio buffer, full-mix or
//! per-stem.
//!
//! **Architecture:** Pure planning stages (cue, compat, plan) feeding an
//! offline render stage that owns its buffers for the lifetime of one job.
//! Rendering runs as a spawned task with a cancellation signal and a result
//! channel; storage fetch/upload and job dispatch are external
//! collaborators.

pub mod audio;
pub mod compat;
pub mod cue;
pub mod error;
pub mod job;
pub mod planner;
pub mod render;
pub mod store;

pub use error::{Error, Result};
