//! Engine configuration loading
//!
//! Configuration is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `MIXDOWN_CONFIG` environment variable
//! 3. Platform config file (`~/.config/mixdown/config.toml` on Linux)
//! 4. Compiled defaults (fallback)
//!
//! Job files may override individual fields per render; this covers the
//! process-wide defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fade_curves::FadeCurve;
use crate::plan::TransitionStyle;

/// Which beat-grid entries beat alignment may snap to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeatAlignMode {
    /// Snap only to downbeats (every 4th grid entry)
    #[default]
    Downbeat,
    /// Snap to any beat
    Any,
}

/// Process-wide engine defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default transition style when a job specifies none
    pub transition_style: TransitionStyle,

    /// Default crossfade curve
    pub crossfade_curve: FadeCurve,

    /// Align transition starts with the incoming track's beat grid
    pub beat_align: bool,

    pub beat_align_mode: BeatAlignMode,

    /// Integrated loudness target for the final normalization pass (LUFS)
    pub target_lufs: f64,

    /// Relative BPM difference at which compatibility reaches zero
    pub bpm_tolerance: f64,

    /// Hard bounds on requested output duration, seconds
    pub min_duration_seconds: f64,
    pub max_duration_seconds: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transition_style: TransitionStyle::Smooth,
            crossfade_curve: FadeCurve::EqualPower,
            beat_align: true,
            beat_align_mode: BeatAlignMode::Downbeat,
            target_lufs: -23.0,
            bpm_tolerance: 0.08,
            min_duration_seconds: 10.0,
            max_duration_seconds: 3600.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration following the priority order above
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var("MIXDOWN_CONFIG") {
            return Self::from_file(Path::new(&path));
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load and validate a specific TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.bpm_tolerance) {
            return Err(Error::Config(format!(
                "bpm_tolerance must be within [0, 1], got {}",
                self.bpm_tolerance
            )));
        }
        if self.target_lufs > 0.0 {
            return Err(Error::Config(format!(
                "target_lufs must be non-positive, got {}",
                self.target_lufs
            )));
        }
        if self.min_duration_seconds <= 0.0 || self.max_duration_seconds <= self.min_duration_seconds
        {
            return Err(Error::Config(format!(
                "invalid duration bounds [{}, {}]",
                self.min_duration_seconds, self.max_duration_seconds
            )));
        }
        Ok(())
    }
}

/// Platform config file path (`~/.config/mixdown/config.toml` on Linux)
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mixdown").join("config.toml"))
}
