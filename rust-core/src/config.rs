//! Analyzer configuration.
//!
//! Every threshold an analyzer uses is a named constant in that analyzer's
//! module; the config structs default to those constants and can be
//! overridden from a TOML file for tuning without touching control flow.
//!
//! ```toml
//! [pushup]
//! down_angle = 85.0
//!
//! [situp]
//! stability_frames = 2
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analyzer::MIN_REP_DURATION_MS;
use crate::error::{EngineError, Result};
use crate::{pullup, pushup, situp};

/// Push-up thresholds. Angles are elbow angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushupConfig {
    /// Minimum visibility for a required landmark to be trusted.
    pub required_visibility: f32,
    /// Elbow angle at or below which the athlete is at the bottom.
    pub down_angle: f32,
    /// Elbow angle at or above which the arms are locked out.
    pub up_angle: f32,
    /// Consecutive frames a new position must persist before it is accepted.
    pub stability_frames: u32,
    /// Maximum vertical offset between the shoulders.
    pub shoulder_level_tolerance: f32,
    /// Maximum distance the hips may drop below the body line.
    pub hip_sag_tolerance: f32,
    /// Maximum distance the hips may rise above the body line.
    pub hip_pike_tolerance: f32,
    /// Largest mid-range elbow angle change between two frames.
    pub max_angle_step: f32,
    /// How far the elbows must leave lockout before a turnaround counts as
    /// an attempted (partial) repetition.
    pub partial_rep_margin: f32,
    /// Shortest time between two counted repetitions. Faster ones are
    /// rejected. Zero disables the check.
    pub min_rep_duration_ms: u64,
}

impl Default for PushupConfig {
    fn default() -> Self {
        Self {
            required_visibility: pushup::REQUIRED_VISIBILITY,
            down_angle: pushup::DOWN_ANGLE_THRESHOLD,
            up_angle: pushup::UP_ANGLE_THRESHOLD,
            stability_frames: pushup::STABILITY_FRAMES,
            shoulder_level_tolerance: pushup::SHOULDER_LEVEL_TOLERANCE,
            hip_sag_tolerance: pushup::HIP_SAG_TOLERANCE,
            hip_pike_tolerance: pushup::HIP_PIKE_TOLERANCE,
            max_angle_step: pushup::MAX_ANGLE_STEP,
            partial_rep_margin: pushup::PARTIAL_REP_MARGIN,
            min_rep_duration_ms: MIN_REP_DURATION_MS,
        }
    }
}

/// Pull-up thresholds. Angles are elbow angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullupConfig {
    pub required_visibility: f32,
    /// Elbow angle at or below which the arms are fully flexed.
    pub down_angle: f32,
    /// Elbow angle at or above which the athlete is in a dead hang.
    pub up_angle: f32,
    pub stability_frames: u32,
    /// How far the nose must be above the wrist line to clear the bar.
    pub chin_over_bar_margin: f32,
    /// Allowed drift of the hip-to-shoulder horizontal offset.
    pub kipping_tolerance: f32,
    pub partial_rep_margin: f32,
    pub min_rep_duration_ms: u64,
}

impl Default for PullupConfig {
    fn default() -> Self {
        Self {
            required_visibility: pullup::REQUIRED_VISIBILITY,
            down_angle: pullup::DOWN_ANGLE_THRESHOLD,
            up_angle: pullup::UP_ANGLE_THRESHOLD,
            stability_frames: pullup::STABILITY_FRAMES,
            chin_over_bar_margin: pullup::CHIN_OVER_BAR_MARGIN,
            kipping_tolerance: pullup::KIPPING_TOLERANCE,
            partial_rep_margin: pullup::PARTIAL_REP_MARGIN,
            min_rep_duration_ms: MIN_REP_DURATION_MS,
        }
    }
}

/// Sit-up thresholds. Angles are hip angles (shoulder-hip-knee) in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitupConfig {
    pub required_visibility: f32,
    /// Hip angle at or above which the athlete is lying back.
    pub down_angle: f32,
    /// Hip angle at or below which the athlete is curled up.
    pub up_angle: f32,
    pub stability_frames: u32,
    pub shoulder_level_tolerance: f32,
    /// Maximum wrist to opposite-shoulder distance for crossed arms.
    pub arms_crossed_distance: f32,
    /// Maximum elbow to same-side shoulder distance for crossed arms.
    pub elbow_tuck_distance: f32,
    pub partial_rep_margin: f32,
    pub min_rep_duration_ms: u64,
}

impl Default for SitupConfig {
    fn default() -> Self {
        Self {
            required_visibility: situp::REQUIRED_VISIBILITY,
            down_angle: situp::DOWN_ANGLE_THRESHOLD,
            up_angle: situp::UP_ANGLE_THRESHOLD,
            stability_frames: situp::STABILITY_FRAMES,
            shoulder_level_tolerance: situp::SHOULDER_LEVEL_TOLERANCE,
            arms_crossed_distance: situp::ARMS_CROSSED_DISTANCE,
            elbow_tuck_distance: situp::ELBOW_TUCK_DISTANCE,
            partial_rep_margin: situp::PARTIAL_REP_MARGIN,
            min_rep_duration_ms: MIN_REP_DURATION_MS,
        }
    }
}

/// Configuration for all analyzers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pushup: PushupConfig,
    pub pullup: PullupConfig,
    pub situp: SitupConfig,
}

impl EngineConfig {
    /// Parses and validates a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Rejects threshold sets the state machines cannot work with.
    pub fn validate(&self) -> Result<()> {
        let p = &self.pushup;
        check_common("pushup", p.required_visibility, p.stability_frames)?;
        check_band("pushup", p.down_angle, p.up_angle, p.partial_rep_margin)?;

        let p = &self.pullup;
        check_common("pullup", p.required_visibility, p.stability_frames)?;
        check_band("pullup", p.down_angle, p.up_angle, p.partial_rep_margin)?;

        // Sit-ups close the hip to go up, so the band is reversed.
        let s = &self.situp;
        check_common("situp", s.required_visibility, s.stability_frames)?;
        check_band("situp", s.up_angle, s.down_angle, s.partial_rep_margin)?;
        Ok(())
    }
}

fn check_common(exercise: &'static str, visibility: f32, stability_frames: u32) -> Result<()> {
    if !(0.0..=1.0).contains(&visibility) {
        return Err(EngineError::InvalidThresholds {
            exercise,
            reason: format!("required_visibility {visibility} outside [0, 1]"),
        });
    }
    if stability_frames == 0 {
        return Err(EngineError::InvalidThresholds {
            exercise,
            reason: "stability_frames must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// `low` is the flexed extreme, `high` the open one.
fn check_band(exercise: &'static str, low: f32, high: f32, margin: f32) -> Result<()> {
    if !(0.0 < low && low < high && high <= 180.0) {
        return Err(EngineError::InvalidThresholds {
            exercise,
            reason: format!("angles must satisfy 0 < {low} < {high} <= 180"),
        });
    }
    if !(0.0 < margin && margin < high - low) {
        return Err(EngineError::InvalidThresholds {
            exercise,
            reason: format!("partial_rep_margin {margin} must be inside the {low}..{high} band"),
        });
    }
    Ok(())
}
