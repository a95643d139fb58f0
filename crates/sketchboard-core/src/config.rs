//! Engine tuning knobs.
//!
//! Defaults reproduce the drawing feel of the hosted board. Hosts may override
//! any subset from JSON; missing fields keep their defaults.

use crate::buffer::StrokeParams;
use crate::stroke::{DEFAULT_STROKE_COLOR, EraseTolerance};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Storage key of the local autosave slot.
pub const DEFAULT_STORAGE_KEY: &str = "sb_autosave_v1";

/// Number of snapshots kept on the undo stack.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tuning for sampling, smoothing, erasing, history and autosave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Samples closer than this to the previous raw sample are dropped.
    pub min_sample_distance: f64,
    /// Samples farther than this from the previous raw sample are treated as glitches.
    pub max_sample_distance: f64,
    /// Exponential smoothing factor for normal motion.
    pub smoothing_factor: f64,
    /// Lighter smoothing used once motion exceeds `fast_motion_threshold`.
    pub fast_smoothing_factor: f64,
    pub fast_motion_threshold: f64,
    /// Smallest eraser radius.
    pub erase_min_tolerance: f64,
    /// Eraser radius as a multiple of the stroke width.
    pub erase_width_factor: f64,
    pub history_limit: usize,
    pub autosave_debounce_ms: u64,
    pub storage_key: String,
    pub default_pen_width: f64,
    pub default_pen_color: String,
    /// Opacity of the in-progress stroke.
    pub live_stroke_opacity: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_sample_distance: 1.5,
            max_sample_distance: 50.0,
            smoothing_factor: 0.4,
            fast_smoothing_factor: 0.2,
            fast_motion_threshold: 20.0,
            erase_min_tolerance: 8.0,
            erase_width_factor: 1.5,
            history_limit: DEFAULT_HISTORY_LIMIT,
            autosave_debounce_ms: 500,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            default_pen_width: 3.0,
            default_pen_color: DEFAULT_STROKE_COLOR.to_string(),
            live_stroke_opacity: 0.9,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values describe a usable engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(self.min_sample_distance >= 0.0 && self.min_sample_distance < self.max_sample_distance) {
            return invalid("min_sample_distance must be non-negative and below max_sample_distance");
        }
        for factor in [self.smoothing_factor, self.fast_smoothing_factor] {
            if !(0.0..1.0).contains(&factor) {
                return invalid("smoothing factors must be in [0, 1)");
            }
        }
        if !(self.erase_min_tolerance > 0.0 && self.erase_width_factor >= 0.0) {
            return invalid("eraser tolerance must be positive");
        }
        if self.history_limit == 0 {
            return invalid("history_limit must be at least 1");
        }
        if self.storage_key.is_empty() {
            return invalid("storage_key must not be empty");
        }
        if !(self.default_pen_width.is_finite() && self.default_pen_width > 0.0) {
            return invalid("default_pen_width must be a positive number");
        }
        if !(0.0..=1.0).contains(&self.live_stroke_opacity) {
            return invalid("live_stroke_opacity must be in [0, 1]");
        }
        Ok(())
    }

    pub fn stroke_params(&self) -> StrokeParams {
        StrokeParams {
            min_distance: self.min_sample_distance,
            max_distance: self.max_sample_distance,
            smoothing_factor: self.smoothing_factor,
            fast_smoothing_factor: self.fast_smoothing_factor,
            fast_motion_threshold: self.fast_motion_threshold,
        }
    }

    pub fn erase_tolerance(&self) -> EraseTolerance {
        EraseTolerance {
            min: self.erase_min_tolerance,
            width_factor: self.erase_width_factor,
        }
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage_key, "sb_autosave_v1");
        assert_eq!(config.autosave_debounce(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"history_limit": 50}"#).unwrap();
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.min_sample_distance, 1.5);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let result = EngineConfig::from_json(r#"{"smoothing_factor": 1.5}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = EngineConfig::from_json(r#"{"history_limit": 0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = EngineConfig::from_json("not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
