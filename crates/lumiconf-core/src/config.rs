//! Engine configuration.

use crate::lights::LightTable;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Zoom-dependent handle scale.
///
/// Zoom is clamped to `[min_zoom, max_zoom]`, then the scale falls linearly
/// from `max` at `min_zoom` (zoomed out) to `min` at `max_zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandleScale {
    /// Scale when fully zoomed in.
    pub min: f64,
    /// Scale when fully zoomed out.
    pub max: f64,
    /// Lowest zoom taken into account.
    pub min_zoom: f64,
    /// Highest zoom taken into account.
    pub max_zoom: f64,
}

impl Default for HandleScale {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: 2.0,
            min_zoom: 10.0,
            max_zoom: 100.0,
        }
    }
}

impl HandleScale {
    pub fn for_zoom(&self, zoom: f64) -> f64 {
        let span = self.min_zoom - self.max_zoom;
        if span.abs() < f64::EPSILON {
            return self.min;
        }
        let zoom = zoom.clamp(self.min_zoom.min(self.max_zoom), self.min_zoom.max(self.max_zoom));
        (self.min * (self.min_zoom - zoom) + self.max * (zoom - self.max_zoom)) / span
    }
}

/// Tunables for curve sampling, light placement, handles and framing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Divisions used when sampling a line junction for the nearest point.
    pub curve_samples: usize,
    /// Fraction excluded at each end of a curve when sampling.
    pub curve_margin: f64,
    /// Lowest curve position a light may take.
    pub light_margin_min: f64,
    /// Highest curve position a light may take.
    pub light_margin_max: f64,
    pub light_models: LightTable,
    pub handle_scale: HandleScale,
    /// Vertical field of view of the scene camera, in degrees.
    pub camera_fov_deg: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            curve_samples: 200,
            curve_margin: 0.05,
            light_margin_min: 0.05,
            light_margin_max: 0.95,
            light_models: LightTable::default(),
            handle_scale: HandleScale::default(),
            camera_fov_deg: 70.0,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded engine config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_handle_scale_endpoints() {
        let scale = HandleScale::default();
        assert!((scale.for_zoom(10.0) - 2.0).abs() < 1e-12);
        assert!((scale.for_zoom(100.0) - 0.1).abs() < 1e-12);
        assert!((scale.for_zoom(55.0) - 1.05).abs() < 1e-12);
    }

    #[test]
    fn test_handle_scale_clamps_zoom() {
        let scale = HandleScale::default();
        assert!((scale.for_zoom(1.0) - 2.0).abs() < 1e-12);
        assert!((scale.for_zoom(1000.0) - 0.1).abs() < 1e-12);
        assert!(scale.for_zoom(-50.0) > 0.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{"curve_samples": 50}"#).unwrap();
        assert_eq!(config.curve_samples, 50);
        assert_eq!(config.light_margin_max, 0.95);
        assert_eq!(config.light_models, LightTable::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"camera_fov_deg": 45.0}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.camera_fov_deg, 45.0);

        assert!(matches!(
            EngineConfig::load(Path::new("/nonexistent/lumiconf.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
