use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::OrbitCamera;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Tunables for the frame renderer.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub camera: OrbitCamera,
    /// Height of the four scene lights.
    pub light_height: f32,
    pub light_color: [f32; 3],
    pub clear_color: [f64; 4],
    /// Copies of every per-frame buffer (clamped to 1..=3).
    pub frames_in_flight: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 65.0,
            near: 1.0,
            far: 150.0,
            camera: OrbitCamera::default(),
            light_height: 10.0,
            light_color: [50.0, 50.0, 50.0],
            clear_color: [1.0, 1.0, 1.0, 1.0],
            frames_in_flight: 2,
        }
    }
}

impl RendererConfig {
    pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Loaded renderer config from {}", path.display());
        Ok(config)
    }

    pub fn fov_y_radians(&self) -> f32 {
        self.fov_y_degrees.to_radians()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight.clamp(1, Self::MAX_FRAMES_IN_FLIGHT)
    }
}
