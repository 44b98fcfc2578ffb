//! Shared math, camera and configuration types for the Radiant renderer.

pub mod camera;
pub mod config;
pub mod math;
pub mod transform;

pub use camera::OrbitCamera;
pub use config::{ConfigError, RendererConfig};
