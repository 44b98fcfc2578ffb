use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::math;

/// A camera that orbits the scene's vertical axis at a fixed angular step
/// per frame.
///
/// The orbit is frame-locked: a faster display spins faster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Radians added per rendered frame.
    pub angular_step: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::new(0.0, 2.0, 0.0),
            up: Vec3::Y,
            angular_step: 0.0025,
        }
    }
}

impl OrbitCamera {
    /// View matrix for `frame`: look-at followed by the orbit rotation
    /// about `up`.
    pub fn view_matrix(&self, frame: u64) -> Mat4 {
        let angle = frame as f32 * self.angular_step;
        math::look_at_rh(self.eye, self.target, self.up) * math::rotation(self.up.normalize(), angle)
    }

    /// Eye position handed to the shader for specular terms.
    pub fn position(&self) -> Vec3 {
        self.eye
    }
}
