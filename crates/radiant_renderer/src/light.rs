use glam::Vec3;
use thiserror::Error;

/// The shader's light array has a fixed length.
pub const LIGHT_COUNT: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LightError {
    #[error("expected exactly 4 lights, got {0}")]
    Count(usize),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuPointLight {
    pub position: [f32; 4], // .w unused
    pub color: [f32; 4],    // .w unused
}

pub type LightUniforms = [GpuPointLight; LIGHT_COUNT];

/// Exactly [`LIGHT_COUNT`] point lights, in shader order.
#[derive(Clone, Debug, PartialEq)]
pub struct LightStore {
    lights: [PointLight; LIGHT_COUNT],
}

impl LightStore {
    pub fn new(lights: Vec<PointLight>) -> Result<Self, LightError> {
        let count = lights.len();
        let lights: [PointLight; LIGHT_COUNT] = lights.try_into().map_err(|_| LightError::Count(count))?;
        Ok(Self { lights })
    }

    /// Four lights over the corners of the xy extent of `min..max`, all at
    /// `height` on z.
    pub fn from_bounds(min: Vec3, max: Vec3, height: f32, color: Vec3) -> Self {
        let at = |x: f32, y: f32| PointLight {
            position: Vec3::new(x, y, height),
            color,
        };
        Self {
            lights: [at(min.x, min.y), at(min.x, max.y), at(max.x, min.y), at(max.x, max.y)],
        }
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    pub fn encode(&self) -> LightUniforms {
        self.lights.map(|l| GpuPointLight {
            position: l.position.extend(1.0).to_array(),
            color: l.color.extend(1.0).to_array(),
        })
    }

    pub fn decode(raw: &[GpuPointLight]) -> Result<Self, LightError> {
        Self::new(
            raw.iter()
                .map(|l| PointLight {
                    position: Vec3::from_slice(&l.position[..3]),
                    color: Vec3::from_slice(&l.color[..3]),
                })
                .collect(),
        )
    }
}
