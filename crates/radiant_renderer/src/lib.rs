//! Real-time PBR frame renderer on top of `wgpu`.
//!
//! [`FrameRenderer`] owns the device, pipeline, depth target and per-node
//! buffers; [`FramePlanner`] holds the CPU half of every frame.

pub mod context;
pub mod error;
pub mod frame;
pub mod frame_ring;
pub mod light;
pub mod material;
pub mod mesh;
pub mod programs;
pub mod render;
pub mod texture;

pub use context::GpuContext;
pub use error::{RenderError, SetupError};
pub use frame::{FrameOutcome, FramePlan, FramePlanner, FrameStats, SkipReason};
pub use light::LightStore;
pub use material::{Material, PbrMaterial};
pub use render::{FrameRenderer, RendererState};
pub use texture::{GpuTexture, load_image};
