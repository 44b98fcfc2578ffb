pub mod pbr_program;

pub use pbr_program::PbrProgram;

use crate::error::RenderError;

/// Holds common WGPU references to simplify function signatures.
pub struct GpuProgramRenderContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub format: wgpu::TextureFormat, // The output format (swapchain or offscreen)
}

pub trait GpuProgram: Sized {
    /// Data required to initialize the pipeline.
    type InitData;

    /// Data required to draw a frame.
    type DrawData<'a>
    where
        Self: 'a;

    /// Compiles shaders and creates the pipeline layout and pipeline.
    fn new(ctx: &GpuProgramRenderContext, init_data: &Self::InitData) -> Result<Self, RenderError>;

    /// Encodes this program's commands into the render pass.
    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'_>, data: Self::DrawData<'a>);
}
