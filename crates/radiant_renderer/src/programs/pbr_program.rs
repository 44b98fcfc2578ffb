use log::{error, info};
use wgpu::RenderPipeline;

use crate::{
    error::RenderError,
    material::Material,
    mesh::{NodeBuffers, vertex_buffer_layout},
    programs::{GpuProgram, GpuProgramRenderContext},
    texture::TextureHelper,
};

/// Material texture slots; the sampler follows at binding 5.
const MATERIAL_TEXTURES: u32 = 5;

/// Group 0: per-node uniforms and the light array.
pub fn node_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let uniform = |binding, visibility| wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Node Bind Group Layout"),
        entries: &[
            // --- BINDING 0: projection / view / model / eye ---
            uniform(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
            // --- BINDING 1: Light Uniforms ---
            uniform(1, wgpu::ShaderStages::FRAGMENT),
        ],
    })
}

/// Group 1: base color, metallic, roughness, ambient occlusion and normal
/// maps plus one sampler.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries: Vec<wgpu::BindGroupLayoutEntry> = (0..MATERIAL_TEXTURES)
        .map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        })
        .collect();
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: MATERIAL_TEXTURES,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Material Bind Group Layout"),
        entries: &entries,
    })
}

/// One indexed draw of a node with its material.
pub struct DrawCall<'a> {
    pub node: &'a NodeBuffers,
    pub material: &'a dyn Material,
    pub index_count: u32,
}

pub struct PbrProgram {
    pipeline: RenderPipeline,
    pub node_layout: wgpu::BindGroupLayout,
    pub material_layout: wgpu::BindGroupLayout,
}

impl GpuProgram for PbrProgram {
    type InitData = ();
    type DrawData<'a> = &'a [DrawCall<'a>];

    fn new(ctx: &GpuProgramRenderContext, _: &Self::InitData) -> Result<Self, RenderError> {
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = ctx
            .device
            .create_shader_module(wgpu::include_wgsl!("pbr.wgsl"));

        let node_layout = node_layout(ctx.device);
        let material_layout = material_layout(ctx.device);

        let render_pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("PBR Pipeline Layout"),
                // [0: node uniforms + lights, 1: material textures]
                bind_group_layouts: &[&node_layout, &material_layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                cache: None,
                label: Some("PBR Pipeline"),
                layout: Some(&render_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[vertex_buffer_layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: TextureHelper::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less, // Closer pixels win
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });

        if let Some(e) = pollster::block_on(ctx.device.pop_error_scope()) {
            error!("PBR pipeline failed to build: {e}");
            return Err(RenderError::PipelineBuild(e.to_string()));
        }
        info!("PBR pipeline compiled for {:?}", ctx.format);

        Ok(Self {
            pipeline,
            node_layout,
            material_layout,
        })
    }

    fn record<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'_>, draws: Self::DrawData<'a>) {
        render_pass.set_pipeline(&self.pipeline);

        for draw in draws {
            render_pass.set_bind_group(0, &draw.node.bind_group, &[]);
            draw.material.bind(render_pass, 1);
            render_pass.set_vertex_buffer(0, draw.node.vertex_buffer.slice(..));
            render_pass.set_index_buffer(draw.node.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{GpuContext, HEADLESS_FORMAT};

    #[test]
    fn pipeline_builds_headless() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };
        let ctx = GpuProgramRenderContext {
            device: &gpu.device,
            queue: &gpu.queue,
            format: HEADLESS_FORMAT,
        };
        assert!(PbrProgram::new(&ctx, &()).is_ok());
    }

    #[test]
    fn depth_format_is_rejected_as_color_target() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };
        let ctx = GpuProgramRenderContext {
            device: &gpu.device,
            queue: &gpu.queue,
            format: TextureHelper::DEPTH_FORMAT,
        };
        assert!(matches!(PbrProgram::new(&ctx, &()), Err(RenderError::PipelineBuild(_))));
    }
}
