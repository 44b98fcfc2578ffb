use std::sync::{Arc, atomic::Ordering};

use log::{debug, error, info, trace, warn};
use radiant_core::RendererConfig;
use radiant_scene::SceneSource;
use wgpu::util::DeviceExt;

use crate::{
    context::GpuContext,
    error::{RenderError, SetupError},
    frame::{FrameOutcome, FramePlanner, SkipReason},
    frame_ring::FrameRing,
    light::LightUniforms,
    material::{self, Material},
    mesh::NodeBuffers,
    programs::{GpuProgram, GpuProgramRenderContext, PbrProgram, pbr_program::DrawCall},
    texture::DepthTarget,
};

/// Where the renderer is in its lifecycle. Dropping it tears everything down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    /// Device bound but no usable pipeline; draws do nothing.
    DeviceReady,
    PipelineReady,
    SceneBound,
    Rendering,
}

/// Per-frame-mutated GPU state; one copy per frame-ring slot.
struct SlotResources {
    light_buffer: wgpu::Buffer,
    nodes: Vec<NodeBuffers>,
}

struct BoundScene {
    scene: Box<dyn SceneSource>,
    /// Per node, resolved by mesh name.
    materials: Vec<Option<Arc<dyn Material>>>,
    ring: FrameRing<SlotResources>,
}

pub struct FrameRenderer {
    gpu: GpuContext,
    program: Option<PbrProgram>,
    planner: FramePlanner,
    depth: Option<DepthTarget>,
    bound: Option<BoundScene>,
    state: RendererState,
}

impl FrameRenderer {
    /// Builds the pipeline for the context's output format.
    ///
    /// A pipeline that fails validation is logged and leaves the renderer in
    /// [`RendererState::DeviceReady`], where every draw is skipped.
    pub fn new(gpu: GpuContext, config: RendererConfig) -> Self {
        let ctx = GpuProgramRenderContext {
            device: &gpu.device,
            queue: &gpu.queue,
            format: gpu.surface_format,
        };
        let program = match PbrProgram::new(&ctx, &()) {
            Ok(program) => Some(program),
            Err(e) => {
                error!("Renderer has no pipeline, frames will be skipped: {e}");
                None
            }
        };
        let state = if program.is_some() {
            RendererState::PipelineReady
        } else {
            RendererState::DeviceReady
        };

        Self {
            gpu,
            program,
            planner: FramePlanner::new(config),
            depth: None,
            bound: None,
            state,
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn planner(&self) -> &FramePlanner {
        &self.planner
    }

    /// Reconfigures the surface. The depth target follows on the next draw.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    /// Binds `scene`: prepares its geometry, resolves materials from the
    /// descriptor next to it and allocates per-node buffers for every
    /// frame-ring slot.
    pub fn setup_scene(&mut self, mut scene: Box<dyn SceneSource>) -> Result<(), RenderError> {
        let path = scene.path().to_path_buf();
        let fail = |source: SetupError| RenderError::SceneSetup {
            path: path.clone(),
            source,
        };

        let Some(program) = &self.program else {
            return Err(fail(SetupError::NotReady(self.state)));
        };
        let device = &self.gpu.device;
        let queue = &self.gpu.queue;

        scene.prepare().map_err(|e| fail(e.into()))?;

        let descriptor = scene.material_descriptor_path();
        let table =
            material::load(device, queue, &program.material_layout, &descriptor).map_err(|e| fail(e.into()))?;
        let materials: Vec<Option<Arc<dyn Material>>> =
            (0..scene.mesh_count()).map(|i| table.get(scene.name(i)).cloned()).collect();
        let unmatched = materials.iter().filter(|m| m.is_none()).count();
        if unmatched > 0 {
            warn!("{unmatched} of {} meshes have no material and will not be drawn", materials.len());
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let ring = FrameRing::new(self.planner.config().frames_in_flight(), |slot| {
            let empty: LightUniforms = bytemuck::Zeroable::zeroed();
            let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Light Buffer"),
                contents: bytemuck::cast_slice(&empty),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let nodes = (0..scene.mesh_count())
                .map(|i| {
                    NodeBuffers::new(
                        device,
                        &program.node_layout,
                        &light_buffer,
                        scene.vertex_bytes(i).len(),
                        scene.index_bytes(i).len(),
                        &format!("{} (slot {slot})", scene.name(i)),
                    )
                })
                .collect();
            SlotResources { light_buffer, nodes }
        });
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(fail(SetupError::Allocation(e.to_string())));
        }

        for slot in ring.iter() {
            for (i, node) in slot.nodes.iter().enumerate() {
                node.upload_geometry(queue, scene.vertex_bytes(i), scene.index_bytes(i));
            }
        }

        info!(
            "Scene {:?} bound: {} meshes, {} materials, {} frames in flight",
            path,
            scene.mesh_count(),
            table.len(),
            ring.len()
        );
        self.bound = Some(BoundScene {
            scene,
            materials,
            ring,
        });
        self.state = RendererState::SceneBound;
        Ok(())
    }

    /// Whether a frame could be rendered right now. Polls the device once
    /// when the ring slot is still busy.
    fn precheck(&self) -> Result<(), SkipReason> {
        if self.program.is_none() {
            return Err(SkipReason::NoPipeline);
        }
        let Some(bound) = &self.bound else {
            return Err(SkipReason::NotReady(self.state));
        };
        if !bound.ring.is_ready() {
            poll_device(&self.gpu.device);
            if !bound.ring.is_ready() {
                return Err(SkipReason::SlotBusy);
            }
        }
        Ok(())
    }

    /// Renders one frame to the surface and presents it.
    pub fn draw(&mut self) -> FrameOutcome {
        if let Err(reason) = self.precheck() {
            trace!("Skipping frame: {reason:?}");
            return FrameOutcome::Skipped(reason);
        }

        let Some(surface) = &self.gpu.surface else {
            return FrameOutcome::Skipped(SkipReason::NoDrawable);
        };
        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("Surface lost or outdated, reconfiguring");
                self.gpu.reconfigure();
                return FrameOutcome::Skipped(SkipReason::SurfaceReconfigured);
            }
            Err(e) => {
                debug!("No drawable this frame: {e}");
                return FrameOutcome::Skipped(SkipReason::NoDrawable);
            }
        };

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(self.gpu.surface_format),
            ..Default::default()
        });
        let (width, height) = (frame.texture.width(), frame.texture.height());
        let outcome = self.draw_to_view(&view, width, height);
        if let FrameOutcome::Rendered(_) = outcome {
            frame.present();
        }
        outcome
    }

    /// Renders one frame into `target`, a color view of `width` x `height`
    /// in the context's output format.
    pub fn draw_to_view(&mut self, target: &wgpu::TextureView, width: u32, height: u32) -> FrameOutcome {
        let Some(program) = &self.program else {
            return FrameOutcome::Skipped(SkipReason::NoPipeline);
        };
        let Some(bound) = &mut self.bound else {
            return FrameOutcome::Skipped(SkipReason::NotReady(self.state));
        };
        let device = &self.gpu.device;
        let queue = &self.gpu.queue;
        let BoundScene {
            scene,
            materials,
            ring,
        } = bound;

        if !ring.is_ready() {
            poll_device(device);
        }
        let Some(slot) = ring.acquire() else {
            trace!("Frame-ring slot {} still in flight", ring.current_index());
            return FrameOutcome::Skipped(SkipReason::SlotBusy);
        };

        let plan = self
            .planner
            .plan(scene.as_mut(), width, height, |node| materials[node].is_some());

        let depth = match self.depth.take() {
            Some(depth) if plan.resized.is_none() && depth.matches(width, height) => depth,
            _ => {
                debug!("Depth target {width}x{height}");
                DepthTarget::new(device, width, height)
            }
        };
        let depth = self.depth.insert(depth);

        // No dirty tracking: every mesh is re-uploaded each tick.
        for (i, node) in slot.nodes.iter().enumerate() {
            node.upload_geometry(queue, scene.vertex_bytes(i), scene.index_bytes(i));
        }
        queue.write_buffer(&slot.light_buffer, 0, bytemuck::cast_slice(&plan.lights.encode()));

        let mut draws = Vec::with_capacity(plan.draws.len());
        for item in &plan.draws {
            let Some(material) = materials[item.node].as_deref() else {
                continue;
            };
            let node = &slot.nodes[item.node];
            node.upload_uniforms(queue, &item.uniforms);
            draws.push(DrawCall {
                node,
                material,
                index_count: item.index_count,
            });
        }

        let [r, g, b, a] = self.planner.config().clear_color;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0), // Clear to "Far" (1.0)
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            program.record(&mut render_pass, &draws);
        }

        queue.submit(std::iter::once(encoder.finish()));
        let idle = ring.submit();
        queue.on_submitted_work_done(move || idle.store(true, Ordering::Release));

        let stats = plan.stats();
        trace!(
            "Frame {}: {} draws, {} nodes skipped",
            stats.frame, stats.draw_calls, stats.skipped_nodes
        );
        self.state = RendererState::Rendering;
        FrameOutcome::Rendered(stats)
    }
}

/// Non-blocking poll so completion callbacks can fire.
fn poll_device(device: &wgpu::Device) {
    if let Err(e) = device.poll(wgpu::PollType::Poll) {
        warn!("Device poll failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};
    use radiant_assets::{MeshData, Vertex, asset_server::tga_parser::encode_tga};
    use radiant_scene::StaticScene;

    use super::*;
    use crate::{context::HEADLESS_FORMAT, frame::FrameStats};

    fn quad(name: &str) -> MeshData {
        MeshData {
            name: name.into(),
            vertices: vec![
                Vertex::new([-1.0, 1.0, 0.0], [0.0, 1.0], [0.0, 0.0, 1.0]),
                Vertex::new([-1.0, 3.0, 0.0], [0.0, 0.0], [0.0, 0.0, 1.0]),
                Vertex::new([1.0, 3.0, 0.0], [1.0, 0.0], [0.0, 0.0, 1.0]),
                Vertex::new([1.0, 1.0, 0.0], [1.0, 1.0], [0.0, 0.0, 1.0]),
            ],
            indices: vec![0, 3, 2, 0, 2, 1],
            weights: None,
        }
    }

    fn offscreen_target(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Offscreen Target"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: HEADLESS_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// A robot.glb scene with a "Body" material on disk and an unmatched mesh.
    fn robot_scene(dir: &std::path::Path) -> Box<StaticScene> {
        std::fs::write(dir.join("albedo.tga"), encode_tga(2, 2, &[180; 16])).unwrap();
        std::fs::write(
            dir.join("robot.json"),
            r#"{"objects": [{"name": "Body", "attributes": [{"name": "baseColor", "value": "albedo.tga"}]}]}"#,
        )
        .unwrap();
        Box::new(
            StaticScene::new(
                dir.join("robot.glb"),
                vec![(quad("Body"), Mat4::IDENTITY), (quad("Loose"), Mat4::IDENTITY)],
            )
            .with_animator(|frame, _| Mat4::from_rotation_y(frame as f32 * 0.1)),
        )
    }

    fn headless_renderer(frames_in_flight: usize) -> Option<FrameRenderer> {
        let gpu = pollster::block_on(GpuContext::new_headless()).ok()?;
        let config = RendererConfig {
            frames_in_flight,
            ..Default::default()
        };
        Some(FrameRenderer::new(gpu, config))
    }

    #[test]
    fn draws_before_scene_are_skipped() {
        let Some(mut renderer) = headless_renderer(2) else {
            return;
        };
        assert_eq!(renderer.state(), RendererState::PipelineReady);

        let target = offscreen_target(&renderer.gpu().device, 64, 48);
        assert_eq!(
            renderer.draw_to_view(&target, 64, 48),
            FrameOutcome::Skipped(SkipReason::NotReady(RendererState::PipelineReady))
        );
        assert_eq!(renderer.planner().frame(), 0);
    }

    #[test]
    fn renders_bound_scene_offscreen() {
        let Some(mut renderer) = headless_renderer(3) else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        renderer.setup_scene(robot_scene(dir.path())).unwrap();
        assert_eq!(renderer.state(), RendererState::SceneBound);

        let target = offscreen_target(&renderer.gpu().device, 64, 48);
        for frame in 1..=3 {
            assert_eq!(
                renderer.draw_to_view(&target, 64, 48),
                FrameOutcome::Rendered(FrameStats {
                    frame,
                    draw_calls: 1,
                    skipped_nodes: 1,
                })
            );
        }
        assert_eq!(renderer.state(), RendererState::Rendering);
        assert_eq!(renderer.planner().drawable_size(), Some((64, 48)));
    }

    #[test]
    fn two_slot_ring_is_reused_across_resize() {
        let Some(mut renderer) = headless_renderer(2) else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        renderer.setup_scene(robot_scene(dir.path())).unwrap();

        let device = renderer.gpu().device.clone();
        let small = offscreen_target(&device, 80, 60);
        let large = offscreen_target(&device, 160, 120);

        for tick in 0..20u64 {
            let (target, width, height) = if tick < 10 { (&small, 80, 60) } else { (&large, 160, 120) };

            // A busy slot only skips the frame; wait it out so every tick renders.
            let outcome = loop {
                match renderer.draw_to_view(target, width, height) {
                    FrameOutcome::Skipped(SkipReason::SlotBusy) => {
                        device.poll(wgpu::PollType::wait_indefinitely()).unwrap();
                    }
                    outcome => break outcome,
                }
            };
            assert!(matches!(outcome, FrameOutcome::Rendered(FrameStats { frame, .. }) if frame == tick + 1));

            let depth = renderer.depth.as_ref().unwrap();
            assert_eq!((depth.width, depth.height), (width, height), "tick {tick}");
        }
        assert_eq!(renderer.planner().drawable_size(), Some((160, 120)));
    }

    #[test]
    fn headless_draw_has_no_drawable() {
        let Some(mut renderer) = headless_renderer(2) else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        renderer.setup_scene(robot_scene(dir.path())).unwrap();
        assert_eq!(renderer.draw(), FrameOutcome::Skipped(SkipReason::NoDrawable));
    }

    #[test]
    fn missing_descriptor_fails_setup() {
        let Some(mut renderer) = headless_renderer(2) else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let scene = StaticScene::new(dir.path().join("lonely.glb"), vec![(quad("Body"), Mat4::IDENTITY)]);

        let err = renderer.setup_scene(Box::new(scene)).unwrap_err();
        assert!(matches!(
            err,
            RenderError::SceneSetup {
                source: SetupError::Material(_),
                ..
            }
        ));
        assert_eq!(renderer.state(), RendererState::PipelineReady);
    }

    #[test]
    fn bad_geometry_fails_setup() {
        let Some(mut renderer) = headless_renderer(2) else {
            return;
        };
        let mut broken = quad("Body");
        broken.indices.push(99);
        let scene = StaticScene::new("broken.glb", vec![(broken, Mat4::from_translation(Vec3::Z))]);

        let err = renderer.setup_scene(Box::new(scene)).unwrap_err();
        assert!(matches!(
            err,
            RenderError::SceneSetup {
                source: SetupError::Scene(_),
                ..
            }
        ));
    }
}
