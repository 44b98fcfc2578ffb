//! CPU side of a frame: everything `draw` decides before touching the GPU.

use glam::{Mat4, Vec3};
use log::debug;
use radiant_core::{RendererConfig, math::perspective_projection_zo};
use radiant_scene::SceneSource;

use crate::{light::LightStore, mesh::Uniforms, render::RendererState};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub draw_calls: u32,
    pub skipped_nodes: u32,
}

/// Why a frame produced nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// No scene is bound yet.
    NotReady(RendererState),
    /// The pipeline failed to build.
    NoPipeline,
    /// The surface had no texture to hand out.
    NoDrawable,
    /// The surface was lost or outdated and has been reconfigured.
    SurfaceReconfigured,
    /// The frame-ring slot is still in use by the GPU.
    SlotBusy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered(FrameStats),
    Skipped(SkipReason),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawItem {
    pub node: usize,
    pub index_count: u32,
    pub uniforms: Uniforms,
}

#[derive(Clone, Debug)]
pub struct FramePlan {
    pub frame: u64,
    /// Set when the depth target must be rebuilt at this size.
    pub resized: Option<(u32, u32)>,
    pub lights: LightStore,
    pub draws: Vec<DrawItem>,
    pub skipped_nodes: u32,
}

impl FramePlan {
    pub fn stats(&self) -> FrameStats {
        FrameStats {
            frame: self.frame,
            draw_calls: self.draws.len() as u32,
            skipped_nodes: self.skipped_nodes,
        }
    }
}

/// Overall bounds of every mesh, accumulated starting from the origin.
pub fn scene_bounds(scene: &dyn SceneSource) -> (Vec3, Vec3) {
    (0..scene.mesh_count()).fold((Vec3::ZERO, Vec3::ZERO), |(min, max), i| {
        (min.min(scene.min_bounds(i)), max.max(scene.max_bounds(i)))
    })
}

pub struct FramePlanner {
    config: RendererConfig,
    drawable: Option<(u32, u32)>,
    projection: Mat4,
    frame: u64,
}

impl FramePlanner {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            drawable: None,
            projection: Mat4::IDENTITY,
            frame: 0,
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Frames planned so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Size the depth target and projection were last built for.
    pub fn drawable_size(&self) -> Option<(u32, u32)> {
        self.drawable
    }

    /// Advances the scene one tick and decides what to draw at the given
    /// drawable size. Nodes for which `has_material` is false are skipped.
    pub fn plan(
        &mut self,
        scene: &mut dyn SceneSource,
        width: u32,
        height: u32,
        has_material: impl Fn(usize) -> bool,
    ) -> FramePlan {
        let resized = (self.drawable != Some((width, height))).then(|| {
            let aspect = width.max(1) as f32 / height.max(1) as f32;
            self.projection =
                perspective_projection_zo(aspect, self.config.fov_y_radians(), self.config.near, self.config.far);
            self.drawable = Some((width, height));
            debug!("Drawable is now {width}x{height}, projection rebuilt");
            (width, height)
        });

        scene.advance();

        self.frame += 1;
        let camera = &self.config.camera;
        let view = camera.view_matrix(self.frame);
        let eye = camera.position();

        let (min, max) = scene_bounds(scene);
        let lights = LightStore::from_bounds(
            min,
            max,
            self.config.light_height,
            Vec3::from_array(self.config.light_color),
        );

        let mut draws = Vec::with_capacity(scene.mesh_count());
        let mut skipped_nodes = 0;
        for node in 0..scene.mesh_count() {
            let index_count = scene.index_count(node);
            if index_count == 0 || !has_material(node) {
                skipped_nodes += 1;
                continue;
            }
            draws.push(DrawItem {
                node,
                index_count,
                uniforms: Uniforms::new(self.projection, view, scene.transform(node), eye),
            });
        }

        FramePlan {
            frame: self.frame,
            resized,
            lights,
            draws,
            skipped_nodes,
        }
    }
}
