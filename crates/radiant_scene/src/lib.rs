//! The scene collaborator consumed by the renderer.
//!
//! The renderer never parses assets itself. It talks to a [`SceneSource`],
//! which owns the authoritative geometry and transforms and is advanced once
//! per rendered frame.

use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use radiant_assets::asset_server::gltf_parser::GltfError;
use thiserror::Error;

mod gltf_scene;
pub mod skinning;
mod static_scene;

pub use gltf_scene::GltfScene;
pub use static_scene::StaticScene;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    Gltf(#[from] GltfError),
    #[error("mesh '{mesh}' references vertex {index} but has only {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        vertex_count: usize,
    },
}

pub trait SceneSource: Send {
    /// Where the scene was loaded from.
    fn path(&self) -> &Path;

    fn mesh_count(&self) -> usize;

    fn index_count(&self, mesh: usize) -> u32;

    /// Stable name used to look up the mesh's material.
    fn name(&self, mesh: usize) -> &str;

    /// Current mesh -> world matrix.
    fn transform(&self, mesh: usize) -> Mat4;

    fn min_bounds(&self, mesh: usize) -> Vec3;

    fn max_bounds(&self, mesh: usize) -> Vec3;

    /// Materializes the geometry the renderer is about to size its buffers
    /// from. Called once, before the first frame.
    fn prepare(&mut self) -> Result<(), SceneError>;

    /// Steps animation and skinning by one frame.
    fn advance(&mut self);

    fn vertex_bytes(&self, mesh: usize) -> &[u8];

    fn index_bytes(&self, mesh: usize) -> &[u8];

    /// The material descriptor that sits beside the scene file.
    fn material_descriptor_path(&self) -> PathBuf {
        self.path().with_extension("json")
    }
}

pub(crate) fn validate_indices(mesh: &radiant_assets::MeshData) -> Result<(), SceneError> {
    let vertex_count = mesh.vertices.len();
    match mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        Some(&index) => Err(SceneError::IndexOutOfRange {
            mesh: mesh.name.clone(),
            index,
            vertex_count,
        }),
        None => Ok(()),
    }
}
