use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use radiant_assets::MeshData;

use crate::{SceneError, SceneSource, validate_indices};

type Animator = Box<dyn FnMut(u64, usize) -> Mat4 + Send>;

struct StaticMesh {
    data: MeshData,
    bounds: (Vec3, Vec3),
    transform: Mat4,
}

/// An in-memory scene: fixed geometry with an optional per-frame transform
/// callback.
pub struct StaticScene {
    path: PathBuf,
    meshes: Vec<StaticMesh>,
    frame: u64,
    animator: Option<Animator>,
}

impl StaticScene {
    pub fn new(path: impl Into<PathBuf>, meshes: Vec<(MeshData, Mat4)>) -> Self {
        Self {
            path: path.into(),
            meshes: meshes
                .into_iter()
                .map(|(data, transform)| StaticMesh {
                    bounds: data.bounds(),
                    data,
                    transform,
                })
                .collect(),
            frame: 0,
            animator: None,
        }
    }

    /// `animator(frame, mesh)` gives the mesh transform after each advance.
    pub fn with_animator(mut self, animator: impl FnMut(u64, usize) -> Mat4 + Send + 'static) -> Self {
        self.animator = Some(Box::new(animator));
        self
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl SceneSource for StaticScene {
    fn path(&self) -> &Path {
        &self.path
    }

    fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    fn index_count(&self, mesh: usize) -> u32 {
        self.meshes[mesh].data.indices.len() as u32
    }

    fn name(&self, mesh: usize) -> &str {
        &self.meshes[mesh].data.name
    }

    fn transform(&self, mesh: usize) -> Mat4 {
        self.meshes[mesh].transform
    }

    fn min_bounds(&self, mesh: usize) -> Vec3 {
        self.meshes[mesh].bounds.0
    }

    fn max_bounds(&self, mesh: usize) -> Vec3 {
        self.meshes[mesh].bounds.1
    }

    fn prepare(&mut self) -> Result<(), SceneError> {
        self.meshes.iter().try_for_each(|m| validate_indices(&m.data))
    }

    fn advance(&mut self) {
        self.frame += 1;
        if let Some(animator) = self.animator.as_mut() {
            for (i, mesh) in self.meshes.iter_mut().enumerate() {
                mesh.transform = animator(self.frame, i);
            }
        }
    }

    fn vertex_bytes(&self, mesh: usize) -> &[u8] {
        self.meshes[mesh].data.vertex_bytes()
    }

    fn index_bytes(&self, mesh: usize) -> &[u8] {
        self.meshes[mesh].data.index_bytes()
    }
}
