use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use log::{debug, info};
use radiant_assets::asset_server::gltf_parser::parse_gltf;
use radiant_assets::{SceneData, Vertex, vertex_bounds};
use radiant_core::transform::Transform;

use crate::skinning::{joint_matrices, skin_vertices};
use crate::{SceneError, SceneSource, validate_indices};

/// Animation advances by a fixed step per rendered frame.
pub const FRAME_TIME: f32 = 1.0 / 60.0;

/// One drawable: a mesh referenced by a node.
struct MeshInstance {
    node: usize,
    mesh: usize,
    name: String,
    /// Skin deforming this instance, when both the node and the mesh have one.
    skin: Option<usize>,
    /// Deformed copy of the mesh vertices; empty for rigid instances.
    skinned: Vec<Vertex>,
}

/// A glTF scene flattened into drawable mesh instances.
pub struct GltfScene {
    path: PathBuf,
    data: SceneData,
    instances: Vec<MeshInstance>,
    /// Per instance, filled by `prepare`.
    bounds: Vec<(Vec3, Vec3)>,
    /// Per node, rest pose.
    rest: Vec<Transform>,
    /// Per node, posed local transforms.
    locals: Vec<Transform>,
    /// Per node, node -> world.
    globals: Vec<Mat4>,
    time: f32,
}

impl GltfScene {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let data = parse_gltf(path)?;
        let scene = Self::from_data(path, data);
        info!(
            "Loaded scene {:?}: {} drawables ({} skinned), {} animations",
            path,
            scene.instances.len(),
            scene.instances.iter().filter(|i| i.skin.is_some()).count(),
            scene.data.animations.len()
        );
        Ok(scene)
    }

    pub fn from_data(path: impl Into<PathBuf>, data: SceneData) -> Self {
        let rest: Vec<Transform> = data.nodes.iter().map(|n| n.transform).collect();
        let mut instances = Vec::new();
        let mut stack: Vec<usize> = data.roots.iter().rev().copied().collect();
        let mut visited = vec![false; data.nodes.len()];

        while let Some(node) = stack.pop() {
            if node >= data.nodes.len() || visited[node] {
                continue;
            }
            visited[node] = true;
            let n = &data.nodes[node];
            for &mesh in n.meshes.iter().filter(|&&m| m < data.meshes.len()) {
                let skin = n
                    .skin
                    .filter(|&s| s < data.skins.len() && data.meshes[mesh].weights.is_some());
                instances.push(MeshInstance {
                    node,
                    mesh,
                    name: n.name.clone(),
                    skin,
                    skinned: Vec::new(),
                });
            }
            stack.extend(n.children.iter().rev());
        }

        let mut scene = Self {
            path: path.into(),
            bounds: Vec::new(),
            instances,
            locals: rest.clone(),
            globals: vec![Mat4::IDENTITY; data.nodes.len()],
            rest,
            data,
            time: 0.0,
        };
        scene.update_globals();
        scene.update_skins();
        scene
    }

    /// Seconds of animation played so far, wrapped to the clip length.
    pub fn time(&self) -> f32 {
        self.time
    }

    fn update_globals(&mut self) {
        let mut stack: Vec<(usize, Mat4)> = self.data.roots.iter().map(|&r| (r, Mat4::IDENTITY)).collect();
        let mut visited = vec![false; self.data.nodes.len()];
        while let Some((node, parent)) = stack.pop() {
            if node >= self.data.nodes.len() || visited[node] {
                continue;
            }
            visited[node] = true;
            let global = parent * self.locals[node].compute_matrix();
            self.globals[node] = global;
            stack.extend(self.data.nodes[node].children.iter().map(|&c| (c, global)));
        }
    }

    /// Re-deforms every skinned instance from the current joint poses and
    /// refreshes its bounds once they exist.
    fn update_skins(&mut self) {
        for (i, instance) in self.instances.iter_mut().enumerate() {
            let Some(skin) = instance.skin else {
                continue;
            };
            let mesh = &self.data.meshes[instance.mesh];
            let Some(weights) = &mesh.weights else {
                continue;
            };

            let joints = joint_matrices(&self.data.skins[skin], &self.globals, self.globals[instance.node]);
            skin_vertices(&mesh.vertices, weights, &joints, &mut instance.skinned);

            if let Some(bounds) = self.bounds.get_mut(i) {
                *bounds = vertex_bounds(&instance.skinned);
            }
        }
    }

    /// Vertices as the renderer should see them this frame.
    fn vertices(&self, mesh: usize) -> &[Vertex] {
        let instance = &self.instances[mesh];
        match instance.skin {
            Some(_) => &instance.skinned,
            None => &self.data.meshes[instance.mesh].vertices,
        }
    }

    fn bounds(&self, mesh: usize) -> (Vec3, Vec3) {
        self.bounds
            .get(mesh)
            .copied()
            .unwrap_or_else(|| vertex_bounds(self.vertices(mesh)))
    }
}

impl SceneSource for GltfScene {
    fn path(&self) -> &Path {
        &self.path
    }

    fn mesh_count(&self) -> usize {
        self.instances.len()
    }

    fn index_count(&self, mesh: usize) -> u32 {
        self.data.meshes[self.instances[mesh].mesh].indices.len() as u32
    }

    fn name(&self, mesh: usize) -> &str {
        &self.instances[mesh].name
    }

    fn transform(&self, mesh: usize) -> Mat4 {
        self.globals[self.instances[mesh].node]
    }

    fn min_bounds(&self, mesh: usize) -> Vec3 {
        self.bounds(mesh).0
    }

    fn max_bounds(&self, mesh: usize) -> Vec3 {
        self.bounds(mesh).1
    }

    fn prepare(&mut self) -> Result<(), SceneError> {
        self.data.meshes.iter().try_for_each(validate_indices)?;
        self.bounds = (0..self.instances.len())
            .map(|i| vertex_bounds(self.vertices(i)))
            .collect();
        debug!("Prepared {} meshes from {:?}", self.data.meshes.len(), self.path);
        Ok(())
    }

    fn advance(&mut self) {
        let Some(clip) = self.data.animations.first() else {
            return;
        };

        self.time += FRAME_TIME;
        if clip.duration > 0.0 {
            self.time %= clip.duration;
        } else {
            self.time = 0.0;
        }

        self.locals.copy_from_slice(&self.rest);
        clip.apply(self.time, &mut self.locals);
        self.update_globals();
        self.update_skins();
    }

    fn vertex_bytes(&self, mesh: usize) -> &[u8] {
        bytemuck::cast_slice(self.vertices(mesh))
    }

    fn index_bytes(&self, mesh: usize) -> &[u8] {
        self.data.meshes[self.instances[mesh].mesh].index_bytes()
    }
}
