use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// The interleaved vertex the renderer consumes.
///
/// 48 bytes: position at 0, UV at 16, normal at 24, the rest padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub _pad0: f32,
    pub uv: [f32; 2],
    pub normal: [f32; 3],
    pub _pad1: [f32; 3],
}

impl Vertex {
    pub const STRIDE: usize = 48;

    pub fn new(position: [f32; 3], uv: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            uv,
            normal,
            ..Default::default()
        }
    }
}

/// Min/max corner of the positions in `vertices`, zeros when empty.
pub fn vertex_bounds(vertices: &[Vertex]) -> (Vec3, Vec3) {
    let mut iter = vertices.iter().map(|v| Vec3::from(v.position));
    let Some(first) = iter.next() else {
        return (Vec3::ZERO, Vec3::ZERO);
    };
    iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)))
}

/// Up to four joint influences per vertex.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexWeights {
    /// Indices into the joint list of the skin bound to the mesh's node.
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

/// Triangle-list geometry of one mesh, in mesh-local space.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Present when the mesh carries JOINTS_0/WEIGHTS_0.
    pub weights: Option<VertexWeights>,
}

impl MeshData {
    /// Axis-aligned bounds of the vertex positions. Empty meshes give zeros.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        vertex_bounds(&self.vertices)
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
