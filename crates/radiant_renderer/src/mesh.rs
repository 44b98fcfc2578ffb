use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use log::warn;
use radiant_assets::Vertex;

// #[repr(C)] keeps the field order the shader expects.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// xyz = eye position, w unused.
    pub camera_position: [f32; 4],
}

impl Uniforms {
    pub fn new(projection: Mat4, view: Mat4, model: Mat4, camera_position: Vec3) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            camera_position: camera_position.extend(0.0).to_array(),
        }
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x3, // position
    },
    wgpu::VertexAttribute {
        offset: 16,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32x2, // uv
    },
    wgpu::VertexAttribute {
        offset: 24,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32x3, // normal
    },
];

pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: Vertex::STRIDE as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// GPU storage of one node for one frame-ring slot.
pub struct NodeBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub uniform_buffer: wgpu::Buffer,
    /// Group 0: uniforms plus the slot's light buffer.
    pub bind_group: wgpu::BindGroup,
}

impl NodeBuffers {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        light_buffer: &wgpu::Buffer,
        vertex_size: usize,
        index_size: usize,
        label: &str,
    ) -> Self {
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: aligned_size(vertex_size),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: aligned_size(index_size),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<Uniforms>() as wgpu::BufferAddress,
            // COPY_DST allows us to update this buffer every frame
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Node Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            bind_group,
        }
    }

    /// Copies this tick's geometry. Bytes past the allocated size are dropped.
    pub fn upload_geometry(&self, queue: &wgpu::Queue, vertices: &[u8], indices: &[u8]) {
        write_clamped(queue, &self.vertex_buffer, vertices);
        write_clamped(queue, &self.index_buffer, indices);
    }

    pub fn upload_uniforms(&self, queue: &wgpu::Queue, uniforms: &Uniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }
}

fn aligned_size(len: usize) -> wgpu::BufferAddress {
    let align = wgpu::COPY_BUFFER_ALIGNMENT;
    (len as wgpu::BufferAddress).div_ceil(align).max(1) * align
}

fn write_clamped(queue: &wgpu::Queue, buffer: &wgpu::Buffer, bytes: &[u8]) {
    let capacity = buffer.size() as usize;
    let len = if bytes.len() > capacity {
        warn!(
            "Geometry grew past its buffer ({} > {} bytes), truncating",
            bytes.len(),
            capacity
        );
        capacity
    } else {
        bytes.len()
    };
    let len = len - len % wgpu::COPY_BUFFER_ALIGNMENT as usize;
    if len > 0 {
        queue.write_buffer(buffer, 0, &bytes[..len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_match_shader_layout() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 208);
        assert_eq!(std::mem::offset_of!(Uniforms, view), 64);
        assert_eq!(std::mem::offset_of!(Uniforms, model), 128);
        assert_eq!(std::mem::offset_of!(Uniforms, camera_position), 192);
    }

    #[test]
    fn uniforms_round_trip_model() {
        let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let u = Uniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, model, Vec3::new(0.0, 2.0, 5.0));
        assert_eq!(u.model(), model);
        assert_eq!(u.camera_position, [0.0, 2.0, 5.0, 0.0]);
    }

    #[test]
    fn vertex_layout_offsets() {
        let layout = vertex_buffer_layout();
        assert_eq!(layout.array_stride, 48);
        let offsets: Vec<_> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 16, 24]);
    }

    #[test]
    fn buffer_sizes_are_copy_aligned() {
        assert_eq!(aligned_size(0), 4);
        assert_eq!(aligned_size(6), 8);
        assert_eq!(aligned_size(48), 48);
    }
}
