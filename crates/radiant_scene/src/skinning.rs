//! Linear-blend skinning on the CPU.

use glam::{Mat4, Vec3};
use radiant_assets::scene::Skin;
use radiant_assets::{Vertex, VertexWeights};

/// Joint matrices in the space of the mesh's own node, so the node
/// transform can still be applied as the model matrix.
pub fn joint_matrices(skin: &Skin, globals: &[Mat4], mesh_global: Mat4) -> Vec<Mat4> {
    let to_mesh = mesh_global.inverse();
    skin.joints
        .iter()
        .enumerate()
        .map(|(i, &joint)| {
            let global = globals.get(joint).copied().unwrap_or(Mat4::IDENTITY);
            let inverse_bind = skin
                .inverse_bind_matrices
                .get(i)
                .copied()
                .unwrap_or(Mat4::IDENTITY);
            to_mesh * global * inverse_bind
        })
        .collect()
}

/// Deforms `rest` into `out`. Vertices without usable influences keep
/// their rest position and normal.
pub fn skin_vertices(rest: &[Vertex], weights: &VertexWeights, joints: &[Mat4], out: &mut Vec<Vertex>) {
    out.clear();
    out.extend(rest.iter().enumerate().map(|(i, vertex)| {
        let (Some(indices), Some(w)) = (weights.joints.get(i), weights.weights.get(i)) else {
            return *vertex;
        };

        let mut blend = Mat4::ZERO;
        let mut total = 0.0;
        for (&joint, &weight) in indices.iter().zip(w) {
            if weight <= 0.0 {
                continue;
            }
            if let Some(matrix) = joints.get(joint as usize) {
                blend += *matrix * weight;
                total += weight;
            }
        }
        if total <= 0.0 {
            return *vertex;
        }
        let blend = blend * (1.0 / total);

        let position = blend.transform_point3(Vec3::from(vertex.position));
        let normal = blend
            .transform_vector3(Vec3::from(vertex.normal))
            .try_normalize()
            .unwrap_or(Vec3::from(vertex.normal));

        Vertex {
            position: position.to_array(),
            normal: normal.to_array(),
            ..*vertex
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skin(joints: Vec<usize>) -> Skin {
        Skin {
            inverse_bind_matrices: vec![Mat4::IDENTITY; joints.len()],
            joints,
        }
    }

    #[test]
    fn joint_matrices_are_relative_to_mesh_node() {
        let globals = [Mat4::from_translation(Vec3::X), Mat4::from_translation(Vec3::new(1.0, 3.0, 0.0))];
        let matrices = joint_matrices(&skin(vec![1]), &globals, globals[0]);
        let moved = matrices[0].transform_point3(Vec3::ZERO);
        assert!(moved.abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-6));
    }

    #[test]
    fn weights_blend_between_joints() {
        let rest = [Vertex::new([0.0, 0.0, 0.0], [0.5, 0.5], [0.0, 0.0, 1.0])];
        let weights = VertexWeights {
            joints: vec![[0, 1, 0, 0]],
            weights: vec![[0.25, 0.75, 0.0, 0.0]],
        };
        let joints = [Mat4::from_translation(Vec3::X * 4.0), Mat4::IDENTITY];

        let mut out = Vec::new();
        skin_vertices(&rest, &weights, &joints, &mut out);
        assert!(Vec3::from(out[0].position).abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-6));
        assert_eq!(out[0].uv, [0.5, 0.5]);
        assert_eq!(out[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn normals_follow_joint_rotation() {
        let rest = [Vertex::new([1.0, 0.0, 0.0], [0.0; 2], [0.0, 0.0, 1.0])];
        let weights = VertexWeights {
            joints: vec![[0; 4]],
            weights: vec![[1.0, 0.0, 0.0, 0.0]],
        };
        let joints = [Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2)];

        let mut out = Vec::new();
        skin_vertices(&rest, &weights, &joints, &mut out);
        assert!(Vec3::from(out[0].position).abs_diff_eq(-Vec3::Z, 1e-6));
        assert!(Vec3::from(out[0].normal).abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn unweighted_and_out_of_range_influences_keep_rest_pose() {
        let rest = [
            Vertex::new([1.0, 2.0, 3.0], [0.0; 2], [0.0, 1.0, 0.0]),
            Vertex::new([4.0, 5.0, 6.0], [0.0; 2], [0.0, 1.0, 0.0]),
            Vertex::new([7.0, 8.0, 9.0], [0.0; 2], [0.0, 1.0, 0.0]),
        ];
        let weights = VertexWeights {
            joints: vec![[0; 4], [9, 0, 0, 0]],
            weights: vec![[0.0; 4], [1.0, 0.0, 0.0, 0.0]],
        };
        let joints = [Mat4::from_translation(Vec3::ONE)];

        let mut out = Vec::new();
        skin_vertices(&rest, &weights, &joints, &mut out);
        assert_eq!(out, rest);
    }
}
