use std::path::Path;

use glam::{Mat4, Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use radiant_core::transform::Transform;
use thiserror::Error;

use crate::{
    assets::{MeshData, Vertex, VertexWeights},
    scene::{AnimationChannel, AnimationClip, ChannelValues, Interpolation, SceneData, SceneNode, Skin},
};

#[derive(Error, Debug)]
pub enum GltfError {
    #[error("failed to import glTF {path}: {source}")]
    Import { path: String, source: gltf::Error },
    #[error("mesh '{0}' has no positions")]
    MissingPositions(String),
}

pub fn parse_gltf(path: &Path) -> Result<SceneData, GltfError> {
    let (document, buffers, _images) = gltf::import(path).map_err(|source| GltfError::Import {
        path: path.display().to_string(),
        source,
    })?;

    // --- MESHES ---
    // Every triangle primitive becomes its own mesh; `mesh_map` maps a glTF
    // mesh index to the primitives it produced.
    let mut meshes = Vec::new();
    let mut mesh_map: Vec<Vec<usize>> = Vec::new();

    for mesh in document.meshes() {
        let name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh{}", mesh.index()));
        let mut produced = Vec::new();

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("Skipping non-triangle primitive in mesh '{}'", name);
                continue;
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .ok_or_else(|| GltfError::MissingPositions(name.clone()))?;

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);

            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|read| read.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);

            // Non-indexed primitives draw their vertices in order.
            let indices: Vec<u32> = reader
                .read_indices()
                .map(|read| read.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let weights = match (reader.read_joints(0), reader.read_weights(0)) {
                (Some(joints), Some(weights)) => Some(VertexWeights {
                    joints: joints.into_u16().collect(),
                    weights: weights.into_f32().collect(),
                }),
                _ => None,
            };

            let vertices = positions
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    Vertex::new(
                        *p,
                        uvs.get(i).copied().unwrap_or_default(),
                        normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    )
                })
                .collect();

            produced.push(meshes.len());
            meshes.push(MeshData {
                name: name.clone(),
                vertices,
                indices,
                weights,
            });
        }

        mesh_map.push(produced);
    }

    // --- NODES ---
    let nodes: Vec<SceneNode> = document
        .nodes()
        .map(|node| {
            let (t, r, s) = node.transform().decomposed();
            SceneNode {
                name: node
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("node{}", node.index())),
                transform: Transform::from_decomposed(t, r, s),
                meshes: node
                    .mesh()
                    .map(|m| mesh_map[m.index()].clone())
                    .unwrap_or_default(),
                children: node.children().map(|c| c.index()).collect(),
                skin: node.skin().map(|s| s.index()),
            }
        })
        .collect();

    let roots = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => {
            // No scene list: every node that is nobody's child is a root.
            let mut is_child = vec![false; nodes.len()];
            for node in &nodes {
                for &c in &node.children {
                    is_child[c] = true;
                }
            }
            (0..nodes.len()).filter(|&i| !is_child[i]).collect()
        }
    };

    // --- SKINS ---
    let skins: Vec<Skin> = document
        .skins()
        .map(|skin| {
            let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
            let reader = skin.reader(|buffer| Some(&buffers[buffer.index()]));
            let inverse_bind_matrices = reader
                .read_inverse_bind_matrices()
                .map(|iter| iter.map(|m| Mat4::from_cols_array_2d(&m)).collect())
                .unwrap_or_else(|| vec![Mat4::IDENTITY; joints.len()]);
            Skin {
                joints,
                inverse_bind_matrices,
            }
        })
        .collect();

    // --- ANIMATIONS ---
    let mut animations = Vec::new();
    for animation in document.animations() {
        let mut channels = Vec::new();

        for channel in animation.channels() {
            let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
            let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
                continue;
            };
            let times: Vec<f32> = inputs.collect();

            let (interpolation, cubic) = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Step => (Interpolation::Step, false),
                gltf::animation::Interpolation::Linear => (Interpolation::Linear, false),
                // Tangents are dropped; the spline is sampled linearly.
                gltf::animation::Interpolation::CubicSpline => (Interpolation::Linear, true),
            };

            let values = match outputs {
                ReadOutputs::Translations(iter) => {
                    ChannelValues::Translation(keyframe_values(iter.map(Vec3::from), cubic))
                }
                ReadOutputs::Rotations(rotations) => ChannelValues::Rotation(keyframe_values(
                    rotations.into_f32().map(Quat::from_array),
                    cubic,
                )),
                ReadOutputs::Scales(iter) => {
                    ChannelValues::Scale(keyframe_values(iter.map(Vec3::from), cubic))
                }
                ReadOutputs::MorphTargetWeights(_) => continue,
            };

            channels.push(AnimationChannel {
                node: channel.target().node().index(),
                interpolation,
                times,
                values,
            });
        }

        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("animation{}", animation.index()));
        animations.push(AnimationClip::new(name, channels));
    }

    log::info!(
        "Parsed {}: {} meshes, {} nodes, {} skins, {} animations",
        path.display(),
        meshes.len(),
        nodes.len(),
        skins.len(),
        animations.len()
    );

    Ok(SceneData {
        meshes,
        nodes,
        roots,
        animations,
        skins,
    })
}

/// Cubic-spline outputs come as (in-tangent, value, out-tangent) triples.
fn keyframe_values<T>(values: impl Iterator<Item = T>, cubic: bool) -> Vec<T> {
    if cubic {
        values.skip(1).step_by(3).collect()
    } else {
        values.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A single triangle, one node named "Tri" translated to (1, 2, 3).
    fn write_triangle_gltf(dir: &Path) -> std::path::PathBuf {
        let mut bin = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in p {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);
        std::fs::write(dir.join("tri.bin"), &bin).unwrap();

        let gltf = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [ { "nodes": [0] } ],
            "nodes": [ { "name": "Tri", "mesh": 0, "translation": [1.0, 2.0, 3.0] } ],
            "meshes": [ { "name": "TriMesh", "primitives": [ { "attributes": { "POSITION": 0 }, "indices": 1 } ] } ],
            "buffers": [ { "uri": "tri.bin", "byteLength": 44 } ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
                { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
            ]
        }"#;
        let path = dir.join("tri.gltf");
        std::fs::write(&path, gltf).unwrap();
        path
    }

    #[test]
    fn parses_single_triangle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_triangle_gltf(dir.path());

        let scene = parse_gltf(&path).unwrap();
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.meshes[0].name, "TriMesh");
        assert_eq!(scene.meshes[0].indices, vec![0, 1, 2]);
        assert_eq!(scene.meshes[0].vertices[1].position, [1.0, 0.0, 0.0]);
        // defaults for missing attributes
        assert_eq!(scene.meshes[0].vertices[0].normal, [0.0, 1.0, 0.0]);

        assert_eq!(scene.roots, vec![0]);
        assert_eq!(scene.nodes[0].name, "Tri");
        assert_eq!(scene.nodes[0].meshes, vec![0]);
        assert_eq!(scene.nodes[0].transform.translation, Vec3::new(1.0, 2.0, 3.0));
        assert!(scene.animations.is_empty());
        assert!(scene.skins.is_empty());
        assert!(scene.meshes[0].weights.is_none());
    }

    /// The same triangle bound to a skin whose only joint is node "Bone".
    fn write_skinned_gltf(dir: &Path) -> std::path::PathBuf {
        let mut bin = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in p {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);
        for _ in 0..3 {
            bin.extend_from_slice(&[0u8, 0, 0, 0]);
        }
        for _ in 0..3 {
            for w in [1.0f32, 0.0, 0.0, 0.0] {
                bin.extend_from_slice(&w.to_le_bytes());
            }
        }
        std::fs::write(dir.join("skin.bin"), &bin).unwrap();

        let gltf = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [ { "nodes": [0, 1] } ],
            "nodes": [
                { "name": "Tri", "mesh": 0, "skin": 0 },
                { "name": "Bone", "translation": [0.0, 2.0, 0.0] }
            ],
            "skins": [ { "joints": [1] } ],
            "meshes": [ { "name": "TriMesh", "primitives": [ {
                "attributes": { "POSITION": 0, "JOINTS_0": 2, "WEIGHTS_0": 3 },
                "indices": 1
            } ] } ],
            "buffers": [ { "uri": "skin.bin", "byteLength": 104 } ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 6 },
                { "buffer": 0, "byteOffset": 44, "byteLength": 12 },
                { "buffer": 0, "byteOffset": 56, "byteLength": 48 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
                { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" },
                { "bufferView": 2, "componentType": 5121, "count": 3, "type": "VEC4" },
                { "bufferView": 3, "componentType": 5126, "count": 3, "type": "VEC4" }
            ]
        }"#;
        let path = dir.join("skin.gltf");
        std::fs::write(&path, gltf).unwrap();
        path
    }

    #[test]
    fn parses_skin_and_vertex_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_skinned_gltf(dir.path());

        let scene = parse_gltf(&path).unwrap();
        assert_eq!(scene.nodes[0].skin, Some(0));
        assert_eq!(scene.nodes[1].skin, None);
        assert_eq!(scene.skins.len(), 1);
        assert_eq!(scene.skins[0].joints, vec![1]);
        assert_eq!(scene.skins[0].inverse_bind_matrices, vec![Mat4::IDENTITY]);

        let weights = scene.meshes[0].weights.as_ref().unwrap();
        assert_eq!(weights.joints, vec![[0; 4]; 3]);
        assert_eq!(weights.weights, vec![[1.0, 0.0, 0.0, 0.0]; 3]);
    }

    #[test]
    fn missing_file_is_import_error() {
        let err = parse_gltf(Path::new("/no/such/scene.gltf")).unwrap_err();
        assert!(matches!(err, GltfError::Import { .. }));
    }

    #[test]
    fn cubic_values_keep_the_middle_of_each_triple() {
        let values = keyframe_values([0, 1, 2, 3, 4, 5].into_iter(), true);
        assert_eq!(values, vec![1, 4]);
    }
}
