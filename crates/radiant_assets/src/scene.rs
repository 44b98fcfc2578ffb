//! Parsed scene hierarchy and keyframe animation.

use glam::{Mat4, Quat, Vec3};
use radiant_core::transform::Transform;

use crate::assets::MeshData;

#[derive(Clone, Debug, Default)]
pub struct SceneData {
    /// One entry per triangle primitive.
    pub meshes: Vec<MeshData>,
    pub nodes: Vec<SceneNode>,
    /// Nodes without a parent, in document order.
    pub roots: Vec<usize>,
    pub animations: Vec<AnimationClip>,
    pub skins: Vec<Skin>,
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    /// Indices into [`SceneData::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<usize>,
    /// Index into [`SceneData::skins`] deforming this node's meshes.
    pub skin: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct Skin {
    /// Node indices.
    pub joints: Vec<usize>,
    /// One per joint; identity when the file omits them.
    pub inverse_bind_matrices: Vec<Mat4>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
}

#[derive(Clone, Debug)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

#[derive(Clone, Debug)]
pub struct AnimationChannel {
    pub node: usize,
    pub interpolation: Interpolation,
    /// Keyframe times in seconds, ascending.
    pub times: Vec<f32>,
    pub values: ChannelValues,
}

impl AnimationChannel {
    /// Finds the keyframe pair around `t` and the blend factor between them.
    fn keyframe(&self, t: f32) -> Option<(usize, usize, f32)> {
        let last = self.times.len().checked_sub(1)?;
        if t <= self.times[0] {
            return Some((0, 0, 0.0));
        }
        if t >= self.times[last] {
            return Some((last, last, 0.0));
        }

        let next = self.times.partition_point(|&k| k <= t);
        let prev = next - 1;
        let span = self.times[next] - self.times[prev];
        let factor = if span > 0.0 { (t - self.times[prev]) / span } else { 0.0 };

        match self.interpolation {
            Interpolation::Step => Some((prev, prev, 0.0)),
            Interpolation::Linear => Some((prev, next, factor)),
        }
    }

    /// Writes the sampled value at time `t` into `transform`.
    pub fn apply(&self, t: f32, transform: &mut Transform) {
        let Some((a, b, f)) = self.keyframe(t) else {
            return;
        };

        match &self.values {
            ChannelValues::Translation(v) if b < v.len() => {
                transform.translation = v[a].lerp(v[b], f);
            }
            ChannelValues::Rotation(v) if b < v.len() => {
                transform.rotation = v[a].slerp(v[b], f).normalize();
            }
            ChannelValues::Scale(v) if b < v.len() => {
                transform.scale = v[a].lerp(v[b], f);
            }
            _ => {}
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<AnimationChannel>,
    /// Time of the last keyframe across all channels.
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: String, channels: Vec<AnimationChannel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0, f32::max);
        Self {
            name,
            channels,
            duration,
        }
    }

    /// Poses `transforms` (indexed by node) at time `t`.
    pub fn apply(&self, t: f32, transforms: &mut [Transform]) {
        for channel in &self.channels {
            if let Some(transform) = transforms.get_mut(channel.node) {
                channel.apply(t, transform);
            }
        }
    }
}
