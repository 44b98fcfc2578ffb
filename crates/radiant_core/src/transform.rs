use glam::{Mat4, Quat, Vec3};

/// Local translation / rotation / scale of a scene node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Builds a transform from glTF-style decomposed arrays.
    pub fn from_decomposed(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        Self {
            translation: translation.into(),
            rotation: Quat::from_array(rotation),
            scale: scale.into(),
        }
    }

    /// Local -> parent matrix.
    pub fn compute_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_matrix_applies_scale_then_translation() {
        let t = Transform {
            translation: Vec3::new(1.0, 0.0, 0.0),
            scale: Vec3::splat(2.0),
            ..Default::default()
        };
        let p = t.compute_matrix().transform_point3(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Vec3::new(3.0, 2.0, 2.0));
    }

    #[test]
    fn decomposed_rotation_is_applied() {
        let half_turn_y = [0.0, 1.0, 0.0, 0.0];
        let t = Transform::from_decomposed([0.0, 0.0, 5.0], half_turn_y, [1.0, 1.0, 1.0]);
        let p = t.compute_matrix().transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(-1.0, 0.0, 5.0), 1e-6));
    }
}
