use glam::{Mat3, Quat, Vec3};

/// A transformation composed of a rotation and a translation.
///
/// The rotation columns are the local x, y and z axes expressed in the parent frame.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RigidTransform {
    /// Rotation in the transform.
    pub rotation: Mat3,
    /// Translation in the transform.
    pub position: Vec3,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidTransform {
    /// Gets the identity transform.
    pub const IDENTITY: Self = Self {
        rotation: Mat3::IDENTITY,
        position: Vec3::ZERO,
    };

    /// Constructs a new rigid transform.
    #[inline(always)]
    pub fn new(rotation: Mat3, position: Vec3) -> Self {
        Self { rotation, position }
    }

    #[inline(always)]
    pub fn from_translation(position: Vec3) -> Self {
        Self {
            rotation: Mat3::IDENTITY,
            position,
        }
    }

    /// Constructs a transform from an orientation quaternion and a translation.
    #[inline(always)]
    pub fn from_rotation_translation(orientation: Quat, position: Vec3) -> Self {
        Self {
            rotation: Mat3::from_quat(orientation),
            position,
        }
    }

    /// Constructs a transform rotated by `angle` radians about `axis`. The axis does not need to be normalized.
    #[inline]
    pub fn from_axis_angle(axis: Vec3, angle: f32, position: Vec3) -> Self {
        let rotation = if angle == 0.0 {
            Mat3::IDENTITY
        } else {
            Mat3::from_axis_angle(axis.normalize(), angle)
        };
        Self { rotation, position }
    }

    /// Transforms a point from the local frame into the parent frame.
    #[inline(always)]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.position
    }

    /// Transforms a point from the parent frame into the local frame.
    #[inline(always)]
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.transpose() * (point - self.position)
    }

    #[inline(always)]
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    #[inline(always)]
    pub fn inverse_transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation.transpose() * vector
    }

    /// Computes `a ∘ b`: applying the result equals applying `b` and then `a`.
    #[inline(always)]
    pub fn concatenate(a: &Self, b: &Self) -> Self {
        Self {
            rotation: a.rotation * b.rotation,
            position: a.rotation * b.position + a.position,
        }
    }

    /// Computes `a⁻¹ ∘ b`, expressing `b` in the frame of `a`.
    #[inline(always)]
    pub fn inverse_concatenate(a: &Self, b: &Self) -> Self {
        let rotation_t = a.rotation.transpose();
        Self {
            rotation: rotation_t * b.rotation,
            position: rotation_t * (b.position - a.position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_point_round_trip() {
        let tx = RigidTransform::from_axis_angle(Vec3::new(0.0, 0.0, 2.0), FRAC_PI_2, Vec3::new(1.0, 2.0, 3.0));
        let world = tx.transform_point(Vec3::X);
        assert!(world.abs_diff_eq(Vec3::new(1.0, 3.0, 3.0), 1e-5));
        assert!(tx.inverse_transform_point(world).abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn test_concatenate_matches_sequential_application() {
        let a = RigidTransform::from_axis_angle(Vec3::Y, 0.7, Vec3::new(0.0, 1.0, 0.0));
        let b = RigidTransform::from_axis_angle(Vec3::X, -1.1, Vec3::new(2.0, 0.0, -1.0));
        let p = Vec3::new(0.3, -0.4, 0.5);
        let combined = RigidTransform::concatenate(&a, &b);
        assert!(combined
            .transform_point(p)
            .abs_diff_eq(a.transform_point(b.transform_point(p)), 1e-5));
        let relative = RigidTransform::inverse_concatenate(&a, &combined);
        assert!(relative.transform_point(p).abs_diff_eq(b.transform_point(p), 1e-5));
    }

    #[test]
    fn test_zero_angle_ignores_axis() {
        let tx = RigidTransform::from_axis_angle(Vec3::ZERO, 0.0, Vec3::ONE);
        assert_eq!(tx.rotation, Mat3::IDENTITY);
    }
}
