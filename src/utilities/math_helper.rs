use glam::{Mat3, Vec3};

/// Clamps a value between a minimum and maximum value.
#[inline(always)]
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Returns -1 if the value is negative and 1 otherwise.
#[inline(always)]
pub fn binary_sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Returns `1 / x`, or zero when `x` is exactly zero.
#[inline(always)]
pub fn invert_or_zero(x: f32) -> f32 {
    if x != 0.0 {
        1.0 / x
    } else {
        0.0
    }
}

/// Builds two unit vectors that complete an orthonormal basis with the unit vector `a`.
///
/// Uses the construction from Erin Catto's "Computing a Basis": the component of `a` with the
/// largest magnitude is never divided away, which keeps the result stable near the axes.
#[inline]
pub fn compute_basis(a: Vec3) -> (Vec3, Vec3) {
    // At least one component of a unit vector is >= 0.57735.
    let b = if a.x.abs() >= 0.57735027 {
        Vec3::new(a.y, -a.x, 0.0)
    } else {
        Vec3::new(0.0, a.z, -a.y)
    }
    .normalize();
    let c = a.cross(b);
    (b, c)
}

/// Outer product `u * vᵀ`.
#[inline(always)]
pub fn outer_product(u: Vec3, v: Vec3) -> Mat3 {
    Mat3::from_cols(u * v.x, u * v.y, u * v.z)
}

/// Diagonal matrix with the given entries.
#[inline(always)]
pub fn diagonal(d: Vec3) -> Mat3 {
    Mat3::from_diagonal(d)
}

/// Friction of a contact between two materials: the geometric mean of both coefficients.
#[inline(always)]
pub fn mix_friction(friction_a: f32, friction_b: f32) -> f32 {
    (friction_a * friction_b).sqrt()
}

/// Restitution of a contact between two materials: the bouncier of the two wins.
#[inline(always)]
pub fn mix_restitution(restitution_a: f32, restitution_b: f32) -> f32 {
    restitution_a.max(restitution_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_basis_is_orthonormal() {
        let normals = [
            Vec3::X,
            Vec3::Y,
            -Vec3::Z,
            Vec3::new(1.0, 2.0, -3.0).normalize(),
            Vec3::new(-0.2, 0.1, 0.97).normalize(),
        ];
        for n in normals {
            let (t, b) = compute_basis(n);
            assert_abs_diff_eq!(t.length(), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(b.length(), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(t.dot(n), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(b.dot(n), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(t.dot(b), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_invert_or_zero() {
        assert_eq!(invert_or_zero(0.0), 0.0);
        assert_eq!(invert_or_zero(4.0), 0.25);
    }

    #[test]
    fn test_material_mixing() {
        assert_abs_diff_eq!(mix_friction(0.4, 0.9), 0.6, epsilon = 1e-6);
        assert_eq!(mix_friction(0.0, 1.0), 0.0);
        assert_eq!(mix_restitution(0.2, 0.7), 0.7);
        assert_eq!(clamp(5.0, -1.0, 1.0), 1.0);
    }

    #[test]
    fn test_outer_product() {
        let m = outer_product(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0));
        // Row 1, column 2 of u vᵀ is u.y * v.z.
        assert_eq!(m.z_axis.y, 12.0);
        assert_eq!(m * Vec3::X, Vec3::new(4.0, 8.0, 12.0));
    }
}
