use glam::{Mat3, Quat, Vec3};

use crate::physics::bodies::Body;
use crate::physics::body_properties::BodyVelocity;

/// Provides helper functions for integrating body velocities and poses.
pub struct PoseIntegration;

impl PoseIntegration {
    /// Rotates an inverse inertia tensor from body space to world space: `R * I⁻¹ * Rᵀ`.
    #[inline(always)]
    pub fn rotate_inverse_inertia(local_inverse_inertia: &Mat3, rotation: &Mat3) -> Mat3 {
        *rotation * *local_inverse_inertia * rotation.transpose()
    }

    /// Applies gravity and accumulated forces to a dynamic body's velocity, then damps it.
    ///
    /// Also refreshes the body's world inverse inertia for the solver. Static and kinematic bodies
    /// are left untouched.
    pub fn integrate_velocity(body: &mut Body, gravity: Vec3, dt: f32) {
        if !body.is_dynamic() {
            return;
        }
        body.force += gravity * (body.gravity_scale * body.mass);
        body.inv_inertia_world =
            Self::rotate_inverse_inertia(&body.inv_inertia_model, &body.transform.rotation);

        body.linear_velocity += body.force * (body.inv_mass * dt);
        body.angular_velocity += body.inv_inertia_world * body.torque * dt;

        // Padé approximation of exp(-c * dt).
        body.linear_velocity *= 1.0 / (1.0 + dt * body.linear_damping);
        body.angular_velocity *= 1.0 / (1.0 + dt * body.angular_damping);
    }

    /// Integrates a position by linear velocity over dt.
    #[inline(always)]
    pub fn integrate_position(position: Vec3, linear_velocity: Vec3, dt: f32) -> Vec3 {
        position + linear_velocity * dt
    }

    /// Integrates an orientation by angular velocity over dt with `q += ½ (ω dt) q`, then renormalizes.
    #[inline(always)]
    pub fn integrate_orientation(orientation: Quat, angular_velocity: Vec3, dt: f32) -> Quat {
        let w = angular_velocity * dt;
        let spin = Quat::from_xyzw(w.x, w.y, w.z, 0.0) * orientation;
        (orientation + spin * 0.5).normalize()
    }

    /// Copies solved velocities onto a non-static body and advances its center of mass and
    /// orientation. The body origin is re-derived later when its proxies are synchronized.
    pub fn integrate_pose(body: &mut Body, velocity: &BodyVelocity, dt: f32) {
        if body.is_static() {
            return;
        }
        body.linear_velocity = velocity.linear;
        body.angular_velocity = velocity.angular;
        body.world_center = Self::integrate_position(body.world_center, velocity.linear, dt);
        body.orientation = Self::integrate_orientation(body.orientation, velocity.angular, dt);
        body.transform.rotation = Mat3::from_quat(body.orientation);
    }
}
