use glam::{Mat3, Vec3};

use crate::physics::body_description::BoxDescription;
use crate::physics::body_properties::MassData;
use crate::physics::collidables::ray::RaycastData;
use crate::physics::handles::BodyHandle;
use crate::physics::trees::NULL_NODE;
use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::math_helper;
use crate::utilities::rigid_transform::RigidTransform;

/// Components of a ray direction smaller than this are treated as parallel to a slab.
const RAY_PARALLEL_EPSILON: f32 = 1.0e-8;

/// Oriented box collider owned by a body.
#[derive(Debug, Clone, Copy)]
pub struct BoxShape {
    /// Placement relative to the owning body.
    pub local: RigidTransform,
    /// Half of the box's size along each local axis.
    pub extents: Vec3,
    pub friction: f32,
    pub restitution: f32,
    pub density: f32,
    pub sensor: bool,
    pub user_data: u64,
    /// Owning body.
    pub body: BodyHandle,
    /// Leaf id of the box in the broad phase tree.
    pub broad_phase_index: i32,
}

/// Corner signs of the unit box, in the order the bounds are accumulated.
const CORNERS: [Vec3; 8] = [
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(-1.0, 1.0, 1.0),
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(1.0, 1.0, -1.0),
    Vec3::new(1.0, 1.0, 1.0),
];

impl BoxShape {
    /// Creates a box from a validated description.
    pub fn new(description: &BoxDescription, body: BodyHandle) -> Self {
        Self {
            local: description.local_transform,
            extents: description.extents,
            friction: description.friction,
            restitution: description.restitution,
            density: description.density,
            sensor: description.sensor,
            user_data: description.user_data,
            body,
            broad_phase_index: NULL_NODE,
        }
    }

    /// World transform of the box given its body's transform.
    #[inline(always)]
    pub fn world_transform(&self, body_transform: &RigidTransform) -> RigidTransform {
        RigidTransform::concatenate(body_transform, &self.local)
    }

    /// Tight world bounds of the box.
    pub fn compute_aabb(&self, body_transform: &RigidTransform) -> BoundingBox {
        let world = self.world_transform(body_transform);
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for corner in CORNERS {
            let point = world.transform_point(corner * self.extents);
            min = min.min(point);
            max = max.max(point);
        }
        BoundingBox::new(min, max)
    }

    /// Mass, weighted center and inertia about the body origin contributed by this box.
    pub fn compute_mass(&self) -> MassData {
        let size = self.extents * 2.0;
        let mass = size.x * size.y * size.z * self.density;
        let e2 = self.extents * self.extents;
        let local_inertia = math_helper::diagonal(
            Vec3::new(e2.y + e2.z, e2.x + e2.z, e2.x + e2.y) * (mass / 3.0),
        );
        let rotation = self.local.rotation;
        let offset = self.local.position;
        // Parallel axis theorem moves the inertia from the box center to the body origin.
        let shift = Mat3::IDENTITY * offset.length_squared() - math_helper::outer_product(offset, offset);
        MassData {
            inertia: rotation * local_inertia * rotation.transpose() + shift * mass,
            weighted_center: offset * mass,
            mass,
        }
    }

    /// Checks whether a world point lies inside the box, boundary included.
    pub fn test_point(&self, body_transform: &RigidTransform, point: Vec3) -> bool {
        let world = self.world_transform(body_transform);
        let local = world.inverse_transform_point(point);
        local.abs().cmple(self.extents).all()
    }

    /// Casts a ray against the box.
    ///
    /// On a hit within `ray.t`, writes the time of impact into `ray.toi`, the world normal of the
    /// entered face into `ray.normal` and returns true. Rays starting inside the box miss.
    pub fn raycast(&self, body_transform: &RigidTransform, ray: &mut RaycastData) -> bool {
        let world = self.world_transform(body_transform);
        let d = world.inverse_transform_vector(ray.dir);
        let p = world.inverse_transform_point(ray.start);

        let mut t_min = f32::MIN;
        let mut t_max = f32::MAX;
        let mut normal_axis = 0usize;
        let mut normal_sign = 1.0f32;

        for axis in 0..3 {
            let e = self.extents[axis];
            if d[axis].abs() < RAY_PARALLEL_EPSILON {
                if p[axis] < -e || p[axis] > e {
                    return false;
                }
                continue;
            }
            let inverse = 1.0 / d[axis];
            let sign = -math_helper::binary_sign(d[axis]);
            let mut t0 = (-e - p[axis]) * inverse;
            let mut t1 = (e - p[axis]) * inverse;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_min {
                t_min = t0;
                normal_axis = axis;
                normal_sign = sign;
            }
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }

        if t_min < 0.0 || t_min > ray.t {
            return false;
        }

        let mut local_normal = Vec3::ZERO;
        local_normal[normal_axis] = normal_sign;
        ray.toi = t_min;
        ray.normal = world.transform_vector(local_normal);
        true
    }
}
