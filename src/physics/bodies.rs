use glam::{Mat3, Quat, Vec3};

use crate::physics::body_description::BodyDescription;
use crate::physics::body_properties::{BodyFlags, BodyType, MassData};
use crate::physics::collidables::box_shape::BoxShape;
use crate::physics::handles::{BodyHandle, BoxHandle, ContactHandle};
use crate::physics::pose_integration::PoseIntegration;
use crate::utilities::memory::id_pool::IdPool;
use crate::utilities::rigid_transform::RigidTransform;

/// Link from a body to one of its contact constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEdge {
    pub constraint: ContactHandle,
    /// Body on the other side of the constraint.
    pub other: BodyHandle,
}

/// Rigid body made of one or more boxes.
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) inv_inertia_model: Mat3,
    pub(crate) inv_inertia_world: Mat3,
    pub(crate) mass: f32,
    pub(crate) inv_mass: f32,
    pub(crate) linear_velocity: Vec3,
    pub(crate) angular_velocity: Vec3,
    pub(crate) force: Vec3,
    pub(crate) torque: Vec3,
    /// Transform of the body origin.
    pub(crate) transform: RigidTransform,
    pub(crate) orientation: Quat,
    pub(crate) local_center: Vec3,
    pub(crate) world_center: Vec3,
    pub(crate) sleep_time: f32,
    pub(crate) gravity_scale: f32,
    pub(crate) layers: u32,
    pub(crate) flags: BodyFlags,
    pub(crate) boxes: Vec<BoxHandle>,
    pub(crate) contact_edges: Vec<ContactEdge>,
    /// Slot of the body in the island currently being solved.
    pub(crate) island_index: usize,
    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,
    pub user_data: u64,
}

impl Body {
    /// Creates a body with no boxes from a validated description.
    pub fn new(description: &BodyDescription) -> Self {
        let orientation = if description.angle != 0.0 {
            Quat::from_axis_angle(description.axis.normalize(), description.angle)
        } else {
            Quat::IDENTITY
        };
        let transform = RigidTransform::from_rotation_translation(orientation, description.position);

        let mut flags = BodyFlags::empty();
        let (linear_velocity, angular_velocity) = match description.body_type {
            BodyType::Dynamic => {
                flags.insert(BodyFlags::DYNAMIC);
                (description.linear_velocity, description.angular_velocity)
            }
            BodyType::Kinematic => {
                flags.insert(BodyFlags::KINEMATIC);
                (description.linear_velocity, description.angular_velocity)
            }
            BodyType::Static => {
                flags.insert(BodyFlags::STATIC);
                (Vec3::ZERO, Vec3::ZERO)
            }
        };
        flags.set(BodyFlags::ALLOW_SLEEP, description.allow_sleep);
        flags.set(BodyFlags::AWAKE, description.awake);
        flags.set(BodyFlags::ACTIVE, description.active);
        flags.set(BodyFlags::LOCK_AXIS_X, description.lock_axis_x);
        flags.set(BodyFlags::LOCK_AXIS_Y, description.lock_axis_y);
        flags.set(BodyFlags::LOCK_AXIS_Z, description.lock_axis_z);

        let mut body = Self {
            inv_inertia_model: Mat3::ZERO,
            inv_inertia_world: Mat3::ZERO,
            mass: 0.0,
            inv_mass: 0.0,
            linear_velocity,
            angular_velocity,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            transform,
            orientation,
            local_center: Vec3::ZERO,
            world_center: description.position,
            sleep_time: 0.0,
            gravity_scale: description.gravity_scale,
            layers: description.layers,
            flags,
            boxes: Vec::new(),
            contact_edges: Vec::new(),
            island_index: 0,
            linear_damping: description.linear_damping,
            angular_damping: description.angular_damping,
            user_data: description.user_data,
        };
        body.calculate_mass_data(std::iter::empty::<MassData>());
        body
    }

    #[inline(always)]
    pub fn transform(&self) -> &RigidTransform {
        &self.transform
    }

    #[inline(always)]
    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    #[inline(always)]
    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// World position of the center of mass.
    #[inline(always)]
    pub fn world_center(&self) -> Vec3 {
        self.world_center
    }

    /// Center of mass relative to the body origin, in body space.
    #[inline(always)]
    pub fn local_center(&self) -> Vec3 {
        self.local_center
    }

    #[inline(always)]
    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    #[inline(always)]
    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// Force accumulated since the last step.
    #[inline(always)]
    pub fn force(&self) -> Vec3 {
        self.force
    }

    #[inline(always)]
    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    #[inline(always)]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline(always)]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Inverse inertia in world space, as of the last step or mass update.
    #[inline(always)]
    pub fn inv_inertia_world(&self) -> Mat3 {
        self.inv_inertia_world
    }

    #[inline(always)]
    pub fn flags(&self) -> BodyFlags {
        self.flags
    }

    #[inline(always)]
    pub fn is_awake(&self) -> bool {
        self.flags.contains(BodyFlags::AWAKE)
    }

    #[inline(always)]
    pub fn is_static(&self) -> bool {
        self.flags.contains(BodyFlags::STATIC)
    }

    #[inline(always)]
    pub fn is_dynamic(&self) -> bool {
        self.flags.contains(BodyFlags::DYNAMIC)
    }

    #[inline(always)]
    pub fn is_kinematic(&self) -> bool {
        self.flags.contains(BodyFlags::KINEMATIC)
    }

    #[inline(always)]
    pub fn sleep_time(&self) -> f32 {
        self.sleep_time
    }

    #[inline(always)]
    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    pub fn set_gravity_scale(&mut self, gravity_scale: f32) {
        self.gravity_scale = gravity_scale;
    }

    #[inline(always)]
    pub fn layers(&self) -> u32 {
        self.layers
    }

    /// Changes the collision layers. Existing contacts are re-checked on the next step.
    pub fn set_layers(&mut self, layers: u32) {
        self.layers = layers;
    }

    #[inline(always)]
    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    pub fn set_linear_damping(&mut self, damping: f32) {
        self.linear_damping = damping;
    }

    #[inline(always)]
    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    pub fn set_angular_damping(&mut self, damping: f32) {
        self.angular_damping = damping;
    }

    /// Boxes attached to the body.
    #[inline(always)]
    pub fn boxes(&self) -> &[BoxHandle] {
        &self.boxes
    }

    #[inline(always)]
    pub fn contact_edges(&self) -> &[ContactEdge] {
        &self.contact_edges
    }

    /// Accumulates a force that acts like an acceleration: it is scaled by the body's mass so every
    /// body responds to the same value equally.
    pub fn apply_linear_force(&mut self, force: Vec3) {
        self.force += force * self.mass;
        self.set_to_awake();
    }

    /// Same as `apply_linear_force`, plus the torque of `force` acting at `point`.
    pub fn apply_force_at_world_point(&mut self, force: Vec3, point: Vec3) {
        self.force += force * self.mass;
        self.torque += (point - self.world_center).cross(force);
        self.set_to_awake();
    }

    pub fn apply_linear_impulse(&mut self, impulse: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
        self.set_to_awake();
    }

    pub fn apply_linear_impulse_at_world_point(&mut self, impulse: Vec3, point: Vec3) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world * (point - self.world_center).cross(impulse);
        self.set_to_awake();
    }

    pub fn apply_torque(&mut self, torque: Vec3) {
        self.torque += torque;
        self.set_to_awake();
    }

    /// Velocity of the body at a world point.
    pub fn velocity_at_world_point(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.world_center)
    }

    /// Replaces the linear velocity. Panics for static bodies.
    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        assert!(!self.is_static(), "Static bodies cannot be given a velocity.");
        if velocity.length_squared() > 0.0 {
            self.set_to_awake();
        }
        self.linear_velocity = velocity;
    }

    /// Replaces the angular velocity. Panics for static bodies.
    pub fn set_angular_velocity(&mut self, velocity: Vec3) {
        assert!(!self.is_static(), "Static bodies cannot be given a velocity.");
        if velocity.length_squared() > 0.0 {
            self.set_to_awake();
        }
        self.angular_velocity = velocity;
    }

    pub fn set_to_awake(&mut self) {
        if !self.is_awake() {
            self.flags.insert(BodyFlags::AWAKE);
            self.sleep_time = 0.0;
        }
    }

    pub fn set_to_sleep(&mut self) {
        self.flags.remove(BodyFlags::AWAKE);
        self.sleep_time = 0.0;
        self.linear_velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    /// Whether contacts between this body and `other` should exist at all.
    ///
    /// A body never collides with itself, at least one side must be dynamic, and the layer masks
    /// must share a bit.
    pub fn can_collide(&self, other: &Body) -> bool {
        if std::ptr::eq(self, other) {
            return false;
        }
        if !self.is_dynamic() && !other.is_dynamic() {
            return false;
        }
        self.layers & other.layers != 0
    }

    #[inline]
    pub fn local_point(&self, point: Vec3) -> Vec3 {
        self.transform.inverse_transform_point(point)
    }

    #[inline]
    pub fn local_vector(&self, vector: Vec3) -> Vec3 {
        self.transform.inverse_transform_vector(vector)
    }

    #[inline]
    pub fn world_point(&self, point: Vec3) -> Vec3 {
        self.transform.transform_point(point)
    }

    #[inline]
    pub fn world_vector(&self, vector: Vec3) -> Vec3 {
        self.transform.transform_vector(vector)
    }

    /// Recomputes mass, center of mass and inertia from the boxes' contributions.
    ///
    /// Static and kinematic bodies always end up with zero inverse mass and inertia. A dynamic
    /// body without mass gets unit mass and no rotational response.
    pub fn calculate_mass_data<I: IntoIterator<Item = MassData>>(&mut self, contributions: I) {
        self.inv_inertia_model = Mat3::ZERO;
        self.inv_inertia_world = Mat3::ZERO;
        self.inv_mass = 0.0;
        self.mass = 0.0;

        if self.is_static() || self.is_kinematic() {
            self.local_center = Vec3::ZERO;
            self.world_center = self.transform.position;
            return;
        }

        let mut mass = 0.0;
        let mut inertia = Mat3::ZERO;
        let mut local_center = Vec3::ZERO;
        for contribution in contributions {
            mass += contribution.mass;
            inertia += contribution.inertia;
            local_center += contribution.weighted_center;
        }

        if mass > 0.0 {
            self.mass = mass;
            self.inv_mass = 1.0 / mass;
            local_center *= self.inv_mass;
            // Move the inertia from the body origin to the center of mass.
            let shift = Mat3::IDENTITY * local_center.length_squared()
                - crate::utilities::math_helper::outer_product(local_center, local_center);
            inertia -= shift * mass;
            self.inv_inertia_model = inertia.inverse();

            if self.flags.contains(BodyFlags::LOCK_AXIS_X) {
                self.inv_inertia_model.x_axis = Vec3::ZERO;
            }
            if self.flags.contains(BodyFlags::LOCK_AXIS_Y) {
                self.inv_inertia_model.y_axis = Vec3::ZERO;
            }
            if self.flags.contains(BodyFlags::LOCK_AXIS_Z) {
                self.inv_inertia_model.z_axis = Vec3::ZERO;
            }
            self.inv_inertia_world =
                PoseIntegration::rotate_inverse_inertia(&self.inv_inertia_model, &self.transform.rotation);
        } else {
            self.mass = 1.0;
            self.inv_mass = 1.0;
            local_center = Vec3::ZERO;
        }

        self.local_center = local_center;
        self.world_center = self.transform.transform_point(local_center);
    }

    /// Moves the body so its center of mass sits at `world_center` with the given orientation.
    pub(crate) fn set_pose(&mut self, world_center: Vec3, orientation: Option<Quat>) {
        self.world_center = world_center;
        if let Some(orientation) = orientation {
            self.orientation = orientation;
            self.transform.rotation = Mat3::from_quat(orientation);
        }
        self.synchronize_transform();
    }

    /// Re-derives the body origin from the center of mass and rotation.
    #[inline]
    pub(crate) fn synchronize_transform(&mut self) {
        self.transform.position =
            self.world_center - self.transform.rotation * self.local_center;
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }
}

/// Arena of bodies and the boxes attached to them, addressed by handles.
///
/// Handles are recycled after removal, so a handle kept past the removal of its object may later
/// refer to a new one.
#[derive(Debug, Clone, Default)]
pub struct Bodies {
    bodies: Vec<Option<Body>>,
    body_handle_pool: IdPool,
    body_count: usize,
    shapes: Vec<Option<BoxShape>>,
    shape_handle_pool: IdPool,
    shape_count: usize,
}

/// Stores `value` at slot `id`, growing the slot list as needed.
pub(crate) fn place<T>(slots: &mut Vec<Option<T>>, id: i32, value: T) {
    let index = id as usize;
    if index >= slots.len() {
        slots.resize_with(index + 1, || None);
    }
    debug_assert!(slots[index].is_none(), "Slot {id} is already occupied.");
    slots[index] = Some(value);
}

impl Bodies {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn count(&self) -> usize {
        self.body_count
    }

    #[inline(always)]
    pub fn shape_count(&self) -> usize {
        self.shape_count
    }

    pub fn add(&mut self, body: Body) -> BodyHandle {
        let id = self.body_handle_pool.take();
        place(&mut self.bodies, id, body);
        self.body_count += 1;
        BodyHandle(id)
    }

    /// Removes a body from the arena. Its boxes stay until removed through `remove_shape`.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<Body> {
        let body = self.bodies.get_mut(handle.slot())?.take()?;
        self.body_handle_pool.return_id(handle.0);
        self.body_count -= 1;
        Some(body)
    }

    #[inline]
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    #[inline]
    pub fn get(&self, handle: BodyHandle) -> Option<&Body> {
        if handle.0 < 0 {
            return None;
        }
        self.bodies.get(handle.slot())?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        if handle.0 < 0 {
            return None;
        }
        self.bodies.get_mut(handle.slot())?.as_mut()
    }

    /// Live bodies in ascending handle order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|body| (BodyHandle(i as i32), body)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut Body)> {
        self.bodies
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|body| (BodyHandle(i as i32), body)))
    }

    pub fn add_shape(&mut self, shape: BoxShape) -> BoxHandle {
        let id = self.shape_handle_pool.take();
        place(&mut self.shapes, id, shape);
        self.shape_count += 1;
        BoxHandle(id)
    }

    /// Removes a box from the arena without touching its body or the broad phase.
    pub fn remove_shape(&mut self, handle: BoxHandle) -> Option<BoxShape> {
        let shape = self.shapes.get_mut(handle.slot())?.take()?;
        self.shape_handle_pool.return_id(handle.0);
        self.shape_count -= 1;
        Some(shape)
    }

    #[inline]
    pub fn shape(&self, handle: BoxHandle) -> Option<&BoxShape> {
        if handle.0 < 0 {
            return None;
        }
        self.shapes.get(handle.slot())?.as_ref()
    }

    #[inline]
    pub fn shape_mut(&mut self, handle: BoxHandle) -> Option<&mut BoxShape> {
        if handle.0 < 0 {
            return None;
        }
        self.shapes.get_mut(handle.slot())?.as_mut()
    }

    /// Recomputes a body's mass from its current boxes. Returns false for an unknown handle.
    pub fn recalculate_mass(&mut self, handle: BodyHandle) -> bool {
        let Some(body) = self.get(handle) else {
            return false;
        };
        let contributions: Vec<MassData> = body
            .boxes
            .iter()
            .filter_map(|&shape| self.shape(shape))
            .filter(|shape| shape.density != 0.0)
            .map(BoxShape::compute_mass)
            .collect();
        match self.get_mut(handle) {
            Some(body) => {
                body.calculate_mass_data(contributions);
                true
            }
            None => false,
        }
    }

    /// Checks whether two bodies are allowed to generate contacts. Unknown handles never collide.
    pub fn can_collide(&self, a: BodyHandle, b: BodyHandle) -> bool {
        if a == b {
            return false;
        }
        match (self.get(a), self.get(b)) {
            (Some(body_a), Some(body_b)) => body_a.can_collide(body_b),
            _ => false,
        }
    }

    /// Removes every body and box and resets the handle pools.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.body_handle_pool.clear();
        self.body_count = 0;
        self.shapes.clear();
        self.shape_handle_pool.clear();
        self.shape_count = 0;
    }
}
