use glam::{Quat, Vec3};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::physics::bodies::{Bodies, Body};
use crate::physics::body_description::{BodyDescription, BoxDescription, DescriptionError};
use crate::physics::body_properties::BodyFlags;
use crate::physics::collidables::box_shape::BoxShape;
use crate::physics::collidables::ray::RaycastData;
use crate::physics::collision_detection::broad_phase::BroadPhase;
use crate::physics::collision_detection::contact_constraint::ContactConstraint;
use crate::physics::collision_detection::contact_manager::{ContactManager, IContactListener};
use crate::physics::handles::{BodyHandle, BoxHandle, ContactHandle};
use crate::physics::island::Island;
use crate::physics::island_sleeper::IslandSleeper;
use crate::physics::simulation_settings::{SettingsError, SimulationSettings};
use crate::utilities::bounding_box::BoundingBox;

/// Half size of the candidate box used to look up shapes around a point.
const POINT_QUERY_MARGIN: f32 = 0.5;

/// Errors returned by fallible simulation entry points.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Description(#[from] DescriptionError),
    /// The handle does not refer to a live body.
    #[error("unknown body {0}")]
    UnknownBody(BodyHandle),
    /// The handle does not refer to a live box, or the box belongs to another body.
    #[error("unknown box {0}")]
    UnknownBox(BoxHandle),
}

/// Receives the boxes found by a scene query.
pub trait IQueryCallback {
    /// Called once per box found. Returning false stops the query.
    fn report_shape(&mut self, shape: BoxHandle) -> bool;
}

impl<F> IQueryCallback for F
where
    F: FnMut(BoxHandle) -> bool,
{
    #[inline(always)]
    fn report_shape(&mut self, shape: BoxHandle) -> bool {
        self(shape)
    }
}

/// Orchestrates the bookkeeping and execution of a box simulation.
///
/// A step finds new pairs, re-tests existing contacts, builds and solves islands, moves the box
/// proxies and clears the accumulated forces. Everything runs on the calling thread.
#[derive(Debug)]
pub struct Simulation {
    settings: SimulationSettings,
    bodies: Bodies,
    contact_manager: ContactManager,
    island: Island,
    seeds: Vec<BodyHandle>,
    new_box: bool,
    step_index: u64,
}

impl Simulation {
    pub fn new(settings: SimulationSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        info!(dt = settings.dt, iterations = settings.iterations, "simulation created");
        Ok(Self {
            settings,
            bodies: Bodies::new(),
            contact_manager: ContactManager::new(BroadPhase::new(settings.aabb_extension)),
            island: Island::new(),
            seeds: Vec::new(),
            new_box: false,
            step_index: 0,
        })
    }

    #[inline(always)]
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Number of completed steps.
    #[inline(always)]
    pub fn step_index(&self) -> u64 {
        self.step_index
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.settings.gravity = gravity;
    }

    /// Sets the solver pass count. Values below one are raised to one.
    pub fn set_iterations(&mut self, iterations: u32) {
        self.settings.iterations = iterations.max(1);
    }

    /// Turning sleep off wakes every body.
    pub fn set_allow_sleep(&mut self, allow_sleep: bool) {
        self.settings.allow_sleep = allow_sleep;
        if !allow_sleep {
            IslandSleeper::wake_all(&mut self.bodies);
        }
    }

    pub fn set_enable_friction(&mut self, enable_friction: bool) {
        self.settings.enable_friction = enable_friction;
    }

    pub fn set_contact_listener(&mut self, listener: Option<Box<dyn IContactListener>>) {
        self.contact_manager.set_contact_listener(listener);
    }

    #[inline(always)]
    pub fn body_count(&self) -> usize {
        self.bodies.count()
    }

    #[inline(always)]
    pub fn contact_count(&self) -> usize {
        self.contact_manager.contact_count()
    }

    #[inline(always)]
    pub fn bodies(&self) -> &Bodies {
        &self.bodies
    }

    #[inline]
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    #[inline]
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    #[inline]
    pub fn box_shape(&self, handle: BoxHandle) -> Option<&BoxShape> {
        self.bodies.shape(handle)
    }

    /// Live contact constraints in handle order, touching or not.
    pub fn contacts(&self) -> impl Iterator<Item = (ContactHandle, &ContactConstraint)> {
        self.contact_manager.iter()
    }

    #[inline]
    pub fn contact(&self, handle: ContactHandle) -> Option<&ContactConstraint> {
        self.contact_manager.get(handle)
    }

    #[inline(always)]
    pub fn broad_phase(&self) -> &BroadPhase {
        self.contact_manager.broad_phase()
    }

    pub fn create_body(&mut self, description: &BodyDescription) -> Result<BodyHandle, DescriptionError> {
        description.validate()?;
        let handle = self.bodies.add(Body::new(description));
        debug!(%handle, body_type = ?description.body_type, "body created");
        Ok(handle)
    }

    /// Removes a body together with its boxes, proxies and contacts.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<(), SimulationError> {
        if !self.bodies.contains(handle) {
            return Err(SimulationError::UnknownBody(handle));
        }
        self.contact_manager
            .remove_contacts_from_body(&mut self.bodies, handle);
        self.contact_manager
            .remove_from_broad_phase(&self.bodies, handle);
        if let Some(body) = self.bodies.remove(handle) {
            for shape in body.boxes {
                self.bodies.remove_shape(shape);
            }
        }
        debug!(%handle, "body removed");
        Ok(())
    }

    pub fn remove_all_bodies(&mut self) {
        let handles: Vec<BodyHandle> = self.bodies.iter().map(|(handle, _)| handle).collect();
        for handle in handles {
            // Handles come straight from the arena.
            let _ = self.remove_body(handle);
        }
    }

    /// Attaches a box to a body, registers its proxy and recomputes the body's mass.
    ///
    /// The next step looks for new pairs before re-testing contacts.
    pub fn add_box(&mut self, body: BodyHandle, description: &BoxDescription) -> Result<BoxHandle, SimulationError> {
        description.validate()?;
        let transform = match self.bodies.get(body) {
            Some(body) => *body.transform(),
            None => return Err(SimulationError::UnknownBody(body)),
        };
        let shape = BoxShape::new(description, body);
        let aabb = shape.compute_aabb(&transform);
        let handle = self.bodies.add_shape(shape);
        let proxy = self
            .contact_manager
            .broad_phase_mut()
            .insert_box(handle, &aabb);
        if let Some(shape) = self.bodies.shape_mut(handle) {
            shape.broad_phase_index = proxy;
        }
        if let Some(body) = self.bodies.get_mut(body) {
            body.boxes.push(handle);
        }
        self.bodies.recalculate_mass(body);
        self.new_box = true;
        debug!(%body, shape = %handle, extents = ?description.extents, "box added");
        Ok(handle)
    }

    /// Detaches a box from its body, dropping its contacts and proxy, and recomputes the mass.
    pub fn remove_box(&mut self, body: BodyHandle, shape: BoxHandle) -> Result<(), SimulationError> {
        let Some(owner) = self.bodies.get(body) else {
            return Err(SimulationError::UnknownBody(body));
        };
        let proxy = match self.bodies.shape(shape) {
            Some(box_shape) if box_shape.body == body => box_shape.broad_phase_index,
            _ => return Err(SimulationError::UnknownBox(shape)),
        };

        let touching: Vec<ContactHandle> = owner
            .contact_edges()
            .iter()
            .map(|edge| edge.constraint)
            .filter(|&constraint| {
                self.contact_manager
                    .get(constraint)
                    .is_some_and(|c| c.box_a == shape || c.box_b == shape)
            })
            .collect();
        for constraint in touching {
            self.contact_manager.remove_contact(&mut self.bodies, constraint);
        }

        self.contact_manager.broad_phase_mut().remove_box(proxy);
        if let Some(owner) = self.bodies.get_mut(body) {
            owner.boxes.retain(|&b| b != shape);
        }
        self.bodies.remove_shape(shape);
        self.bodies.recalculate_mass(body);
        debug!(%body, %shape, "box removed");
        Ok(())
    }

    pub fn remove_all_boxes(&mut self, body: BodyHandle) -> Result<(), SimulationError> {
        let boxes = match self.bodies.get(body) {
            Some(owner) => owner.boxes().to_vec(),
            None => return Err(SimulationError::UnknownBody(body)),
        };
        for shape in boxes {
            self.remove_box(body, shape)?;
        }
        Ok(())
    }

    /// Places a body's center of mass at `position`, rotated `angle` radians about `axis`, then
    /// moves its proxies and wakes it.
    pub fn set_body_transform(
        &mut self,
        handle: BodyHandle,
        position: Vec3,
        axis: Vec3,
        angle: f32,
    ) -> Result<(), SimulationError> {
        if !position.is_finite() {
            return Err(DescriptionError::NonFinite("position").into());
        }
        if !axis.is_finite() || !angle.is_finite() {
            return Err(DescriptionError::NonFinite("rotation").into());
        }
        let orientation = if angle == 0.0 {
            Quat::IDENTITY
        } else if axis.length_squared() == 0.0 {
            return Err(DescriptionError::ZeroAxis.into());
        } else {
            Quat::from_axis_angle(axis.normalize(), angle)
        };

        let Some(body) = self.bodies.get_mut(handle) else {
            return Err(SimulationError::UnknownBody(handle));
        };
        body.set_pose(position, Some(orientation));
        body.set_to_awake();
        self.synchronize_proxies(handle);
        Ok(())
    }

    /// Re-derives a body's origin and refreshes the broad phase bounds of its boxes.
    fn synchronize_proxies(&mut self, handle: BodyHandle) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        body.synchronize_transform();
        let Some(body) = self.bodies.get(handle) else {
            return;
        };
        let transform = *body.transform();
        for &shape in body.boxes() {
            if let Some(shape) = self.bodies.shape(shape) {
                let aabb = shape.compute_aabb(&transform);
                self.contact_manager
                    .broad_phase_mut()
                    .update(shape.broad_phase_index, &aabb);
            }
        }
    }

    /// Advances the simulation by `settings.dt`.
    #[instrument(skip(self), fields(step = self.step_index))]
    pub fn step(&mut self) {
        if self.new_box {
            self.contact_manager.find_new_contacts(&mut self.bodies);
            self.new_box = false;
        }
        self.contact_manager.test_collisions(&mut self.bodies);

        let mut seeds = std::mem::take(&mut self.seeds);
        seeds.clear();
        for (handle, body) in self.bodies.iter_mut() {
            body.flags.remove(BodyFlags::ISLAND);
            seeds.push(handle);
        }

        for &seed in &seeds {
            let Some(body) = self.bodies.get(seed) else {
                continue;
            };
            if body.flags.contains(BodyFlags::ISLAND) || !body.is_awake() || body.is_static() {
                continue;
            }
            self.island
                .build(seed, &mut self.bodies, &mut self.contact_manager);
            self.island
                .solve(&mut self.bodies, &mut self.contact_manager, &self.settings);
            self.island.release_static_bodies(&mut self.bodies);
        }

        for &handle in &seeds {
            if self.bodies.get(handle).is_some_and(|body| !body.is_static()) {
                self.synchronize_proxies(handle);
            }
        }
        self.seeds = seeds;

        self.contact_manager.find_new_contacts(&mut self.bodies);
        for (_, body) in self.bodies.iter_mut() {
            body.clear_forces();
        }
        self.step_index += 1;
    }

    /// Reports every box whose world bounds overlap `aabb`.
    pub fn query_aabb<C: IQueryCallback>(&self, aabb: &BoundingBox, callback: &mut C) {
        let tree = self.contact_manager.broad_phase().tree();
        tree.query_aabb(aabb, &mut |leaf: i32| {
            let handle = BoxHandle(tree.user_data(leaf));
            let Some((shape, body)) = self.shape_and_body(handle) else {
                return true;
            };
            if BoundingBox::intersects(shape.compute_aabb(body.transform()), *aabb) {
                return callback.report_shape(handle);
            }
            true
        });
    }

    /// Reports every box containing `point`.
    pub fn query_point<C: IQueryCallback>(&self, point: Vec3, callback: &mut C) {
        let margin = Vec3::splat(POINT_QUERY_MARGIN);
        let candidates = BoundingBox::new(point - margin, point + margin);
        let tree = self.contact_manager.broad_phase().tree();
        tree.query_aabb(&candidates, &mut |leaf: i32| {
            let handle = BoxHandle(tree.user_data(leaf));
            let Some((shape, body)) = self.shape_and_body(handle) else {
                return true;
            };
            if shape.test_point(body.transform(), point) {
                return callback.report_shape(handle);
            }
            true
        });
    }

    /// Casts `ray` against every box and reports each one it hits.
    ///
    /// Before each report `ray.toi` and `ray.normal` hold the hit on the reported box.
    pub fn ray_cast<C: IQueryCallback>(&self, ray: &mut RaycastData, callback: &mut C) {
        let segment = *ray;
        let tree = self.contact_manager.broad_phase().tree();
        tree.query_raycast(&segment, &mut |leaf: i32| {
            let handle = BoxHandle(tree.user_data(leaf));
            let Some((shape, body)) = self.shape_and_body(handle) else {
                return true;
            };
            if shape.raycast(body.transform(), ray) {
                return callback.report_shape(handle);
            }
            true
        });
    }

    fn shape_and_body(&self, handle: BoxHandle) -> Option<(&BoxShape, &Body)> {
        let shape = self.bodies.shape(handle)?;
        let body = self.bodies.get(shape.body)?;
        Some((shape, body))
    }

    /// Removes every body, box and contact.
    pub fn shutdown(&mut self) {
        self.remove_all_bodies();
        self.contact_manager.clear();
        self.bodies.clear();
        self.new_box = false;
        info!(steps = self.step_index, "simulation shut down");
    }
}
