use tracing::trace;

use crate::physics::bodies::Bodies;
use crate::physics::body_properties::{BodyFlags, BodyVelocity};
use crate::physics::collision_detection::contact_constraint::ContactFlags;
use crate::physics::collision_detection::contact_manager::ContactManager;
use crate::physics::handles::{BodyHandle, ContactHandle};
use crate::physics::island_sleeper::IslandSleeper;
use crate::physics::pose_integration::PoseIntegration;
use crate::physics::simulation_settings::SimulationSettings;
use crate::physics::solver::ContactSolver;

/// Bodies and touching contacts reachable from one seed body, solved together.
///
/// The island is rebuilt every step. Its buffers are kept between builds so a simulation can reuse
/// one island for every seed.
#[derive(Debug, Clone, Default)]
pub struct Island {
    bodies: Vec<BodyHandle>,
    velocities: Vec<BodyVelocity>,
    contacts: Vec<ContactHandle>,
    stack: Vec<BodyHandle>,
    stack_capacity: usize,
    solver: ContactSolver,
}

impl Island {
    pub fn new() -> Self {
        Self::default()
    }

    /// Members in the order they were reached. A body's position here is its island index.
    #[inline(always)]
    pub fn bodies(&self) -> &[BodyHandle] {
        &self.bodies
    }

    #[inline(always)]
    pub fn contacts(&self) -> &[ContactHandle] {
        &self.contacts
    }

    /// Solved velocities, parallel to `bodies`.
    #[inline(always)]
    pub fn velocities(&self) -> &[BodyVelocity] {
        &self.velocities
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.velocities.clear();
        self.contacts.clear();
        self.stack.clear();
    }

    #[inline]
    fn push(&mut self, handle: BodyHandle) {
        assert!(self.stack.len() < self.stack_capacity, "Fixed size stack overflow.");
        self.stack.push(handle);
    }

    /// Depth-first search from `seed` over touching, non-sensor contacts.
    ///
    /// Every reached body is woken and flagged `ISLAND`, as is every traversed contact. Static
    /// bodies join the island but the search does not continue through them.
    pub fn build(&mut self, seed: BodyHandle, bodies: &mut Bodies, contacts: &mut ContactManager) {
        self.clear();
        self.stack_capacity = bodies.count();
        match bodies.get_mut(seed) {
            Some(body) => body.flags.insert(BodyFlags::ISLAND),
            None => return,
        }
        self.push(seed);

        while let Some(handle) = self.stack.pop() {
            let Some(body) = bodies.get_mut(handle) else {
                continue;
            };
            body.island_index = self.bodies.len();
            self.bodies.push(handle);
            body.set_to_awake();
            if body.is_static() {
                continue;
            }

            let edge_count = body.contact_edges.len();
            for i in 0..edge_count {
                let Some(edge) = bodies.get(handle).map(|body| body.contact_edges[i]) else {
                    break;
                };
                let Some(constraint) = contacts.get_mut(edge.constraint) else {
                    continue;
                };
                if constraint.flags.contains(ContactFlags::ISLAND)
                    || !constraint.is_colliding()
                    || constraint.is_sensor()
                {
                    continue;
                }
                constraint.flags.insert(ContactFlags::ISLAND);
                self.contacts.push(edge.constraint);

                let Some(other) = bodies.get_mut(edge.other) else {
                    continue;
                };
                if other.flags.contains(BodyFlags::ISLAND) {
                    continue;
                }
                other.flags.insert(BodyFlags::ISLAND);
                self.push(edge.other);
            }
        }
    }

    /// Integrates velocities, solves the contacts, integrates poses and evaluates sleep.
    pub fn solve(&mut self, bodies: &mut Bodies, contacts: &mut ContactManager, settings: &SimulationSettings) {
        let dt = settings.dt;
        self.velocities.clear();
        for &handle in &self.bodies {
            let velocity = match bodies.get_mut(handle) {
                Some(body) => {
                    PoseIntegration::integrate_velocity(body, settings.gravity, dt);
                    BodyVelocity::new(body.linear_velocity, body.angular_velocity)
                }
                None => BodyVelocity::default(),
            };
            self.velocities.push(velocity);
        }

        self.solver.initialize(&self.contacts, contacts, bodies, settings);
        self.solver.pre_solve(&mut self.velocities, dt);
        for _ in 0..settings.iterations {
            self.solver.solve(&mut self.velocities);
        }
        self.solver.shutdown(contacts);

        for (&handle, velocity) in self.bodies.iter().zip(&self.velocities) {
            if let Some(body) = bodies.get_mut(handle) {
                PoseIntegration::integrate_pose(body, velocity, dt);
            }
        }

        if settings.allow_sleep {
            IslandSleeper::evaluate(bodies, &self.bodies, settings);
        }
        trace!(bodies = self.bodies.len(), contacts = self.contacts.len(), "island solved");
    }

    /// Clears the island flag of static members so other islands can include them too.
    pub fn release_static_bodies(&self, bodies: &mut Bodies) {
        for &handle in &self.bodies {
            if let Some(body) = bodies.get_mut(handle) {
                if body.is_static() {
                    body.flags.remove(BodyFlags::ISLAND);
                }
            }
        }
    }
}
