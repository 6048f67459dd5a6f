use std::fmt;

use tracing::debug;

use crate::physics::bodies::{place, Bodies, ContactEdge};
use crate::physics::collision_detection::broad_phase::BroadPhase;
use crate::physics::collision_detection::contact_constraint::{ContactConstraint, ContactFlags};
use crate::physics::handles::{BodyHandle, BoxHandle, ContactHandle};
use crate::utilities::memory::id_pool::IdPool;

/// Receives notifications when two boxes start or stop touching.
pub trait IContactListener {
    /// Called after a re-test produced contacts for a pair that had none before.
    fn begin_contact(&mut self, contact: &ContactConstraint);
    /// Called after a pair that was touching lost all of its contacts, or was removed while touching.
    fn end_contact(&mut self, contact: &ContactConstraint);
}

/// Owns the broad phase and every persistent contact constraint.
///
/// Constraints live in handle-addressed slots and are linked into both bodies' contact edge lists,
/// which is how islands find them.
pub struct ContactManager {
    broad_phase: BroadPhase,
    constraints: Vec<Option<ContactConstraint>>,
    handle_pool: IdPool,
    contact_count: usize,
    pair_scratch: Vec<(BoxHandle, BoxHandle)>,
    listener: Option<Box<dyn IContactListener>>,
}

impl fmt::Debug for ContactManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContactManager")
            .field("broad_phase", &self.broad_phase)
            .field("contact_count", &self.contact_count)
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for ContactManager {
    fn default() -> Self {
        Self::new(BroadPhase::default())
    }
}

/// What `test_collisions` decided for one constraint.
enum Retest {
    Skip,
    Remove,
    Collide,
}

impl ContactManager {
    pub fn new(broad_phase: BroadPhase) -> Self {
        Self {
            broad_phase,
            constraints: Vec::new(),
            handle_pool: IdPool::new(64),
            contact_count: 0,
            pair_scratch: Vec::with_capacity(64),
            listener: None,
        }
    }

    #[inline(always)]
    pub fn broad_phase(&self) -> &BroadPhase {
        &self.broad_phase
    }

    #[inline(always)]
    pub fn broad_phase_mut(&mut self) -> &mut BroadPhase {
        &mut self.broad_phase
    }

    /// Number of live constraints, touching or not.
    #[inline(always)]
    pub fn contact_count(&self) -> usize {
        self.contact_count
    }

    pub fn set_contact_listener(&mut self, listener: Option<Box<dyn IContactListener>>) {
        self.listener = listener;
    }

    #[inline]
    pub fn get(&self, handle: ContactHandle) -> Option<&ContactConstraint> {
        if handle.0 < 0 {
            return None;
        }
        self.constraints.get(handle.slot())?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, handle: ContactHandle) -> Option<&mut ContactConstraint> {
        if handle.0 < 0 {
            return None;
        }
        self.constraints.get_mut(handle.slot())?.as_mut()
    }

    /// Live constraints in ascending handle order.
    pub fn iter(&self) -> impl Iterator<Item = (ContactHandle, &ContactConstraint)> {
        self.constraints.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref()
                .map(|constraint| (ContactHandle(i as i32), constraint))
        })
    }

    /// Creates a constraint between two boxes unless their bodies cannot collide or the same box
    /// pair is already linked. Both bodies are woken on creation.
    pub fn add_contact(&mut self, bodies: &mut Bodies, a: BoxHandle, b: BoxHandle) -> Option<ContactHandle> {
        let (shape_a, shape_b) = (bodies.shape(a)?, bodies.shape(b)?);
        let (body_a, body_b) = (shape_a.body, shape_b.body);
        if !bodies.can_collide(body_a, body_b) {
            return None;
        }

        let duplicate = bodies.get(body_a)?.contact_edges.iter().any(|edge| {
            edge.other == body_b
                && self
                    .get(edge.constraint)
                    .is_some_and(|constraint| constraint.connects(a, b))
        });
        if duplicate {
            return None;
        }

        let constraint = ContactConstraint::new(a, shape_a, b, shape_b);
        let handle = ContactHandle(self.handle_pool.take());
        place(&mut self.constraints, handle.0, constraint);
        self.contact_count += 1;

        for (body, other) in [(body_a, body_b), (body_b, body_a)] {
            if let Some(body) = bodies.get_mut(body) {
                body.contact_edges.push(ContactEdge {
                    constraint: handle,
                    other,
                });
                body.set_to_awake();
            }
        }
        debug!(%handle, box_a = %a, box_b = %b, "contact created");
        Some(handle)
    }

    /// Turns the broad phase's new overlapping pairs into constraints.
    pub fn find_new_contacts(&mut self, bodies: &mut Bodies) {
        let mut pairs = std::mem::take(&mut self.pair_scratch);
        pairs.clear();
        self.broad_phase.update_pairs(|a, b| pairs.push((a, b)));
        for &(a, b) in &pairs {
            self.add_contact(bodies, a, b);
        }
        self.pair_scratch = pairs;
    }

    /// Unlinks a constraint from both bodies, wakes them and frees its handle.
    ///
    /// A constraint that was still touching reports `end_contact` first.
    pub fn remove_contact(&mut self, bodies: &mut Bodies, handle: ContactHandle) -> Option<ContactConstraint> {
        if handle.0 < 0 {
            return None;
        }
        let constraint = self.constraints.get_mut(handle.slot())?.take()?;
        self.handle_pool.return_id(handle.0);
        self.contact_count -= 1;

        if constraint.is_colliding() {
            if let Some(listener) = self.listener.as_mut() {
                listener.end_contact(&constraint);
            }
        }
        for body in [constraint.body_a, constraint.body_b] {
            if let Some(body) = bodies.get_mut(body) {
                body.contact_edges.retain(|edge| edge.constraint != handle);
                body.set_to_awake();
            }
        }
        debug!(%handle, "contact removed");
        Some(constraint)
    }

    /// Removes every constraint attached to `body`.
    pub fn remove_contacts_from_body(&mut self, bodies: &mut Bodies, body: BodyHandle) {
        let handles: Vec<ContactHandle> = match bodies.get(body) {
            Some(body) => body.contact_edges.iter().map(|edge| edge.constraint).collect(),
            None => return,
        };
        for handle in handles {
            self.remove_contact(bodies, handle);
        }
    }

    /// Removes the broad phase proxies of all of `body`'s boxes.
    pub fn remove_from_broad_phase(&mut self, bodies: &Bodies, body: BodyHandle) {
        let Some(body) = bodies.get(body) else {
            return;
        };
        for &shape in &body.boxes {
            if let Some(shape) = bodies.shape(shape) {
                self.broad_phase.remove_box(shape.broad_phase_index);
            }
        }
    }

    /// Re-runs the narrow phase for every constraint that has at least one awake body.
    ///
    /// Constraints whose bodies can no longer collide, or whose fat bounds stopped overlapping,
    /// are removed. Surviving constraints keep warm starting impulses for matching features and
    /// report begin/end transitions to the listener. Every constraint's island flag is cleared.
    pub fn test_collisions(&mut self, bodies: &mut Bodies) {
        for index in 0..self.constraints.len() {
            let handle = ContactHandle(index as i32);
            let Some(constraint) = self.constraints[index].as_mut() else {
                continue;
            };
            constraint.flags.remove(ContactFlags::ISLAND);

            let retest = match (
                bodies.get(constraint.body_a),
                bodies.get(constraint.body_b),
                bodies.shape(constraint.box_a),
                bodies.shape(constraint.box_b),
            ) {
                (Some(body_a), Some(body_b), Some(shape_a), Some(shape_b)) => {
                    if !body_a.is_awake() && !body_b.is_awake() {
                        Retest::Skip
                    } else if !body_a.can_collide(body_b)
                        || !self
                            .broad_phase
                            .test_overlap(shape_a.broad_phase_index, shape_b.broad_phase_index)
                    {
                        Retest::Remove
                    } else {
                        let transform_a = shape_a.world_transform(body_a.transform());
                        let transform_b = shape_b.world_transform(body_b.transform());
                        constraint.solve_collision(
                            &transform_a,
                            shape_a.extents,
                            &transform_b,
                            shape_b.extents,
                        );
                        Retest::Collide
                    }
                }
                _ => Retest::Remove,
            };

            match retest {
                Retest::Skip => {}
                Retest::Remove => {
                    self.remove_contact(bodies, handle);
                }
                Retest::Collide => {
                    let now = constraint.is_colliding();
                    let was = constraint.was_colliding();
                    if now != was {
                        if now {
                            debug!(%handle, contacts = constraint.manifold.contact_count, "contact began");
                        } else {
                            debug!(%handle, "contact ended");
                        }
                        if let Some(listener) = self.listener.as_mut() {
                            if now {
                                listener.begin_contact(constraint);
                            } else {
                                listener.end_contact(constraint);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Drops every constraint and proxy. Body edge lists are left to the caller.
    pub fn clear(&mut self) {
        self.constraints.clear();
        self.handle_pool.clear();
        self.contact_count = 0;
        self.pair_scratch.clear();
        self.broad_phase.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::bodies::Body;
    use crate::physics::body_description::{BodyDescription, BoxDescription};
    use crate::physics::collidables::box_shape::BoxShape;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn add_box(
        bodies: &mut Bodies,
        manager: &mut ContactManager,
        body: BodyHandle,
        description: &BoxDescription,
    ) -> BoxHandle {
        let shape = BoxShape::new(description, body);
        let transform = *bodies.get(body).unwrap().transform();
        let handle = bodies.add_shape(shape);
        let index = manager
            .broad_phase_mut()
            .insert_box(handle, &shape.compute_aabb(&transform));
        bodies.shape_mut(handle).unwrap().broad_phase_index = index;
        bodies.get_mut(body).unwrap().boxes.push(handle);
        bodies.recalculate_mass(body);
        handle
    }

    fn scene(second: BodyDescription) -> (Bodies, ContactManager, [BoxHandle; 2]) {
        let mut bodies = Bodies::new();
        let mut manager = ContactManager::default();
        let floor = bodies.add(Body::new(&BodyDescription::fixed(Vec3::ZERO)));
        let other = bodies.add(Body::new(&second));
        let a = add_box(&mut bodies, &mut manager, floor, &BoxDescription::new(Vec3::ONE));
        let b = add_box(&mut bodies, &mut manager, other, &BoxDescription::new(Vec3::ONE));
        (bodies, manager, [a, b])
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<&'static str>,
    }

    struct SharedRecorder(Rc<RefCell<Recorder>>);

    impl IContactListener for SharedRecorder {
        fn begin_contact(&mut self, _: &ContactConstraint) {
            self.0.borrow_mut().events.push("begin");
        }

        fn end_contact(&mut self, _: &ContactConstraint) {
            self.0.borrow_mut().events.push("end");
        }
    }

    #[test]
    fn test_pairs_become_single_constraint() {
        let (mut bodies, mut manager, [a, b]) =
            scene(BodyDescription::dynamic(Vec3::new(0.0, 1.5, 0.0)));
        manager.find_new_contacts(&mut bodies);
        assert_eq!(manager.contact_count(), 1);
        // The same pair in either order is not linked twice.
        assert!(manager.add_contact(&mut bodies, b, a).is_none());
        assert!(manager.add_contact(&mut bodies, a, b).is_none());
        assert_eq!(manager.contact_count(), 1);

        let (handle, constraint) = manager.iter().next().unwrap();
        for body in [constraint.body_a, constraint.body_b] {
            let edges = bodies.get(body).unwrap().contact_edges();
            assert_eq!(edges.len(), 1);
            assert_eq!(edges[0].constraint, handle);
        }
    }

    #[test]
    fn test_static_pairs_never_collide() {
        let (mut bodies, mut manager, _) = scene(BodyDescription::fixed(Vec3::new(0.0, 1.5, 0.0)));
        manager.find_new_contacts(&mut bodies);
        assert_eq!(manager.contact_count(), 0);
    }

    #[test]
    fn test_listener_sees_begin_and_end() {
        let (mut bodies, mut manager, [_, b]) =
            scene(BodyDescription::dynamic(Vec3::new(0.0, 1.5, 0.0)));
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        manager.set_contact_listener(Some(Box::new(SharedRecorder(recorder.clone()))));
        manager.find_new_contacts(&mut bodies);

        manager.test_collisions(&mut bodies);
        assert_eq!(recorder.borrow().events, vec!["begin"]);
        let (_, constraint) = manager.iter().next().unwrap();
        assert_eq!(constraint.manifold.contact_count, 4);

        // Lift the box out of contact but keep the fat bounds overlapping.
        let body = bodies.get(BodyHandle(1)).unwrap();
        assert_eq!(bodies.shape(b).unwrap().body, BodyHandle(1));
        let center = body.world_center() + Vec3::new(0.0, 0.6, 0.0);
        bodies.get_mut(BodyHandle(1)).unwrap().set_pose(center, None);
        manager.test_collisions(&mut bodies);
        assert_eq!(recorder.borrow().events, vec!["begin", "end"]);
        assert_eq!(manager.contact_count(), 1);
    }

    #[test]
    fn test_removal_unlinks_and_reports_end() {
        let (mut bodies, mut manager, _) =
            scene(BodyDescription::dynamic(Vec3::new(0.0, 1.5, 0.0)));
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        manager.set_contact_listener(Some(Box::new(SharedRecorder(recorder.clone()))));
        manager.find_new_contacts(&mut bodies);
        manager.test_collisions(&mut bodies);

        bodies.get_mut(BodyHandle(1)).unwrap().set_to_sleep();
        manager.remove_contacts_from_body(&mut bodies, BodyHandle(1));
        assert_eq!(manager.contact_count(), 0);
        assert_eq!(recorder.borrow().events, vec!["begin", "end"]);
        assert!(bodies.get(BodyHandle(0)).unwrap().contact_edges().is_empty());
        assert!(bodies.get(BodyHandle(1)).unwrap().contact_edges().is_empty());
        assert!(bodies.get(BodyHandle(1)).unwrap().is_awake());
    }

    #[test]
    fn test_separated_proxies_drop_constraint() {
        let (mut bodies, mut manager, [_, b]) =
            scene(BodyDescription::dynamic(Vec3::new(0.0, 1.5, 0.0)));
        manager.find_new_contacts(&mut bodies);
        let far = Vec3::new(0.0, 20.0, 0.0);
        bodies.get_mut(BodyHandle(1)).unwrap().set_pose(far, None);
        let shape = *bodies.shape(b).unwrap();
        let aabb = shape.compute_aabb(bodies.get(BodyHandle(1)).unwrap().transform());
        manager.broad_phase_mut().update(shape.broad_phase_index, &aabb);
        manager.test_collisions(&mut bodies);
        assert_eq!(manager.contact_count(), 0);
    }

    #[test]
    fn test_sleeping_pairs_are_not_retested() {
        let (mut bodies, mut manager, _) =
            scene(BodyDescription::dynamic(Vec3::new(0.0, 1.5, 0.0)));
        manager.find_new_contacts(&mut bodies);
        bodies.get_mut(BodyHandle(1)).unwrap().set_to_sleep();
        bodies.get_mut(BodyHandle(0)).unwrap().set_to_sleep();
        manager.test_collisions(&mut bodies);
        let (_, constraint) = manager.iter().next().unwrap();
        assert_eq!(constraint.manifold.contact_count, 0);
        assert!(!constraint.is_colliding());
    }
}
