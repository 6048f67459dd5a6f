use glam::Vec3;
use std::fmt;

use crate::physics::collidables::box_shape::BoxShape;
use crate::physics::collision_detection::collision_tasks::box_pair_tester::BoxPairTester;
use crate::physics::collision_detection::contact_manifold::{Contact, Manifold, MAX_CONTACTS};
use crate::physics::handles::{BodyHandle, BoxHandle};
use crate::utilities::math_helper::{compute_basis, mix_friction, mix_restitution};
use crate::utilities::rigid_transform::RigidTransform;

/// Status bits of a contact constraint.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ContactFlags(u8);

impl ContactFlags {
    /// The last narrow phase test produced contacts.
    pub const COLLIDING: Self = Self(0x1);
    /// The test before the last one produced contacts.
    pub const WAS_COLLIDING: Self = Self(0x2);
    /// Already added to the island being built.
    pub const ISLAND: Self = Self(0x4);

    #[inline(always)]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline(always)]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline(always)]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline(always)]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    #[inline(always)]
    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl fmt::Debug for ContactFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_set();
        for (flag, name) in [
            (Self::COLLIDING, "COLLIDING"),
            (Self::WAS_COLLIDING, "WAS_COLLIDING"),
            (Self::ISLAND, "ISLAND"),
        ] {
            if self.contains(flag) {
                list.entry(&format_args!("{name}"));
            }
        }
        list.finish()
    }
}

/// Persistent contact between two boxes on different bodies.
#[derive(Debug, Clone)]
pub struct ContactConstraint {
    pub box_a: BoxHandle,
    pub box_b: BoxHandle,
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub manifold: Manifold,
    /// Mixed friction of both boxes.
    pub friction: f32,
    /// Mixed restitution of both boxes.
    pub restitution: f32,
    pub flags: ContactFlags,
}

impl ContactConstraint {
    pub fn new(box_a: BoxHandle, shape_a: &BoxShape, box_b: BoxHandle, shape_b: &BoxShape) -> Self {
        Self {
            box_a,
            box_b,
            body_a: shape_a.body,
            body_b: shape_b.body,
            manifold: Manifold::new(box_a, box_b, shape_a.sensor || shape_b.sensor),
            friction: mix_friction(shape_a.friction, shape_b.friction),
            restitution: mix_restitution(shape_a.restitution, shape_b.restitution),
            flags: ContactFlags::empty(),
        }
    }

    #[inline(always)]
    pub fn is_colliding(&self) -> bool {
        self.flags.contains(ContactFlags::COLLIDING)
    }

    #[inline(always)]
    pub fn was_colliding(&self) -> bool {
        self.flags.contains(ContactFlags::WAS_COLLIDING)
    }

    /// Sensor contacts are reported but never solved.
    #[inline(always)]
    pub fn is_sensor(&self) -> bool {
        self.manifold.sensor
    }

    /// Whether the constraint connects exactly these two boxes, in either order.
    #[inline]
    pub fn connects(&self, a: BoxHandle, b: BoxHandle) -> bool {
        (self.box_a == a && self.box_b == b) || (self.box_a == b && self.box_b == a)
    }

    /// Re-runs the narrow phase for the two boxes at their current world transforms.
    ///
    /// Contacts whose feature key matches one from the previous manifold inherit its normal
    /// impulse, and its friction impulse projected onto the new tangent basis. All others start
    /// from zero. The colliding flags shift so that `COLLIDING` reflects this test and
    /// `WAS_COLLIDING` the previous one.
    pub fn solve_collision(
        &mut self,
        transform_a: &RigidTransform,
        extents_a: Vec3,
        transform_b: &RigidTransform,
        extents_b: Vec3,
    ) {
        let old_count = self.manifold.contact_count;
        let old_contacts: [Contact; MAX_CONTACTS] = self.manifold.contacts;
        let [old_tangent, old_bitangent] = self.manifold.tangent_vectors;

        BoxPairTester::test(&mut self.manifold, transform_a, extents_a, transform_b, extents_b);
        let (tangent, bitangent) = compute_basis(self.manifold.normal.normalize_or_zero());
        self.manifold.tangent_vectors = [tangent, bitangent];

        for contact in self.manifold.contacts_mut() {
            contact.normal_impulse = 0.0;
            contact.tangent_impulse = [0.0; 2];
            contact.warm_started = 0;
            let key = contact.feature.key();
            if let Some(old) = old_contacts[..old_count]
                .iter()
                .find(|old| old.feature.key() == key)
            {
                contact.normal_impulse = old.normal_impulse;
                let friction =
                    old_tangent * old.tangent_impulse[0] + old_bitangent * old.tangent_impulse[1];
                contact.tangent_impulse = [friction.dot(tangent), friction.dot(bitangent)];
                contact.warm_started = old.warm_started.saturating_add(1);
            }
        }

        let was_colliding = self.is_colliding();
        self.flags.set(ContactFlags::COLLIDING, self.manifold.contact_count > 0);
        self.flags.set(ContactFlags::WAS_COLLIDING, was_colliding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_description::BoxDescription;
    use approx::assert_abs_diff_eq;

    fn constraint() -> ContactConstraint {
        let a = BoxShape::new(&BoxDescription::new(Vec3::ONE).with_friction(0.25), BodyHandle(0));
        let b = BoxShape::new(
            &BoxDescription::new(Vec3::ONE).with_friction(1.0).with_restitution(0.6),
            BodyHandle(1),
        );
        ContactConstraint::new(BoxHandle(0), &a, BoxHandle(1), &b)
    }

    #[test]
    fn test_material_mixing() {
        let constraint = constraint();
        assert_abs_diff_eq!(constraint.friction, 0.5, epsilon = 1e-6);
        assert_eq!(constraint.restitution, 0.6);
        assert!(constraint.connects(BoxHandle(1), BoxHandle(0)));
        assert!(!constraint.is_sensor());
    }

    #[test]
    fn test_impulses_carry_over_matching_features() {
        let mut constraint = constraint();
        let a = RigidTransform::IDENTITY;
        let b = RigidTransform::from_translation(Vec3::new(0.0, 0.0, 1.5));
        constraint.solve_collision(&a, Vec3::ONE, &b, Vec3::ONE);
        assert!(constraint.is_colliding());
        assert!(!constraint.was_colliding());
        for (i, contact) in constraint.manifold.contacts_mut().iter_mut().enumerate() {
            contact.normal_impulse = i as f32 + 1.0;
            contact.tangent_impulse = [0.5, -0.25];
        }
        let before: Vec<(u32, f32)> = constraint
            .manifold
            .contacts()
            .iter()
            .map(|c| (c.feature.key(), c.normal_impulse))
            .collect();

        constraint.solve_collision(&a, Vec3::ONE, &b, Vec3::ONE);
        assert!(constraint.is_colliding());
        assert!(constraint.was_colliding());
        for contact in constraint.manifold.contacts() {
            let (_, impulse) = before
                .iter()
                .find(|(key, _)| *key == contact.feature.key())
                .expect("feature persisted");
            assert_eq!(contact.normal_impulse, *impulse);
            // Same normal, same basis: friction is unchanged.
            assert_abs_diff_eq!(contact.tangent_impulse[0], 0.5, epsilon = 1e-5);
            assert_abs_diff_eq!(contact.tangent_impulse[1], -0.25, epsilon = 1e-5);
            assert_eq!(contact.warm_started, 1);
        }
    }

    #[test]
    fn test_flags_track_separation() {
        let mut constraint = constraint();
        let a = RigidTransform::IDENTITY;
        constraint.solve_collision(&a, Vec3::ONE, &RigidTransform::from_translation(Vec3::Z), Vec3::ONE);
        assert!(constraint.is_colliding());
        let far = RigidTransform::from_translation(Vec3::new(0.0, 0.0, 5.0));
        constraint.solve_collision(&a, Vec3::ONE, &far, Vec3::ONE);
        assert!(!constraint.is_colliding());
        assert!(constraint.was_colliding());
        constraint.solve_collision(&a, Vec3::ONE, &far, Vec3::ONE);
        assert_eq!(constraint.flags, ContactFlags::empty());
        assert_eq!(format!("{:?}", ContactFlags::COLLIDING), "{COLLIDING}");
    }
}
