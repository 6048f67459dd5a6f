use glam::Vec3;

use crate::physics::handles::BoxHandle;

/// Maximum number of contacts a box pair can produce.
pub const MAX_CONTACTS: usize = 8;

/// Identifies the box features that produced a contact so it can be matched across steps.
///
/// Face contacts record the incident edges the point was clipped between (`in_i`, `out_i`) and
/// the reference side planes that clipped it (`in_r`, `out_r`). Edge contacts store the separating
/// axis index in the packed key instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeaturePair {
    pub in_r: u8,
    pub out_r: u8,
    pub in_i: u8,
    pub out_i: u8,
}

impl FeaturePair {
    #[inline(always)]
    pub const fn new(in_r: u8, out_r: u8, in_i: u8, out_i: u8) -> Self {
        Self {
            in_r,
            out_r,
            in_i,
            out_i,
        }
    }

    /// Packs all four bytes into a single comparable key.
    #[inline(always)]
    pub const fn key(&self) -> u32 {
        u32::from_le_bytes([self.in_r, self.out_r, self.in_i, self.out_i])
    }

    #[inline(always)]
    pub const fn from_key(key: u32) -> Self {
        let [in_r, out_r, in_i, out_i] = key.to_le_bytes();
        Self::new(in_r, out_r, in_i, out_i)
    }

    /// Swaps the reference and incident halves. Used when the roles of the two boxes are exchanged.
    #[inline(always)]
    pub const fn swapped(&self) -> Self {
        Self::new(self.in_i, self.out_i, self.in_r, self.out_r)
    }
}

/// One contact point between two boxes, with the solver state that persists across steps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Contact {
    /// World position of the contact.
    pub position: Vec3,
    /// Signed separation along the manifold normal. Negative while overlapping.
    pub penetration: f32,
    /// Accumulated impulse along the normal.
    pub normal_impulse: f32,
    /// Accumulated friction impulses along the two tangents.
    pub tangent_impulse: [f32; 2],
    /// Velocity bias from position correction and restitution.
    pub bias: f32,
    pub normal_mass: f32,
    pub tangent_mass: [f32; 2],
    pub feature: FeaturePair,
    /// Number of consecutive steps this contact inherited impulses from its predecessor.
    pub warm_started: u8,
}

/// Contact set between two boxes.
#[derive(Debug, Clone, Copy)]
pub struct Manifold {
    pub box_a: BoxHandle,
    pub box_b: BoxHandle,
    /// Unit normal pointing from A towards B.
    pub normal: Vec3,
    /// Two unit vectors completing an orthonormal basis with `normal`.
    pub tangent_vectors: [Vec3; 2],
    pub contacts: [Contact; MAX_CONTACTS],
    pub contact_count: usize,
    /// Set when either box is a sensor.
    pub sensor: bool,
}

impl Manifold {
    pub fn new(box_a: BoxHandle, box_b: BoxHandle, sensor: bool) -> Self {
        Self {
            box_a,
            box_b,
            normal: Vec3::ZERO,
            tangent_vectors: [Vec3::ZERO; 2],
            contacts: [Contact::default(); MAX_CONTACTS],
            contact_count: 0,
            sensor,
        }
    }

    /// Live contacts.
    #[inline(always)]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts[..self.contact_count]
    }

    #[inline(always)]
    pub fn contacts_mut(&mut self) -> &mut [Contact] {
        &mut self.contacts[..self.contact_count]
    }

    /// Drops all contacts but keeps the box pair.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.contact_count = 0;
    }

    /// Appends a contact. Panics if the manifold is already full.
    #[inline]
    pub fn push(&mut self, position: Vec3, penetration: f32, feature: FeaturePair) {
        assert!(self.contact_count < MAX_CONTACTS, "Manifold overflow.");
        self.contacts[self.contact_count] = Contact {
            position,
            penetration,
            feature,
            ..Contact::default()
        };
        self.contact_count += 1;
    }
}
