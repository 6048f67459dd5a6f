use glam::{Mat3, Vec3};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// How a body participates in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BodyType {
    /// Never moves and has infinite mass.
    #[default]
    Static,
    /// Moved by gravity, forces and contacts.
    Dynamic,
    /// Moves with its set velocity and pushes dynamic bodies, but is never pushed back.
    Kinematic,
}

/// State bits stored on every body.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct BodyFlags(u32);

impl BodyFlags {
    pub const AWAKE: Self = Self(0x001);
    pub const ACTIVE: Self = Self(0x002);
    pub const ALLOW_SLEEP: Self = Self(0x004);
    /// Set while the body is part of the island currently being built.
    pub const ISLAND: Self = Self(0x010);
    pub const STATIC: Self = Self(0x020);
    pub const DYNAMIC: Self = Self(0x040);
    pub const KINEMATIC: Self = Self(0x080);
    pub const LOCK_AXIS_X: Self = Self(0x100);
    pub const LOCK_AXIS_Y: Self = Self(0x200);
    pub const LOCK_AXIS_Z: Self = Self(0x400);

    #[inline(always)]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline(always)]
    pub const fn bits(self) -> u32 {
        self.0
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

impl BitOr for BodyFlags {
    type Output = Self;

    #[inline(always)]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for BodyFlags {
    #[inline(always)]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for BodyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(BodyFlags, &str); 10] = [
            (BodyFlags::AWAKE, "AWAKE"),
            (BodyFlags::ACTIVE, "ACTIVE"),
            (BodyFlags::ALLOW_SLEEP, "ALLOW_SLEEP"),
            (BodyFlags::ISLAND, "ISLAND"),
            (BodyFlags::STATIC, "STATIC"),
            (BodyFlags::DYNAMIC, "DYNAMIC"),
            (BodyFlags::KINEMATIC, "KINEMATIC"),
            (BodyFlags::LOCK_AXIS_X, "LOCK_AXIS_X"),
            (BodyFlags::LOCK_AXIS_Y, "LOCK_AXIS_Y"),
            (BodyFlags::LOCK_AXIS_Z, "LOCK_AXIS_Z"),
        ];
        let mut list = f.debug_set();
        for (flag, name) in NAMES {
            if self.contains(flag) {
                list.entry(&format_args!("{name}"));
            }
        }
        list.finish()
    }
}

/// Mass contribution of one box, expressed in the owning body's frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassData {
    /// Inertia about the body origin.
    pub inertia: Mat3,
    /// Mass-weighted center, `center * mass`.
    pub weighted_center: Vec3,
    pub mass: f32,
}

impl Default for MassData {
    fn default() -> Self {
        Self {
            inertia: Mat3::ZERO,
            weighted_center: Vec3::ZERO,
            mass: 0.0,
        }
    }
}

/// Linear and angular velocity of a body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyVelocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl BodyVelocity {
    #[inline(always)]
    pub fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }
}
