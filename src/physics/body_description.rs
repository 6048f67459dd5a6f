use glam::Vec3;
use thiserror::Error;

use crate::physics::body_properties::BodyType;
use crate::utilities::rigid_transform::RigidTransform;

/// Rejected body or box description.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DescriptionError {
    /// Box half-extents must be positive and finite on every axis.
    #[error("box extents must be positive and finite, got {0}")]
    InvalidExtents(Vec3),
    /// Density cannot be negative.
    #[error("density must be finite and non-negative, got {0}")]
    InvalidDensity(f32),
    /// Friction cannot be negative.
    #[error("friction must be finite and non-negative, got {0}")]
    InvalidFriction(f32),
    /// Restitution lies in [0, 1].
    #[error("restitution must lie in [0, 1], got {0}")]
    InvalidRestitution(f32),
    /// A position, axis or velocity had a NaN or infinite component.
    #[error("{0} must be finite")]
    NonFinite(&'static str),
    /// Rotating by a nonzero angle needs a nonzero axis.
    #[error("rotation axis must be nonzero when the angle is nonzero")]
    ZeroAxis,
    /// Gravity scale or damping was NaN, infinite or negative.
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidScalar {
        /// Name of the offending field.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },
}

/// Describes a body's initial state.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BodyDescription {
    pub body_type: BodyType,
    /// World position of the body origin.
    pub position: Vec3,
    /// Initial orientation as a rotation of `angle` radians about `axis`.
    pub axis: Vec3,
    pub angle: f32,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Multiplier on the simulation gravity. Zero makes the body float.
    pub gravity_scale: f32,
    /// Bit mask; two bodies only collide if their layers share a bit.
    pub layers: u32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub allow_sleep: bool,
    /// Start awake. Sleeping bodies wake when touched.
    pub awake: bool,
    pub active: bool,
    pub lock_axis_x: bool,
    pub lock_axis_y: bool,
    pub lock_axis_z: bool,
    /// Free for the application.
    pub user_data: u64,
}

impl Default for BodyDescription {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            position: Vec3::ZERO,
            axis: Vec3::Y,
            angle: 0.0,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            gravity_scale: 1.0,
            layers: 1,
            linear_damping: 0.0,
            angular_damping: 0.1,
            allow_sleep: true,
            awake: true,
            active: true,
            lock_axis_x: false,
            lock_axis_y: false,
            lock_axis_z: false,
            user_data: 0,
        }
    }
}

impl BodyDescription {
    /// Dynamic body at `position` with default settings.
    pub fn dynamic(position: Vec3) -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position,
            ..Self::default()
        }
    }

    /// Static body at `position`.
    pub fn fixed(position: Vec3) -> Self {
        Self {
            body_type: BodyType::Static,
            position,
            ..Self::default()
        }
    }

    /// Kinematic body at `position` moving with `linear_velocity`.
    pub fn kinematic(position: Vec3, linear_velocity: Vec3) -> Self {
        Self {
            body_type: BodyType::Kinematic,
            position,
            linear_velocity,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, axis: Vec3, angle: f32) -> Self {
        self.axis = axis;
        self.angle = angle;
        self
    }

    pub fn with_linear_velocity(mut self, linear_velocity: Vec3) -> Self {
        self.linear_velocity = linear_velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_gravity_scale(mut self, gravity_scale: f32) -> Self {
        self.gravity_scale = gravity_scale;
        self
    }

    pub fn with_damping(mut self, linear_damping: f32, angular_damping: f32) -> Self {
        self.linear_damping = linear_damping;
        self.angular_damping = angular_damping;
        self
    }

    pub fn with_allow_sleep(mut self, allow_sleep: bool) -> Self {
        self.allow_sleep = allow_sleep;
        self
    }

    pub fn with_awake(mut self, awake: bool) -> Self {
        self.awake = awake;
        self
    }

    pub fn with_axis_locks(mut self, x: bool, y: bool, z: bool) -> Self {
        self.lock_axis_x = x;
        self.lock_axis_y = y;
        self.lock_axis_z = z;
        self
    }

    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }

    /// Initial world transform described by `position`, `axis` and `angle`.
    pub fn transform(&self) -> RigidTransform {
        RigidTransform::from_axis_angle(self.axis, self.angle, self.position)
    }

    pub fn validate(&self) -> Result<(), DescriptionError> {
        let vectors = [
            ("position", self.position),
            ("axis", self.axis),
            ("linear velocity", self.linear_velocity),
            ("angular velocity", self.angular_velocity),
        ];
        for (name, value) in vectors {
            if !value.is_finite() {
                return Err(DescriptionError::NonFinite(name));
            }
        }
        if !self.angle.is_finite() {
            return Err(DescriptionError::NonFinite("angle"));
        }
        if self.angle != 0.0 && self.axis.length_squared() == 0.0 {
            return Err(DescriptionError::ZeroAxis);
        }
        let scalars = [
            ("gravity_scale", self.gravity_scale),
            ("linear_damping", self.linear_damping),
            ("angular_damping", self.angular_damping),
        ];
        for (name, value) in scalars {
            if !(value.is_finite() && value >= 0.0) {
                return Err(DescriptionError::InvalidScalar { name, value });
            }
        }
        Ok(())
    }
}

/// Describes a box collider attached to a body.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BoxDescription {
    /// Placement of the box relative to the body origin.
    pub local_transform: RigidTransform,
    /// Half of the box's size along each local axis.
    pub extents: Vec3,
    pub friction: f32,
    pub restitution: f32,
    pub density: f32,
    /// Sensors report overlaps to the contact listener but never produce a response.
    pub sensor: bool,
    /// Free for the application.
    pub user_data: u64,
}

impl Default for BoxDescription {
    fn default() -> Self {
        Self {
            local_transform: RigidTransform::IDENTITY,
            extents: Vec3::splat(0.5),
            friction: 0.4,
            restitution: 0.2,
            density: 1.0,
            sensor: false,
            user_data: 0,
        }
    }
}

impl BoxDescription {
    /// Box centered on the body origin with the given half-extents.
    pub fn new(extents: Vec3) -> Self {
        Self {
            extents,
            ..Self::default()
        }
    }

    pub fn with_local_transform(mut self, local_transform: RigidTransform) -> Self {
        self.local_transform = local_transform;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }

    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn validate(&self) -> Result<(), DescriptionError> {
        if !(self.extents.is_finite() && self.extents.cmpgt(Vec3::ZERO).all()) {
            return Err(DescriptionError::InvalidExtents(self.extents));
        }
        if !(self.density.is_finite() && self.density >= 0.0) {
            return Err(DescriptionError::InvalidDensity(self.density));
        }
        if !(self.friction.is_finite() && self.friction >= 0.0) {
            return Err(DescriptionError::InvalidFriction(self.friction));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(DescriptionError::InvalidRestitution(self.restitution));
        }
        if !self.local_transform.position.is_finite() || !self.local_transform.rotation.is_finite() {
            return Err(DescriptionError::NonFinite("local transform"));
        }
        Ok(())
    }
}
