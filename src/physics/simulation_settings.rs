use glam::Vec3;
use thiserror::Error;

/// Rejected configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SettingsError {
    /// The fixed timestep must be positive and finite.
    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f32),
    /// At least one solver iteration is required.
    #[error("iteration count must be at least 1")]
    ZeroIterations,
    /// A tuning constant was negative, NaN or infinite.
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidTuning {
        /// Name of the offending field.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },
    /// Gravity contained a NaN or infinite component.
    #[error("gravity must be finite, got {0}")]
    InvalidGravity(Vec3),
}

/// Immutable tuning parameters for a simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationSettings {
    /// Fixed timestep advanced by every call to `step`.
    pub dt: f32,
    pub gravity: Vec3,
    /// Number of sequential impulse passes per island.
    pub iterations: u32,
    pub allow_sleep: bool,
    pub enable_friction: bool,
    /// Fraction of penetration error fed back into the velocity solve each step.
    pub baumgarte: f32,
    /// Penetration depth tolerated without positional correction.
    pub penetration_slop: f32,
    /// Squared linear speed under which a body counts as resting.
    pub sleep_linear: f32,
    /// Squared angular speed under which a body counts as resting.
    pub sleep_angular: f32,
    /// Seconds an entire island must rest before it is put to sleep.
    pub sleep_time: f32,
    /// Margin added on every side of box bounds stored in the broad phase.
    pub aabb_extension: f32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            iterations: Self::DEFAULT_ITERATIONS,
            allow_sleep: true,
            enable_friction: true,
            baumgarte: Self::BAUMGARTE,
            penetration_slop: Self::PENETRATION_SLOP,
            sleep_linear: Self::SLEEP_LINEAR,
            sleep_angular: Self::SLEEP_ANGULAR,
            sleep_time: Self::SLEEP_TIME,
            aabb_extension: crate::physics::trees::DEFAULT_AABB_EXTENSION,
        }
    }
}

impl SimulationSettings {
    pub const DEFAULT_ITERATIONS: u32 = 20;
    pub const BAUMGARTE: f32 = 0.2;
    pub const PENETRATION_SLOP: f32 = 0.05;
    pub const SLEEP_LINEAR: f32 = 0.01;
    pub const SLEEP_ANGULAR: f32 = (2.0 / 180.0) * std::f32::consts::PI;
    pub const SLEEP_TIME: f32 = 0.5;

    /// Creates settings with the given timestep and default tuning.
    pub fn new(dt: f32) -> Result<Self, SettingsError> {
        let settings = Self {
            dt,
            ..Self::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Checks every field, returning the first problem found.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SettingsError::InvalidTimestep(self.dt));
        }
        if self.iterations == 0 {
            return Err(SettingsError::ZeroIterations);
        }
        if !self.gravity.is_finite() {
            return Err(SettingsError::InvalidGravity(self.gravity));
        }
        let tuning = [
            ("baumgarte", self.baumgarte),
            ("penetration_slop", self.penetration_slop),
            ("sleep_linear", self.sleep_linear),
            ("sleep_angular", self.sleep_angular),
            ("sleep_time", self.sleep_time),
            ("aabb_extension", self.aabb_extension),
        ];
        for (name, value) in tuning {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SettingsError::InvalidTuning { name, value });
            }
        }
        Ok(())
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_allow_sleep(mut self, allow_sleep: bool) -> Self {
        self.allow_sleep = allow_sleep;
        self
    }

    pub fn with_enable_friction(mut self, enable_friction: bool) -> Self {
        self.enable_friction = enable_friction;
        self
    }

    pub fn with_baumgarte(mut self, baumgarte: f32) -> Self {
        self.baumgarte = baumgarte;
        self
    }

    pub fn with_penetration_slop(mut self, penetration_slop: f32) -> Self {
        self.penetration_slop = penetration_slop;
        self
    }

    pub fn with_aabb_extension(mut self, aabb_extension: f32) -> Self {
        self.aabb_extension = aabb_extension;
        self
    }
}
