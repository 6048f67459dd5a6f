//! Rigid body simulation for oriented boxes.
//!
//! Bodies carry one or more boxes. Every step the broad phase finds overlapping box proxies, the
//! narrow phase builds contact manifolds with the separating axis test, and connected groups of
//! awake bodies are solved as islands with warm started sequential impulses. Islands that stay
//! still long enough fall asleep.
//!
//! ```
//! use glam::Vec3;
//! use rust_boxphysics::{BodyDescription, BoxDescription, Simulation, SimulationSettings};
//!
//! let mut simulation = Simulation::new(SimulationSettings::default()).unwrap();
//! let floor = simulation.create_body(&BodyDescription::fixed(Vec3::ZERO)).unwrap();
//! simulation.add_box(floor, &BoxDescription::new(Vec3::new(10.0, 0.5, 10.0))).unwrap();
//! let crate_body = simulation
//!     .create_body(&BodyDescription::dynamic(Vec3::new(0.0, 3.0, 0.0)))
//!     .unwrap();
//! simulation.add_box(crate_body, &BoxDescription::new(Vec3::splat(0.5))).unwrap();
//! for _ in 0..120 {
//!     simulation.step();
//! }
//! assert!(simulation.body(crate_body).unwrap().position().y < 3.0);
//! ```

pub mod physics;
pub mod utilities;

pub use physics::bodies::{Bodies, Body, ContactEdge};
pub use physics::body_description::{BodyDescription, BoxDescription, DescriptionError};
pub use physics::body_properties::{BodyFlags, BodyType, BodyVelocity, MassData};
pub use physics::collidables::box_shape::BoxShape;
pub use physics::collidables::ray::RaycastData;
pub use physics::collision_detection::contact_constraint::{ContactConstraint, ContactFlags};
pub use physics::collision_detection::contact_manager::IContactListener;
pub use physics::collision_detection::contact_manifold::{Contact, FeaturePair, Manifold};
pub use physics::handles::{BodyHandle, BoxHandle, ContactHandle};
pub use physics::simulation::{IQueryCallback, Simulation, SimulationError};
pub use physics::simulation_settings::{SettingsError, SimulationSettings};
pub use utilities::bounding_box::BoundingBox;
pub use utilities::rigid_transform::RigidTransform;
