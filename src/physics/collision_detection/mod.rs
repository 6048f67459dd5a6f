//! Pair discovery, box-box contact generation and persistent contact bookkeeping.

pub mod broad_phase;
pub mod collision_tasks;
pub mod contact_constraint;
pub mod contact_manager;
pub mod contact_manifold;
