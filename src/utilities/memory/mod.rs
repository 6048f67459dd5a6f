//! Handle allocation shared by the body, box and contact arenas.

pub mod id_pool;

pub use id_pool::IdPool;
