//! Dynamic bounding volume hierarchy used by the broad phase.

pub mod node;
pub mod tree;
pub mod tree_add;
pub mod tree_diagnostics;
pub mod tree_ray_cast;
pub mod tree_refit;
pub mod tree_remove;
pub mod tree_volume_query;

pub use node::{Node, NULL_NODE};
pub use tree::{Tree, DEFAULT_AABB_EXTENSION, DEFAULT_NODE_CAPACITY, TRAVERSAL_STACK_CAPACITY};
