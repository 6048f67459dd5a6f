use tracing::trace;

use crate::physics::handles::BoxHandle;
use crate::physics::trees::{Tree, DEFAULT_NODE_CAPACITY};
use crate::utilities::bounding_box::BoundingBox;

/// Dynamic tree of box proxies plus the bookkeeping needed to find new overlapping pairs.
///
/// Leaves store the owning `BoxHandle` as their user data. Leaves whose bounds changed since the
/// last pass sit in the move buffer and are re-queried by `update_pairs`.
#[derive(Debug, Clone)]
pub struct BroadPhase {
    tree: Tree,
    move_buffer: Vec<i32>,
    pair_buffer: Vec<(i32, i32)>,
}

impl Default for BroadPhase {
    fn default() -> Self {
        Self::new(crate::physics::trees::DEFAULT_AABB_EXTENSION)
    }
}

impl BroadPhase {
    /// Creates an empty broad phase whose leaves are fattened by `aabb_extension`.
    pub fn new(aabb_extension: f32) -> Self {
        Self {
            tree: Tree::new(DEFAULT_NODE_CAPACITY, aabb_extension),
            move_buffer: Vec::with_capacity(64),
            pair_buffer: Vec::with_capacity(64),
        }
    }

    /// Tree holding the box proxies.
    #[inline(always)]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Number of leaves waiting to be re-queried.
    #[inline(always)]
    pub fn pending_move_count(&self) -> usize {
        self.move_buffer.len()
    }

    /// Adds a proxy for `shape` with tight world bounds `aabb`. Returns its leaf id.
    pub fn insert_box(&mut self, shape: BoxHandle, aabb: &BoundingBox) -> i32 {
        let id = self.tree.insert(aabb, shape.0);
        self.buffer_move(id);
        id
    }

    /// Removes the proxy with leaf id `index`.
    pub fn remove_box(&mut self, index: i32) {
        self.tree.remove(index);
        self.move_buffer.retain(|&moved| moved != index);
    }

    /// Moves a proxy to new tight bounds. The leaf is only re-queried if it left its fat bounds.
    pub fn update(&mut self, index: i32, aabb: &BoundingBox) {
        if self.tree.update(index, aabb) {
            self.buffer_move(index);
        }
    }

    /// Marks a leaf for re-querying on the next `update_pairs`.
    #[inline(always)]
    pub fn buffer_move(&mut self, index: i32) {
        self.move_buffer.push(index);
    }

    /// Fat bounds overlap test between two proxies.
    #[inline]
    pub fn test_overlap(&self, a: i32, b: i32) -> bool {
        BoundingBox::intersects(self.tree.fat_aabb(a), self.tree.fat_aabb(b))
    }

    /// Queries the tree for every moved leaf and reports each overlapping box pair exactly once.
    ///
    /// Pairs are reported in ascending order of leaf ids. The move buffer is empty afterwards.
    pub fn update_pairs<F: FnMut(BoxHandle, BoxHandle)>(&mut self, mut on_pair: F) {
        self.pair_buffer.clear();
        for &query_id in &self.move_buffer {
            let fat = self.tree.fat_aabb(query_id);
            let pairs = &mut self.pair_buffer;
            self.tree.query_aabb(&fat, &mut |id: i32| {
                if id != query_id {
                    pairs.push((id.min(query_id), id.max(query_id)));
                }
                true
            });
        }
        self.move_buffer.clear();

        self.pair_buffer.sort_unstable();
        self.pair_buffer.dedup();
        trace!(pairs = self.pair_buffer.len(), "broad phase pairs");

        for &(a, b) in &self.pair_buffer {
            on_pair(
                BoxHandle(self.tree.user_data(a)),
                BoxHandle(self.tree.user_data(b)),
            );
        }
        self.pair_buffer.clear();
    }

    /// Removes every proxy.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.move_buffer.clear();
        self.pair_buffer.clear();
    }
}
