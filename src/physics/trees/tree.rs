use super::node::{Node, NULL_NODE};
use crate::utilities::bounding_box::BoundingBox;

/// Maximum stack depth for iterative tree traversals.
pub const TRAVERSAL_STACK_CAPACITY: usize = 256;

/// Default number of pooled nodes a tree starts with.
pub const DEFAULT_NODE_CAPACITY: usize = 1024;

/// Default distance leaf bounds are grown by on every side.
pub const DEFAULT_AABB_EXTENSION: f32 = 0.5;

/// Self-balancing bounding volume hierarchy over fattened leaf AABBs.
///
/// Nodes live in a pool addressed by `i32` ids. Growing the pool never moves a live id, so
/// ids handed out by [`Tree::insert`] stay valid until they are passed to [`Tree::remove`].
///
/// The struct is defined here and extended with `impl Tree` blocks in sibling modules.
#[derive(Clone, Debug)]
pub struct Tree {
    pub(crate) root: i32,
    pub(crate) nodes: Vec<Node>,
    /// Number of live nodes, leaves and branches together.
    pub(crate) node_count: usize,
    pub(crate) free_list: i32,
    pub(crate) aabb_extension: f32,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_CAPACITY, DEFAULT_AABB_EXTENSION)
    }
}

impl Tree {
    /// Creates an empty tree.
    ///
    /// # Arguments
    /// * `initial_capacity` - Number of nodes to preallocate. Clamped to at least 1.
    /// * `aabb_extension` - Margin added to every side of the bounds passed to `insert` and `update`.
    pub fn new(initial_capacity: usize, aabb_extension: f32) -> Self {
        let capacity = initial_capacity.max(1);
        let mut tree = Self {
            root: NULL_NODE,
            nodes: vec![Node::default(); capacity],
            node_count: 0,
            free_list: 0,
            aabb_extension,
        };
        tree.add_to_free_list(0);
        tree
    }

    /// Root node id, or `NULL_NODE` when the tree is empty.
    #[inline(always)]
    pub fn root(&self) -> i32 {
        self.root
    }

    /// Number of nodes the pool can hold before it grows.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live nodes, leaves and branches together.
    #[inline(always)]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Height of the root, or 0 for an empty tree.
    #[inline]
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    #[inline(always)]
    pub fn aabb_extension(&self) -> f32 {
        self.aabb_extension
    }

    /// Gets the fattened bounds stored for a leaf.
    #[inline]
    pub fn fat_aabb(&self, id: i32) -> BoundingBox {
        self.node(id).aabb
    }

    /// Gets the payload stored with a leaf.
    #[inline]
    pub fn user_data(&self, id: i32) -> i32 {
        self.node(id).user_data
    }

    #[inline]
    pub(crate) fn node(&self, id: i32) -> &Node {
        self.check_index(id);
        &self.nodes[id as usize]
    }

    #[inline(always)]
    pub(crate) fn check_index(&self, id: i32) {
        assert!(
            id >= 0 && (id as usize) < self.nodes.len(),
            "Node index {id} is out of range."
        );
    }

    /// Grows `bounds` by the tree's extension margin.
    #[inline(always)]
    pub(crate) fn fatten(&self, bounds: &BoundingBox) -> BoundingBox {
        bounds.fattened(self.aabb_extension)
    }

    /// Threads every slot from `first` to the end of the pool into the free list.
    fn add_to_free_list(&mut self, first: usize) {
        let capacity = self.nodes.len();
        for index in first..capacity {
            let node = &mut self.nodes[index];
            *node = Node::default();
            node.next = if index + 1 < capacity {
                (index + 1) as i32
            } else {
                NULL_NODE
            };
        }
        self.free_list = first as i32;
    }

    pub(crate) fn allocate_node(&mut self) -> i32 {
        if self.free_list == NULL_NODE {
            let old_capacity = self.nodes.len();
            self.nodes.resize(old_capacity * 2, Node::default());
            self.add_to_free_list(old_capacity);
        }
        let id = self.free_list;
        let node = &mut self.nodes[id as usize];
        self.free_list = node.next;
        node.height = 0;
        node.left = NULL_NODE;
        node.right = NULL_NODE;
        node.parent = NULL_NODE;
        node.next = NULL_NODE;
        node.user_data = -1;
        self.node_count += 1;
        id
    }

    pub(crate) fn deallocate_node(&mut self, id: i32) {
        self.check_index(id);
        let free_list = self.free_list;
        let node = &mut self.nodes[id as usize];
        debug_assert!(!node.is_free(), "Node {id} was already returned to the pool.");
        node.next = free_list;
        node.height = -1;
        self.free_list = id;
        self.node_count -= 1;
    }

    /// Returns every node to the pool without shrinking it.
    pub fn clear(&mut self) {
        self.root = NULL_NODE;
        self.node_count = 0;
        self.add_to_free_list(0);
    }
}
