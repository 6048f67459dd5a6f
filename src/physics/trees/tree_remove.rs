use super::node::NULL_NODE;
use super::tree::Tree;
use crate::utilities::bounding_box::BoundingBox;

impl Tree {
    #[inline(always)]
    fn check_leaf(&self, id: i32) {
        self.check_index(id);
        let node = &self.nodes[id as usize];
        assert!(
            !node.is_free() && node.is_leaf(),
            "Node {id} is not a live leaf."
        );
    }

    /// Removes a leaf and returns its node to the pool.
    pub fn remove(&mut self, id: i32) {
        self.check_leaf(id);
        self.remove_leaf(id);
        self.deallocate_node(id);
    }

    /// Refits a leaf against new tight bounds.
    ///
    /// Returns false without touching the hierarchy when the stored fat bounds still contain
    /// `bounds`. Otherwise the leaf is refattened and reinserted, and true is returned.
    pub fn update(&mut self, id: i32, bounds: &BoundingBox) -> bool {
        self.check_leaf(id);
        if self.nodes[id as usize].aabb.contains(bounds) {
            return false;
        }
        self.remove_leaf(id);
        self.nodes[id as usize].aabb = self.fatten(bounds);
        self.insert_leaf(id);
        true
    }

    /// Unlinks a leaf from the hierarchy, replacing its parent branch with the sibling.
    /// The leaf itself stays allocated.
    pub(crate) fn remove_leaf(&mut self, id: i32) {
        if id == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[id as usize].parent;
        let parent_node = self.nodes[parent as usize];
        let grand_parent = parent_node.parent;
        let sibling = if parent_node.left == id {
            parent_node.right
        } else {
            parent_node.left
        };

        if grand_parent != NULL_NODE {
            let grand = &mut self.nodes[grand_parent as usize];
            if grand.left == parent {
                grand.left = sibling;
            } else {
                grand.right = sibling;
            }
        } else {
            self.root = sibling;
        }
        self.nodes[sibling as usize].parent = grand_parent;
        self.nodes[id as usize].parent = NULL_NODE;

        self.deallocate_node(parent);
        self.sync_hierarchy(grand_parent);
    }
}
