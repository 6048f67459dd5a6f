use super::node::NULL_NODE;
use super::tree::Tree;
use crate::utilities::bounding_box::BoundingBox;

impl Tree {
    /// Adds a leaf holding `user_data` with the given tight bounds and returns its id.
    ///
    /// The stored bounds are fattened by the tree's extension margin so that small motions can be
    /// absorbed by [`Tree::update`] without restructuring.
    pub fn insert(&mut self, bounds: &BoundingBox, user_data: i32) -> i32 {
        let id = self.allocate_node();
        let fat = self.fatten(bounds);
        let node = &mut self.nodes[id as usize];
        node.aabb = fat;
        node.user_data = user_data;
        node.height = 0;
        self.insert_leaf(id);
        id
    }

    /// Cost of descending into `child` when placing `leaf_bounds` below it.
    #[inline(always)]
    fn descent_cost(&self, child: i32, leaf_bounds: &BoundingBox, inherited_cost: f32) -> f32 {
        let child = &self.nodes[child as usize];
        let inflated = BoundingBox::create_merged_boxes(*leaf_bounds, child.aabb).surface_area();
        if child.is_leaf() {
            // Descending into a leaf means creating a new branch over it.
            inflated + inherited_cost
        } else {
            inflated - child.aabb.surface_area() + inherited_cost
        }
    }

    /// Links an already allocated leaf into the hierarchy next to the cheapest sibling.
    pub(crate) fn insert_leaf(&mut self, id: i32) {
        if self.root == NULL_NODE {
            self.root = id;
            self.nodes[id as usize].parent = NULL_NODE;
            return;
        }

        let leaf_bounds = self.nodes[id as usize].aabb;
        let mut search_index = self.root;
        while !self.nodes[search_index as usize].is_leaf() {
            let node = self.nodes[search_index as usize];
            let combined_area = BoundingBox::create_merged_boxes(leaf_bounds, node.aabb).surface_area();
            // Creating a branch here pairs the new leaf with this whole subtree.
            let branch_cost = 2.0 * combined_area;
            // Growth every ancestor pays once the leaf is placed somewhere below.
            let inherited_cost = 2.0 * (combined_area - node.aabb.surface_area());

            let left_cost = self.descent_cost(node.left, &leaf_bounds, inherited_cost);
            let right_cost = self.descent_cost(node.right, &leaf_bounds, inherited_cost);

            if branch_cost < left_cost && branch_cost < right_cost {
                break;
            }
            search_index = if left_cost < right_cost {
                node.left
            } else {
                node.right
            };
        }

        let sibling = search_index;
        let old_parent = self.nodes[sibling as usize].parent;
        let new_parent = self.allocate_node();
        {
            let sibling_node = self.nodes[sibling as usize];
            let parent = &mut self.nodes[new_parent as usize];
            parent.parent = old_parent;
            parent.user_data = -1;
            parent.aabb = BoundingBox::create_merged_boxes(leaf_bounds, sibling_node.aabb);
            parent.height = sibling_node.height + 1;
            parent.left = sibling;
            parent.right = id;
        }
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[id as usize].parent = new_parent;

        if old_parent == NULL_NODE {
            self.root = new_parent;
        } else {
            let grand = &mut self.nodes[old_parent as usize];
            if grand.left == sibling {
                grand.left = new_parent;
            } else {
                grand.right = new_parent;
            }
        }

        self.sync_hierarchy(new_parent);
    }
}
