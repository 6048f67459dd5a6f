use super::node::NULL_NODE;
use super::tree::Tree;
use crate::utilities::bounding_box::BoundingBox;

impl Tree {
    /// Walks from `index` to the root, rebalancing each ancestor and recomputing its height and bounds.
    pub(crate) fn sync_hierarchy(&mut self, mut index: i32) {
        while index != NULL_NODE {
            index = self.balance(index);
            let node = self.nodes[index as usize];
            let left = self.nodes[node.left as usize];
            let right = self.nodes[node.right as usize];
            let node = &mut self.nodes[index as usize];
            node.height = 1 + left.height.max(right.height);
            node.aabb = BoundingBox::create_merged_boxes(left.aabb, right.aabb);
            index = node.parent;
        }
    }

    /// Points the parent of `old_child` (or the root) at `new_child`.
    #[inline(always)]
    fn replace_child(&mut self, parent: i32, old_child: i32, new_child: i32) {
        if parent == NULL_NODE {
            self.root = new_child;
        } else {
            let parent = &mut self.nodes[parent as usize];
            if parent.left == old_child {
                parent.left = new_child;
            } else {
                parent.right = new_child;
            }
        }
    }

    /// Rotates the taller child of branch `a` above it when the child heights differ by more than one.
    ///
    /// The promoted child keeps its taller grandchild and hands the shorter one to `a`.
    /// Returns the id of the node now occupying `a`'s former position.
    pub(crate) fn balance(&mut self, a: i32) -> i32 {
        let node_a = self.nodes[a as usize];
        if node_a.is_leaf() || node_a.height == 1 {
            return a;
        }

        let b = node_a.left;
        let c = node_a.right;
        let height_b = self.nodes[b as usize].height;
        let height_c = self.nodes[c as usize].height;
        let balance = height_c - height_b;

        if balance > 1 {
            // C is higher, promote C.
            let f = self.nodes[c as usize].left;
            let g = self.nodes[c as usize].right;
            self.replace_child(node_a.parent, a, c);

            self.nodes[c as usize].left = a;
            self.nodes[c as usize].parent = node_a.parent;
            self.nodes[a as usize].parent = c;

            let (keep, give) = if self.nodes[f as usize].height > self.nodes[g as usize].height {
                (f, g)
            } else {
                (g, f)
            };
            self.nodes[c as usize].right = keep;
            self.nodes[a as usize].right = give;
            self.nodes[give as usize].parent = a;
            self.refresh_rotated_pair(a, c, b, give, keep);
            c
        } else if balance < -1 {
            // B is higher, promote B.
            let d = self.nodes[b as usize].left;
            let e = self.nodes[b as usize].right;
            self.replace_child(node_a.parent, a, b);

            self.nodes[b as usize].right = a;
            self.nodes[b as usize].parent = node_a.parent;
            self.nodes[a as usize].parent = b;

            let (keep, give) = if self.nodes[d as usize].height > self.nodes[e as usize].height {
                (d, e)
            } else {
                (e, d)
            };
            self.nodes[b as usize].left = keep;
            self.nodes[a as usize].left = give;
            self.nodes[give as usize].parent = a;
            self.refresh_rotated_pair(a, b, c, give, keep);
            b
        } else {
            a
        }
    }

    /// Recomputes bounds and heights after a rotation: `lowered` now parents `stayed` and `given`,
    /// `promoted` now parents `lowered` and `kept`.
    #[inline(always)]
    fn refresh_rotated_pair(&mut self, lowered: i32, promoted: i32, stayed: i32, given: i32, kept: i32) {
        let stayed = self.nodes[stayed as usize];
        let given = self.nodes[given as usize];
        let kept = self.nodes[kept as usize];

        let lowered_aabb = BoundingBox::create_merged_boxes(stayed.aabb, given.aabb);
        let lowered_height = 1 + stayed.height.max(given.height);
        {
            let node = &mut self.nodes[lowered as usize];
            node.aabb = lowered_aabb;
            node.height = lowered_height;
        }
        let node = &mut self.nodes[promoted as usize];
        node.aabb = BoundingBox::create_merged_boxes(lowered_aabb, kept.aabb);
        node.height = 1 + lowered_height.max(kept.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_rotation_keeps_structure_valid() {
        let mut tree = Tree::default();
        let mut ids = Vec::new();
        for i in 0..32 {
            let min = Vec3::new(0.0, i as f32 * 2.0, 0.0);
            ids.push(tree.insert(&BoundingBox::new(min, min + Vec3::ONE), i));
            tree.validate();
        }
        let root = tree.node(tree.root());
        let left = tree.node(root.left).height;
        let right = tree.node(root.right).height;
        assert!((left - right).abs() <= 2, "root children heights {left} and {right}");
    }
}
