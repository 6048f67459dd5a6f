use super::node::NULL_NODE;
use super::tree::{Tree, TRAVERSAL_STACK_CAPACITY};
use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::for_each_ref::IBreakableForEach;

impl Tree {
    /// Reports the id of every leaf whose fat bounds overlap `bounds`.
    ///
    /// The enumerator returns false to stop the traversal early.
    pub fn query_aabb<TEnumerator: IBreakableForEach<i32>>(
        &self,
        bounds: &BoundingBox,
        leaf_enumerator: &mut TEnumerator,
    ) {
        if self.root == NULL_NODE {
            return;
        }
        let mut stack = [NULL_NODE; TRAVERSAL_STACK_CAPACITY];
        stack[0] = self.root;
        let mut stack_end = 1usize;

        while stack_end > 0 {
            stack_end -= 1;
            let id = stack[stack_end];
            let node = &self.nodes[id as usize];
            if !BoundingBox::intersects(*bounds, node.aabb) {
                continue;
            }
            if node.is_leaf() {
                if !leaf_enumerator.loop_body(id) {
                    return;
                }
            } else {
                assert!(
                    stack_end + 2 <= TRAVERSAL_STACK_CAPACITY,
                    "Fixed size stack overflow."
                );
                stack[stack_end] = node.left;
                stack[stack_end + 1] = node.right;
                stack_end += 2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn build(count: i32) -> Tree {
        let mut tree = Tree::default();
        for i in 0..count {
            let min = Vec3::new(i as f32 * 3.0, 0.0, 0.0);
            tree.insert(&BoundingBox::new(min, min + Vec3::ONE), i);
        }
        tree
    }

    #[test]
    fn test_query_finds_overlapping_leaves() {
        let tree = build(20);
        let mut found = Vec::new();
        let query = BoundingBox::new(Vec3::new(4.5, 0.0, 0.0), Vec3::new(9.5, 1.0, 1.0));
        tree.query_aabb(&query, &mut |id: i32| {
            found.push(tree.user_data(id));
            true
        });
        found.sort_unstable();
        // Leaf 1's fat bounds only touch the query, which still counts.
        assert_eq!(found, vec![1, 2, 3]);
    }

    #[test]
    fn test_query_stops_when_asked() {
        let tree = build(20);
        let mut visits = 0;
        let everything = BoundingBox::new(Vec3::splat(-100.0), Vec3::splat(100.0));
        tree.query_aabb(&everything, &mut |_: i32| {
            visits += 1;
            visits < 3
        });
        assert_eq!(visits, 3);
    }

    #[test]
    fn test_empty_tree_reports_nothing() {
        let tree = Tree::default();
        let mut visits = 0;
        tree.query_aabb(&BoundingBox::new(Vec3::ZERO, Vec3::ONE), &mut |_: i32| {
            visits += 1;
            true
        });
        assert_eq!(visits, 0);
    }
}
