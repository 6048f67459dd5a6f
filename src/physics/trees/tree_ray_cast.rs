use super::node::NULL_NODE;
use super::tree::{Tree, TRAVERSAL_STACK_CAPACITY};
use crate::physics::collidables::ray::RaycastData;
use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::for_each_ref::IBreakableForEach;
use glam::Vec3;

/// Padding added to the cross-axis tests so that segments parallel to a slab are not rejected.
const RAY_EPSILON: f32 = 1.0e-6;

impl Tree {
    /// Separating-axis test between the segment `p0..p1` and `bounds`.
    ///
    /// Works with doubled quantities throughout: full box size, full segment, and twice the
    /// offset between the segment midpoint and the box center.
    #[inline(always)]
    pub fn segment_intersects(p0: Vec3, p1: Vec3, bounds: &BoundingBox) -> bool {
        let e = bounds.max - bounds.min;
        let d = p1 - p0;
        let m = p0 + p1 - bounds.min - bounds.max;

        let mut ad = d.abs();
        if m.x.abs() > e.x + ad.x || m.y.abs() > e.y + ad.y || m.z.abs() > e.z + ad.z {
            return false;
        }
        ad += Vec3::splat(RAY_EPSILON);
        if (m.y * d.z - m.z * d.y).abs() > e.y * ad.z + e.z * ad.y {
            return false;
        }
        if (m.z * d.x - m.x * d.z).abs() > e.x * ad.z + e.z * ad.x {
            return false;
        }
        if (m.x * d.y - m.y * d.x).abs() > e.x * ad.y + e.y * ad.x {
            return false;
        }
        true
    }

    /// Reports the id of every leaf whose fat bounds the segment `[start, start + dir * t]` crosses.
    ///
    /// The enumerator returns false to stop the traversal early. Panics if the traversal stack
    /// would exceed `TRAVERSAL_STACK_CAPACITY`.
    pub fn query_raycast<TEnumerator: IBreakableForEach<i32>>(
        &self,
        ray: &RaycastData,
        leaf_enumerator: &mut TEnumerator,
    ) {
        if self.root == NULL_NODE {
            return;
        }
        let p0 = ray.start;
        let p1 = ray.end_point();

        let mut stack = [NULL_NODE; TRAVERSAL_STACK_CAPACITY];
        stack[0] = self.root;
        let mut stack_end = 1usize;

        while stack_end > 0 {
            stack_end -= 1;
            let id = stack[stack_end];
            let node = &self.nodes[id as usize];
            if !Self::segment_intersects(p0, p1, &node.aabb) {
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
