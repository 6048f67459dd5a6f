use crate::utilities::bounding_box::BoundingBox;

/// Index stored in link fields that point nowhere.
pub const NULL_NODE: i32 = -1;

/// Pooled tree node. Leaves have `right == NULL_NODE`; free slots have `height == -1`.
#[derive(Clone, Copy, Debug)]
pub struct Node {
    /// Fattened bounds for leaves, union of the children for branches.
    pub aabb: BoundingBox,
    pub parent: i32,
    pub left: i32,
    pub right: i32,
    /// Free-list successor while the node is pooled.
    pub next: i32,
    /// 0 for leaves, 1 + max(child heights) for branches, -1 for free slots.
    pub height: i32,
    /// Opaque payload handed to query callbacks. Only meaningful on leaves.
    pub user_data: i32,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            aabb: BoundingBox::default(),
            parent: NULL_NODE,
            left: NULL_NODE,
            right: NULL_NODE,
            next: NULL_NODE,
            height: -1,
            user_data: -1,
        }
    }
}

impl Node {
    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.right == NULL_NODE
    }

    #[inline(always)]
    pub fn is_free(&self) -> bool {
        self.height == -1
    }
}
