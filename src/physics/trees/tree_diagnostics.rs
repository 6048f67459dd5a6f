use super::node::NULL_NODE;
use super::tree::Tree;
use crate::utilities::bounding_box::BoundingBox;

impl Tree {
    /// Measures the surface area cost metric of the tree: the summed area of every node divided
    /// by the root's area. Lower is better.
    pub fn measure_cost_metric(&self) -> f32 {
        if self.root == NULL_NODE {
            return 0.0;
        }
        let root_metric = self.nodes[self.root as usize].aabb.surface_area();
        if root_metric <= 0.0 {
            return 0.0;
        }
        let total_cost: f32 = self
            .nodes
            .iter()
            .filter(|node| !node.is_free())
            .map(|node| node.aabb.surface_area())
            .sum();
        total_cost / root_metric
    }

    /// Panics if the pool or hierarchy is inconsistent.
    pub fn validate(&self) {
        let mut free_nodes = 0usize;
        let mut index = self.free_list;
        while index != NULL_NODE {
            assert!(
                index >= 0 && (index as usize) < self.nodes.len(),
                "Free list link {index} is out of range."
            );
            assert_eq!(self.nodes[index as usize].height, -1, "Pooled node {index} has a height.");
            index = self.nodes[index as usize].next;
            free_nodes += 1;
        }
        assert_eq!(
            self.node_count + free_nodes,
            self.nodes.len(),
            "Live and pooled nodes do not add up to the capacity."
        );

        if self.root != NULL_NODE {
            assert_eq!(
                self.nodes[self.root as usize].parent,
                NULL_NODE,
                "Root {} has a parent.",
                self.root
            );
            let reached = self.validate_node(self.root);
            assert_eq!(reached, self.node_count, "Unreachable live nodes.");
        } else {
            assert_eq!(self.node_count, 0, "Empty tree with live nodes.");
        }
    }

    /// Returns the number of nodes in the subtree rooted at `index`.
    fn validate_node(&self, index: i32) -> usize {
        let node = &self.nodes[index as usize];
        assert!(!node.is_free(), "Node {index} is reachable but pooled.");
        if node.is_leaf() {
            assert_eq!(node.height, 0, "Leaf {index} has nonzero height.");
            return 1;
        }

        let (left, right) = (node.left, node.right);
        for child in [left, right] {
            assert!(
                child >= 0 && (child as usize) < self.nodes.len(),
                "Child {child} of node {index} is out of range."
            );
            assert_eq!(
                self.nodes[child as usize].parent, index,
                "Bad parent index on node {child}"
            );
        }
        let left_node = &self.nodes[left as usize];
        let right_node = &self.nodes[right as usize];
        assert_eq!(
            node.height,
            1 + left_node.height.max(right_node.height),
            "Bad height on node {index}"
        );
        let merged = BoundingBox::create_merged_boxes(left_node.aabb, right_node.aabb);
        assert!(
            node.aabb.contains(&merged),
            "Node {index} bounds do not contain its children."
        );
        1 + self.validate_node(left) + self.validate_node(right)
    }
}
