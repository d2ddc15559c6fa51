//! Read-only tree view used by the comparator and normalizer
//!
//! Only three things matter for structure: tag name, attribute pairs, and
//! ordered element children. Text and comment nodes never show up here.

use crate::arena::DomArena;
use crate::types::NodeId;

/// Minimal read-only view over an element tree
pub trait TreeView {
    /// Cheap handle to a node inside this view
    type Node: Copy;

    /// Comparison root (the element whose inner markup was captured)
    fn root(&self) -> Self::Node;

    /// Tag name as stored by the producer; callers normalise case
    fn tag_name(&self, node: Self::Node) -> &str;

    /// Attribute pairs in no particular order
    fn attributes(&self, node: Self::Node) -> Vec<(&str, &str)>;

    /// Element children in document order
    fn element_children(&self, node: Self::Node) -> Vec<Self::Node>;
}

// An arena without a root (or an unknown id) reads as an empty element:
// no tag, no attributes, no children.
impl TreeView for DomArena {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.root_id().unwrap_or(0)
    }

    fn tag_name(&self, node: NodeId) -> &str {
        self.get(node).map(|n| n.node_name.as_str()).unwrap_or("")
    }

    fn attributes(&self, node: NodeId) -> Vec<(&str, &str)> {
        let Ok(node) = self.get(node) else {
            return Vec::new();
        };
        node.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        let Ok(node) = self.get(node) else {
            return Vec::new();
        };
        node.children_ids
            .iter()
            .copied()
            .filter(|&child| self.get(child).is_ok_and(|c| c.is_element()))
            .collect()
    }
}
