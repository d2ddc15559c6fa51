//! Core type definitions
//!
//! Key design principles:
//! 1. Use u32 for indices (4 bytes vs 8 bytes pointer)
//! 2. Use SmallVec for small arrays (avoid heap allocation)
//! 3. Keep only what structure comparison needs: tag, attributes, children

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Node identifier (index into arena)
/// u32 allows 4 billion nodes, enough for any webpage
pub type NodeId = u32;

/// Node type matching DOM specification
///
/// Only the kinds the HTML parser can produce are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Text = 3,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
}

/// The main DOM tree node structure
///
/// Design philosophy:
/// - Small fixed-size fields first (better packing)
/// - Use indices instead of pointers
#[derive(Debug, Clone)]
pub struct DomNode {
    pub node_id: NodeId,
    pub node_type: NodeType,

    // Navigation indices
    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>, // Most nodes have <4 children

    pub node_name: String,
    pub node_value: String,

    /// Declaration order is not preserved; consumers sort by name.
    pub attributes: AHashMap<String, String>,
}

impl DomNode {
    /// Create a new node with required fields
    pub fn new(node_id: NodeId, node_type: NodeType, node_name: impl Into<String>) -> Self {
        Self {
            node_id,
            node_type,
            parent_id: None,
            children_ids: SmallVec::new(),
            node_name: node_name.into(),
            node_value: String::new(),
            attributes: AHashMap::new(),
        }
    }

    /// Shorthand for an element node
    pub fn element(tag: impl Into<String>) -> Self {
        Self::new(0, NodeType::Element, tag)
    }

    /// Shorthand for a text node
    pub fn text(value: impl Into<String>) -> Self {
        let mut node = Self::new(0, NodeType::Text, "#text");
        node.node_value = value.into();
        node
    }

    /// Builder-style attribute setter, mostly for synthetic trees
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Check if node is an element
    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    /// Get attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }
}

/// One step of a [`ComparisonPath`]: lowercased tag and 1-based element index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub tag: String,
    pub nth_child: usize,
}

/// Location of a node relative to the comparison root
///
/// Renders as `root > tag:nth-child(i) > tag:nth-child(j)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonPath {
    root: String,
    segments: Vec<PathSegment>,
}

impl ComparisonPath {
    pub fn root(label: impl Into<String>) -> Self {
        Self {
            root: label.into(),
            segments: Vec::new(),
        }
    }

    /// Path of the `nth_child` (1-based) element child of this path
    pub fn child(&self, tag: &str, nth_child: usize) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(PathSegment {
            tag: tag.to_ascii_lowercase(),
            nth_child,
        });
        Self {
            root: self.root.clone(),
            segments,
        }
    }

    pub fn root_label(&self) -> &str {
        &self.root
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl std::fmt::Display for ComparisonPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.root)?;
        for segment in &self.segments {
            write!(f, " > {}:nth-child({})", segment.tag, segment.nth_child)?;
        }
        Ok(())
    }
}

impl Serialize for ComparisonPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single attribute as seen on one side of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttrPair {
    pub name: String,
    pub value: String,
}

impl std::fmt::Display for AttrPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=\"{}\"", self.name, self.value)
    }
}

/// What kind of mismatch was found, with both sides' values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DivergenceKind {
    ChildCountMismatch { count_a: usize, count_b: usize },
    TagMismatch { tag_a: String, tag_b: String },
    AttributeCountMismatch { count_a: usize, count_b: usize },
    AttributeValueMismatch { attr_a: AttrPair, attr_b: AttrPair },
}

/// One detected structural or attribute mismatch at a specific path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub path: ComparisonPath,
    #[serde(flatten)]
    pub kind: DivergenceKind,
}

/// Result of a structural comparison
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonOutcome {
    pub identical: bool,
    pub divergences: Vec<Divergence>,
}

impl ComparisonOutcome {
    pub fn from_divergences(divergences: Vec<Divergence>) -> Self {
        Self {
            identical: divergences.is_empty(),
            divergences,
        }
    }
}
