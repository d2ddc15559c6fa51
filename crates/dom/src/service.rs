//! DOM Service - HTML text to arena
//!
//! This handles:
//! - Parsing fragment markup with html5ever (tolerant, never fails)
//! - Copying the parsed tree into a [`DomArena`] without recursion
//! - Picking the comparison root (the `<body>` the parser wraps fragments in)

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::arena::DomArena;
use crate::types::{DomNode, NodeId, NodeType};

/// Configuration for DOM service
#[derive(Debug, Clone)]
pub struct DomServiceConfig {
    /// Parse `<noscript>` as a browser with scripting would (raw text)
    pub scripting_enabled: bool,
}

impl Default for DomServiceConfig {
    fn default() -> Self {
        Self {
            scripting_enabled: true,
        }
    }
}

/// Main DOM service
#[derive(Debug, Clone, Default)]
pub struct DomService {
    config: DomServiceConfig,
}

impl DomService {
    /// Create new DOM service with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create DOM service with custom config
    pub fn with_config(config: DomServiceConfig) -> Self {
        Self { config }
    }

    /// Parse fragment markup into an arena rooted at `<body>`
    ///
    /// The markup is parsed as a full document, the way a browser treats the
    /// inner HTML of a captured element. Malformed input is repaired by the
    /// parser; if no body exists the document node becomes the root.
    pub fn parse_fragment(&self, html: &str) -> DomArena {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                scripting_enabled: self.config.scripting_enabled,
                ..Default::default()
            },
            ..Default::default()
        };
        let dom = parse_document(RcDom::default(), opts).one(html);

        let arena = self.build_arena(&dom.document);
        tracing::trace!(
            nodes = arena.len(),
            elements = arena.element_count(),
            "parsed fragment"
        );
        arena
    }

    fn build_arena(&self, document: &Handle) -> DomArena {
        let mut arena = DomArena::new();
        let mut body: Option<NodeId> = None;
        let mut stack: Vec<(Handle, Option<NodeId>)> = vec![(document.clone(), None)];

        while let Some((handle, parent)) = stack.pop() {
            let node = convert_node(&handle);
            let is_body = node.is_element() && node.node_name.eq_ignore_ascii_case("body");

            let node_id = match parent {
                Some(parent_id) => match arena.append_child(parent_id, node) {
                    Ok(id) => id,
                    // Parent ids come from this loop, so this cannot happen.
                    Err(_) => continue,
                },
                None => arena.add_node(node),
            };
            if is_body && body.is_none() {
                body = Some(node_id);
            }

            // Push children in reverse order (so they're visited left-to-right)
            for child in handle.children.borrow().iter().rev() {
                stack.push((child.clone(), Some(node_id)));
            }
        }

        let root = body.unwrap_or(0);
        if arena.set_root(root).is_err() {
            // Empty arena: give it a bare document so the view stays valid.
            let doc = arena.add_node(DomNode::new(0, NodeType::Document, "#document"));
            let _ = arena.set_root(doc);
        }
        arena
    }
}

/// Convenience wrapper with default configuration
pub fn parse_fragment(html: &str) -> DomArena {
    DomService::new().parse_fragment(html)
}

fn convert_node(handle: &Handle) -> DomNode {
    match &handle.data {
        NodeData::Document => DomNode::new(0, NodeType::Document, "#document"),
        NodeData::Doctype { name, .. } => DomNode::new(0, NodeType::DocumentType, name.to_string()),
        NodeData::Text { contents } => DomNode::text(contents.borrow().to_string()),
        NodeData::Comment { contents } => {
            let mut node = DomNode::new(0, NodeType::Comment, "#comment");
            node.node_value = contents.to_string();
            node
        }
        NodeData::ProcessingInstruction { target, contents } => {
            let mut node = DomNode::new(0, NodeType::ProcessingInstruction, target.to_string());
            node.node_value = contents.to_string();
            node
        }
        NodeData::Element { name, attrs, .. } => {
            let mut node = DomNode::element(name.local.to_string());
            for attr in attrs.borrow().iter() {
                let attr_name = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                    None => attr.name.local.to_string(),
                };
                node.attributes.insert(attr_name, attr.value.to_string());
            }
            node
        }
    }
}
