//! Tree Normalizer - Convert an element tree to canonical text
//!
//! One line per element, depth-first in document order:
//!
//! ```text
//! ul class="menu"
//!   li
//!   li id="last"
//! ```
//!
//! Identical tree + identical rules gives byte-identical text, so two
//! fragments can be checked for equivalence with a plain string compare
//! or an external line diff.

use crate::exclusion::ExclusionRuleSet;
use crate::tree::TreeView;

/// Normalizer configuration
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Indentation emitted once per depth level
    pub indent: String,
    /// Drop attributes whose value is the empty string
    pub drop_empty_values: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            drop_empty_values: true,
        }
    }
}

/// Deterministic, filtered serialization of one tree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CanonicalText(String);

impl CanonicalText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn line_count(&self) -> usize {
        self.0.lines().count()
    }
}

impl std::fmt::Display for CanonicalText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tree Normalizer
pub struct TreeNormalizer<'r> {
    rules: &'r ExclusionRuleSet,
    config: NormalizerConfig,
}

impl<'r> TreeNormalizer<'r> {
    pub fn new(rules: &'r ExclusionRuleSet) -> Self {
        Self::with_config(rules, NormalizerConfig::default())
    }

    pub fn with_config(rules: &'r ExclusionRuleSet, config: NormalizerConfig) -> Self {
        Self { rules, config }
    }

    /// Render the descendants of the view's root
    ///
    /// The root is the container whose inner markup was captured; it is not
    /// emitted itself. Traversal uses an explicit stack, so input depth is
    /// bounded by heap, not by the call stack.
    pub fn render<V: TreeView>(&self, view: &V) -> CanonicalText {
        let mut output = String::with_capacity(1024);
        let mut stack: Vec<(V::Node, usize)> = view
            .element_children(view.root())
            .into_iter()
            .rev()
            .map(|child| (child, 0))
            .collect();

        while let Some((node, depth)) = stack.pop() {
            self.render_line(view, node, depth, &mut output);

            // Push children in reverse order (so they're visited left-to-right)
            for child in view.element_children(node).into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        CanonicalText(output)
    }

    fn render_line<V: TreeView>(&self, view: &V, node: V::Node, depth: usize, output: &mut String) {
        let tag = view.tag_name(node);

        for _ in 0..depth {
            output.push_str(&self.config.indent);
        }
        output.push_str(&tag.to_ascii_lowercase());

        let attrs = self.rules.filter_sorted(tag, view.attributes(node));
        for (name, value) in attrs {
            if self.config.drop_empty_values && value.is_empty() {
                continue;
            }
            output.push(' ');
            output.push_str(name);
            output.push_str("=\"");
            output.push_str(value);
            output.push('"');
        }

        output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::DomArena;
    use crate::types::DomNode;

    fn sample_tree(reorder: bool) -> DomArena {
        let mut arena = DomArena::new();
        let body = arena.add_node(DomNode::element("BODY"));
        arena.set_root(body).unwrap();

        let ul = if reorder {
            DomNode::element("UL")
                .with_attr("id", "menu")
                .with_attr("class", "nav")
        } else {
            DomNode::element("UL")
                .with_attr("class", "nav")
                .with_attr("id", "menu")
        };
        let ul = arena.append_child(body, ul).unwrap();
        let li = arena.append_child(ul, DomNode::element("LI")).unwrap();
        arena.append_child(li, DomNode::text("first")).unwrap();
        arena
            .append_child(
                ul,
                DomNode::element("LI")
                    .with_attr("title", "")
                    .with_attr("data-id", "9"),
            )
            .unwrap();
        arena.append_child(body, DomNode::element("FOOTER")).unwrap();
        arena
    }

    #[test]
    fn test_render_shape() {
        let rules = ExclusionRuleSet::empty();
        let text = TreeNormalizer::new(&rules).render(&sample_tree(false));
        assert_eq!(
            text.as_str(),
            "ul class=\"nav\" id=\"menu\"\n  li\n  li\nfooter\n"
        );
        assert_eq!(text.line_count(), 4);
    }

    #[test]
    fn test_render_is_deterministic_and_order_insensitive() {
        let rules = ExclusionRuleSet::empty();
        let normalizer = TreeNormalizer::new(&rules);
        let tree = sample_tree(false);
        assert_eq!(normalizer.render(&tree), normalizer.render(&tree));
        assert_eq!(normalizer.render(&tree), normalizer.render(&sample_tree(true)));
    }

    #[test]
    fn test_render_applies_rules() {
        let rules = ExclusionRuleSet::build(Some("UL:id"), &["*:class:^na"]);
        let text = TreeNormalizer::new(&rules).render(&sample_tree(false));
        assert_eq!(text.as_str(), "ul\n  li\n  li\nfooter\n");
    }

    #[test]
    fn test_keep_empty_values_when_configured() {
        let rules = ExclusionRuleSet::empty();
        let config = NormalizerConfig {
            indent: "\t".to_string(),
            drop_empty_values: false,
        };
        let text = TreeNormalizer::with_config(&rules, config).render(&sample_tree(false));
        assert!(text.as_str().contains("\tli title=\"\"\n"));
    }

    #[test]
    fn test_empty_arena_renders_nothing() {
        let rules = ExclusionRuleSet::empty();
        let text = TreeNormalizer::new(&rules).render(&DomArena::new());
        assert_eq!(text.as_str(), "");
        assert_eq!(text.line_count(), 0);
    }

    #[test]
    fn test_deep_tree_does_not_overflow() {
        let mut arena = DomArena::new();
        let mut parent = arena.add_node(DomNode::element("body"));
        arena.set_root(parent).unwrap();
        for _ in 0..50_000 {
            parent = arena.append_child(parent, DomNode::element("div")).unwrap();
        }
        let rules = ExclusionRuleSet::empty();
        // No indent: keeps the output linear in depth.
        let config = NormalizerConfig {
            indent: String::new(),
            ..NormalizerConfig::default()
        };
        let text = TreeNormalizer::with_config(&rules, config).render(&arena);
        assert_eq!(text.line_count(), 50_000);
    }
}
