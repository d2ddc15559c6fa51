//! Structural Comparator - positional node-by-node comparison of two trees
//!
//! Children are aligned strictly by index among element siblings. When two
//! nodes have different element child counts, one `ChildCountMismatch` is
//! recorded for that node and none of its children are compared. Any other
//! mismatch (tag, attribute count, attribute value) does not stop descent:
//! the subtree below is still compared so every divergence gets reported.
//!
//! The walk uses an explicit stack and emits divergences in document order.

use crate::exclusion::ExclusionRuleSet;
use crate::tree::TreeView;
use crate::types::{
    AttrPair, ComparisonOutcome, ComparisonPath, Divergence, DivergenceKind, PathSegment,
};

/// Parent-linked path storage; a full path is only built for a divergence
struct PathTable {
    entries: Vec<(Option<usize>, PathSegment)>,
}

impl PathTable {
    fn push(&mut self, parent: Option<usize>, tag: &str, nth_child: usize) -> usize {
        self.entries.push((
            parent,
            PathSegment {
                tag: tag.to_ascii_lowercase(),
                nth_child,
            },
        ));
        self.entries.len() - 1
    }

    fn materialize(&self, root: &ComparisonPath, at: Option<usize>) -> ComparisonPath {
        let mut chain = Vec::new();
        let mut cursor = at;
        while let Some(idx) = cursor {
            let (parent, segment) = &self.entries[idx];
            chain.push(segment);
            cursor = *parent;
        }
        chain
            .into_iter()
            .rev()
            .fold(root.clone(), |path, seg| path.child(&seg.tag, seg.nth_child))
    }
}

struct Frame<NA, NB> {
    a: NA,
    b: NB,
    /// `None` for the comparison root
    path: Option<usize>,
}

/// Structural Comparator
pub struct StructuralComparator<'r> {
    rules: &'r ExclusionRuleSet,
}

impl<'r> StructuralComparator<'r> {
    pub fn new(rules: &'r ExclusionRuleSet) -> Self {
        Self { rules }
    }

    /// Compare the subtrees below the two roots
    ///
    /// `root_label` is only used as the first element of reported paths
    /// (typically the CSS selector that produced the fragments).
    pub fn compare<A: TreeView, B: TreeView>(
        &self,
        a: &A,
        b: &B,
        root_label: &str,
    ) -> ComparisonOutcome {
        let root_path = ComparisonPath::root(root_label);
        let mut paths = PathTable {
            entries: Vec::with_capacity(256),
        };
        let mut divergences = Vec::new();
        let mut stack = vec![Frame {
            a: a.root(),
            b: b.root(),
            path: None,
        }];

        while let Some(frame) = stack.pop() {
            // The root is a container; only its descendants are compared.
            if frame.path.is_some() {
                self.compare_node(
                    a,
                    frame.a,
                    b,
                    frame.b,
                    || paths.materialize(&root_path, frame.path),
                    &mut divergences,
                );
            }

            let children_a = a.element_children(frame.a);
            let children_b = b.element_children(frame.b);

            if children_a.len() != children_b.len() {
                divergences.push(Divergence {
                    path: paths.materialize(&root_path, frame.path),
                    kind: DivergenceKind::ChildCountMismatch {
                        count_a: children_a.len(),
                        count_b: children_b.len(),
                    },
                });
                continue;
            }

            let base = stack.len();
            for (i, (child_a, child_b)) in children_a.into_iter().zip(children_b).enumerate() {
                let path = paths.push(frame.path, a.tag_name(child_a), i + 1);
                stack.push(Frame {
                    a: child_a,
                    b: child_b,
                    path: Some(path),
                });
            }
            // Pop order must be document order
            stack[base..].reverse();
        }

        if !divergences.is_empty() {
            tracing::debug!(count = divergences.len(), "structural divergences found");
        }
        ComparisonOutcome::from_divergences(divergences)
    }

    fn compare_node<A: TreeView, B: TreeView>(
        &self,
        a: &A,
        node_a: A::Node,
        b: &B,
        node_b: B::Node,
        path: impl Fn() -> ComparisonPath,
        out: &mut Vec<Divergence>,
    ) {
        let tag_a = a.tag_name(node_a);
        let tag_b = b.tag_name(node_b);

        if !tag_a.eq_ignore_ascii_case(tag_b) {
            out.push(Divergence {
                path: path(),
                kind: DivergenceKind::TagMismatch {
                    tag_a: tag_a.to_ascii_lowercase(),
                    tag_b: tag_b.to_ascii_lowercase(),
                },
            });
        }

        // Each side is filtered under its own tag.
        let attrs_a = self.rules.filter_sorted(tag_a, a.attributes(node_a));
        let attrs_b = self.rules.filter_sorted(tag_b, b.attributes(node_b));

        if attrs_a.len() != attrs_b.len() {
            out.push(Divergence {
                path: path(),
                kind: DivergenceKind::AttributeCountMismatch {
                    count_a: attrs_a.len(),
                    count_b: attrs_b.len(),
                },
            });
            return;
        }

        for (&(name_a, value_a), &(name_b, value_b)) in attrs_a.iter().zip(&attrs_b) {
            if name_a != name_b || value_a != value_b {
                out.push(Divergence {
                    path: path(),
                    kind: DivergenceKind::AttributeValueMismatch {
                        attr_a: AttrPair {
                            name: name_a.to_string(),
                            value: value_a.to_string(),
                        },
                        attr_b: AttrPair {
                            name: name_b.to_string(),
                            value: value_b.to_string(),
                        },
                    },
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::DomArena;
    use crate::types::{DomNode, NodeId};

    fn body() -> (DomArena, NodeId) {
        let mut arena = DomArena::new();
        let root = arena.add_node(DomNode::element("BODY"));
        arena.set_root(root).unwrap();
        (arena, root)
    }

    fn kinds(outcome: &ComparisonOutcome) -> Vec<(String, &DivergenceKind)> {
        outcome
            .divergences
            .iter()
            .map(|d| (d.path.to_string(), &d.kind))
            .collect()
    }

    #[test]
    fn test_identical_trees() {
        let (mut a, ra) = body();
        let (mut b, rb) = body();
        let ul = a.append_child(ra, DomNode::element("UL").with_attr("class", "x")).unwrap();
        a.append_child(ul, DomNode::element("LI")).unwrap();
        let ul = b.append_child(rb, DomNode::element("ul").with_attr("class", "x")).unwrap();
        b.append_child(ul, DomNode::element("li")).unwrap();

        let rules = ExclusionRuleSet::empty();
        let outcome = StructuralComparator::new(&rules).compare(&a, &b, "body");
        assert!(outcome.identical);
        assert!(outcome.divergences.is_empty());
    }

    #[test]
    fn test_child_count_short_circuit() {
        let (mut a, ra) = body();
        let (mut b, rb) = body();
        let div_a = a.append_child(ra, DomNode::element("div")).unwrap();
        let div_b = b.append_child(rb, DomNode::element("div")).unwrap();
        let list_a = a.append_child(div_a, DomNode::element("ol")).unwrap();
        let list_b = b.append_child(div_b, DomNode::element("ol")).unwrap();
        for i in 0..2 {
            a.append_child(list_a, DomNode::element("li").with_attr("id", format!("a{i}")))
                .unwrap();
        }
        for i in 0..3 {
            b.append_child(list_b, DomNode::element("li").with_attr("id", format!("b{i}")))
                .unwrap();
        }

        let rules = ExclusionRuleSet::empty();
        let outcome = StructuralComparator::new(&rules).compare(&a, &b, "body");
        assert!(!outcome.identical);
        assert_eq!(
            kinds(&outcome),
            vec![(
                "body > div:nth-child(1) > ol:nth-child(1)".to_string(),
                &DivergenceKind::ChildCountMismatch { count_a: 2, count_b: 3 }
            )]
        );
    }

    #[test]
    fn test_root_child_count_mismatch_uses_root_label() {
        let (mut a, ra) = body();
        let (b, _) = body();
        a.append_child(ra, DomNode::element("p")).unwrap();

        let rules = ExclusionRuleSet::empty();
        let outcome = StructuralComparator::new(&rules).compare(&a, &b, "#app");
        assert_eq!(outcome.divergences.len(), 1);
        assert_eq!(outcome.divergences[0].path.to_string(), "#app");
    }

    #[test]
    fn test_tag_mismatch_keeps_descending() {
        let (mut a, ra) = body();
        let (mut b, rb) = body();
        let x = a.append_child(ra, DomNode::element("section")).unwrap();
        let y = b.append_child(rb, DomNode::element("article")).unwrap();
        a.append_child(x, DomNode::element("img").with_attr("src", "1.png")).unwrap();
        b.append_child(y, DomNode::element("img").with_attr("src", "2.png")).unwrap();

        let rules = ExclusionRuleSet::empty();
        let outcome = StructuralComparator::new(&rules).compare(&a, &b, "body");
        let found = kinds(&outcome);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, "body > section:nth-child(1)");
        assert!(matches!(
            found[0].1,
            DivergenceKind::TagMismatch { tag_a, tag_b } if tag_a == "section" && tag_b == "article"
        ));
        assert_eq!(found[1].0, "body > section:nth-child(1) > img:nth-child(1)");
        assert!(matches!(found[1].1, DivergenceKind::AttributeValueMismatch { .. }));
    }

    #[test]
    fn test_attribute_count_and_value() {
        let (mut a, ra) = body();
        let (mut b, rb) = body();
        a.append_child(ra, DomNode::element("a").with_attr("href", "/x")).unwrap();
        let link = DomNode::element("a").with_attr("href", "/x").with_attr("rel", "nofollow");
        b.append_child(rb, link).unwrap();
        let input_a = DomNode::element("input").with_attr("type", "text").with_attr("name", "q");
        let input_b = DomNode::element("input").with_attr("type", "search").with_attr("name", "q");
        a.append_child(ra, input_a).unwrap();
        b.append_child(rb, input_b).unwrap();

        let rules = ExclusionRuleSet::empty();
        let outcome = StructuralComparator::new(&rules).compare(&a, &b, "body");
        assert_eq!(
            kinds(&outcome),
            vec![
                (
                    "body > a:nth-child(1)".to_string(),
                    &DivergenceKind::AttributeCountMismatch { count_a: 1, count_b: 2 }
                ),
                (
                    "body > input:nth-child(2)".to_string(),
                    &DivergenceKind::AttributeValueMismatch {
                        attr_a: AttrPair { name: "type".into(), value: "text".into() },
                        attr_b: AttrPair { name: "type".into(), value: "search".into() },
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_sibling_index_counts_elements_only() {
        let (mut a, ra) = body();
        let (mut b, rb) = body();
        a.append_child(ra, DomNode::text("lead")).unwrap();
        a.append_child(ra, DomNode::element("p")).unwrap();
        a.append_child(ra, DomNode::element("p").with_attr("class", "x")).unwrap();
        b.append_child(rb, DomNode::element("p")).unwrap();
        b.append_child(rb, DomNode::text("gap")).unwrap();
        b.append_child(rb, DomNode::element("p").with_attr("class", "y")).unwrap();

        let rules = ExclusionRuleSet::empty();
        let outcome = StructuralComparator::new(&rules).compare(&a, &b, "body");
        assert_eq!(outcome.divergences.len(), 1);
        assert_eq!(outcome.divergences[0].path.to_string(), "body > p:nth-child(2)");
    }

    #[test]
    fn test_empty_arenas_are_identical() {
        let rules = ExclusionRuleSet::empty();
        let comparator = StructuralComparator::new(&rules);
        let outcome = comparator.compare(&DomArena::new(), &DomArena::new(), "body");
        assert!(outcome.identical);

        let (mut a, ra) = body();
        a.append_child(ra, DomNode::element("p")).unwrap();
        let outcome = comparator.compare(&a, &DomArena::new(), "body");
        assert_eq!(
            kinds(&outcome),
            vec![(
                "body".to_string(),
                &DivergenceKind::ChildCountMismatch { count_a: 1, count_b: 0 }
            )]
        );
    }

    #[test]
    fn test_tag_mismatch_filters_each_side_under_its_own_tag() {
        let (mut a, ra) = body();
        let (mut b, rb) = body();
        a.append_child(ra, DomNode::element("img").with_attr("src", "/a.png")).unwrap();
        b.append_child(rb, DomNode::element("video").with_attr("src", "/b.mp4")).unwrap();

        // The rule names IMG only, so B's src survives under VIDEO.
        let rules = ExclusionRuleSet::build(Some("IMG:src"), &[] as &[&str]);
        let outcome = StructuralComparator::new(&rules).compare(&a, &b, "body");
        assert_eq!(
            kinds(&outcome),
            vec![
                (
                    "body > img:nth-child(1)".to_string(),
                    &DivergenceKind::TagMismatch { tag_a: "img".into(), tag_b: "video".into() }
                ),
                (
                    "body > img:nth-child(1)".to_string(),
                    &DivergenceKind::AttributeCountMismatch { count_a: 0, count_b: 1 }
                ),
            ]
        );
    }

    #[test]
    fn test_deep_identical_trees() {
        let build = || {
            let (mut arena, mut parent) = body();
            for _ in 0..20_000 {
                parent = arena.append_child(parent, DomNode::element("div")).unwrap();
            }
            arena
        };
        let rules = ExclusionRuleSet::empty();
        let outcome = StructuralComparator::new(&rules).compare(&build(), &build(), "body");
        assert!(outcome.identical);
    }
}
