//! DOM Structure Comparison Library
//!
//! Checks that two rendered HTML fragments share the same element structure:
//! same tags, same child ordering, same surviving attributes, while ignoring
//! attributes the operator declares irrelevant.
//!
//! ## Core Design
//!
//! ```text
//! HTML text → DomService → DomArena (TreeView) ─┬→ StructuralComparator → ComparisonOutcome
//!                                              └→ TreeNormalizer       → CanonicalText
//!                    ExclusionRuleSet (shared, immutable) ↗
//! ```
//!
//! Reporters in [`report`] pick one of the two paths and render the result.

pub mod arena;
pub mod comparator;
pub mod error;
pub mod exclusion;
pub mod normalizer;
pub mod report;
pub mod service;
pub mod tree;
pub mod types;

pub use arena::DomArena;
pub use comparator::StructuralComparator;
pub use error::{DomError, Result};
pub use exclusion::{ConfigWarning, ExclusionRuleSet};
pub use normalizer::{CanonicalText, NormalizerConfig, TreeNormalizer};
pub use report::{CanonicalDumpReporter, DiffReporter, Fragments, InlineReporter, JsonReporter};
pub use service::{parse_fragment, DomService};
pub use tree::TreeView;
pub use types::*;

/// Parse both fragments and compare them structurally
pub fn compare_fragments(
    html_a: &str,
    html_b: &str,
    root_label: &str,
    rules: &ExclusionRuleSet,
) -> ComparisonOutcome {
    let a = parse_fragment(html_a);
    let b = parse_fragment(html_b);
    StructuralComparator::new(rules).compare(&a, &b, root_label)
}

/// Parse a fragment and render its canonical text
pub fn normalize_fragment(html: &str, rules: &ExclusionRuleSet) -> CanonicalText {
    TreeNormalizer::new(rules).render(&parse_fragment(html))
}
