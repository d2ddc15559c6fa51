//! Diff reporting
//!
//! Every reporter drives the same core (comparator or normalizer) with the
//! same rule set, then renders the result for an operator:
//! - [`InlineReporter`]: one line per divergence plus a verdict line
//! - [`JsonReporter`]: the same outcome as a JSON document
//! - [`CanonicalDumpReporter`]: canonical text of each side written to
//!   `{prefix}_a` / `{prefix}_b`, verdict is whole-text equality

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::comparator::StructuralComparator;
use crate::error::Result;
use crate::exclusion::ExclusionRuleSet;
use crate::normalizer::{NormalizerConfig, TreeNormalizer};
use crate::tree::TreeView;
use crate::types::{ComparisonOutcome, Divergence, DivergenceKind};

/// The two parsed fragments plus the label used as path root
pub struct Fragments<'a, V: TreeView> {
    pub a: &'a V,
    pub b: &'a V,
    pub label: &'a str,
}

/// Pluggable output strategy. Returns `true` when the fragments match.
pub trait DiffReporter<V: TreeView> {
    fn report(&mut self, fragments: &Fragments<'_, V>, rules: &ExclusionRuleSet) -> Result<bool>;
}

/// Human-readable line for one divergence
pub fn describe(divergence: &Divergence) -> String {
    let path = &divergence.path;
    match &divergence.kind {
        DivergenceKind::ChildCountMismatch { count_a, count_b } => format!(
            "Different number of child elements at \"{path}\": A has {count_a}, B has {count_b}"
        ),
        DivergenceKind::TagMismatch { tag_a, tag_b } => {
            format!("Different tag names at \"{path}\": A <{tag_a}>, B <{tag_b}>")
        }
        DivergenceKind::AttributeCountMismatch { count_a, count_b } => format!(
            "Different number of attributes at \"{path}\": A has {count_a}, B has {count_b}"
        ),
        DivergenceKind::AttributeValueMismatch { attr_a, attr_b } => {
            format!("Different attributes at \"{path}\": A {attr_a}, B {attr_b}")
        }
    }
}

/// Inline verdict: divergence lines then one pass/fail line
pub struct InlineReporter<W: Write> {
    out: W,
}

impl<W: Write> InlineReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn write_outcome(&mut self, outcome: &ComparisonOutcome, label: &str) -> Result<()> {
        for divergence in &outcome.divergences {
            writeln!(self.out, "✗ {}", describe(divergence))?;
        }
        if outcome.identical {
            writeln!(
                self.out,
                "✓ The HTML structure inside \"{label}\" is identical (with specified exclusions)."
            )?;
        } else {
            writeln!(
                self.out,
                "Comparison finished: {} structural difference(s) found inside \"{label}\".",
                outcome.divergences.len()
            )?;
        }
        Ok(())
    }
}

impl<V: TreeView, W: Write> DiffReporter<V> for InlineReporter<W> {
    fn report(&mut self, fragments: &Fragments<'_, V>, rules: &ExclusionRuleSet) -> Result<bool> {
        let outcome =
            StructuralComparator::new(rules).compare(fragments.a, fragments.b, fragments.label);
        self.write_outcome(&outcome, fragments.label)?;
        Ok(outcome.identical)
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    selector: &'a str,
    #[serde(flatten)]
    outcome: &'a ComparisonOutcome,
}

/// Machine-readable outcome for automation
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<V: TreeView, W: Write> DiffReporter<V> for JsonReporter<W> {
    fn report(&mut self, fragments: &Fragments<'_, V>, rules: &ExclusionRuleSet) -> Result<bool> {
        let outcome =
            StructuralComparator::new(rules).compare(fragments.a, fragments.b, fragments.label);
        serde_json::to_writer_pretty(
            &mut self.out,
            &JsonReport {
                selector: fragments.label,
                outcome: &outcome,
            },
        )?;
        writeln!(self.out)?;
        Ok(outcome.identical)
    }
}

/// Where the canonical dumps went
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpArtifacts {
    pub path_a: PathBuf,
    pub path_b: PathBuf,
}

impl DumpArtifacts {
    /// `{prefix}_a` and `{prefix}_b`
    pub fn for_prefix(prefix: &Path) -> Self {
        let suffixed = |suffix: &str| {
            let mut name = OsString::from(prefix.as_os_str());
            name.push(suffix);
            PathBuf::from(name)
        };
        Self {
            path_a: suffixed("_a"),
            path_b: suffixed("_b"),
        }
    }
}

/// Canonical dump: write both texts, leave the line diff to external tools
pub struct CanonicalDumpReporter<W: Write> {
    artifacts: DumpArtifacts,
    config: NormalizerConfig,
    out: W,
}

impl<W: Write> CanonicalDumpReporter<W> {
    pub fn new(prefix: impl AsRef<Path>, out: W) -> Self {
        Self {
            artifacts: DumpArtifacts::for_prefix(prefix.as_ref()),
            config: NormalizerConfig::default(),
            out,
        }
    }

    pub fn with_config(mut self, config: NormalizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn artifacts(&self) -> &DumpArtifacts {
        &self.artifacts
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<V: TreeView, W: Write> DiffReporter<V> for CanonicalDumpReporter<W> {
    fn report(&mut self, fragments: &Fragments<'_, V>, rules: &ExclusionRuleSet) -> Result<bool> {
        let normalizer = TreeNormalizer::with_config(rules, self.config.clone());
        let text_a = normalizer.render(fragments.a);
        let text_b = normalizer.render(fragments.b);

        std::fs::write(&self.artifacts.path_a, text_a.as_str())?;
        std::fs::write(&self.artifacts.path_b, text_b.as_str())?;
        tracing::debug!(
            path_a = %self.artifacts.path_a.display(),
            path_b = %self.artifacts.path_b.display(),
            lines_a = text_a.line_count(),
            lines_b = text_b.line_count(),
            "canonical dumps written"
        );

        let (a, b) = (self.artifacts.path_a.display(), self.artifacts.path_b.display());
        writeln!(self.out, "Canonical dumps of \"{}\" written to {a} and {b}", fragments.label)?;

        let identical = text_a == text_b;
        if identical {
            writeln!(self.out, "✓ Canonical dumps are identical (with specified exclusions).")?;
        } else {
            writeln!(self.out, "Canonical dumps differ. Inspect with: diff -u {a} {b}")?;
        }
        Ok(identical)
    }
}
