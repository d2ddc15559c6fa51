//! Attribute exclusion rules
//!
//! Built once from operator configuration, then queried as a pure predicate
//! over `(tag, attribute name, attribute value)`. Nothing here ever fails:
//! bad entries are dropped and reported as [`ConfigWarning`]s.
//!
//! Two kinds of rule:
//! - exact: `TAG:ATTR` pairs, comma separated (`IMG:src,A:href`)
//! - regex: `TAG:ATTR:PATTERN`, tag may be `*` (`*:href:^/temp/`)
//!
//! `data-*` and `aria-*` attributes are always excluded.

use ahash::{AHashMap, AHashSet};
use regex::Regex;
use thiserror::Error;

/// Prefixes that are never compared or serialized
pub const IMPLICIT_EXCLUDED_PREFIXES: &[&str] = &["data-", "aria-"];

/// A dropped configuration entry. Never fatal.
#[derive(Debug, Error)]
pub enum ConfigWarning {
    #[error("malformed exclusion pair {0:?}: expected TAG:ATTR")]
    MalformedPair(String),

    #[error("malformed regex rule {0:?}: expected TAG:ATTR:PATTERN")]
    MalformedRegexRule(String),

    #[error("invalid pattern in regex rule {rule:?}: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

/// Which tags a regex rule applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagMatcher {
    Any,
    /// Uppercased tag name
    Exact(String),
}

impl TagMatcher {
    fn parse(raw: &str) -> Self {
        if raw == "*" {
            TagMatcher::Any
        } else {
            TagMatcher::Exact(raw.to_ascii_uppercase())
        }
    }

    fn matches(&self, tag_upper: &str) -> bool {
        match self {
            TagMatcher::Any => true,
            TagMatcher::Exact(tag) => tag == tag_upper,
        }
    }
}

/// An attribute is excluded by this rule when its name matches and its own
/// value matches the pattern. Each side of a comparison is tested alone.
#[derive(Debug, Clone)]
pub struct RegexExclusionRule {
    pub tag: TagMatcher,
    pub attr: String,
    pub pattern: Regex,
}

/// Immutable, compiled exclusion configuration
#[derive(Debug, Clone, Default)]
pub struct ExclusionRuleSet {
    /// Uppercased tag -> attribute names excluded regardless of value
    exact: AHashMap<String, AHashSet<String>>,
    regex: Vec<RegexExclusionRule>,
}

impl ExclusionRuleSet {
    /// Rule set with only the implicit `data-*`/`aria-*` suppression
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile configuration, logging and dropping bad entries
    pub fn build<S: AsRef<str>>(exact_spec: Option<&str>, regex_specs: &[S]) -> Self {
        let (rules, warnings) = Self::build_with_warnings(exact_spec, regex_specs);
        for warning in &warnings {
            match warning {
                ConfigWarning::MalformedPair(_) => tracing::debug!("Ignoring {}", warning),
                _ => tracing::warn!("Ignoring {}", warning),
            }
        }
        rules
    }

    /// Same as [`build`](Self::build) but hands the dropped entries back
    pub fn build_with_warnings<S: AsRef<str>>(
        exact_spec: Option<&str>,
        regex_specs: &[S],
    ) -> (Self, Vec<ConfigWarning>) {
        let mut rules = Self::default();
        let mut warnings = Vec::new();

        for pair in exact_spec.into_iter().flat_map(|s| s.split(',')) {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            match pair.split_once(':') {
                Some((tag, attr)) if !tag.trim().is_empty() && !attr.trim().is_empty() => {
                    rules
                        .exact
                        .entry(tag.trim().to_ascii_uppercase())
                        .or_default()
                        .insert(attr.trim().to_string());
                }
                _ => warnings.push(ConfigWarning::MalformedPair(pair.to_string())),
            }
        }

        for spec in regex_specs {
            let spec = spec.as_ref();
            // At most three parts: the pattern itself may contain ':'
            let mut parts = spec.splitn(3, ':');
            let (Some(tag), Some(attr), Some(pattern)) = (parts.next(), parts.next(), parts.next())
            else {
                warnings.push(ConfigWarning::MalformedRegexRule(spec.to_string()));
                continue;
            };
            if tag.is_empty() || attr.is_empty() {
                warnings.push(ConfigWarning::MalformedRegexRule(spec.to_string()));
                continue;
            }
            match Regex::new(pattern) {
                Ok(pattern) => rules.regex.push(RegexExclusionRule {
                    tag: TagMatcher::parse(tag),
                    attr: attr.to_string(),
                    pattern,
                }),
                Err(source) => warnings.push(ConfigWarning::InvalidPattern {
                    rule: spec.to_string(),
                    source,
                }),
            }
        }

        (rules, warnings)
    }

    /// Should this attribute be ignored on an element with tag `tag`?
    pub fn is_excluded(&self, tag: &str, attr_name: &str, attr_value: &str) -> bool {
        if IMPLICIT_EXCLUDED_PREFIXES
            .iter()
            .any(|prefix| attr_name.starts_with(prefix))
        {
            return true;
        }

        let tag_upper = tag.to_ascii_uppercase();
        if self
            .exact
            .get(&tag_upper)
            .is_some_and(|attrs| attrs.contains(attr_name))
        {
            return true;
        }

        self.regex.iter().any(|rule| {
            rule.attr == attr_name
                && rule.tag.matches(&tag_upper)
                && rule.pattern.is_match(attr_value)
        })
    }

    /// Surviving attributes of one element, sorted ascending by name
    pub fn filter_sorted<'a>(
        &self,
        tag: &str,
        attrs: Vec<(&'a str, &'a str)>,
    ) -> Vec<(&'a str, &'a str)> {
        let mut kept: Vec<_> = attrs
            .into_iter()
            .filter(|(name, value)| !self.is_excluded(tag, name, value))
            .collect();
        kept.sort_unstable_by(|a, b| a.0.cmp(b.0));
        kept
    }

    /// Number of explicit rules (exact pairs + regex rules)
    pub fn rule_count(&self) -> usize {
        self.exact.values().map(|attrs| attrs.len()).sum::<usize>() + self.regex.len()
    }

    pub fn regex_rules(&self) -> &[RegexExclusionRule] {
        &self.regex
    }
}
