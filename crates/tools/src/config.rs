//! Config file loading and merging with CLI flags

use anyhow::{Context, Result};
use browser::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::Cli;

pub const DEFAULT_SELECTOR: &str = "body";

/// On-disk configuration (TOML)
///
/// ```toml
/// selector = "#app"
/// exclude_attrs = ["IMG:src", "A:href"]
/// exclude_regex = ["*:class:^js-"]
///
/// [browser]
/// cdp_url = "ws://127.0.0.1:9222/devtools/browser/abc"
/// network_idle_ms = 750
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub selector: Option<String>,
    pub exclude_attrs: Vec<String>,
    pub exclude_regex: Vec<String>,
    pub browser: Option<SessionConfig>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }
}

/// Effective settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub selector: String,
    /// Comma-separated `TAG:ATTR` list, file entries first
    pub exclude_attrs: Option<String>,
    pub exclude_regex: Vec<String>,
    pub session: SessionConfig,
}

impl Settings {
    /// CLI flags win for scalars; exclusion lists from both sources are combined
    pub fn resolve(cli: &Cli, file: FileConfig) -> Self {
        let selector = cli
            .selector
            .clone()
            .or(file.selector)
            .unwrap_or_else(|| DEFAULT_SELECTOR.to_string());

        let mut exact: Vec<String> = file.exclude_attrs;
        if let Some(spec) = &cli.exclude_attrs {
            exact.push(spec.clone());
        }
        let exclude_attrs = (!exact.is_empty()).then(|| exact.join(","));

        let mut exclude_regex = file.exclude_regex;
        exclude_regex.extend(cli.exclude_regex.iter().cloned());

        let mut session = file.browser.unwrap_or_default();
        if let Some(url) = &cli.cdp_url {
            session.cdp_url = url.clone();
        }
        if let Some(ms) = cli.network_idle_ms {
            session.network_idle_ms = ms;
        }
        if let Some(secs) = cli.timeout_secs {
            session.navigation_timeout_secs = secs;
        }

        Self {
            selector,
            exclude_attrs,
            exclude_regex,
            session,
        }
    }

    pub fn load(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(cli, file))
    }
}
