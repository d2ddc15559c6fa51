//! Command-line arguments

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the inline verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per divergence plus a verdict line
    Text,
    /// Machine-readable report
    Json,
}

/// Compare the DOM structure inside a selector on two pages
#[derive(Debug, Parser)]
#[command(name = "compare-html")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// First page (URL, or file path with --local)
    pub a: String,

    /// Second page (URL, or file path with --local)
    pub b: String,

    /// CSS selector of the element whose inner markup is compared [default: body]
    #[arg(short, long)]
    pub selector: Option<String>,

    /// Attributes to ignore per tag, e.g. "IMG:src,A:href"
    #[arg(short = 'e', long = "exclude-attrs", value_name = "TAG:ATTR[,TAG:ATTR...]")]
    pub exclude_attrs: Option<String>,

    /// Ignore an attribute when its value matches PATTERN; TAG may be "*"
    #[arg(short = 'r', long = "exclude-regex", value_name = "TAG:ATTR:PATTERN")]
    pub exclude_regex: Vec<String>,

    /// Write canonical dumps to PREFIX_a / PREFIX_b instead of an inline diff
    #[arg(long, value_name = "PREFIX", conflicts_with = "format")]
    pub dump: Option<PathBuf>,

    /// Inline report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Treat A and B as files holding fragment markup
    #[arg(long)]
    pub local: bool,

    /// TOML file with exclusion rules and browser settings
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// DevTools WebSocket URL of a running Chrome
    #[arg(long, env = "CDP_URL")]
    pub cdp_url: Option<String>,

    /// Quiet period before a page counts as settled
    #[arg(long, value_name = "MS")]
    pub network_idle_ms: Option<u64>,

    /// Per-page navigation timeout
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
