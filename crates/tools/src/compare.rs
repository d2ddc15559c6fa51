//! One comparison run: obtain both fragments, parse, report

use anyhow::{Context, Result};
use browser::{fetch_pair, BrowserSession};
use dom::{
    parse_fragment, CanonicalDumpReporter, DiffReporter, DomArena, ExclusionRuleSet, Fragments,
    InlineReporter, JsonReporter,
};
use std::io::Write;

use crate::cli::{Cli, OutputFormat};
use crate::config::Settings;

/// Returns `true` when the fragments are structurally identical
pub async fn run(cli: &Cli, settings: &Settings, out: &mut dyn Write) -> Result<bool> {
    let rules = ExclusionRuleSet::build(settings.exclude_attrs.as_deref(), &settings.exclude_regex);
    tracing::debug!(
        rules = rules.rule_count(),
        selector = %settings.selector,
        "exclusion rules ready"
    );

    if cli.dump.is_none() && cli.format == OutputFormat::Text {
        writeln!(
            out,
            "Comparing HTML structure inside selector \"{}\" of:\n- {}\n- {}",
            settings.selector, cli.a, cli.b
        )?;
        if let Some(exact) = &settings.exclude_attrs {
            writeln!(out, "Excluding attributes: {exact}")?;
        }
        if !settings.exclude_regex.is_empty() {
            writeln!(
                out,
                "Excluding attributes matching: {}",
                settings.exclude_regex.join(", ")
            )?;
        }
    }

    let (html_a, html_b) = if cli.local {
        read_local(&cli.a, &cli.b)?
    } else {
        render_remote(cli, settings).await?
    };

    let a = parse_fragment(&html_a);
    let b = parse_fragment(&html_b);
    tracing::debug!(
        elements_a = a.element_count(),
        elements_b = b.element_count(),
        "fragments parsed"
    );

    let fragments = Fragments {
        a: &a,
        b: &b,
        label: &settings.selector,
    };

    let mut reporter: Box<dyn DiffReporter<DomArena> + '_> = match (&cli.dump, cli.format) {
        (Some(prefix), _) => Box::new(CanonicalDumpReporter::new(prefix, &mut *out)),
        (None, OutputFormat::Json) => Box::new(JsonReporter::new(&mut *out)),
        (None, OutputFormat::Text) => Box::new(InlineReporter::new(&mut *out)),
    };
    Ok(reporter.report(&fragments, &rules)?)
}

fn read_local(path_a: &str, path_b: &str) -> Result<(String, String)> {
    let a = std::fs::read_to_string(path_a).with_context(|| format!("failed to read {path_a}"))?;
    let b = std::fs::read_to_string(path_b).with_context(|| format!("failed to read {path_b}"))?;
    Ok((a, b))
}

async fn render_remote(cli: &Cli, settings: &Settings) -> Result<(String, String)> {
    let session = BrowserSession::new(settings.session.clone());
    session
        .start()
        .await
        .with_context(|| format!("failed to connect to browser at {}", settings.session.cdp_url))?;

    let fetched = fetch_pair(&session, &cli.a, &cli.b, &settings.selector).await;

    if let Err(e) = session.stop().await {
        tracing::warn!("Failed to stop browser session: {}", e);
    }
    Ok(fetched?)
}
