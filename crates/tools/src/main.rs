//! compare-html - structural comparison of two rendered pages
//!
//! Exit status: 0 when identical, 1 when divergences were found, 2 when the
//! comparison could not run (unreachable page, missing selector, bad config).

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod compare;
mod config;

use browser::RenderError;
use cli::Cli;
use config::Settings;

const EXIT_DIVERGENT: u8 = 1;
const EXIT_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let outcome = match Settings::load(&cli) {
        Ok(settings) => compare::run(&cli, &settings, &mut std::io::stdout().lock()).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_DIVERGENT),
        Err(e) => {
            match e.downcast_ref::<RenderError>() {
                Some(RenderError::SelectorNotFound { url, selector }) => eprintln!(
                    "Error: The selector \"{selector}\" was not found on {url}. \
                     Check the selector or wait conditions."
                ),
                _ => eprintln!("Error: {e:#}"),
            }
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
