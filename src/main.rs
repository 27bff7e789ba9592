use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ical_events_cli::cli::Cli;
use ical_events_cli::config::Config;
use ical_events_cli::normalize::Normalizer;
use ical_events_cli::{output, query};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout is reserved for the rendered output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings()?;

    let normalizer = Normalizer::from_system()?;
    let (config, criteria) = Config::validate(settings, &normalizer)?;

    let events = query::run_query(&config, &criteria, &normalizer).await?;

    let rendered = output::render(&config, &events)?;
    output::write_output(&config.output, &rendered)?;

    Ok(())
}
