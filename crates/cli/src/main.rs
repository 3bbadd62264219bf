//! `procura <scenario.json>`: evaluate a procurement scenario and print the
//! resulting documents as JSON.

mod scenario;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use procura_observability::LogFormat;
use procura_procurement::EngineConfig;

use crate::scenario::Scenario;

#[derive(Debug, Parser)]
#[command(name = "procura")]
#[command(about = "Evaluate a procurement scenario and print the resulting documents")]
#[command(version)]
struct Cli {
    /// Scenario file (catalog, rates, request lines and steps)
    scenario: PathBuf,

    /// Log line format: json or pretty
    #[arg(long, default_value = "json")]
    log_format: LogFormat,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    procura_observability::init(cli.log_format);

    let raw = std::fs::read_to_string(&cli.scenario)
        .with_context(|| format!("cannot read {}", cli.scenario.display()))?;

    let config = EngineConfig::from_env()?;
    tracing::info!(path = %cli.scenario.display(), rounding = ?config.rounding, "evaluating scenario");

    let reports = Scenario::from_json(&raw)?.run(config)?;
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
