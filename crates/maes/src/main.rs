use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use maes::models::config::SimConfig;
use maes::{Runner, Span};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "maes",
    about = "Multi-Agent ETF Simulator - synthetic customer behavior driving a portfolio feedback loop"
)]
struct Cli {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Number of ticks to run
    #[arg(short, long, conflicts_with = "span")]
    ticks: Option<u64>,

    /// Run for a calendar span instead of a tick count
    #[arg(long, value_enum)]
    span: Option<Span>,

    /// Seed for a reproducible run (overrides population.seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Keep ticking on an interval, printing one JSON report per tick
    #[arg(long)]
    follow: bool,

    /// Delay between ticks in follow mode
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,

    /// Print the latest critique text to stderr when the run ends
    #[arg(long)]
    critique: bool,
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let config_str = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {path}"))?;
            toml::from_str::<SimConfig>(&config_str).with_context(|| "Failed to parse config")?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.population.seed = Some(seed);
    }

    let mut session = maes::build_session(&config).context("Failed to build session")?;
    let ticks = match (cli.ticks, cli.span) {
        (Some(ticks), _) => Some(ticks),
        (None, Some(span)) => Some(span.ticks(config.session.tick_minutes)),
        (None, None) => None,
    };

    if cli.follow {
        let runner = Runner::new(session, Duration::from_millis(cli.interval_ms));
        let cancel = runner.cancel_token();

        // Handle shutdown signals
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal");
            cancel.cancel();
        });

        let mut print_error = None;
        session = runner
            .run(ticks, |report| match to_json(report, cli.pretty) {
                Ok(line) => println!("{line}"),
                Err(e) => {
                    print_error.get_or_insert(e);
                }
            })
            .await
            .map_err(|e| anyhow::anyhow!("Run failed: {e}"))?;
        if let Some(e) = print_error {
            return Err(e.context("Failed to serialize tick report"));
        }
    } else {
        session
            .run(ticks.unwrap_or(1))
            .map_err(|e| anyhow::anyhow!("Run failed: {e}"))?;
        println!("{}", to_json(&session.summary(), cli.pretty)?);
    }

    if cli.critique {
        if let Some(critique) = session.latest_critique() {
            eprintln!("{}", critique.text);
        }
    }

    Ok(())
}
