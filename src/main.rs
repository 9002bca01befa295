use anyhow::{anyhow, Context, Result};
use clap::Parser;
use lapmetrics::{analyze_session, data, AnalyticsConfig, SessionKind};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Compute session analytics from a lap CSV and print them as JSON.
#[derive(Parser, Debug)]
#[command(name = "lapmetrics", version, about)]
struct Cli {
    /// Lap CSV with a header row (driver_id, lap_number, lap_time_ms, ...)
    laps: PathBuf,

    /// Pit stop CSV (driver_id, stop, lap, duration, time)
    #[arg(long)]
    pits: Option<PathBuf>,

    /// Session code: FP1/FP2/FP3, Q, SQ, S, R or T
    #[arg(long, default_value = "R")]
    session: String,

    /// JSON file overriding analyzer thresholds
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the report.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let kind: SessionKind = cli.session.parse().map_err(|e: String| anyhow!(e))?;

    let config = match &cli.config {
        Some(path) => AnalyticsConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalyticsConfig::default(),
    };

    let laps = data::load_laps(&cli.laps)
        .with_context(|| format!("failed to read laps from {}", cli.laps.display()))?;
    if laps.is_empty() {
        tracing::warn!("no laps found in {}", cli.laps.display());
    }

    let pit_stops = match &cli.pits {
        Some(path) => data::load_pit_stops(path)
            .with_context(|| format!("failed to read pit stops from {}", path.display()))?,
        None => Vec::new(),
    };
    tracing::info!(laps = laps.len(), pit_stops = pit_stops.len(), session = %kind, "loaded session data");

    let report = analyze_session(&laps, &pit_stops, kind, &config);

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("failed to serialize report")?;
    println!("{json}");
    Ok(())
}
