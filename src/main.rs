//! fieldlink - Field Node Telemetry Ingestion
//!
//! Listens to field nodes on a shared serial link, logs every reading and
//! answers over-temperature nodes with `ALARM_ON` / `MOTOR_OFF`.
//!
//! # Usage
//!
//! ```bash
//! # Auto-detect the gateway port
//! fieldlink
//!
//! # Explicit port and baud rate
//! fieldlink --port /dev/ttyUSB0 --baud 9600
//!
//! # Replay simulated nodes through stdin (commands go to stdout)
//! node-simulation --count 500 | fieldlink --stdin
//!
//! # Write a report from the existing reading log
//! fieldlink report
//! ```
//!
//! # Environment Variables
//!
//! - `FIELDLINK_CONFIG`: path to the station TOML config
//! - `FIELDLINK_PORT`: serial port, same as `--port`
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use fieldlink::config::StationConfig;
use fieldlink::pipeline::{IngestionLoop, LinkConnector, StdinConnector};
use fieldlink::report::{self, ReportWriter};
use fieldlink::storage::{self, FileJournal};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "fieldlink")]
#[command(about = "Field node telemetry ingestion over a shared serial link")]
#[command(version)]
struct CliArgs {
    /// Serial port to try first (e.g. /dev/ttyUSB0, COM3)
    #[arg(long, env = "FIELDLINK_PORT")]
    port: Option<String>,

    /// Link baud rate (default: 9600)
    #[arg(long)]
    baud: Option<u32>,

    /// Only try the explicit port, never probe discovered ports
    #[arg(long)]
    no_auto_detect: bool,

    /// Station config file (overrides FIELDLINK_CONFIG and ./fieldlink.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Read frames from stdin and write commands to stdout instead of a serial port
    #[arg(long)]
    stdin: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Write a report from the reading log without opening the link
    Report,
    /// List serial ports visible to this host
    Ports,
    /// Print the effective configuration as TOML
    Config,
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(args: &CliArgs) -> Result<StationConfig> {
    let mut config = match &args.config {
        Some(path) => StationConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StationConfig::load(),
    };

    if let Some(port) = &args.port {
        config.link.port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        config.link.baud_rate = baud;
    }
    if args.no_auto_detect {
        config.link.auto_detect = false;
    }

    config.validate().context("Invalid configuration after CLI overrides")?;
    Ok(config)
}

// ============================================================================
// Subcommands
// ============================================================================

fn run_report(config: &StationConfig) -> Result<()> {
    let log = storage::open_reading_log(&config.storage).context("Failed to open reading log")?;
    let report = report::generate(log.as_ref(), &config.nodes).context("Failed to generate report")?;

    let writer = ReportWriter::new(config.report.output_dir.clone(), config.report.render_json);
    let artifacts = writer.write(&report).context("Failed to write report")?;

    print!("{}", report::render_text(&report));
    println!();
    println!("Written to {}", artifacts.text.display());
    if let Some(json) = artifacts.json {
        println!("JSON rendering: {}", json.display());
    }
    Ok(())
}

#[cfg(feature = "serial")]
fn run_ports() -> Result<()> {
    let ports = fieldlink::acquisition::list_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{:<24} {}", port.name, port.kind);
    }
    Ok(())
}

#[cfg(not(feature = "serial"))]
fn run_ports() -> Result<()> {
    anyhow::bail!("built without the `serial` feature; no port enumeration available")
}

fn print_config(config: &StationConfig) -> Result<()> {
    print!("{}", config.to_toml().context("Failed to render config")?);
    Ok(())
}

// ============================================================================
// Ingestion
// ============================================================================

#[cfg(feature = "serial")]
fn serial_connector(config: &StationConfig) -> Result<Box<dyn LinkConnector>> {
    Ok(Box::new(fieldlink::pipeline::SerialConnector::new(
        config.link.clone(),
        config.commands.framing,
    )))
}

#[cfg(not(feature = "serial"))]
fn serial_connector(_config: &StationConfig) -> Result<Box<dyn LinkConnector>> {
    anyhow::bail!("built without the `serial` feature; use --stdin")
}

async fn run_ingestion(config: StationConfig, use_stdin: bool) -> Result<()> {
    let log = storage::open_reading_log(&config.storage).with_context(|| {
        format!("Failed to open reading log {}", config.storage.resolved_path().display())
    })?;
    let journal = FileJournal::open(&config.diagnostics.anomaly_log).with_context(|| {
        format!("Failed to open anomaly journal {}", config.diagnostics.anomaly_log.display())
    })?;

    info!(
        log = log.backend_name(),
        path = %config.storage.resolved_path().display(),
        journal = %journal.path().display(),
        "Storage ready"
    );
    info!(
        temperature_max_c = config.thresholds.temperature_max_c,
        humidity_min_pct = config.thresholds.humidity_min_pct,
        humidity_max_pct = config.thresholds.humidity_max_pct,
        framing = ?config.commands.framing,
        "Anomaly thresholds"
    );

    let mut connector: Box<dyn LinkConnector> = if use_stdin {
        Box::new(StdinConnector::new(config.link.clone(), config.commands.framing))
    } else {
        serial_connector(&config)?
    };

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, draining...");
        shutdown_token.cancel();
    });

    let ingestion = IngestionLoop::new(&config, log, Box::new(journal), cancel_token);

    match ingestion.run(connector.as_mut()).await {
        Ok(summary) => {
            info!(link = %summary.link, reason = %summary.stop_reason, "Ingestion stopped");
            if summary.stats.log_write_failures > 0 {
                warn!(
                    failures = summary.stats.log_write_failures,
                    "Some readings were not persisted"
                );
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "No link could be opened");
            Err(e).context("Link unavailable")
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays free for commands in --stdin mode
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    if let Some(SubCommand::Ports) = &args.command {
        return run_ports();
    }

    let config = load_config(&args)?;

    match &args.command {
        Some(SubCommand::Report) => return run_report(&config),
        Some(SubCommand::Config) => return print_config(&config),
        Some(SubCommand::Ports) | None => {}
    }

    info!("fieldlink {} starting", env!("CARGO_PKG_VERSION"));
    run_ingestion(config, args.stdin).await?;

    info!("fieldlink shutdown complete");
    Ok(())
}
