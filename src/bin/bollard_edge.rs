//! Bollard edge controller daemon.
//!
//! Connects to the decision service, opens the servo and the radio link,
//! and runs the control loop until Ctrl-C or a fatal stream failure.
//!
//! # Usage
//!
//! ```bash
//! # Defaults, server address from the environment
//! GRPCSERVERADDR=10.0.0.5:50051 bollard_edge
//!
//! # Explicit config file
//! bollard_edge --config /etc/rs-bollard.toml
//!
//! # No hardware: log what would be driven (still needs the server)
//! bollard_edge --dry-run --log-level debug
//!
//! # Print the default configuration
//! bollard_edge --print-config > rs-bollard.toml
//! ```
//!
//! Driving the radio needs the `serial` feature. A build without it only
//! runs with `--dry-run`. Every mode connects to the decision service at
//! startup and exits if it is unreachable.

use std::path::PathBuf;

#[cfg(feature = "serial")]
use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rs_bollard::hal::{GrpcDecisionSource, MockActuator, MockSignal};
#[cfg(feature = "serial")]
use rs_bollard::hal::{SerialRadio, SysfsServo};
use rs_bollard::traits::{ActuatorPort, SignalPort};
use rs_bollard::{BollardController, Config, ControlLoop, LoopSettings};

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - bollard edge controller");

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Decision service address (host:port or URL)
    #[arg(short = 's', long = "server", env = rs_bollard::config::SERVER_ADDR_ENV)]
    server: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    log_level: Option<String>,
    /// Use in-memory ports instead of the servo and radio
    #[arg(long = "dry-run")]
    dry_run: bool,
}

fn init_logging(log_level: Option<&str>) {
    let level = log_level
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    FmtSubscriber::builder()
        .with_target(false)
        .with_max_level(level)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", Config::example_toml());
        return Ok(());
    }

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(address) = cli.server.as_deref() {
        config.server = config.server.with_address(address);
    }
    config.validate()?;

    init_logging(cli.log_level.as_deref().or(config.general.log_level.as_deref()));
    info!(server = %config.server.address, dry_run = cli.dry_run, "starting");

    let source = GrpcDecisionSource::connect(&config.server).await?;

    if cli.dry_run {
        let actuator = MockActuator::new().with_settle(config.actuator.settle());
        return run_with(&config, source, actuator, MockSignal::new()).await;
    }
    run_hardware(&config, source).await
}

#[cfg(feature = "serial")]
async fn run_hardware(config: &Config, source: GrpcDecisionSource) -> anyhow::Result<()> {
    let actuator = SysfsServo::open(&config.actuator).context("opening servo")?;
    let radio = SerialRadio::open(&config.radio).context("opening radio link")?;
    run_with(config, source, actuator, radio).await
}

#[cfg(not(feature = "serial"))]
async fn run_hardware(_config: &Config, _source: GrpcDecisionSource) -> anyhow::Result<()> {
    anyhow::bail!("built without the `serial` feature; rebuild with it or pass --dry-run")
}

async fn run_with<A, S>(
    config: &Config,
    source: GrpcDecisionSource,
    actuator: A,
    signal: S,
) -> anyhow::Result<()>
where
    A: ActuatorPort,
    S: SignalPort,
{
    info!(settle = ?actuator.settle_time(), "ports ready");
    let controller = BollardController::new(actuator, signal);
    let settings = LoopSettings::from(&config.control);
    let mut control = ControlLoop::new(source, controller, settings, config.control.policy());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    control.run_until(shutdown).await?;

    let snapshot = control.controller().snapshot();
    info!(
        state = %snapshot.state,
        commands = snapshot.commands_issued,
        faults = snapshot.port_faults,
        "stopped"
    );
    Ok(())
}
