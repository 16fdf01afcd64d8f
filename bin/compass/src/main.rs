//! Compass relayer daemon.

use std::path::PathBuf;

use clap::Parser;
use compass_relayer::{Engine, config::Config, metrics};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "compass")]
#[command(version, about = "Cross-chain proof relayer for the Map chain")]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "compass.toml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the relayer daemon
    Run,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,compass=debug,compass_relayer=debug"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();
    match args.cmd {
        Command::Run => run(args.config).await,
    }
}

async fn run(config_path: PathBuf) -> eyre::Result<()> {
    tracing::info!(config = ?config_path, "loading configuration");
    let config = Config::load(&config_path)?;
    tracing::info!(
        chains = config.chains.len(),
        map_chain = config.map.chain_id,
        "starting compass"
    );

    metrics::describe();

    let shutdown = CancellationToken::new();
    let mut engine = Engine::spawn_from_config(&config, shutdown.clone())?;

    // Alarms are free-form strings for a human; the daemon surfaces them
    // in the log stream.
    let mut alerts = engine.take_alerts();
    tokio::spawn(async move {
        while let Some(alert) = alerts.recv().await {
            tracing::warn!(%alert, "relayer alarm");
        }
    });

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        fatal = engine.sys_errors.recv() => {
            if let Some(err) = fatal {
                tracing::error!(%err, "fatal relayer error, shutting down");
            }
        }
    }

    shutdown.cancel();
    engine.join().await;
    tracing::info!("compass stopped");

    Ok(())
}
