use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use vote_tracker_core::{AppConfig, ConfigLoader};
use vote_tracker_orchestrator::VoteTracker;
use vote_tracker_sheets::DrainOutcome;
use vote_tracker_web_api::ApiServer;

#[derive(Parser)]
#[command(name = "vote-tracker")]
#[command(about = "Live vote tracker for BStage Plus polls", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll continuously and serve the JSON API
    Serve {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml", env = "VOTE_TRACKER_CONFIG")]
        config: String,
        /// Server address, defaults to server.host:server.port
        #[arg(short, long)]
        addr: Option<String>,
    },
    /// Recover, fetch once and print the current state as JSON
    Once {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml", env = "VOTE_TRACKER_CONFIG")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Serve { config, addr } => {
            run_serve(&config, addr).await?;
        }
        Commands::Once { config } => {
            run_once(&config).await?;
        }
    }

    Ok(())
}

fn load_tracker(config_path: &str) -> anyhow::Result<(AppConfig, Arc<VoteTracker>)> {
    let config = ConfigLoader::load(config_path)?;
    let tracker = VoteTracker::from_config(&config).context("Failed to build vote tracker")?;
    Ok((config, Arc::new(tracker)))
}

fn log_banner(config: &AppConfig) {
    tracing::info!("BStage Plus Vote Tracker");
    tracing::info!("  Poll ID:        {}", config.poll.poll_id);
    tracing::info!("  Fetch Interval: {}s", config.poll.fetch_interval_secs);
    tracing::info!("  Account:        {}", config.bstage.email);
    tracing::info!("  Mode:           {:?}", config.persistence.execution_mode);
}

async fn run_serve(config_path: &str, addr: Option<String>) -> anyhow::Result<()> {
    tracing::info!("Starting vote tracker with config: {}", config_path);

    let (config, tracker) = load_tracker(config_path)?;
    log_banner(&config);

    if !config.is_stateless() {
        if tracker.recover_previous_day().await {
            tracing::info!("Loaded previous day from remote sheet");
        }
        let handles = tracker.spawn_background();
        tracing::info!("Started {} background task(s)", handles.len());
    }

    let addr = addr.unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));
    ApiServer::new(tracker).serve(&addr).await?;

    Ok(())
}

async fn run_once(config_path: &str) -> anyhow::Result<()> {
    let (config, tracker) = load_tracker(config_path)?;
    log_banner(&config);

    tracker.recover_previous_day().await;
    if !tracker.tick().await {
        tracing::warn!("Fetch failed, printing last known state");
    }

    // no background worker here, so flush anything the tick queued
    while matches!(
        tracker.writer().drain_once().await,
        DrainOutcome::Written(_) | DrainOutcome::SkippedDuplicate
    ) {}

    println!("{}", serde_json::to_string_pretty(&tracker.current_state())?);
    Ok(())
}
