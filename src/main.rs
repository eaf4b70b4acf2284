mod agent;
mod collectors;
mod config;
mod connection;
mod report;

use agent::Agent;
use clap::Parser;
use collectors::system::SysinfoSampler;
use config::Config;
use connection::{ConnectionManager, WsDialer};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "beacond")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match Config::load_from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load config");
            std::process::exit(1);
        }
    };

    info!(
        server = %cfg.server_addr,
        interval_secs = cfg.interval_secs,
        "starting beacond"
    );

    let dialer = WsDialer::new(cfg.ws_url(), cfg.auth_token.clone());
    let manager = ConnectionManager::new(
        dialer,
        cfg.backoff.min_wait_secs,
        cfg.backoff.max_wait_secs,
    );
    let agent = Agent::new(
        Duration::from_secs(cfg.interval_secs),
        cfg.auth_token.clone(),
        manager,
        SysinfoSampler::new(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl+c");
            return;
        }
        info!("ctrl+c received, shutting down");
        let _ = shutdown_tx.send(true);
    });

    if let Err(err) = agent.run(shutdown_rx).await {
        error!(error = %err, "agent stopped on fatal error");
        std::process::exit(1);
    }
    info!("shutdown complete");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
