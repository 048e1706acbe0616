// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cplaned`: runs one cluster node, either as the Controller or as a
//! Worker, per `config.node.role`.

mod controller;
mod worker;

use clap::Parser;
use cplane_core::{Config, NodeRole};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cplaned", about = "configuration-operations cluster node")]
struct Cli {
    /// Path to the node's TOML config file. Falls back to
    /// `CONFIGOPS_CONFIG_FILE`/`CONFIGOPS_CONFIG_VALUE` when absent.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).json().init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load_from_env(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            return std::process::ExitCode::FAILURE;
        }
    };

    let result = match config.config.node.role {
        NodeRole::Controller => run_controller(config).await,
        NodeRole::Worker => run_worker(config).await,
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "node exited with error");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run_controller(config: Config) -> Result<(), String> {
    let addr: std::net::SocketAddr = config
        .config
        .node
        .listen_addr
        .as_deref()
        .unwrap_or("0.0.0.0:7443")
        .parse()
        .map_err(|e| format!("invalid config.node.listen_addr: {e}"))?;
    let store = cplane_ledger::LedgerStore::connect(&config.database_uri().map_err(|e| e.to_string())?)
        .await
        .map_err(|e| e.to_string())?;
    let auth = controller::WorkerAuthRegistry::new(config.workers.clone());
    let hub = controller::ControllerHub::new(auth, store);
    controller::serve(addr, hub).await.map_err(|e| e.to_string())
}

async fn run_worker(config: Config) -> Result<(), String> {
    let state = worker::WorkerState::from_config(config).await.map_err(|e| e.to_string())?;
    worker::run(state).await;
    Ok(())
}
