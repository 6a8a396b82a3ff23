use std::sync::Arc;

use clap::Parser;
use config::{Cli, Command, MasterConfig};
use invoker::HttpInvoker;
use master::MasterImpl;
use registry::WorkerRegistry;
use task::TaskGenerator;
use tokio::net::TcpListener;
use tracing::{info, warn};

mod config;
mod invoker;
mod job;
mod journal;
mod local;
mod master;
mod registry;
mod state;
mod task;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Local(config)) => {
            journal::init_tracing(config.journal.as_deref())?;
            for line in local::run_local(&config).await? {
                println!("{}", line);
            }
            Ok(())
        }
        Some(Command::Serve(config)) => serve(config).await,
        None => serve(MasterConfig::default()).await,
    }
}

async fn serve(config: MasterConfig) -> Result<(), Box<dyn std::error::Error>> {
    journal::init_tracing(Some(config.journal.as_path()))?;

    let master = MasterImpl::new(
        WorkerRegistry::new(),
        Arc::new(HttpInvoker::new(config.map_timeout())?),
        TaskGenerator::new(config.expand_policy()),
        config.max_in_flight,
    );

    let listener = TcpListener::bind(config.address).await?;
    info!("Starting master server on {}", listener.local_addr()?);

    axum::serve(listener, master.router())
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl-C, shutting down"),
                Err(err) => {
                    warn!("Failed to listen for Ctrl-C: {}", err);
                    std::future::pending::<()>().await
                }
            }
        })
        .await?;

    Ok(())
}
