use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worker::WorkerImpl;
use worker_config::WorkerConfig;

mod registration;
mod shutdown;
mod worker;
mod worker_config;
mod worker_server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  let config = WorkerConfig::parse();

  let subscriber = tracing_subscriber::FmtSubscriber::builder()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .finish();

  tracing::subscriber::set_global_default(subscriber)?;

  let worker = WorkerImpl::new(config).await?;

  let shutdown_reason = worker.await_shutdown().await;

  info!("Shutting down due to: {:?}", shutdown_reason);

  Ok(())
}
