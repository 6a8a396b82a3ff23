use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::{
  registration::start_registration_fiber,
  shutdown::{
    shutdown_manager::{Shutdown, ShutdownManager},
    shutdown_reason::ShutdownReason,
  },
  worker_config::WorkerConfig,
  worker_server,
};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
  #[error("cannot listen on {address}: {source}")]
  Bind {
    address: String,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot build HTTP client: {0}")]
  Client(#[from] reqwest::Error),
}

pub struct WorkerImpl {
  config: WorkerConfig,
  shutdown: ShutdownManager<ShutdownReason>,
}

impl WorkerImpl {
  /// Binds the listener, registers with the master (retrying until it answers),
  /// and only then starts serving `/map`.
  pub async fn new(config: WorkerConfig) -> Result<Self, WorkerError> {
    info!("Starting worker with config: {:?}", config);

    let shutdown_manager = ShutdownManager::new();
    start_interrupt_fiber(shutdown_manager.shutdown.clone());

    let address = config.listen_address();
    let listener = TcpListener::bind(&address)
      .await
      .map_err(|source| WorkerError::Bind { address, source })?;
    if let Ok(local) = listener.local_addr() {
      info!("Worker listening on {}", local);
    }

    let on_registered = start_registration_fiber(
      reqwest::Client::builder().build()?,
      config.master_url.clone(),
      config.advertised_address(),
      config.register_retry_interval(),
      shutdown_manager.shutdown.clone(),
    )
    .await;

    if on_registered.await.is_err() || shutdown_manager.shutdown.is_triggered().await {
      warn!("Shut down before registration completed, not serving");
      return Ok(Self {
        config,
        shutdown: shutdown_manager,
      });
    }

    start_server_fiber(listener, shutdown_manager.shutdown.clone()).await;

    Ok(Self {
      config,
      shutdown: shutdown_manager,
    })
  }

  pub async fn await_shutdown(self) -> Option<ShutdownReason> {
    info!("Worker for {} is up", self.config.master_url);
    match self.shutdown.await_shutdown().await {
      Ok(reason) => Some(reason),
      Err(err) => {
        error!("Shutdown signal lost: {}", err);
        None
      }
    }
  }
}

fn start_interrupt_fiber(shutdown: Arc<Shutdown<ShutdownReason>>) {
  tokio::spawn(async move {
    match tokio::signal::ctrl_c().await {
      Ok(()) => {
        info!("Received Ctrl-C");
        shutdown.trigger(ShutdownReason::Interrupted).await;
      }
      Err(err) => warn!("Failed to listen for Ctrl-C: {}", err),
    }
  });
}

async fn start_server_fiber(listener: TcpListener, shutdown: Arc<Shutdown<ShutdownReason>>) {
  let server_shutdown = shutdown.clone();
  let server_handle = tokio::spawn(async move {
    if let Err(err) = axum::serve(listener, worker_server::router()).await {
      error!("HTTP server failed: {}", err);
      // Triggering aborts this very task, so do it from another one.
      tokio::spawn(async move {
        server_shutdown
          .trigger(ShutdownReason::ServerError(err.to_string()))
          .await;
      });
    }
  });

  shutdown
    .register_shutdown_task("http server", || {
      Box::pin(async move {
        server_handle.abort();
        info!("Aborted http server");
      })
    })
    .await;
}
