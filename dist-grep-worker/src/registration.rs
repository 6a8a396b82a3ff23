use std::{sync::Arc, time::Duration};

use dist_grep_core::{
  wire::{RegisterWorkerRequest, REGISTER_ROUTE},
  Address,
};
use tokio::{sync::oneshot, time::sleep};
use tracing::{info, warn};

use crate::shutdown::{shutdown_manager::Shutdown, shutdown_reason::ShutdownReason};

pub async fn register_with_master(
  client: &reqwest::Client,
  master_url: &str,
  address: &Address,
) -> Result<(), reqwest::Error> {
  client
    .post(format!("{}{}", master_url.trim_end_matches('/'), REGISTER_ROUTE))
    .json(&RegisterWorkerRequest {
      address: address.clone(),
    })
    .send()
    .await?
    .error_for_status()?;
  Ok(())
}

/// Keeps registering until the master answers 2xx, waiting `retry_interval`
/// between attempts. The receiver fires once registration succeeded; it is
/// dropped without firing if shutdown wins first.
pub async fn start_registration_fiber(
  client: reqwest::Client,
  master_url: String,
  address: Address,
  retry_interval: Duration,
  shutdown: Arc<Shutdown<ShutdownReason>>,
) -> oneshot::Receiver<()> {
  let (registered, on_registered) = oneshot::channel();

  let fiber = tokio::spawn(async move {
    let mut attempts = 0usize;
    loop {
      attempts += 1;
      match register_with_master(&client, &master_url, &address).await {
        Ok(()) => {
          info!(
            "Registered {} with master at {} after {} attempt(s)",
            address, master_url, attempts
          );
          let _ = registered.send(());
          break;
        }
        Err(error) => {
          warn!(
            "Failed to register with {}: {}. Retrying in {:?}...",
            master_url, error, retry_interval
          );
          sleep(retry_interval).await;
        }
      }
    }
  });

  shutdown
    .register_shutdown_task("registration", || {
      Box::pin(async move {
        fiber.abort();
        let exit = fiber.await;
        info!("registration fiber exited: {:?}", exit);
      })
    })
    .await;

  on_registered
}
