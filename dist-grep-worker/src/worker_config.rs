use std::time::Duration;

use clap::Parser;
use dist_grep_core::Address;

#[derive(Debug, Clone, Parser)]
#[command(
  name = "dist-grep-worker",
  about = "Runs grep map tasks for a dist-grep master. Flags take two dashes (--addr, --master), not -addr/-master."
)]
pub struct WorkerConfig {
  /// Listen address. `:8001` listens on every interface.
  #[arg(long = "addr", default_value = ":8001")]
  pub address: String,
  /// Base URL of the master to register with.
  #[arg(long = "master", default_value = "http://localhost:9000")]
  pub master_url: String,
  /// URL the master should use to reach this worker.
  #[arg(long)]
  pub advertise: Option<String>,
  /// Delay between failed registration attempts, in milliseconds.
  #[arg(long = "register-retry-ms", default_value_t = 2000)]
  pub register_retry_ms: u64,
}

impl WorkerConfig {
  pub fn listen_address(&self) -> String {
    match self.address.strip_prefix(':') {
      Some(port) => format!("0.0.0.0:{}", port),
      None => self.address.clone(),
    }
  }

  pub fn advertised_address(&self) -> Address {
    match &self.advertise {
      Some(url) => Address::new(url.clone()),
      None if self.address.starts_with(':') => Address::new(format!("http://localhost{}", self.address)),
      None => Address::new(format!("http://{}", self.address)),
    }
  }

  pub fn register_retry_interval(&self) -> Duration {
    Duration::from_millis(self.register_retry_ms)
  }
}
