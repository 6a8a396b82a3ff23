use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};

use crate::task::ExpandPolicy;

const DEFAULT_ADDRESS: &str = "0.0.0.0:9000";
const DEFAULT_JOURNAL: &str = "distgrep.log";
const DEFAULT_MAX_IN_FLIGHT: usize = 64;

#[derive(Debug, Parser)]
#[command(
    name = "dist-grep-master",
    about = "Coordinates distributed grep jobs. Flags take two dashes (--addr), not -addr."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the coordinator HTTP API. This is the default.
    Serve(MasterConfig),
    /// Run one search in-process, without any workers.
    Local(LocalConfig),
}

#[derive(Debug, Clone, Args)]
pub struct MasterConfig {
    /// Address to bind the master server to.
    #[arg(long = "addr", default_value = DEFAULT_ADDRESS)]
    pub address: SocketAddr,
    /// Append-only file receiving job lifecycle events.
    #[arg(long, default_value = DEFAULT_JOURNAL)]
    pub journal: PathBuf,
    /// Upper bound on map invocations in flight per job.
    #[arg(long, default_value_t = NonZeroUsize::new(DEFAULT_MAX_IN_FLIGHT).unwrap_or(NonZeroUsize::MIN))]
    pub max_in_flight: NonZeroUsize,
    /// Give up on a map invocation after this many seconds. Unset means wait forever.
    #[arg(long)]
    pub map_timeout_secs: Option<u64>,
    /// Skip unreadable paths instead of rejecting the whole request.
    #[arg(long)]
    pub skip_unreadable: bool,
}

impl MasterConfig {
    pub fn map_timeout(&self) -> Option<Duration> {
        self.map_timeout_secs.map(Duration::from_secs)
    }

    pub fn expand_policy(&self) -> ExpandPolicy {
        ExpandPolicy::from_skip_flag(self.skip_unreadable)
    }
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 9000)),
            journal: PathBuf::from(DEFAULT_JOURNAL),
            max_in_flight: NonZeroUsize::new(DEFAULT_MAX_IN_FLIGHT).unwrap_or(NonZeroUsize::MIN),
            map_timeout_secs: None,
            skip_unreadable: false,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct LocalConfig {
    /// Regular expression to search for.
    pub pattern: String,
    /// Files or directories to search. Directories are walked recursively.
    #[arg(required = true)]
    pub paths: Vec<String>,
    /// Also append job lifecycle events to this file.
    #[arg(long)]
    pub journal: Option<PathBuf>,
    #[arg(long, default_value_t = NonZeroUsize::new(DEFAULT_MAX_IN_FLIGHT).unwrap_or(NonZeroUsize::MIN))]
    pub max_in_flight: NonZeroUsize,
    #[arg(long)]
    pub skip_unreadable: bool,
}
