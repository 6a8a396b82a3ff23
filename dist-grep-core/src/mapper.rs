use std::future::Future;

use crate::KeyValue;

#[derive(Debug, thiserror::Error)]
pub enum MapError {
  #[error("invalid regex pattern {pattern:?}: {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: regex::Error,
  },

  #[error("error opening file {path:?}: {source}")]
  Open {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("error reading file {path:?}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

/// The map half of a job: turns one input file into key/value pairs.
pub trait Mapper {
  fn map(&self, path: &str) -> impl Future<Output = Result<Vec<KeyValue>, MapError>> + Send;
}
