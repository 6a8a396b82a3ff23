//! Line matching over a single file, the unit of work a worker runs.

use regex::Regex;
use tokio::{
  fs::File,
  io::{AsyncBufReadExt, BufReader},
};
use tokio_stream::{wrappers::SplitStream, StreamExt};
use tracing::info;

use crate::{
  mapper::{MapError, Mapper},
  wire::{MapRequest, MapResponse},
  KeyValue,
};

#[derive(Debug, Clone)]
pub struct GrepMapper {
  pattern: Regex,
}

impl GrepMapper {
  pub fn new(pattern: &str) -> Result<Self, MapError> {
    let compiled = Regex::new(pattern).map_err(|source| MapError::InvalidPattern {
      pattern: pattern.to_string(),
      source,
    })?;
    Ok(Self { pattern: compiled })
  }

  pub fn pattern(&self) -> &str {
    self.pattern.as_str()
  }
}

impl Mapper for GrepMapper {
  /// Emits `<path>:<line>` -> line text for every matching line, in file order.
  /// Lines are numbered from 1 and returned without their line terminator.
  async fn map(&self, path: &str) -> Result<Vec<KeyValue>, MapError> {
    let file = File::open(path).await.map_err(|source| MapError::Open {
      path: path.to_string(),
      source,
    })?;

    let mut lines = SplitStream::new(BufReader::new(file).split(b'\n'));
    let mut kvs = vec![];
    let mut line_number = 0usize;

    while let Some(line) = lines.next().await {
      let mut line = line.map_err(|source| MapError::Read {
        path: path.to_string(),
        source,
      })?;
      line_number += 1;

      if line.last() == Some(&b'\r') {
        line.pop();
      }

      let text = String::from_utf8_lossy(&line);
      if self.pattern.is_match(&text) {
        kvs.push(KeyValue::new(
          format!("{}:{}", path, line_number),
          text.into_owned(),
        ));
      }
    }

    Ok(kvs)
  }
}

/// Serves one `/map` request: compile the pattern, then scan the file.
pub async fn run_map(request: &MapRequest) -> Result<MapResponse, MapError> {
  info!(
    "Running map on file={} pattern={:?}",
    request.path, request.pattern
  );

  let mapper = GrepMapper::new(&request.pattern)?;
  let kvs = mapper.map(&request.path).await?;

  info!("Completed map on file={}. {} matches.", request.path, kvs.len());
  Ok(MapResponse { kvs })
}
