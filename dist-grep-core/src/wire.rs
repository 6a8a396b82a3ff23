//! JSON bodies exchanged between clients, the master and the workers.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Address, KeyValue};

/// Master: workers announce themselves here.
pub const REGISTER_ROUTE: &str = "/register";
/// Master: clients submit search jobs here.
pub const RUN_ROUTE: &str = "/run";
/// Master: snapshot of the registry.
pub const DEBUG_ROUTE: &str = "/debug";
/// Worker: runs one map task.
pub const MAP_ROUTE: &str = "/map";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterWorkerRequest {
  pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunJobRequest {
  #[serde(default)]
  pub pattern: String,
  #[serde(default)]
  pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunJobResponse {
  pub results: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRequest {
  pub pattern: String,
  pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapResponse {
  #[serde(default, deserialize_with = "null_as_empty")]
  pub kvs: Vec<KeyValue>,
}

// An empty match list may arrive as `null`.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<KeyValue>, D::Error> {
  Ok(Option::<Vec<KeyValue>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugResponse {
  pub workers: Vec<Address>,
}

/// Body of every non-2xx answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
  pub error: String,
}
