use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

pub mod grep;
pub mod mapper;
pub mod reducer;
pub mod wire;

/// Network endpoint of a registered worker, e.g. `http://localhost:8001`.
///
/// Opaque to the master: it is stored and dialled exactly as the worker sent it.
#[derive(Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
  pub fn new(address: impl Into<String>) -> Self {
    Self(address.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Debug for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// One emitted match. For grep the key is `<path>:<line>` and the value is the line text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
  #[serde(alias = "Key")]
  pub key: String,
  #[serde(alias = "Value")]
  pub value: String,
}

impl KeyValue {
  pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      value: value.into(),
    }
  }
}
