#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
  #[error("no values to reduce for key {0:?}")]
  NoValues(String),
}

/// The reduce half of a job: collapses every value gathered for a key into one.
///
/// Values arrive in the order workers reported them, which is not deterministic
/// across workers. Implementations must not rely on the order keys are visited in.
pub trait Reducer: Send + Sync {
  fn reduce(&self, key: &str, values: &[String]) -> Result<String, ReduceError>;
}

/// Keeps the first value that arrived. The grep default: duplicate values for a
/// `<path>:<line>` key are copies of the same line.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstValueReducer;

impl Reducer for FirstValueReducer {
  fn reduce(&self, key: &str, values: &[String]) -> Result<String, ReduceError> {
    values
      .first()
      .cloned()
      .ok_or_else(|| ReduceError::NoValues(key.to_string()))
  }
}

#[derive(Debug, Clone)]
pub struct ConcatReducer {
  pub separator: String,
}

impl Default for ConcatReducer {
  fn default() -> Self {
    Self {
      separator: "\n".to_string(),
    }
  }
}

impl Reducer for ConcatReducer {
  fn reduce(&self, key: &str, values: &[String]) -> Result<String, ReduceError> {
    if values.is_empty() {
      return Err(ReduceError::NoValues(key.to_string()));
    }
    Ok(values.join(&self.separator))
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CountReducer;

impl Reducer for CountReducer {
  fn reduce(&self, _key: &str, values: &[String]) -> Result<String, ReduceError> {
    Ok(values.len().to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn values(vs: &[&str]) -> Vec<String> {
    vs.iter().map(|v| v.to_string()).collect()
  }

  #[test]
  fn test_first_value_wins() {
    let out = FirstValueReducer
      .reduce("a.log:2", &values(&["first", "second"]))
      .unwrap();
    assert_eq!(out, "first");
  }

  #[test]
  fn test_first_value_on_empty_is_an_error() {
    let err = FirstValueReducer.reduce("a.log:2", &[]).unwrap_err();
    assert!(matches!(err, ReduceError::NoValues(key) if key == "a.log:2"));
  }

  #[test]
  fn test_reducing_a_reduced_singleton_is_idempotent() {
    let once = FirstValueReducer
      .reduce("k", &values(&["ERROR disk full", "ERROR disk full"]))
      .unwrap();
    let twice = FirstValueReducer.reduce("k", &[once.clone()]).unwrap();
    assert_eq!(once, twice);

    let joined = ConcatReducer::default().reduce("k", &[once.clone()]).unwrap();
    assert_eq!(joined, once);
  }

  #[test]
  fn test_concat_and_count() {
    let vs = values(&["a", "b", "c"]);
    let concat = ConcatReducer {
      separator: ",".to_string(),
    };
    assert_eq!(concat.reduce("k", &vs).unwrap(), "a,b,c");
    assert_eq!(CountReducer.reduce("k", &vs).unwrap(), "3");
    assert_eq!(CountReducer.reduce("k", &[]).unwrap(), "0");
  }
}
