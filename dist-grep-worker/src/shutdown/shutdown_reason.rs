#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
  Interrupted,
  ServerError(String),
}
