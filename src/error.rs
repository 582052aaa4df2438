//! Error taxonomy shared by the session controller, its collaborators and the config loader.

use thiserror::Error;

/// Session configuration rejected before the session is created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
  #[error("total participants must be a positive integer, got {0}")]
  InvalidParticipants(i64),

  #[error("at most {max} participants per session, got {requested}")]
  TooManyParticipants { requested: i64, max: u32 },

  #[error("malformed {field} identifier: {value:?}")]
  MalformedContext { field: &'static str, value: String },
}

/// Failure to obtain the question pool for a context.
#[derive(Error, Debug)]
pub enum SourceError {
  #[error("question source unavailable: {0}")]
  Unavailable(String),

  #[error("question source transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("question source returned an unreadable payload: {0}")]
  Decode(String),
}

/// Failure to record an outcome. Never propagated into the state machine.
#[derive(Error, Debug)]
pub enum SinkError {
  #[error("result sink rejected the outcome (status {status}): {body}")]
  Rejected { status: u16, body: String },

  #[error("result sink transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("invalid outcome: {0}")]
  Invalid(String),
}

/// Failure to load the TOML service configuration.
#[derive(Error, Debug)]
pub enum LoadError {
  #[error("failed to read config file: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse config file: {0}")]
  Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn config_error_messages_name_the_problem() {
    assert_eq!(
      ConfigError::InvalidParticipants(0).to_string(),
      "total participants must be a positive integer, got 0"
    );
    let e = ConfigError::MalformedContext { field: "country", value: "abc".into() };
    assert_eq!(e.to_string(), "malformed country identifier: \"abc\"");
  }

  #[test]
  fn sink_rejection_includes_status() {
    let e = SinkError::Rejected { status: 401, body: "Unauthorized".into() };
    assert!(e.to_string().contains("401"));
  }
}
