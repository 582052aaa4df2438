//! Domain models: question pool, campaign context, per-participant results and outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

/// The (country, brand) pair that scopes questions and campaign content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
  pub country_id: u32,
  pub brand_id: u32,
}

impl Context {
  pub fn new(country_id: u32, brand_id: u32) -> Self {
    Self { country_id, brand_id }
  }

  /// Parse textual identifiers (route segments, query params, WS payloads).
  /// Both must be positive integers.
  pub fn parse(country: &str, brand: &str) -> Result<Self, ConfigError> {
    Ok(Self {
      country_id: parse_id("country", country)?,
      brand_id: parse_id("brand", brand)?,
    })
  }
}

fn parse_id(field: &'static str, raw: &str) -> Result<u32, ConfigError> {
  match raw.trim().parse::<u32>() {
    Ok(id) if id > 0 => Ok(id),
    _ => Err(ConfigError::MalformedContext { field, value: raw.to_string() }),
  }
}

/// One selectable answer. Exactly which options are correct is decided at data entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
  pub id: u32,
  pub text: String,
  pub is_correct: bool,
}

/// Read-only copy of a question owned by the Question Source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: u32,
  pub text: String,
  pub country_id: u32,
  pub brand_id: u32,
  pub options: Vec<AnswerOption>,
}

impl Question {
  pub fn context(&self) -> Context {
    Context::new(self.country_id, self.brand_id)
  }

  pub fn option(&self, option_id: u32) -> Option<&AnswerOption> {
    self.options.iter().find(|o| o.id == option_id)
  }

  pub fn correct_option_ids(&self) -> Vec<u32> {
    self.options.iter().filter(|o| o.is_correct).map(|o| o.id).collect()
  }
}

/// Campaign brand shown on the spin screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
  pub id: u32,
  pub name: String,
  pub country_id: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub logo_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub banner_url: Option<String>,
}

/// What happened in one round of a turn. `selected_option_id` is `None` on timeout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundAnswer {
  pub round: u8,
  pub question_id: u32,
  pub selected_option_id: Option<u32>,
  pub correct: bool,
}

/// One entry per completed participant turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
  pub participant: u32,
  pub score: u8,
  pub won: bool,
  #[serde(default)]
  pub answers: Vec<RoundAnswer>,
}

/// Payload handed to the Result Sink when a turn finalizes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
  pub session_id: Uuid,
  pub context: Context,
  pub participant: u32,
  pub score: u8,
  pub won: bool,
  #[serde(default)]
  pub answers: Vec<RoundAnswer>,
}

/// A recorded outcome, as stored by the in-process participation log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participation {
  pub id: Uuid,
  pub session_id: Uuid,
  pub context: Context,
  pub participant: u32,
  pub score: u8,
  pub won: bool,
  pub recorded_at: DateTime<Utc>,
}

impl Participation {
  pub fn from_outcome(outcome: &Outcome) -> Self {
    Self {
      id: Uuid::new_v4(),
      session_id: outcome.session_id,
      context: outcome.context,
      participant: outcome.participant,
      score: outcome.score,
      won: outcome.won,
      recorded_at: Utc::now(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn context_parse_accepts_positive_integers() {
    assert_eq!(Context::parse("1", " 42 ").unwrap(), Context::new(1, 42));
  }

  #[test]
  fn context_parse_rejects_malformed_ids() {
    for (country, brand, field) in [("", "1", "country"), ("x", "1", "country"), ("0", "1", "country"), ("1", "-3", "brand"), ("1", "2.5", "brand")] {
      match Context::parse(country, brand) {
        Err(ConfigError::MalformedContext { field: f, .. }) => assert_eq!(f, field),
        other => panic!("expected malformed {field}, got {other:?}"),
      }
    }
  }

  #[test]
  fn question_lookups() {
    let q = Question {
      id: 7,
      text: "?".into(),
      country_id: 1,
      brand_id: 2,
      options: vec![
        AnswerOption { id: 1, text: "a".into(), is_correct: false },
        AnswerOption { id: 2, text: "b".into(), is_correct: true },
      ],
    };
    assert_eq!(q.context(), Context::new(1, 2));
    assert_eq!(q.correct_option_ids(), vec![2]);
    assert!(q.option(2).is_some_and(|o| o.is_correct));
    assert!(q.option(9).is_none());
  }
}
