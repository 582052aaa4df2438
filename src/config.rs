//! Loading service configuration (game rules, brands, question bank) from TOML.
//!
//! See `AppConfig` and `GameRules` for the expected schema. Every section is
//! optional; missing values fall back to the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::LoadError;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub rules: GameRules,
  #[serde(default)]
  pub brands: Vec<BrandCfg>,
  #[serde(default)]
  pub questions: Vec<QuestionCfg>,
}

/// Timings and thresholds of a game round.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameRules {
  /// Wheel spin duration before the question appears.
  pub spin_secs: u64,
  /// Countdown per question.
  pub question_secs: u32,
  /// Dwell on the feedback screen before advancing.
  pub feedback_secs: u64,
  /// Correct answers (out of 3) needed to win.
  pub win_threshold: u8,
  /// Upper bound for participants in one session.
  pub max_participants: u32,
}

impl Default for GameRules {
  fn default() -> Self {
    Self { spin_secs: 5, question_secs: 15, feedback_secs: 2, win_threshold: 2, max_participants: 10 }
  }
}

impl GameRules {
  pub fn spin_duration(&self) -> Duration {
    Duration::from_secs(self.spin_secs)
  }

  pub fn feedback_duration(&self) -> Duration {
    Duration::from_secs(self.feedback_secs)
  }

  pub fn problems(&self) -> Vec<String> {
    let mut out = vec![];
    if !(1..=3).contains(&self.win_threshold) {
      out.push(format!("win_threshold must be within 1..=3, got {}", self.win_threshold));
    }
    if self.question_secs == 0 {
      out.push("question_secs must be positive".into());
    }
    if self.max_participants == 0 {
      out.push("max_participants must be positive".into());
    }
    out
  }

  /// Return these rules if they are usable, otherwise the defaults.
  pub fn validated(self) -> Self {
    let problems = self.problems();
    if problems.is_empty() {
      self
    } else {
      error!(target: "wheel_quiz_backend", problems = ?problems, "Invalid [rules]; using defaults");
      Self::default()
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BrandCfg {
  pub id: u32,
  pub name: String,
  pub country_id: u32,
  #[serde(default)]
  pub logo_url: Option<String>,
  #[serde(default)]
  pub banner_url: Option<String>,
}

/// Question bank entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  #[serde(default)]
  pub id: Option<u32>,
  pub country_id: u32,
  pub brand_id: u32,
  pub text: String,
  #[serde(default)]
  pub options: Vec<OptionCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OptionCfg {
  pub text: String,
  #[serde(default)]
  pub correct: bool,
}

pub fn parse_config(s: &str) -> Result<AppConfig, LoadError> {
  let mut cfg = toml::from_str::<AppConfig>(s)?;
  cfg.rules = cfg.rules.validated();
  Ok(cfg)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<AppConfig, LoadError> {
  let s = std::fs::read_to_string(path)?;
  parse_config(&s)
}

/// Load `AppConfig` from QUIZ_CONFIG_PATH. Any IO or parse error is logged and
/// the built-in defaults are used instead.
pub fn load_app_config_from_env() -> AppConfig {
  let Ok(path) = std::env::var("QUIZ_CONFIG_PATH") else {
    info!(target: "wheel_quiz_backend", "QUIZ_CONFIG_PATH not set; using default rules and built-in questions");
    return AppConfig::default();
  };
  match load_from_path(&path) {
    Ok(cfg) => {
      info!(target: "wheel_quiz_backend", %path, brands = cfg.brands.len(), questions = cfg.questions.len(), "Loaded quiz config (TOML)");
      cfg
    }
    Err(e) => {
      warn!(target: "wheel_quiz_backend", %path, error = %e, "Could not load quiz config; using defaults");
      AppConfig::default()
    }
  }
}
