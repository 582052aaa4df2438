//! Application state: rules, brand catalog, question source and result sink.
//!
//! Without a remote backend the in-memory `QuestionBank` serves questions and
//! outcomes land only in the local `ParticipationLog`. With QUIZ_BACKEND_URL set,
//! questions come from the remote backend and outcomes are written to both.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::config::{load_app_config_from_env, AppConfig, GameRules};
use crate::domain::{Brand, Context, Outcome};
use crate::error::SinkError;
use crate::ports::{QuestionSource, ResultSink};
use crate::remote::RemoteBackend;
use crate::seeds::{seed_brands, seed_questions};
use crate::store::{ParticipationLog, QuestionBank};

#[derive(Clone)]
pub struct AppState {
  pub rules: GameRules,
  pub brands: BTreeMap<u32, Brand>,
  pub questions: Arc<dyn QuestionSource>,
  pub sink: Arc<dyn ResultSink>,
  pub participations: ParticipationLog,
}

impl AppState {
  /// Build state from env: load config, seed content, pick collaborators.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    let cfg = load_app_config_from_env();
    let remote = RemoteBackend::from_env();
    if let Some(rb) = &remote {
      info!(target: "wheel_quiz_backend", base_url = %rb.base_url, "Remote backend enabled for questions and outcomes.");
    } else {
      info!(target: "wheel_quiz_backend", "Remote backend disabled (no QUIZ_BACKEND_URL). Using local bank and log.");
    }
    Self::from_parts(cfg, remote)
  }

  pub fn from_parts(cfg: AppConfig, remote: Option<RemoteBackend>) -> Self {
    let mut brands: BTreeMap<u32, Brand> = seed_brands().into_iter().map(|b| (b.id, b)).collect();
    for b in cfg.brands {
      brands.insert(
        b.id,
        Brand { id: b.id, name: b.name, country_id: b.country_id, logo_url: b.logo_url, banner_url: b.banner_url },
      );
    }

    let participations = ParticipationLog::new();
    let (questions, sink): (Arc<dyn QuestionSource>, Arc<dyn ResultSink>) = match remote {
      Some(rb) => {
        let rb = Arc::new(rb);
        let questions: Arc<dyn QuestionSource> = rb.clone();
        let sink: Arc<dyn ResultSink> = Arc::new(TeeSink { local: participations.clone(), remote: rb });
        (questions, sink)
      }
      None => {
        let questions: Arc<dyn QuestionSource> = Arc::new(QuestionBank::build(&cfg.questions, seed_questions()));
        let sink: Arc<dyn ResultSink> = Arc::new(participations.clone());
        (questions, sink)
      }
    };

    Self { rules: cfg.rules, brands, questions, sink, participations }
  }

  /// The brand shown for a context. A brand id registered under another country is not a match.
  pub fn brand(&self, context: &Context) -> Option<&Brand> {
    self.brands.get(&context.brand_id).filter(|b| b.country_id == context.country_id)
  }
}

/// Records locally, then forwards. The local write cannot fail, so the remote
/// result is what the caller sees.
struct TeeSink {
  local: ParticipationLog,
  remote: Arc<RemoteBackend>,
}

#[async_trait]
impl ResultSink for TeeSink {
  async fn report_outcome(&self, outcome: &Outcome) -> Result<(), SinkError> {
    self.local.report_outcome(outcome).await?;
    self.remote.report_outcome(outcome).await
  }
}
