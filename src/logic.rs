//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Opening a quiz session (config validation + one pool fetch)
//!   - Recording outcomes reported by other game clients

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::domain::{Context, Outcome, Participation};
use crate::error::{ConfigError, SinkError};
use crate::protocol::{ParticipationIn, StartSession};
use crate::session::{QuizSession, SessionConfig, ROUNDS_PER_TURN};
use crate::state::AppState;

pub fn parse_context(country: &impl ToString, brand: &impl ToString) -> Result<Context, ConfigError> {
  Context::parse(&country.to_string(), &brand.to_string())
}

/// Validate the request and build a session over a fresh pool. Configuration
/// errors mean no session exists. A failed pool fetch is logged and treated as
/// an empty pool, which leaves the session unplayable.
#[instrument(level = "info", skip(state), fields(total = req.total_participants))]
pub async fn open_session(state: &AppState, req: &StartSession) -> Result<QuizSession, ConfigError> {
  let context = parse_context(&req.country_id, &req.brand_id)?;
  let config = SessionConfig::new(context, req.total_participants, &state.rules)?;

  let pool = match state.questions.fetch_questions(&context).await {
    Ok(pool) => pool,
    Err(e) => {
      error!(target: "quiz", country = context.country_id, brand = context.brand_id, error = %e, "Question fetch failed; session will be unplayable");
      vec![]
    }
  };

  let id = Uuid::new_v4();
  info!(target: "quiz", session = %id, country = context.country_id, brand = context.brand_id, pool = pool.len(), participants = config.total_participants, "Opening session");
  Ok(QuizSession::new(id, config, state.rules.clone(), pool, StdRng::from_entropy()))
}

/// Store an outcome reported over HTTP. The score must fit a turn and `won`
/// must agree with the configured threshold.
#[instrument(level = "info", skip(state, input), fields(participant = input.participant, score = input.score))]
pub async fn record_participation(state: &AppState, input: &ParticipationIn) -> Result<Participation, SinkError> {
  let context = parse_context(&input.country_id, &input.brand_id).map_err(|e| SinkError::Invalid(e.to_string()))?;
  if input.participant == 0 {
    return Err(SinkError::Invalid("participant must be 1 or greater".into()));
  }
  if usize::from(input.score) > ROUNDS_PER_TURN {
    return Err(SinkError::Invalid(format!("score must be between 0 and {ROUNDS_PER_TURN}")));
  }
  if input.won != (input.score >= state.rules.win_threshold) {
    return Err(SinkError::Invalid("won does not match score".into()));
  }

  let outcome = Outcome {
    session_id: input.session_id.unwrap_or_else(Uuid::new_v4),
    context,
    participant: input.participant,
    score: input.score,
    won: input.won,
    answers: vec![],
  };
  let participation = Participation::from_outcome(&outcome);
  state.participations.record(participation.clone()).await;
  info!(target: "quiz", id = %participation.id, "Participation recorded via HTTP");
  Ok(participation)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AppConfig;
  use crate::protocol::RawId;
  use crate::session::Phase;

  fn state() -> AppState {
    AppState::from_parts(AppConfig::default(), None)
  }

  fn start(country: &str, brand: &str, total: i64) -> StartSession {
    StartSession { country_id: RawId::Text(country.into()), brand_id: RawId::Text(brand.into()), total_participants: total }
  }

  #[tokio::test]
  async fn opens_playable_session_for_seeded_context() {
    let s = open_session(&state(), &start("1", "1", 2)).await.unwrap();
    assert_eq!(s.phase(), Phase::Ready);
    assert_eq!(s.config().total_participants, 2);
    assert_eq!(s.pool_len(), 5);
  }

  #[tokio::test]
  async fn empty_context_is_unplayable() {
    let s = open_session(&state(), &start("1", "3", 1)).await.unwrap();
    assert_eq!(s.phase(), Phase::Unplayable);
  }

  #[tokio::test]
  async fn configuration_errors_reject_the_session() {
    let st = state();
    assert!(matches!(open_session(&st, &start("1", "1", 0)).await, Err(ConfigError::InvalidParticipants(0))));
    assert!(matches!(
      open_session(&st, &start("one", "1", 1)).await,
      Err(ConfigError::MalformedContext { field: "country", .. })
    ));
  }

  #[tokio::test]
  async fn records_valid_participations_only() {
    let st = state();
    let ok = ParticipationIn {
      country_id: RawId::Number(1),
      brand_id: RawId::Number(1),
      participant: 1,
      score: 2,
      won: true,
      session_id: None,
    };
    record_participation(&st, &ok).await.unwrap();

    let inconsistent = ParticipationIn { won: false, ..ok };
    assert!(matches!(record_participation(&st, &inconsistent).await, Err(SinkError::Invalid(_))));
    let too_high = ParticipationIn { score: 4, won: true, ..inconsistent };
    assert!(record_participation(&st, &too_high).await.is_err());

    assert_eq!(st.participations.stats().await.total, 1);
  }
}
