//! Quiz session controller.
//!
//! `QuizSession` is a synchronous state machine for one device: it sequences
//! `total_participants` turns of `ROUNDS_PER_TURN` timed rounds and emits one
//! `SessionResult` per participant. It never sleeps or performs I/O itself;
//! every transition returns a `Step` whose `Effect`s (timers to schedule, timers
//! to cancel, outcomes to report) are carried out by `runner::SessionRunner`.
//!
//! Timers are identified by a `TimerToken`. Scheduling bumps the session epoch,
//! and a token whose epoch is not current is ignored, so a timer that survives a
//! restart or a superseding transition can never fire into the new state.

pub mod round;
pub mod runner;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GameRules;
use crate::domain::{Context, Outcome, Question, RoundAnswer, SessionResult};
use crate::error::ConfigError;

pub use round::ROUNDS_PER_TURN;

/// Countdown granularity while a question is open.
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Immutable inputs of a session, validated before the session exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
  pub context: Context,
  pub total_participants: u32,
}

impl SessionConfig {
  pub fn new(context: Context, total_participants: i64, rules: &GameRules) -> Result<Self, ConfigError> {
    if total_participants < 1 {
      return Err(ConfigError::InvalidParticipants(total_participants));
    }
    if total_participants > i64::from(rules.max_participants) {
      return Err(ConfigError::TooManyParticipants { requested: total_participants, max: rules.max_participants });
    }
    Ok(Self { context, total_participants: total_participants as u32 })
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
  /// Waiting for the current participant to spin.
  Ready,
  Spinning,
  /// Question open with a running countdown.
  Question,
  Feedback,
  /// A non-final participant finished; waiting for "continue".
  NextParticipant,
  Finished,
  /// Pool too small to play. Terminal.
  Unplayable,
}

/// Presentation-layer intents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
  RequestSpin,
  SubmitAnswer { option_id: u32 },
  ContinueToNextParticipant,
  RestartSession,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
  SpinComplete,
  CountdownTick,
  FeedbackComplete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerToken {
  pub kind: TimerKind,
  pub epoch: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
  /// Deliver `token` back through `on_timer` after `after`. Replaces any pending timer.
  Schedule { token: TimerToken, after: Duration },
  /// Drop every pending timer.
  CancelTimers,
  /// Fire-and-forget write to the Result Sink.
  Report(Outcome),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
  /// The event was not valid for the current phase; nothing changed.
  Ignored,
  Applied(Vec<Effect>),
}

impl Step {
  #[cfg(test)]
  pub fn is_applied(&self) -> bool {
    matches!(self, Step::Applied(_))
  }

  #[cfg(test)]
  pub fn effects(&self) -> &[Effect] {
    match self {
      Step::Applied(effects) => effects,
      Step::Ignored => &[],
    }
  }
}

/// Per-participant state. Created when a turn begins, consumed by `finalize_turn`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipantTurn {
  /// 1-based.
  pub participant: u32,
  /// 1-based, `1..=ROUNDS_PER_TURN`.
  pub round: u8,
  pub score: u8,
  /// Indices into the session pool, one per round, all distinct.
  pub questions: Vec<usize>,
  pub answers: Vec<RoundAnswer>,
}

pub struct QuizSession {
  id: Uuid,
  config: SessionConfig,
  rules: GameRules,
  pool: Arc<[Question]>,
  rng: StdRng,
  phase: Phase,
  turn: Option<ParticipantTurn>,
  time_left: u32,
  feedback: Option<RoundAnswer>,
  results: Vec<SessionResult>,
  epoch: u64,
}

impl QuizSession {
  /// Build a session over a read-only copy of the pool. With fewer than
  /// `ROUNDS_PER_TURN` questions the session starts (and stays) `Unplayable`.
  pub fn new(id: Uuid, config: SessionConfig, rules: GameRules, pool: Vec<Question>, rng: StdRng) -> Self {
    let mut session = Self {
      id,
      config,
      time_left: rules.question_secs,
      rules,
      pool: pool.into(),
      rng,
      phase: Phase::Unplayable,
      turn: None,
      feedback: None,
      results: vec![],
      epoch: 0,
    };
    if session.pool.len() >= ROUNDS_PER_TURN {
      session.turn = Some(session.new_turn(1));
      session.phase = Phase::Ready;
    } else {
      info!(target: "quiz", session = %id, available = session.pool.len(), "Session unplayable: not enough questions");
    }
    session
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn config(&self) -> &SessionConfig {
    &self.config
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn results(&self) -> &[SessionResult] {
    &self.results
  }

  pub fn turn(&self) -> Option<&ParticipantTurn> {
    self.turn.as_ref()
  }

  pub fn time_left(&self) -> u32 {
    self.time_left
  }

  pub fn pool_len(&self) -> usize {
    self.pool.len()
  }

  /// Participant currently playing, or the last one to finish.
  pub fn participant(&self) -> u32 {
    self
      .turn
      .as_ref()
      .map(|t| t.participant)
      .or_else(|| self.results.last().map(|r| r.participant))
      .unwrap_or(1)
  }

  pub fn current_question(&self) -> Option<&Question> {
    let turn = self.turn.as_ref()?;
    let slot = usize::from(turn.round).checked_sub(1)?;
    self.pool.get(*turn.questions.get(slot)?)
  }

  pub fn apply(&mut self, intent: Intent) -> Step {
    match intent {
      Intent::RequestSpin => self.request_spin(),
      Intent::SubmitAnswer { option_id } => self.submit_answer(option_id),
      Intent::ContinueToNextParticipant => self.advance_participant(),
      Intent::RestartSession => self.restart(),
    }
  }

  pub fn request_spin(&mut self) -> Step {
    if self.phase != Phase::Ready {
      return self.ignore("request_spin");
    }
    self.phase = Phase::Spinning;
    Step::Applied(vec![self.schedule(TimerKind::SpinComplete, self.rules.spin_duration())])
  }

  /// At most once per round: after the first answer the phase is `Feedback`.
  pub fn submit_answer(&mut self, option_id: u32) -> Step {
    if self.phase != Phase::Question {
      return self.ignore("submit_answer");
    }
    let Some((question_id, correct)) = self
      .current_question()
      .and_then(|q| q.option(option_id).map(|o| (q.id, o.is_correct)))
    else {
      debug!(target: "quiz", session = %self.id, option_id, "Unknown option for current question");
      return Step::Ignored;
    };
    self.record_answer(question_id, Some(option_id), correct)
  }

  /// Countdown expiry: scored as incorrect, otherwise identical to an answer.
  pub fn on_timeout(&mut self) -> Step {
    if self.phase != Phase::Question {
      return self.ignore("on_timeout");
    }
    let Some(question_id) = self.current_question().map(|q| q.id) else {
      return Step::Ignored;
    };
    self.time_left = 0;
    self.record_answer(question_id, None, false)
  }

  pub fn advance_participant(&mut self) -> Step {
    if self.phase != Phase::NextParticipant {
      return self.ignore("advance_participant");
    }
    let next = self.results.last().map_or(1, |r| r.participant + 1);
    self.turn = Some(self.new_turn(next));
    self.time_left = self.rules.question_secs;
    self.phase = Phase::Ready;
    info!(target: "quiz", session = %self.id, participant = next, "Next participant");
    Step::Applied(vec![])
  }

  /// Hard reset to participant 1. Pending timers are invalidated before state is touched.
  pub fn restart(&mut self) -> Step {
    if self.phase == Phase::Unplayable {
      return self.ignore("restart");
    }
    self.epoch += 1;
    self.results.clear();
    self.feedback = None;
    self.turn = Some(self.new_turn(1));
    self.time_left = self.rules.question_secs;
    self.phase = Phase::Ready;
    info!(target: "quiz", session = %self.id, "Session restarted");
    Step::Applied(vec![Effect::CancelTimers])
  }

  pub fn on_timer(&mut self, token: TimerToken) -> Step {
    if token.epoch != self.epoch {
      debug!(target: "quiz", session = %self.id, ?token, current = self.epoch, "Stale timer ignored");
      return Step::Ignored;
    }
    match token.kind {
      TimerKind::SpinComplete => self.complete_spin(),
      TimerKind::CountdownTick => self.tick(),
      TimerKind::FeedbackComplete => self.complete_feedback(),
    }
  }

  fn complete_spin(&mut self) -> Step {
    if self.phase != Phase::Spinning {
      return Step::Ignored;
    }
    self.phase = Phase::Question;
    self.time_left = self.rules.question_secs;
    self.feedback = None;
    Step::Applied(vec![self.schedule(TimerKind::CountdownTick, COUNTDOWN_TICK)])
  }

  fn tick(&mut self) -> Step {
    if self.phase != Phase::Question {
      return Step::Ignored;
    }
    self.time_left = self.time_left.saturating_sub(1);
    if self.time_left == 0 {
      return self.on_timeout();
    }
    Step::Applied(vec![self.schedule(TimerKind::CountdownTick, COUNTDOWN_TICK)])
  }

  fn record_answer(&mut self, question_id: u32, selected_option_id: Option<u32>, correct: bool) -> Step {
    let Some(turn) = self.turn.as_mut() else {
      return Step::Ignored;
    };
    if correct {
      turn.score += 1;
    }
    let answer = RoundAnswer { round: turn.round, question_id, selected_option_id, correct };
    debug!(target: "quiz", session = %self.id, participant = turn.participant, round = turn.round, correct, timed_out = selected_option_id.is_none(), "Round answered");
    turn.answers.push(answer.clone());
    self.feedback = Some(answer);
    self.phase = Phase::Feedback;
    Step::Applied(vec![self.schedule(TimerKind::FeedbackComplete, self.rules.feedback_duration())])
  }

  fn complete_feedback(&mut self) -> Step {
    if self.phase != Phase::Feedback {
      return Step::Ignored;
    }
    self.feedback = None;
    if let Some(turn) = self.turn.as_mut() {
      if usize::from(turn.round) < ROUNDS_PER_TURN {
        turn.round += 1;
        self.time_left = self.rules.question_secs;
        self.phase = Phase::Ready;
        return Step::Applied(vec![]);
      }
    }
    match self.turn.take() {
      Some(turn) => self.finalize_turn(turn),
      None => Step::Ignored,
    }
  }

  /// Close a turn: record its result, emit the outcome report, pick the next phase.
  /// The score comes from the turn handed in, not from session state.
  fn finalize_turn(&mut self, turn: ParticipantTurn) -> Step {
    let won = turn.score >= self.rules.win_threshold;
    let outcome = Outcome {
      session_id: self.id,
      context: self.config.context,
      participant: turn.participant,
      score: turn.score,
      won,
      answers: turn.answers.clone(),
    };
    info!(target: "quiz", session = %self.id, participant = turn.participant, score = turn.score, won, "Turn finalized");
    self.results.push(SessionResult { participant: turn.participant, score: turn.score, won, answers: turn.answers });
    self.phase = if turn.participant < self.config.total_participants { Phase::NextParticipant } else { Phase::Finished };
    Step::Applied(vec![Effect::Report(outcome)])
  }

  fn new_turn(&mut self, participant: u32) -> ParticipantTurn {
    ParticipantTurn {
      participant,
      round: 1,
      score: 0,
      questions: round::draw_round(self.pool.len(), &mut self.rng),
      answers: Vec::with_capacity(ROUNDS_PER_TURN),
    }
  }

  fn schedule(&mut self, kind: TimerKind, after: Duration) -> Effect {
    self.epoch += 1;
    Effect::Schedule { token: TimerToken { kind, epoch: self.epoch }, after }
  }

  fn ignore(&self, intent: &'static str) -> Step {
    debug!(target: "quiz", session = %self.id, intent, phase = ?self.phase, "Intent not valid in current phase");
    Step::Ignored
  }
}
