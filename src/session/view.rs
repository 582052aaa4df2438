//! Snapshot of a session for the presentation layer, published after every transition.

use serde::Serialize;
use uuid::Uuid;

use super::{Phase, QuizSession, ROUNDS_PER_TURN};
use crate::domain::{Question, SessionResult};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
  pub session_id: Uuid,
  pub phase: Phase,
  pub participant: u32,
  pub total_participants: u32,
  pub round: u8,
  pub rounds_per_turn: u8,
  pub score: u8,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub time_left: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub question: Option<QuestionView>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub feedback: Option<FeedbackView>,
  pub results: Vec<SessionResult>,
  /// Blocking message shown in place of the game when it cannot be played.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

/// A question as shown while it is open: correctness is not revealed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
  pub id: u32,
  pub text: String,
  pub options: Vec<OptionView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptionView {
  pub id: u32,
  pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
  pub selected_option_id: Option<u32>,
  pub correct: bool,
  pub timed_out: bool,
  pub correct_option_ids: Vec<u32>,
}

impl From<&Question> for QuestionView {
  fn from(q: &Question) -> Self {
    Self {
      id: q.id,
      text: q.text.clone(),
      options: q.options.iter().map(|o| OptionView { id: o.id, text: o.text.clone() }).collect(),
    }
  }
}

impl QuizSession {
  pub fn view(&self) -> SessionView {
    let (round, score) = match (self.turn(), self.results.last()) {
      (Some(turn), _) => (turn.round, turn.score),
      (None, Some(last)) => (ROUNDS_PER_TURN as u8, last.score),
      (None, None) => (1, 0),
    };

    let asking = matches!(self.phase, Phase::Question | Phase::Feedback);
    let question = if asking { self.current_question() } else { None };

    let feedback = match (self.phase, &self.feedback, question) {
      (Phase::Feedback, Some(answer), Some(q)) => Some(FeedbackView {
        selected_option_id: answer.selected_option_id,
        correct: answer.correct,
        timed_out: answer.selected_option_id.is_none(),
        correct_option_ids: q.correct_option_ids(),
      }),
      _ => None,
    };

    let message = (self.phase == Phase::Unplayable).then(|| {
      format!(
        "Not enough questions available for this game ({} of {} required). Please contact the administrator.",
        self.pool_len(),
        ROUNDS_PER_TURN
      )
    });

    SessionView {
      session_id: self.id,
      phase: self.phase,
      participant: self.participant(),
      total_participants: self.config.total_participants,
      round,
      rounds_per_turn: ROUNDS_PER_TURN as u8,
      score,
      time_left: asking.then_some(self.time_left()),
      question: question.map(QuestionView::from),
      feedback,
      results: self.results.clone(),
      message,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::GameRules;
  use crate::domain::Context;
  use crate::seeds::seed_questions;
  use crate::session::{Effect, SessionConfig, Step, TimerToken};
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn session(pool_size: usize) -> QuizSession {
    let rules = GameRules::default();
    let config = SessionConfig::new(Context::new(1, 1), 2, &rules).unwrap();
    let pool = seed_questions().into_iter().take(pool_size).collect();
    QuizSession::new(Uuid::new_v4(), config, rules, pool, StdRng::seed_from_u64(3))
  }

  fn token(step: &Step) -> TimerToken {
    match step.effects() {
      [Effect::Schedule { token, .. }] => *token,
      other => panic!("expected one timer, got {other:?}"),
    }
  }

  #[test]
  fn ready_view_has_no_question() {
    let v = session(5).view();
    assert_eq!(v.phase, Phase::Ready);
    assert_eq!((v.participant, v.total_participants, v.round, v.score), (1, 2, 1, 0));
    assert!(v.question.is_none());
    assert!(v.time_left.is_none());
    assert!(v.message.is_none());
  }

  #[test]
  fn open_question_hides_correctness() {
    let mut s = session(5);
    let spin = s.request_spin();
    s.on_timer(token(&spin));
    let v = s.view();
    assert_eq!(v.time_left, Some(15));
    let q = v.question.expect("question shown");
    assert_eq!(q.options.len(), 3);
    let json = serde_json::to_string(&q).unwrap();
    assert!(!json.contains("isCorrect"));
    assert!(v.feedback.is_none());
  }

  #[test]
  fn feedback_reveals_correct_option() {
    let mut s = session(5);
    let spin = s.request_spin();
    s.on_timer(token(&spin));
    let q = s.current_question().unwrap().clone();
    let wrong = q.options.iter().find(|o| !o.is_correct).unwrap().id;
    s.submit_answer(wrong);

    let fb = s.view().feedback.expect("feedback shown");
    assert_eq!(fb.selected_option_id, Some(wrong));
    assert!(!fb.correct);
    assert!(!fb.timed_out);
    assert_eq!(fb.correct_option_ids, q.correct_option_ids());
  }

  #[test]
  fn unplayable_view_carries_message() {
    let v = session(2).view();
    assert_eq!(v.phase, Phase::Unplayable);
    assert!(v.message.unwrap().contains("2 of 3"));
  }

  #[test]
  fn phase_serializes_screaming_snake() {
    assert_eq!(serde_json::to_string(&Phase::NextParticipant).unwrap(), "\"NEXT_PARTICIPANT\"");
  }
}
