//! In-process question bank and participation log.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, instrument};

use crate::config::QuestionCfg;
use crate::domain::{AnswerOption, Context, Outcome, Participation, Question};
use crate::error::{SinkError, SourceError};
use crate::ports::{QuestionSource, ResultSink};

/// Questions indexed by context. Immutable after construction.
#[derive(Clone, Debug, Default)]
pub struct QuestionBank {
  by_context: HashMap<Context, Vec<Question>>,
}

impl QuestionBank {
  /// Build from configured entries first, then built-in seeds.
  /// Seeds never replace a configured question id.
  pub fn build(configured: &[QuestionCfg], seeds: Vec<Question>) -> Self {
    let mut bank = Self::default();
    let mut taken: HashSet<u32> = configured.iter().filter_map(|q| q.id).collect();
    let mut next_id = taken.iter().copied().max().unwrap_or(0).max(1000).checked_add(1);

    for cfg in configured {
      let id = match (cfg.id, next_id) {
        (Some(id), _) => id,
        (None, Some(id)) => {
          next_id = id.checked_add(1);
          id
        }
        (None, None) => {
          error!(target: "wheel_quiz_backend", text = %cfg.text, "Skipping bank question: no free id left");
          continue;
        }
      };
      taken.insert(id);
      match question_from_cfg(id, cfg) {
        Ok(q) => bank.insert(q),
        Err(reason) => {
          error!(target: "wheel_quiz_backend", %id, %reason, "Skipping bank question");
        }
      }
    }

    for q in seeds {
      if taken.insert(q.id) {
        bank.insert(q);
      }
    }

    for (ctx, qs) in &bank.by_context {
      info!(target: "wheel_quiz_backend", country = ctx.country_id, brand = ctx.brand_id, questions = qs.len(), "Question bank inventory");
    }
    bank
  }

  pub fn insert(&mut self, q: Question) {
    self.by_context.entry(q.context()).or_default().push(q);
  }

  pub fn questions_for(&self, context: &Context) -> Vec<Question> {
    self.by_context.get(context).cloned().unwrap_or_default()
  }
}

fn question_from_cfg(id: u32, cfg: &QuestionCfg) -> Result<Question, &'static str> {
  if cfg.text.trim().is_empty() {
    return Err("empty text");
  }
  if cfg.options.len() < 2 {
    return Err("fewer than two options");
  }
  if !cfg.options.iter().any(|o| o.correct) {
    return Err("no option flagged correct");
  }
  // Option ids are `id * 10 + n`, n starting at 1.
  let base = id.checked_mul(10).ok_or("id too large to number its options")?;
  let options = cfg
    .options
    .iter()
    .enumerate()
    .map(|(i, o)| {
      let id = u32::try_from(i + 1)
        .ok()
        .and_then(|n| base.checked_add(n))
        .ok_or("id too large to number its options")?;
      Ok(AnswerOption { id, text: o.text.clone(), is_correct: o.correct })
    })
    .collect::<Result<Vec<_>, &'static str>>()?;
  Ok(Question { id, text: cfg.text.clone(), country_id: cfg.country_id, brand_id: cfg.brand_id, options })
}

#[async_trait]
impl QuestionSource for QuestionBank {
  async fn fetch_questions(&self, context: &Context) -> Result<Vec<Question>, SourceError> {
    Ok(self.questions_for(context))
  }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
  pub total: usize,
  pub winners: usize,
  pub by_country: Vec<GroupCount>,
  pub by_brand: Vec<GroupCount>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct GroupCount {
  pub id: u32,
  pub count: usize,
}

/// Outcomes recorded in this process, in arrival order.
#[derive(Clone, Default)]
pub struct ParticipationLog {
  entries: Arc<RwLock<Vec<Participation>>>,
}

impl ParticipationLog {
  pub fn new() -> Self {
    Self::default()
  }

  #[instrument(level = "debug", skip(self, p), fields(participant = p.participant, score = p.score))]
  pub async fn record(&self, p: Participation) {
    self.entries.write().await.push(p);
  }

  /// Newest first.
  pub async fn entries(&self) -> Vec<Participation> {
    let mut out = self.entries.read().await.clone();
    out.reverse();
    out
  }

  pub async fn stats(&self) -> ReportStats {
    let entries = self.entries.read().await;
    let mut by_country = BTreeMap::<u32, usize>::new();
    let mut by_brand = BTreeMap::<u32, usize>::new();
    for p in entries.iter() {
      *by_country.entry(p.context.country_id).or_default() += 1;
      *by_brand.entry(p.context.brand_id).or_default() += 1;
    }
    let groups = |m: BTreeMap<u32, usize>| -> Vec<GroupCount> {
      m.into_iter().map(|(id, count)| GroupCount { id, count }).collect()
    };
    ReportStats {
      total: entries.len(),
      winners: entries.iter().filter(|p| p.won).count(),
      by_country: groups(by_country),
      by_brand: groups(by_brand),
    }
  }
}

#[async_trait]
impl ResultSink for ParticipationLog {
  async fn report_outcome(&self, outcome: &Outcome) -> Result<(), SinkError> {
    self.record(Participation::from_outcome(outcome)).await;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::OptionCfg;
  use crate::seeds::seed_questions;
  use uuid::Uuid;

  fn cfg(id: Option<u32>, brand_id: u32, options: &[(&str, bool)]) -> QuestionCfg {
    QuestionCfg {
      id,
      country_id: 1,
      brand_id,
      text: "Q".into(),
      options: options.iter().map(|(t, c)| OptionCfg { text: (*t).into(), correct: *c }).collect(),
    }
  }

  #[tokio::test]
  async fn bank_groups_by_context_and_skips_invalid_entries() {
    let configured = vec![
      cfg(None, 2, &[("a", true), ("b", false)]),
      cfg(None, 2, &[("a", false), ("b", false)]),
      cfg(None, 2, &[("only", true)]),
    ];
    let bank = QuestionBank::build(&configured, seed_questions());

    let brand2 = bank.fetch_questions(&Context::new(1, 2)).await.unwrap();
    assert_eq!(brand2.len(), 1);
    assert_eq!(brand2[0].correct_option_ids().len(), 1);

    let brand1 = bank.fetch_questions(&Context::new(1, 1)).await.unwrap();
    assert_eq!(brand1.len(), 5);
    assert!(bank.fetch_questions(&Context::new(9, 9)).await.unwrap().is_empty());
  }

  #[test]
  fn configured_ids_win_over_seeds() {
    let configured = vec![cfg(Some(1), 3, &[("a", true), ("b", false)])];
    let bank = QuestionBank::build(&configured, seed_questions());
    assert_eq!(bank.questions_for(&Context::new(1, 3)).len(), 1);
    assert_eq!(bank.questions_for(&Context::new(1, 1)).len(), 4);
  }

  #[test]
  fn large_ids_are_skipped_without_overflow() {
    let two = [("a", true), ("b", false)];
    let bank = QuestionBank::build(&[cfg(Some(500_000_000), 1, &two)], vec![]);
    assert!(bank.questions_for(&Context::new(1, 1)).is_empty());

    // No id left above u32::MAX for the auto-numbered entry either.
    let bank = QuestionBank::build(&[cfg(Some(u32::MAX), 1, &two), cfg(None, 1, &two)], vec![]);
    assert!(bank.questions_for(&Context::new(1, 1)).is_empty());

    let bank = QuestionBank::build(&[cfg(Some(400_000_000), 1, &two), cfg(None, 1, &two)], vec![]);
    let qs = bank.questions_for(&Context::new(1, 1));
    assert_eq!(qs.iter().map(|q| q.id).collect::<Vec<_>>(), vec![400_000_000, 400_000_001]);
    assert_eq!(qs[0].correct_option_ids(), vec![4_000_000_001]);
  }

  #[tokio::test]
  async fn log_reports_totals_and_groups() {
    let log = ParticipationLog::new();
    let session_id = Uuid::new_v4();
    for (brand, participant, score) in [(1, 1, 2), (1, 2, 0), (2, 1, 3)] {
      let outcome = Outcome {
        session_id,
        context: Context::new(1, brand),
        participant,
        score,
        won: score >= 2,
        answers: vec![],
      };
      log.report_outcome(&outcome).await.unwrap();
    }

    let stats = log.stats().await;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.winners, 2);
    assert_eq!(stats.by_country, vec![GroupCount { id: 1, count: 3 }]);
    assert_eq!(stats.by_brand, vec![GroupCount { id: 1, count: 2 }, GroupCount { id: 2, count: 1 }]);

    let entries = log.entries().await;
    assert_eq!(entries[0].context.brand_id, 2);
    assert_eq!(entries[2].participant, 1);
  }
}
