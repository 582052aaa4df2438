//! Collaborator ports consumed by the quiz controller.
//!
//! Implementations live in `store` (in-process) and `remote` (HTTP backend).

use async_trait::async_trait;

use crate::domain::{Context, Outcome, Question};
use crate::error::{SinkError, SourceError};

/// Supplies the full question pool for a context in a single read.
/// The controller samples on its own; sources never pre-select a subset.
#[async_trait]
pub trait QuestionSource: Send + Sync {
  async fn fetch_questions(&self, context: &Context) -> Result<Vec<Question>, SourceError>;
}

/// Durably records one participant's outcome.
#[async_trait]
pub trait ResultSink: Send + Sync {
  async fn report_outcome(&self, outcome: &Outcome) -> Result<(), SinkError>;
}
