//! HTTP client for an external campaign backend that owns the question bank and
//! the participation table.
//!
//! Wire shapes follow that backend: questions come back with `texto` and
//! `respuestas[]`, outcomes are posted as `{aciertos, gano, marca_bayer_id, numero_participante}`.
//! The session token (if any) is sent as the `token` cookie and never logged.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE, USER_AGENT};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument, warn};

use crate::domain::{AnswerOption, Context, Outcome, Question};
use crate::error::{SinkError, SourceError};
use crate::ports::{QuestionSource, ResultSink};

#[derive(Clone)]
pub struct RemoteBackend {
  pub client: reqwest::Client,
  pub base_url: String,
  token: Option<String>,
}

#[derive(Deserialize)]
struct RemoteQuestion {
  id: u32,
  texto: String,
  pais_id: u32,
  marca_bayer_id: u32,
  #[serde(default)]
  respuestas: Vec<RemoteAnswer>,
}

#[derive(Deserialize)]
struct RemoteAnswer {
  id: u32,
  texto: String,
  #[serde(deserialize_with = "bool_or_int")]
  es_correcta: bool,
}

#[derive(Serialize)]
struct RemoteParticipation {
  aciertos: u8,
  gano: bool,
  marca_bayer_id: u32,
  numero_participante: u32,
}

// MySQL-backed endpoints serialize BOOLEAN columns as 0/1.
fn bool_or_int<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Flag {
    Bool(bool),
    Int(i64),
  }
  Ok(match Flag::deserialize(d)? {
    Flag::Bool(b) => b,
    Flag::Int(i) => i != 0,
  })
}

impl From<RemoteQuestion> for Question {
  fn from(r: RemoteQuestion) -> Self {
    Question {
      id: r.id,
      text: r.texto,
      country_id: r.pais_id,
      brand_id: r.marca_bayer_id,
      options: r
        .respuestas
        .into_iter()
        .map(|a| AnswerOption { id: a.id, text: a.texto, is_correct: a.es_correcta })
        .collect(),
    }
  }
}

fn decode_questions(body: &str) -> Result<Vec<Question>, SourceError> {
  let raw: Vec<RemoteQuestion> = serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;
  Ok(raw.into_iter().map(Question::from).collect())
}

impl RemoteBackend {
  /// Construct the client if QUIZ_BACKEND_URL is set; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let base_url = std::env::var("QUIZ_BACKEND_URL").ok()?;
    let token = std::env::var("QUIZ_BACKEND_TOKEN").ok().filter(|t| !t.is_empty());
    Self::new(base_url, token)
  }

  pub fn new(base_url: impl Into<String>, token: Option<String>) -> Option<Self> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build().ok()?;
    Some(Self { client, base_url: base_url.into().trim_end_matches('/').to_string(), token })
  }

  fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    let builder = builder.header(USER_AGENT, "wheel-quiz-backend/0.1");
    match &self.token {
      Some(t) => builder.header(COOKIE, format!("token={t}")),
      None => builder,
    }
  }
}

#[async_trait]
impl QuestionSource for RemoteBackend {
  #[instrument(level = "info", skip(self), fields(country = context.country_id, brand = context.brand_id))]
  async fn fetch_questions(&self, context: &Context) -> Result<Vec<Question>, SourceError> {
    let url = format!("{}/api/game/questions", self.base_url);
    let started = Instant::now();
    let resp = self
      .request(self.client.get(&url))
      .query(&[("paisId", context.country_id), ("marcaBayerId", context.brand_id)])
      .send()
      .await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
      warn!(target: "wheel_quiz_backend", %status, "Remote question fetch failed");
      return Err(SourceError::Unavailable(format!("status {status}")));
    }
    let questions = decode_questions(&body)?;
    info!(target: "wheel_quiz_backend", count = questions.len(), elapsed_ms = started.elapsed().as_millis() as u64, "Fetched remote questions");
    Ok(questions)
  }
}

#[async_trait]
impl ResultSink for RemoteBackend {
  #[instrument(level = "info", skip(self, outcome), fields(session = %outcome.session_id, participant = outcome.participant))]
  async fn report_outcome(&self, outcome: &Outcome) -> Result<(), SinkError> {
    let url = format!("{}/api/game/participation", self.base_url);
    let body = RemoteParticipation {
      aciertos: outcome.score,
      gano: outcome.won,
      marca_bayer_id: outcome.context.brand_id,
      numero_participante: outcome.participant,
    };
    let resp = self
      .request(self.client.post(&url))
      .header(CONTENT_TYPE, "application/json")
      .json(&body)
      .send()
      .await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(SinkError::Rejected { status: status.as_u16(), body });
    }
    Ok(())
  }
}
