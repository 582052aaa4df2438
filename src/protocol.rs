//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Brand, Participation};
use crate::session::view::SessionView;
use crate::session::Intent;
use crate::store::ReportStats;

/// Identifier as sent by clients: route segments arrive as strings, JSON forms
/// may send numbers. Validation happens in `Context::parse`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{n}"),
            RawId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSession {
    pub country_id: RawId,
    pub brand_id: RawId,
    #[serde(default = "one")]
    pub total_participants: i64,
}

fn one() -> i64 {
    1
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartSession(StartSession),
    RequestSpin,
    SubmitAnswer {
        #[serde(rename = "optionId")]
        option_id: u32,
    },
    ContinueToNextParticipant,
    RestartSession,
}

impl ClientWsMessage {
    /// The session intent carried by this message, if any.
    pub fn intent(&self) -> Option<Intent> {
        match self {
            ClientWsMessage::RequestSpin => Some(Intent::RequestSpin),
            ClientWsMessage::SubmitAnswer { option_id } => Some(Intent::SubmitAnswer { option_id: *option_id }),
            ClientWsMessage::ContinueToNextParticipant => Some(Intent::ContinueToNextParticipant),
            ClientWsMessage::RestartSession => Some(Intent::RestartSession),
            ClientWsMessage::Ping | ClientWsMessage::StartSession(_) => None,
        }
    }
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    SessionStarted {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        brand: Option<Brand>,
        view: SessionView,
    },
    State {
        view: SessionView,
    },
    /// Configuration error: no session was created.
    Rejected {
        message: String,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsQuery {
    pub country_id: String,
    pub brand_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationIn {
    pub country_id: RawId,
    pub brand_id: RawId,
    pub participant: u32,
    pub score: u8,
    pub won: bool,
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct ParticipationOut {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    #[default]
    Stats,
    Rows,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default, rename = "type")]
    pub kind: ReportKind,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum ReportOut {
    Stats(ReportStats),
    Rows(Vec<Participation>),
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_messages() {
        let m: ClientWsMessage =
            serde_json::from_str(r#"{"type":"start_session","countryId":"1","brandId":2}"#).unwrap();
        match m {
            ClientWsMessage::StartSession(s) => {
                assert_eq!(s.country_id.to_string(), "1");
                assert_eq!(s.brand_id.to_string(), "2");
                assert_eq!(s.total_participants, 1);
            }
            other => panic!("unexpected {other:?}"),
        }

        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"submit_answer","optionId":31}"#).unwrap();
        assert_eq!(m.intent(), Some(Intent::SubmitAnswer { option_id: 31 }));

        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"continue_to_next_participant"}"#).unwrap();
        assert_eq!(m.intent(), Some(Intent::ContinueToNextParticipant));
        assert!(serde_json::from_str::<ClientWsMessage>(r#"{"type":"ping"}"#).unwrap().intent().is_none());
    }

    #[test]
    fn server_messages_are_tagged() {
        let out = serde_json::to_value(ServerWsMessage::Rejected { message: "bad".into() }).unwrap();
        assert_eq!(out, serde_json::json!({"type": "rejected", "message": "bad"}));
    }

    #[test]
    fn report_kind_defaults_to_stats() {
        let q: ReportQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.kind, ReportKind::Stats);
        let q: ReportQuery = serde_json::from_str(r#"{"type":"rows"}"#).unwrap();
        assert_eq!(q.kind, ReportKind::Rows);
    }
}
