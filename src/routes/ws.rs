//! WebSocket upgrade + game loop. One socket drives at most one quiz session.
//! Client messages are parsed as JSON and forwarded as intents; every state
//! change of the session is pushed back as a `state` message.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::logic::open_session;
use crate::protocol::{ClientWsMessage, ServerWsMessage, StartSession};
use crate::session::runner::SessionRunner;
use crate::session::Intent;
use crate::session::view::SessionView;
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "wheel_quiz_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// The socket's active session, if any.
#[derive(Default)]
struct Connection {
  runner: Option<SessionRunner>,
  views: Option<watch::Receiver<SessionView>>,
}

impl Connection {
  #[instrument(level = "info", skip(self, state))]
  async fn handle(&mut self, msg: ClientWsMessage, state: &AppState) -> Option<ServerWsMessage> {
    match msg {
      ClientWsMessage::Ping => Some(ServerWsMessage::Pong),
      ClientWsMessage::StartSession(req) => {
        let (reply, replaced) = self.start(&req, state).await;
        if let Some(old) = replaced {
          debug!(target: "quiz", session = %old.id(), "Previous session replaced");
        }
        Some(reply)
      }
      other => self.forward(other.intent()?).await,
    }
  }

  /// Open a session for this socket. Whatever was playing before is shut
  /// down first and handed back.
  async fn start(&mut self, req: &StartSession, state: &AppState) -> (ServerWsMessage, Option<SessionRunner>) {
    let replaced = self.close();
    let reply = match open_session(state, req).await {
      Ok(session) => {
        let brand = state.brand(&session.config().context).cloned();
        let runner = SessionRunner::spawn(session, state.sink.clone());
        let mut views = runner.subscribe();
        let view = views.borrow_and_update().clone();
        let session_id = runner.id();
        info!(target: "quiz", session = %session_id, phase = ?view.phase, "WS session started");
        self.runner = Some(runner);
        self.views = Some(views);
        ServerWsMessage::SessionStarted { session_id, brand, view }
      }
      Err(e) => {
        warn!(target: "quiz", error = %e, "WS session rejected");
        ServerWsMessage::Rejected { message: e.to_string() }
      }
    };
    (reply, replaced)
  }

  async fn forward(&self, intent: Intent) -> Option<ServerWsMessage> {
    let Some(runner) = &self.runner else {
      return Some(ServerWsMessage::Error { message: "No active session; send start_session first.".into() });
    };
    if !runner.send(intent).await {
      warn!(target: "quiz", session = %runner.id(), ?intent, "Intent for a closed session");
      return Some(ServerWsMessage::Error { message: "Session closed.".into() });
    }
    None
  }

  /// Shut the active session down, returning its handle.
  fn close(&mut self) -> Option<SessionRunner> {
    self.views = None;
    let runner = self.runner.take()?;
    runner.shutdown();
    Some(runner)
  }
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "wheel_quiz_backend", "WebSocket connected");
  let mut conn = Connection::default();

  loop {
    tokio::select! {
      incoming = socket.recv() => {
        let Some(Ok(msg)) = incoming else { break };
        match msg {
          Message::Text(txt) => {
            let reply = match serde_json::from_str::<ClientWsMessage>(&txt) {
              Ok(incoming) => {
                debug!(target: "wheel_quiz_backend", "WS received: {:?}", &incoming);
                conn.handle(incoming, &state).await
              }
              Err(e) => Some(ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }),
            };
            if let Some(reply) = reply {
              if !send_json(&mut socket, &reply).await {
                break;
              }
            }
          }
          Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
          Message::Close(_) => break,
          _ => {}
        }
      }
      view = next_view(&mut conn.views) => {
        match view {
          Some(view) => {
            if !send_json(&mut socket, &ServerWsMessage::State { view }).await {
              break;
            }
          }
          None => conn.views = None,
        }
      }
    }
  }

  conn.close();
  info!(target: "wheel_quiz_backend", "WebSocket disconnected");
}

/// Resolves with the next published view; pends forever without a session.
async fn next_view(views: &mut Option<watch::Receiver<SessionView>>) -> Option<SessionView> {
  match views {
    Some(rx) => {
      rx.changed().await.ok()?;
      let view = rx.borrow_and_update().clone();
      Some(view)
    }
    None => std::future::pending().await,
  }
}

async fn send_json(socket: &mut WebSocket, msg: &ServerWsMessage) -> bool {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  match socket.send(Message::Text(out)).await {
    Ok(()) => true,
    Err(e) => {
      error!(target: "wheel_quiz_backend", error = %e, "WS send error");
      false
    }
  }
}
