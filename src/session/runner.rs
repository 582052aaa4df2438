//! Async driver for one `QuizSession`.
//!
//! The session lives inside a spawned actor task. Intents and timer
//! completions enter one mpsc channel, so the state machine is never invoked
//! concurrently with itself. Views go out on a `watch` channel.
//!
//! At most one timer is pending at a time: a sleeping task guarded by a child
//! of the session's shutdown `CancellationToken`. Scheduling a new timer or a
//! `CancelTimers` effect cancels the previous guard; dropping the runner
//! cancels the shutdown token, which stops the actor and every timer.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use super::view::SessionView;
use super::{Effect, Intent, QuizSession, Step, TimerToken};
use crate::ports::ResultSink;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug)]
enum Command {
  Intent(Intent),
  Timer(TimerToken),
}

/// Handle owned by the presentation layer (one per device / socket).
pub struct SessionRunner {
  session_id: Uuid,
  commands: mpsc::Sender<Command>,
  views: watch::Receiver<SessionView>,
  shutdown: CancellationToken,
}

impl SessionRunner {
  pub fn spawn(session: QuizSession, sink: Arc<dyn ResultSink>) -> Self {
    let session_id = session.id();
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let (view_tx, view_rx) = watch::channel(session.view());
    let shutdown = CancellationToken::new();

    let actor = Actor {
      session,
      sink,
      commands: tx.clone(),
      views: view_tx,
      shutdown: shutdown.clone(),
      timer: None,
    };
    tokio::spawn(actor.run(rx).instrument(info_span!("quiz_session", session = %session_id)));

    Self { session_id, commands: tx, views: view_rx, shutdown }
  }

  pub fn id(&self) -> Uuid {
    self.session_id
  }

  /// Forward an intent. Returns false once the session has been shut down.
  pub async fn send(&self, intent: Intent) -> bool {
    !self.shutdown.is_cancelled() && self.commands.send(Command::Intent(intent)).await.is_ok()
  }

  pub fn subscribe(&self) -> watch::Receiver<SessionView> {
    self.views.clone()
  }

  #[cfg(test)]
  pub fn current(&self) -> SessionView {
    self.views.borrow().clone()
  }

  pub fn shutdown(&self) {
    self.shutdown.cancel();
  }
}

impl Drop for SessionRunner {
  fn drop(&mut self) {
    self.shutdown.cancel();
  }
}

struct Actor {
  session: QuizSession,
  sink: Arc<dyn ResultSink>,
  commands: mpsc::Sender<Command>,
  views: watch::Sender<SessionView>,
  shutdown: CancellationToken,
  timer: Option<CancellationToken>,
}

impl Actor {
  async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
    info!(target: "quiz", phase = ?self.session.phase(), "Session started");
    loop {
      let cmd = tokio::select! {
        biased;
        _ = self.shutdown.cancelled() => break,
        cmd = rx.recv() => match cmd {
          Some(cmd) => cmd,
          None => break,
        },
      };

      let step = match cmd {
        Command::Intent(intent) => self.session.apply(intent),
        Command::Timer(token) => self.session.on_timer(token),
      };
      let Step::Applied(effects) = step else { continue };

      for effect in effects {
        self.execute(effect);
      }
      self.views.send_replace(self.session.view());
    }
    self.cancel_timer();
    info!(target: "quiz", results = self.session.results().len(), "Session closed");
  }

  fn execute(&mut self, effect: Effect) {
    match effect {
      Effect::Schedule { token, after } => {
        self.cancel_timer();
        let guard = self.shutdown.child_token();
        self.timer = Some(guard.clone());
        let tx = self.commands.clone();
        tokio::spawn(async move {
          tokio::select! {
            _ = guard.cancelled() => {}
            _ = tokio::time::sleep(after) => {
              let _ = tx.send(Command::Timer(token)).await;
            }
          }
        });
      }
      Effect::CancelTimers => self.cancel_timer(),
      Effect::Report(outcome) => {
        let sink = self.sink.clone();
        tokio::spawn(
          async move {
            match sink.report_outcome(&outcome).await {
              Ok(()) => debug!(target: "quiz", participant = outcome.participant, "Outcome recorded"),
              Err(e) => error!(
                target: "quiz",
                session = %outcome.session_id,
                participant = outcome.participant,
                score = outcome.score,
                won = outcome.won,
                error = %e,
                "Failed to record outcome; game continues"
              ),
            }
          }
          .in_current_span(),
        );
      }
    }
  }

  fn cancel_timer(&mut self) {
    if let Some(t) = self.timer.take() {
      t.cancel();
    }
  }
}
