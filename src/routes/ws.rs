//! WebSocket lesson play. Each connection owns one `LessonPlay`: the client
//! says hello, starts a lesson and sends engine inputs; the server answers
//! with views, haptics and results. `Wake` delays are honored by sleeping in
//! the socket loop, so inputs sent meanwhile wait in the socket buffer.

use std::{sync::Arc, time::Duration};

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, error, info, instrument, warn};

use crate::engine::{Effect, Input};
use crate::error::CoreError;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::runner::{LessonRunner, LessonSession, Next, RunnerState, Turn};
use crate::sessions::SessionContext;
use crate::state::AppState;
use crate::domain::DbId;
use crate::util::trunc_for_log;

/// Raw payloads longer than this are cut in logs.
const WS_LOG_LIMIT: usize = 256;

/// Outgoing messages for one client event, plus the delay after which the
/// host must call [`LessonPlay::wake`].
#[derive(Debug, Default)]
pub struct Reply {
  pub messages: Vec<ServerWsMessage>,
  pub wake_after: Option<Duration>,
}

impl Reply {
  fn one(msg: ServerWsMessage) -> Self { Reply { messages: vec![msg], wake_after: None } }

  fn error(code: &'static str, message: impl Into<String>) -> Self {
    Reply::one(ServerWsMessage::Error { message: message.into(), code })
  }

  fn core(err: &CoreError) -> Self { Reply::error(err.code(), err.to_string()) }
}

/// Per-connection lesson state.
pub struct LessonPlay {
  state: Arc<AppState>,
  ctx: Option<SessionContext>,
  session: Option<LessonSession>,
}

impl LessonPlay {
  pub fn new(state: Arc<AppState>) -> Self { Self { state, ctx: None, session: None } }

  pub async fn handle(&mut self, msg: ClientWsMessage) -> Reply {
    match msg {
      ClientWsMessage::Ping => Reply::one(ServerWsMessage::Pong),
      ClientWsMessage::Hello { telegram_id } => self.hello(telegram_id).await,
      ClientWsMessage::StartLesson { lesson_id } => self.start_lesson(lesson_id).await,
      ClientWsMessage::Input { input } => self.input(&input).await,
    }
  }

  pub async fn wake(&mut self) -> Reply {
    let Some(session) = self.session.as_mut() else {
      return Reply::default();
    };
    let turn = session.wake().await;
    self.render(turn)
  }

  async fn hello(&mut self, telegram_id: i64) -> Reply {
    match self.state.sessions.find(telegram_id).await {
      Ok(Some(user)) => {
        info!(target: "lingvo_backend", telegram_id, "WS session identified");
        self.ctx = Some(SessionContext { telegram_id });
        Reply::one(ServerWsMessage::Profile { user })
      }
      Ok(None) => Reply::core(&CoreError::not_found("user", telegram_id)),
      Err(e) => Reply::core(&e),
    }
  }

  async fn start_lesson(&mut self, lesson_id: DbId) -> Reply {
    let Some(ctx) = self.ctx else {
      return Reply::error("BAD_REQUEST", "Send hello before starting a lesson");
    };
    if let Err(e) = self.state.catalog.find_lesson(lesson_id).await {
      return Reply::core(&e);
    }

    let rng = StdRng::seed_from_u64(rand::thread_rng().gen());
    let runner = LessonRunner::new(ctx, lesson_id, rng);
    let mut session = LessonSession::new(runner, self.state.recorder.clone());
    let reply = match session.start(&self.state.catalog).await {
      RunnerState::Running { .. } => None,
      _ => Some(Reply::one(ServerWsMessage::NoExercises { lesson_id })),
    };
    if let Some(reply) = reply {
      self.session = None;
      return reply;
    }
    let reply = Reply { messages: current_exercise(&session).into_iter().collect(), wake_after: None };
    self.session = Some(session);
    reply
  }

  async fn input(&mut self, input: &Input) -> Reply {
    let Some(session) = self.session.as_mut() else {
      return Reply::error("BAD_REQUEST", "No lesson in progress");
    };
    let turn = session.input(input).await;
    self.render(turn)
  }

  fn render(&mut self, turn: Turn) -> Reply {
    let mut reply = Reply::default();
    for effect in &turn.effects {
      match effect {
        Effect::Haptic(haptic) => reply.messages.push(ServerWsMessage::Effect { haptic: *haptic }),
        Effect::Wake(delay) => reply.wake_after = Some(*delay),
        Effect::Complete(_) => {}
      }
    }

    let Some(session) = self.session.as_ref() else {
      return reply;
    };
    match turn.advance {
      None => {
        if let Some(view) = session.runner().current().and_then(|c| c.view) {
          reply.messages.push(ServerWsMessage::State { view });
        }
      }
      Some(advance) => {
        reply.messages.push(ServerWsMessage::ExerciseResult {
          correct: advance.outcome.correct,
          score: advance.outcome.score,
          xp_earned: advance.xp_earned,
        });
        match advance.next {
          Next::Exercise { .. } => reply.messages.extend(current_exercise(session)),
          Next::Completed { total_xp, bonus_xp } => {
            reply.messages.push(ServerWsMessage::LessonComplete { total_xp, bonus_xp });
            self.session = None;
          }
        }
      }
    }
    reply
  }
}

fn current_exercise(session: &LessonSession) -> Option<ServerWsMessage> {
  let current = session.runner().current()?;
  Some(ServerWsMessage::Exercise {
    index: current.index,
    total: current.total,
    exercise_id: current.exercise.id,
    kind: current.exercise.kind,
    xp_reward: current.exercise.xp_reward,
    view: current.view,
  })
}

/// Parse one text frame; malformed JSON becomes an error reply.
fn decode(txt: &str) -> Result<ClientWsMessage, Reply> {
  debug!(target: "lingvo_backend", payload = %trunc_for_log(txt, WS_LOG_LIMIT), "WS received");
  serde_json::from_str(txt).map_err(|e| {
    warn!(target: "lingvo_backend", payload = %trunc_for_log(txt, WS_LOG_LIMIT), error = %e, "WS message rejected");
    Reply::error("BAD_REQUEST", format!("Invalid JSON: {}", e))
  })
}

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "lingvo_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn send_all(socket: &mut WebSocket, messages: &[ServerWsMessage]) -> Result<(), axum::Error> {
  for msg in messages {
    let out = serde_json::to_string(msg).unwrap_or_else(|e| {
      serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e), "code": "INTERNAL" })
        .to_string()
    });
    socket.send(Message::Text(out)).await?;
  }
  Ok(())
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "lingvo_backend", "WebSocket connected");
  let mut play = LessonPlay::new(state);

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let mut reply = match decode(&txt) {
          Ok(incoming) => play.handle(incoming).await,
          Err(reply) => reply,
        };

        loop {
          if let Err(e) = send_all(&mut socket, &reply.messages).await {
            error!(target: "lingvo_backend", error = %e, "WS send error");
            return;
          }
          // Locked answers always advance; there is no cancellation.
          let Some(delay) = reply.wake_after else { break };
          tokio::time::sleep(delay).await;
          reply = play.wake().await;
        }
      }
      Message::Ping(payload) => {
        let _ = socket.send(Message::Pong(payload)).await;
      }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "lingvo_backend", "WebSocket disconnected");
}
