//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.
//!
//! A connection drives at most one practice session at a time; starting a new
//! one discards the previous, and disconnecting discards the current. The
//! connection's learner (and so its XP) stays the same across those sessions.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::logic;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "tutor_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Per-connection state.
#[derive(Debug, Default)]
struct Connection {
  session_id: Option<String>,
  learner_id: Option<String>,
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "tutor_backend", "WebSocket connected");
  let mut conn = Connection::default();

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "tutor_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut conn).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "tutor_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }

  if let Some(id) = conn.session_id.take() {
    let _ = logic::end_session(&state, &id).await;
  }
  info!(target: "tutor_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state, conn))]
async fn handle_client_ws(
  msg: ClientWsMessage,
  state: &AppState,
  conn: &mut Connection,
) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::StartSession { skill, learner_id } => {
      let learner_id = learner_id.or_else(|| conn.learner_id.clone());
      let out = match logic::start_session(state, skill, learner_id.as_deref()).await {
        Ok(out) => out,
        Err(e) => return ServerWsMessage::Error { message: e.to_string() },
      };
      if let Some(old) = conn.session_id.replace(out.session_id.clone()) {
        let _ = logic::end_session(state, &old).await;
      }
      conn.learner_id = Some(out.learner_id.clone());
      info!(target: "practice", session_id = %out.session_id, learner_id = %out.learner_id, %skill, "WS session started");
      ServerWsMessage::Problem(out)
    }

    ClientWsMessage::NextProblem => {
      let Some(id) = conn.session_id.as_deref() else { return no_session() };
      match logic::next_problem(state, id).await {
        Ok(out) => ServerWsMessage::Problem(out),
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::SubmitAnswer { answer, elapsed_seconds } => {
      let Some(id) = conn.session_id.as_deref() else { return no_session() };
      match logic::submit_answer(state, id, &answer, elapsed_seconds).await {
        Ok(out) => {
          info!(target: "practice", session_id = %id, is_correct = out.is_correct, "WS submit_answer evaluated");
          ServerWsMessage::AnswerResult(out)
        }
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Hint => {
      let Some(id) = conn.session_id.as_deref() else { return no_session() };
      match logic::hint(state, id).await {
        Ok(h) => ServerWsMessage::Hint { text: h.text },
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }

    ClientWsMessage::Progress => {
      let Some(id) = conn.session_id.as_deref() else { return no_session() };
      match logic::progress(state, id).await {
        Ok(p) => ServerWsMessage::Progress(p),
        Err(e) => ServerWsMessage::Error { message: e.to_string() },
      }
    }
  }
}

fn no_session() -> ServerWsMessage {
  ServerWsMessage::Error { message: "No active session; send start_session first.".into() }
}
