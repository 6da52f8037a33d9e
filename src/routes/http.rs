//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::logic::{self, ApiError};
use crate::protocol::*;
use crate::session::SessionError;
use crate::state::AppState;

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::UnknownSession(_) => StatusCode::NOT_FOUND,
      ApiError::Session(SessionError::NoProblemPending) => StatusCode::CONFLICT,
      ApiError::Session(_) | ApiError::InvalidLearnerId => StatusCode::BAD_REQUEST,
    };
    warn!(target: "tutor_backend", %status, error = %self, "Request rejected");
    (status, Json(ErrorOut { error: self.to_string() })).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut {
    ok: true,
    sessions: state.session_count().await,
    learners: state.learner_count().await,
  })
}

#[instrument(level = "info", skip(state), fields(skill = %body.skill))]
pub async fn http_start_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StartIn>,
) -> Result<(StatusCode, Json<ProblemEnvelope>), ApiError> {
  let out = logic::start_session(&state, body.skill, body.learner_id.as_deref()).await?;
  info!(target: "practice", session_id = %out.session_id, learner_id = %out.learner_id, "HTTP session started");
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_next_problem(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ProblemEnvelope>, ApiError> {
  let out = logic::next_problem(&state, &id).await?;
  info!(target: "practice", session_id = %id, source = ?out.problem.source, "HTTP next problem served");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(%id, answer_len = body.answer.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<AnswerOut>, ApiError> {
  let out = logic::submit_answer(&state, &id, &body.answer, body.elapsed_seconds).await?;
  info!(target: "practice", session_id = %id, is_correct = out.is_correct, "HTTP answer evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_hint(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<HintOut>, ApiError> {
  Ok(Json(logic::hint(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ProgressEnvelope>, ApiError> {
  Ok(Json(logic::progress(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  logic::end_session(&state, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}
