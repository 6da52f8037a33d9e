//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Starting sessions and serving the next problem
//!   - Submitting answers (controller transition + XP award)
//!   - Hints and progress lookups
//!
//! XP goes to the learner, not the session, so it carries over when the same
//! learner starts another session.

use thiserror::Error;
use tracing::{info, instrument};

use crate::domain::Skill;
use crate::protocol::{to_out, AnswerOut, HintOut, ProblemEnvelope, ProgressEnvelope};
use crate::session::SessionError;
use crate::state::{AppState, SharedEntry};

pub const MAX_LEARNER_ID_LEN: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
  #[error("unknown session: {0}")]
  UnknownSession(String),
  #[error("learner id must be 1-{} characters", MAX_LEARNER_ID_LEN)]
  InvalidLearnerId,
  #[error(transparent)]
  Session(#[from] SessionError),
}

async fn entry(state: &AppState, session_id: &str) -> Result<SharedEntry, ApiError> {
  state
    .get_session(session_id)
    .await
    .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))
}

fn check_learner_id(id: Option<&str>) -> Result<Option<&str>, ApiError> {
  match id.map(str::trim) {
    None => Ok(None),
    Some(s) if s.is_empty() || s.chars().count() > MAX_LEARNER_ID_LEN => Err(ApiError::InvalidLearnerId),
    Some(s) => Ok(Some(s)),
  }
}

/// Start a session for `learner_id`, or for a new learner when `None`.
#[instrument(level = "info", skip(state))]
pub async fn start_session(
  state: &AppState,
  skill: Skill,
  learner_id: Option<&str>,
) -> Result<ProblemEnvelope, ApiError> {
  let learner_id = check_learner_id(learner_id)?;
  let (learner_id, learner) = state.learner(learner_id).await;
  learner.lock().await.touch();
  let (session, problem) = state.controller.start_session(skill).await;
  let snapshot = session.snapshot();
  let session_id = state.insert_session(session, learner_id.clone(), learner).await;
  info!(target: "practice", %session_id, %learner_id, %skill, source = ?problem.source, "Session registered");
  Ok(ProblemEnvelope { session_id, learner_id, problem: to_out(&problem), session: snapshot })
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn next_problem(state: &AppState, session_id: &str) -> Result<ProblemEnvelope, ApiError> {
  let shared = entry(state, session_id).await?;
  let mut e = shared.lock().await;
  e.touch();
  let problem = state.controller.request_next_problem(&mut e.session).await;
  Ok(ProblemEnvelope {
    session_id: session_id.to_string(),
    learner_id: e.learner_id.clone(),
    problem: to_out(&problem),
    session: e.session.snapshot(),
  })
}

#[instrument(level = "info", skip(state, answer), fields(%session_id, answer_len = answer.len()))]
pub async fn submit_answer(
  state: &AppState,
  session_id: &str,
  answer: &str,
  elapsed_seconds: Option<f64>,
) -> Result<AnswerOut, ApiError> {
  let shared = entry(state, session_id).await?;
  let mut e = shared.lock().await;
  e.touch();
  let feedback = state.controller.submit_answer(&mut e.session, answer, elapsed_seconds).await?;
  info!(
    target: "practice",
    %session_id,
    difficulty = %e.session.difficulty(),
    ability = e.session.ability().value(),
    "Answer recorded"
  );

  let expected_answer = e.session.current_problem().map(|p| p.expected_answer.clone()).unwrap_or_default();
  let mut learner = e.learner.lock().await;
  learner.touch();
  let progress = &mut learner.progress;
  let (xp_awarded, new_badges) = if feedback.is_correct {
    let level_before = progress.level();
    let xp = state.settings.xp_per_correct;
    let earned = progress.add_xp(xp);
    if progress.level() > level_before {
      info!(target: "practice", learner_id = %e.learner_id, level = progress.level(), xp = progress.xp(), "Level up");
    }
    (xp, earned)
  } else {
    (0, Vec::new())
  };
  if !new_badges.is_empty() {
    info!(target: "practice", learner_id = %e.learner_id, badges = ?new_badges, "Badges earned");
  }

  Ok(AnswerOut {
    is_correct: feedback.is_correct,
    explanation: feedback.explanation,
    expected_answer,
    xp_awarded,
    new_badges,
    session: e.session.snapshot(),
    progress: progress.to_out(),
  })
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn hint(state: &AppState, session_id: &str) -> Result<HintOut, ApiError> {
  let shared = entry(state, session_id).await?;
  let mut e = shared.lock().await;
  e.touch();
  let problem = e.session.current_problem().ok_or(SessionError::NoProblemPending)?;
  let text = if problem.hint.trim().is_empty() {
    "No hint available for this problem.".to_string()
  } else {
    problem.hint.clone()
  };
  Ok(HintOut { text })
}

#[instrument(level = "debug", skip(state), fields(%session_id))]
pub async fn progress(state: &AppState, session_id: &str) -> Result<ProgressEnvelope, ApiError> {
  let shared = entry(state, session_id).await?;
  let mut e = shared.lock().await;
  e.touch();
  let mut learner = e.learner.lock().await;
  learner.touch();
  Ok(ProgressEnvelope {
    learner_id: e.learner_id.clone(),
    session: e.session.snapshot(),
    progress: learner.progress.to_out(),
  })
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn end_session(state: &AppState, session_id: &str) -> Result<(), ApiError> {
  if state.end_session(session_id).await {
    info!(target: "practice", %session_id, "Session discarded");
    Ok(())
  } else {
    Err(ApiError::UnknownSession(session_id.to_string()))
  }
}
