//! Adaptive practice sessions.
//!
//! A `Session` tracks one student practicing one skill: the current difficulty,
//! an ability estimate and the append-only attempt history. The
//! `PracticeController` drives the problem → answer → feedback cycle:
//!
//!   Idle → AwaitingProblem → AwaitingAnswer → Feedback → AwaitingProblem → …
//!
//! Generator failures never reach the caller; the fixed fallback problem is
//! served instead. Each answered problem moves difficulty by one level and
//! ability by a fixed step, both saturating.

use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::domain::{Ability, Attempt, Difficulty, Feedback, Problem, Skill};
use crate::generator::{GenerationRequest, ProblemGenerator};
use crate::judge::AnswerJudge;
use crate::seeds::fallback_problem;

pub const ABILITY_STEP_CORRECT: f64 = 0.05;
pub const ABILITY_STEP_INCORRECT: f64 = -0.03;
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Great job! Your approach was correct.";

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum SessionError {
  #[error("answer must not be empty")]
  EmptyAnswer,
  #[error("elapsed time must be a non-negative number of seconds, got {0}")]
  InvalidElapsed(f64),
  #[error("no problem is awaiting an answer")]
  NoProblemPending,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Phase {
  Idle,
  AwaitingProblem,
  AwaitingAnswer,
  Feedback {
    #[serde(rename = "isCorrect")]
    is_correct: bool,
  },
}

#[derive(Clone, Debug)]
pub struct Session {
  skill: Skill,
  difficulty: Difficulty,
  ability: Ability,
  history: Vec<Attempt>,
  phase: Phase,
  current: Option<Problem>,
  delivered_at: Option<Instant>,
}

/// Read-only view of a session for clients.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SessionSnapshot {
  pub skill: Skill,
  pub difficulty: Difficulty,
  pub ability: f64,
  pub attempts: usize,
  pub correct: usize,
  pub accuracy: f64,
  pub phase: Phase,
}

impl Session {
  /// Fresh session: difficulty 1, ability 0.5, no history.
  pub fn new(skill: Skill) -> Self {
    Self {
      skill,
      difficulty: Difficulty::default(),
      ability: Ability::default(),
      history: Vec::new(),
      phase: Phase::Idle,
      current: None,
      delivered_at: None,
    }
  }

  pub fn skill(&self) -> Skill { self.skill }
  pub fn difficulty(&self) -> Difficulty { self.difficulty }
  pub fn ability(&self) -> Ability { self.ability }
  #[cfg(test)]
  pub fn history(&self) -> &[Attempt] { &self.history }
  #[cfg(test)]
  pub fn phase(&self) -> Phase { self.phase }
  pub fn current_problem(&self) -> Option<&Problem> { self.current.as_ref() }

  /// Generator input built from the current state.
  pub fn generation_request(&self) -> GenerationRequest {
    GenerationRequest {
      skill: self.skill,
      difficulty: self.difficulty,
      ability: self.ability,
      history: self.history.clone(),
    }
  }

  fn begin_request(&mut self) {
    self.phase = Phase::AwaitingProblem;
    self.current = None;
    self.delivered_at = None;
  }

  fn deliver(&mut self, problem: Problem) {
    self.current = Some(problem);
    self.delivered_at = Some(Instant::now());
    self.phase = Phase::AwaitingAnswer;
  }

  fn elapsed_since_delivery(&self) -> f64 {
    self.delivered_at.map(|t| t.elapsed().as_secs_f64()).unwrap_or(0.0)
  }

  /// Apply one judged outcome. Appends the attempt, then moves ability and difficulty.
  fn record(&mut self, problem_text: String, is_correct: bool, elapsed_seconds: f64) {
    self.history.push(Attempt { problem_text, is_correct, time_taken_seconds: elapsed_seconds });
    self.ability = next_ability(self.ability, is_correct);
    self.difficulty = next_difficulty(self.difficulty, is_correct);
    self.phase = Phase::Feedback { is_correct };
  }

  pub fn snapshot(&self) -> SessionSnapshot {
    let attempts = self.history.len();
    let correct = self.history.iter().filter(|a| a.is_correct).count();
    SessionSnapshot {
      skill: self.skill,
      difficulty: self.difficulty,
      ability: self.ability.value(),
      attempts,
      correct,
      accuracy: if attempts == 0 { 0.0 } else { correct as f64 / attempts as f64 },
      phase: self.phase,
    }
  }
}

pub fn next_difficulty(d: Difficulty, is_correct: bool) -> Difficulty {
  if is_correct { d.step_up() } else { d.step_down() }
}

pub fn next_ability(a: Ability, is_correct: bool) -> Ability {
  a.adjust(if is_correct { ABILITY_STEP_CORRECT } else { ABILITY_STEP_INCORRECT })
}

/// Success message when correct; common mistake plus hint otherwise.
pub fn explanation_for(problem: &Problem, is_correct: bool, success_message: &str) -> String {
  if is_correct {
    return success_message.to_string();
  }
  let mistake = problem.common_mistake.trim().trim_end_matches('.');
  let hint = problem.hint.trim().trim_end_matches('.');
  match (mistake.is_empty(), hint.is_empty()) {
    (false, false) => format!("Not quite. {}. Remember: {}.", mistake, hint),
    (false, true) => format!("Not quite. {}.", mistake),
    (true, false) => format!("Not quite. Remember: {}.", hint),
    (true, true) => "Not quite.".to_string(),
  }
}

/// Drives sessions against a problem generator and an answer judge.
pub struct PracticeController<G, J> {
  generator: G,
  judge: J,
  success_message: String,
}

impl<G: ProblemGenerator, J: AnswerJudge> PracticeController<G, J> {
  pub fn new(generator: G, judge: J) -> Self {
    Self { generator, judge, success_message: DEFAULT_SUCCESS_MESSAGE.to_string() }
  }

  pub fn with_success_message(mut self, message: impl Into<String>) -> Self {
    self.success_message = message.into();
    self
  }

  /// Create a session and fetch its first problem.
  #[instrument(level = "info", skip(self))]
  pub async fn start_session(&self, skill: Skill) -> (Session, Problem) {
    let mut session = Session::new(skill);
    let problem = self.request_next_problem(&mut session).await;
    info!(target: "practice", %skill, source = ?problem.source, "Session started");
    (session, problem)
  }

  /// Fetch the next problem for the session's current parameters.
  /// Difficulty, ability and history are left untouched; any generator
  /// error is replaced by the fallback problem.
  #[instrument(level = "info", skip(self, session), fields(skill = %session.skill, difficulty = %session.difficulty))]
  pub async fn request_next_problem(&self, session: &mut Session) -> Problem {
    session.begin_request();
    let request = session.generation_request();
    let problem = match self.generator.generate(&request).await {
      Ok(p) => p,
      Err(e) => {
        warn!(target: "practice", skill = %session.skill, error = %e, "Problem generation failed; serving fallback problem");
        fallback_problem()
      }
    };
    session.deliver(problem.clone());
    problem
  }

  /// Judge an answer to the pending problem and advance the session.
  /// With `elapsed_seconds = None` the time since delivery is used.
  #[instrument(level = "info", skip(self, session, answer), fields(skill = %session.skill, answer_len = answer.len()))]
  pub async fn submit_answer(
    &self,
    session: &mut Session,
    answer: &str,
    elapsed_seconds: Option<f64>,
  ) -> Result<Feedback, SessionError> {
    if answer.trim().is_empty() {
      return Err(SessionError::EmptyAnswer);
    }
    let elapsed = match elapsed_seconds {
      Some(s) if s.is_finite() && s >= 0.0 => s,
      Some(s) => return Err(SessionError::InvalidElapsed(s)),
      None => session.elapsed_since_delivery(),
    };
    let problem = match (session.phase, session.current.as_ref()) {
      (Phase::AwaitingAnswer, Some(p)) => p.clone(),
      _ => return Err(SessionError::NoProblemPending),
    };

    let verdict = self.judge.judge(&problem, answer).await;
    session.record(problem.statement.clone(), verdict.is_correct, elapsed);

    let mut explanation = explanation_for(&problem, verdict.is_correct, &self.success_message);
    if let Some(note) = verdict.note {
      explanation.push(' ');
      explanation.push_str(&note);
    }
    info!(
      target: "practice",
      is_correct = verdict.is_correct,
      difficulty = %session.difficulty,
      ability = session.ability.value(),
      attempts = session.history.len(),
      "Answer recorded"
    );
    Ok(Feedback { is_correct: verdict.is_correct, explanation })
  }
}
