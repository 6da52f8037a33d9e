//! Problem generation: the generator seam, the TOML/seed problem bank,
//! and the configured model-then-bank chain.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::{ProblemCfg, Prompts};
use crate::domain::{Ability, Attempt, Difficulty, Problem, ProblemSource, Skill};
use crate::openai::OpenAI;

/// Parameters sent to a generator. Serializes to the wire shape the model sees.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct GenerationRequest {
  pub skill: Skill,
  pub difficulty: Difficulty,
  #[serde(rename = "studentAbility")]
  pub ability: Ability,
  #[serde(rename = "solveHistory")]
  pub history: Vec<Attempt>,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
  #[error("model call failed: {0}")]
  Model(String),
  #[error("generated problem rejected: {0}")]
  Invalid(String),
  #[error("no bank problem for skill {0}")]
  NoBankProblem(Skill),
}

#[async_trait]
pub trait ProblemGenerator: Send + Sync {
  async fn generate(&self, request: &GenerationRequest) -> Result<Problem, GenerationError>;
}

/// Schema check on generator output: statement and expected answer are required.
pub fn validate_problem(p: &Problem) -> Result<(), GenerationError> {
  if p.statement.trim().is_empty() {
    return Err(GenerationError::Invalid("empty problemStatement".into()));
  }
  if p.expected_answer.trim().is_empty() {
    return Err(GenerationError::Invalid("empty expectedAnswer".into()));
  }
  Ok(())
}

#[derive(Clone, Debug)]
struct BankEntry {
  skill: Skill,
  difficulty: Difficulty,
  problem: Problem,
}

/// In-memory problem bank keyed by skill and difficulty.
#[derive(Clone, Debug, Default)]
pub struct ProblemBank {
  entries: Vec<BankEntry>,
}

impl ProblemBank {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, skill: Skill, difficulty: Difficulty, mut problem: Problem) {
    problem.source = ProblemSource::Bank;
    self.entries.push(BankEntry { skill, difficulty, problem });
  }

  /// Insert a config entry. Entries with an empty statement or answer are skipped.
  pub fn insert_cfg(&mut self, cfg: &ProblemCfg) -> bool {
    let problem = Problem {
      statement: cfg.statement.clone(),
      problem_type: cfg.problem_type.clone().unwrap_or_else(|| cfg.skill.as_str().to_string()),
      expected_answer: cfg.expected_answer.clone(),
      hint: cfg.hint.clone().unwrap_or_default(),
      common_mistake: cfg.common_mistake.clone().unwrap_or_default(),
      source: ProblemSource::Bank,
    };
    if validate_problem(&problem).is_err() {
      return false;
    }
    self.insert(cfg.skill, Difficulty::new(cfg.difficulty), problem);
    true
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn count_for(&self, skill: Skill) -> usize {
    self.entries.iter().filter(|e| e.skill == skill).count()
  }

  /// Closest difficulty wins; ties prefer the easier entry.
  /// The statement of the most recent attempt is skipped when an alternative exists.
  pub fn pick(&self, skill: Skill, difficulty: Difficulty, last_statement: Option<&str>) -> Option<Problem> {
    let mut candidates: Vec<&BankEntry> = self.entries.iter().filter(|e| e.skill == skill).collect();
    if candidates.is_empty() {
      return None;
    }
    candidates.sort_by_key(|e| {
      let gap = (e.difficulty.level() as i16 - difficulty.level() as i16).abs();
      (gap, e.difficulty.level())
    });
    let fresh = candidates
      .iter()
      .find(|e| Some(e.problem.statement.as_str()) != last_statement);
    fresh.or_else(|| candidates.first()).map(|e| e.problem.clone())
  }
}

#[async_trait]
impl ProblemGenerator for ProblemBank {
  async fn generate(&self, request: &GenerationRequest) -> Result<Problem, GenerationError> {
    let last = request.history.last().map(|a| a.problem_text.as_str());
    self.pick(request.skill, request.difficulty, last)
      .ok_or(GenerationError::NoBankProblem(request.skill))
  }
}

/// Model-backed generator. Output is schema-checked before it is accepted.
pub struct ModelGenerator {
  pub openai: OpenAI,
  pub prompts: Prompts,
}

#[async_trait]
impl ProblemGenerator for ModelGenerator {
  #[instrument(level = "info", skip_all, fields(skill = %request.skill, difficulty = %request.difficulty))]
  async fn generate(&self, request: &GenerationRequest) -> Result<Problem, GenerationError> {
    let mut problem = self
      .openai
      .generate_problem(&self.prompts, request)
      .await
      .map_err(GenerationError::Model)?;
    validate_problem(&problem)?;
    problem.source = ProblemSource::Generated;
    Ok(problem)
  }
}

/// Selection policy: the model when available, then the bank.
/// An error here means the controller substitutes the fallback problem.
pub struct ConfiguredGenerator {
  pub model: Option<ModelGenerator>,
  pub bank: ProblemBank,
}

#[async_trait]
impl ProblemGenerator for ConfiguredGenerator {
  async fn generate(&self, request: &GenerationRequest) -> Result<Problem, GenerationError> {
    if let Some(model) = &self.model {
      match model.generate(request).await {
        Ok(p) => return Ok(p),
        Err(e) => warn!(target: "practice", skill = %request.skill, error = %e, "Model generation failed; trying problem bank"),
      }
    } else {
      debug!(target: "practice", skill = %request.skill, "No model configured; using problem bank");
    }
    self.bank.generate(request).await
  }
}
