//! Domain models: skills, the difficulty/ability scales, attempts, problems and feedback.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

/// Practiced topic. Fixed for the lifetime of a session.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
  FractionsDecimals,
  Algebra,
  Geometry,
}

impl Skill {
  pub fn as_str(&self) -> &'static str {
    match self {
      Skill::FractionsDecimals => "fractions_decimals",
      Skill::Algebra => "algebra",
      Skill::Geometry => "geometry",
    }
  }
}

impl fmt::Display for Skill {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Difficulty level, always within [1, 5].
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Difficulty(u8);

impl Difficulty {
  pub const MIN: Difficulty = Difficulty(MIN_DIFFICULTY);
  pub const MAX: Difficulty = Difficulty(MAX_DIFFICULTY);

  /// Clamp any integer into the valid range.
  pub fn new(level: i64) -> Self {
    Difficulty(level.clamp(MIN_DIFFICULTY as i64, MAX_DIFFICULTY as i64) as u8)
  }

  pub fn level(self) -> u8 { self.0 }

  pub fn step_up(self) -> Self { Difficulty(self.0.saturating_add(1).min(Self::MAX.0)) }

  pub fn step_down(self) -> Self { Difficulty(self.0.saturating_sub(1).max(Self::MIN.0)) }
}

impl Default for Difficulty {
  fn default() -> Self { Difficulty::MIN }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Proficiency estimate, always within [0, 1].
#[derive(Clone, Copy, Debug, Serialize, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct Ability(f64);

impl Ability {
  /// Clamp into [0, 1]. NaN collapses to 0.
  pub fn new(value: f64) -> Self {
    if value.is_nan() { Ability(0.0) } else { Ability(value.clamp(0.0, 1.0)) }
  }

  pub fn value(self) -> f64 { self.0 }

  /// Saturating adjustment by `delta`.
  pub fn adjust(self, delta: f64) -> Self { Ability::new(self.0 + delta) }
}

impl Default for Ability {
  fn default() -> Self { Ability(0.5) }
}

/// One resolved problem/answer pair. Immutable once recorded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Attempt {
  #[serde(rename = "problem")]
  pub problem_text: String,
  #[serde(rename = "isCorrect")]
  pub is_correct: bool,
  #[serde(rename = "timeTaken")]
  pub time_taken_seconds: f64,
}

/// Where did a problem come from?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProblemSource {
  Generated,  // produced by the model
  Bank,       // from the TOML problem bank
  Fallback,   // the fixed substitute problem
}

/// A practice problem as produced by a generator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Problem {
  #[serde(rename = "problemStatement")]
  pub statement: String,
  #[serde(rename = "problemType")]
  pub problem_type: String,
  #[serde(rename = "expectedAnswer")]
  pub expected_answer: String,
  pub hint: String,
  #[serde(rename = "commonMistake")]
  pub common_mistake: String,
  #[serde(skip, default = "default_source")]
  pub source: ProblemSource,
}

fn default_source() -> ProblemSource { ProblemSource::Generated }

/// Outcome of one submitted answer.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Feedback {
  #[serde(rename = "isCorrect")]
  pub is_correct: bool,
  pub explanation: String,
}
