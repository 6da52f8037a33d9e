//! Loading tutor configuration (prompts, tutor settings, optional problem bank) from TOML.
//!
//! See `TutorConfig`, `Prompts` and `TutorSettings` for expected schema.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Skill;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TutorConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub tutor: TutorSettings,
  #[serde(default)]
  pub problems: Vec<ProblemCfg>,
}

/// Problem entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ProblemCfg {
  pub skill: Skill,
  pub difficulty: i64,
  pub statement: String,
  pub expected_answer: String,
  #[serde(default)] pub problem_type: Option<String>,
  #[serde(default)] pub hint: Option<String>,
  #[serde(default)] pub common_mistake: Option<String>,
}

/// Which judge decides answer correctness.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JudgePolicy {
  /// Local normalized/numeric comparison against the expected answer.
  #[default]
  Match,
  /// Ask the model; local comparison if the call fails.
  Model,
  /// Coin flip weighted 70/30. Demo only.
  Random,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TutorSettings {
  pub judge: JudgePolicy,
  pub numeric_tolerance: f64,
  pub xp_per_correct: u32,
  pub success_message: String,
  /// Sessions and learners untouched for this long are evicted.
  pub idle_ttl_secs: u64,
  /// How often the idle sweeper runs.
  pub sweep_interval_secs: u64,
}

impl TutorSettings {
  pub fn idle_ttl(&self) -> Duration { Duration::from_secs(self.idle_ttl_secs) }

  pub fn sweep_interval(&self) -> Duration { Duration::from_secs(self.sweep_interval_secs.max(1)) }
}

impl Default for TutorSettings {
  fn default() -> Self {
    Self {
      judge: JudgePolicy::Match,
      numeric_tolerance: 1e-3,
      xp_per_correct: 5,
      success_message: "Great job! Your approach was correct.".into(),
      idle_ttl_secs: 30 * 60,
      sweep_interval_secs: 60,
    }
  }
}

/// Prompts used by the OpenAI client. Override them in TOML to tune tone/structure.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub problem_system: String,
  pub problem_user_template: String,
  pub judge_system: String,
  pub judge_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      problem_system: "You are an expert math curriculum designer for students in grades 6-8. Respond ONLY with strict JSON.".into(),
      problem_user_template: concat!(
        "Generate a single, well-formed math problem adapted to the student's profile.\n\n",
        "Skill focus: {skill}\n",
        "Target difficulty: level {difficulty} out of 5\n",
        "Estimated ability score: {ability} (0 to 1, 1 is high ability)\n",
        "Recent history:\n{history}\n\n",
        "Rules:\n",
        "1. Target the skill. fractions_decimals: operations, conversions or comparisons. ",
        "algebra: basic equations, variable manipulation, solving for a variable. ",
        "geometry: transformations (translations, rotations, reflections) on a coordinate plane.\n",
        "2. Level 1 is straightforward; level 5 needs multiple steps or more abstract reasoning.\n",
        "3. If the student is struggling, make it slightly easier; if excelling, add a minor twist.\n",
        "4. Where appropriate, frame it as a short word problem.\n",
        "5. The statement must not contain the answer.\n\n",
        "Return JSON with fields: problemStatement, problemType, expectedAnswer, hint, commonMistake."
      ).into(),
      judge_system: "You are a strict but fair math answer checker. Reply as compact JSON.".into(),
      judge_user_template: "Problem: {statement}\nExpected answer: {expected}\nStudent answer: {answer}\nReturn JSON {\"correct\": boolean, \"explanation\": string}. Accept equivalent forms (fractions vs decimals, spacing, 'x = 3' vs '3').".into(),
    }
  }
}

/// Attempt to load `TutorConfig` from TUTOR_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_tutor_config_from_env() -> Option<TutorConfig> {
  let path = std::env::var("TUTOR_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_tutor_config(&s) {
      Ok(cfg) => {
        info!(target: "tutor_backend", %path, bank = cfg.problems.len(), "Loaded tutor config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "tutor_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "tutor_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_tutor_config(s: &str) -> Result<TutorConfig, toml::de::Error> {
  toml::from_str::<TutorConfig>(s)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = parse_tutor_config("").unwrap();
    assert_eq!(cfg.tutor.judge, JudgePolicy::Match);
    assert_eq!(cfg.tutor.xp_per_correct, 5);
    assert_eq!(cfg.tutor.idle_ttl(), Duration::from_secs(1800));
    assert!(cfg.problems.is_empty());
    assert!(cfg.prompts.problem_user_template.contains("{history}"));
  }

  #[test]
  fn parses_settings_and_bank() {
    let cfg = parse_tutor_config(
      r#"
        [tutor]
        judge = "random"
        numeric_tolerance = 0.01
        idle_ttl_secs = 90
        sweep_interval_secs = 0

        [prompts]
        judge_system = "Be kind."

        [[problems]]
        skill = "algebra"
        difficulty = 4
        statement = "Solve 2x - 4 = 10"
        expected_answer = "x = 7"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.tutor.judge, JudgePolicy::Random);
    assert_eq!(cfg.tutor.numeric_tolerance, 0.01);
    assert_eq!(cfg.tutor.idle_ttl(), Duration::from_secs(90));
    assert_eq!(cfg.tutor.sweep_interval(), Duration::from_secs(1));
    assert_eq!(cfg.tutor.xp_per_correct, 5);
    assert_eq!(cfg.prompts.judge_system, "Be kind.");
    assert!(!cfg.prompts.problem_system.is_empty());
    assert_eq!(cfg.problems.len(), 1);
    assert_eq!(cfg.problems[0].skill, Skill::Algebra);
    assert!(cfg.problems[0].hint.is_none());
  }

  #[test]
  fn rejects_unknown_skill() {
    let err = parse_tutor_config(
      r#"
        [[problems]]
        skill = "calculus"
        difficulty = 1
        statement = "d/dx x^2"
        expected_answer = "2x"
      "#,
    );
    assert!(err.is_err());
  }
}
