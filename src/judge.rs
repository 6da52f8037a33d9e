//! Answer judging: local comparison, model-backed checking, and the random demo judge.

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, error, instrument};

use crate::config::{JudgePolicy, Prompts, TutorSettings};
use crate::domain::Problem;
use crate::openai::OpenAI;
use crate::util::{normalize_answer, parse_number};

/// Judgement for one answer. `note` is an optional remark from the judge.
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
  pub is_correct: bool,
  pub note: Option<String>,
}

impl Verdict {
  pub fn plain(is_correct: bool) -> Self { Self { is_correct, note: None } }
}

/// Judges never fail: implementations absorb their own errors.
#[async_trait]
pub trait AnswerJudge: Send + Sync {
  async fn judge(&self, problem: &Problem, answer: &str) -> Verdict;
}

/// Normalized string match with numeric tolerance.
#[derive(Clone, Debug)]
pub struct MatchJudge {
  pub tolerance: f64,
}

impl MatchJudge {
  pub fn new(tolerance: f64) -> Self { Self { tolerance: tolerance.abs() } }

  pub fn matches(&self, expected: &str, answer: &str) -> bool {
    let e = normalize_answer(expected);
    let a = normalize_answer(answer);
    if a.is_empty() {
      return false;
    }
    if e == a {
      return true;
    }
    match (parse_number(&e), parse_number(&a)) {
      (Some(x), Some(y)) => (x - y).abs() <= self.tolerance,
      _ => false,
    }
  }
}

impl Default for MatchJudge {
  fn default() -> Self { Self::new(TutorSettings::default().numeric_tolerance) }
}

#[async_trait]
impl AnswerJudge for MatchJudge {
  async fn judge(&self, problem: &Problem, answer: &str) -> Verdict {
    Verdict::plain(self.matches(&problem.expected_answer, answer))
  }
}

/// Model-backed judge; falls back to local matching if the call fails.
pub struct ModelJudge {
  pub openai: OpenAI,
  pub prompts: Prompts,
  pub local: MatchJudge,
}

#[async_trait]
impl AnswerJudge for ModelJudge {
  #[instrument(level = "info", skip_all, fields(answer_len = answer.len()))]
  async fn judge(&self, problem: &Problem, answer: &str) -> Verdict {
    match self.openai.judge_answer(&self.prompts, problem, answer).await {
      Ok((is_correct, explanation)) => Verdict {
        is_correct,
        note: Some(explanation).filter(|e| !e.trim().is_empty()),
      },
      Err(e) => {
        error!(target: "practice", error = %e, "Model judge failed; using local comparison.");
        self.local.judge(problem, answer).await
      }
    }
  }
}

/// Weighted coin flip, ignoring the answer. Kept for demos only.
#[derive(Clone, Debug)]
pub struct RandomJudge {
  pub p_correct: f64,
}

impl Default for RandomJudge {
  fn default() -> Self { Self { p_correct: 0.7 } }
}

#[async_trait]
impl AnswerJudge for RandomJudge {
  async fn judge(&self, _problem: &Problem, _answer: &str) -> Verdict {
    let p = self.p_correct.clamp(0.0, 1.0);
    let is_correct = rand::thread_rng().gen_bool(p);
    debug!(target: "practice", is_correct, "Random judge decided");
    Verdict::plain(is_correct)
  }
}

/// Build the judge selected by config. `Model` degrades to `Match` without a client.
pub fn build_judge(settings: &TutorSettings, prompts: &Prompts, openai: Option<OpenAI>) -> Box<dyn AnswerJudge> {
  let local = MatchJudge::new(settings.numeric_tolerance);
  match (settings.judge, openai) {
    (JudgePolicy::Model, Some(openai)) => Box::new(ModelJudge { openai, prompts: prompts.clone(), local }),
    (JudgePolicy::Model, None) => {
      error!(target: "tutor_backend", "judge = \"model\" but OpenAI is disabled; using local comparison");
      Box::new(local)
    }
    (JudgePolicy::Random, _) => Box::new(RandomJudge::default()),
    (JudgePolicy::Match, _) => Box::new(local),
  }
}

#[async_trait]
impl AnswerJudge for Box<dyn AnswerJudge> {
  async fn judge(&self, problem: &Problem, answer: &str) -> Verdict {
    (**self).judge(problem, answer).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::fallback_problem;

  #[test]
  fn match_accepts_equivalent_forms() {
    let j = MatchJudge::default();
    assert!(j.matches("x = 3", "3"));
    assert!(j.matches("x = 3", "X=3"));
    assert!(j.matches("0.75", "3/4"));
    assert!(j.matches("5/6", "0.8333"));
    assert!(j.matches("(6, 2)", "(6,2)"));
    assert!(j.matches("60", "60 "));
  }

  #[test]
  fn match_rejects_wrong_answers() {
    let j = MatchJudge::default();
    assert!(!j.matches("60", "17"));
    assert!(!j.matches("5/6", "3/9"));
    assert!(!j.matches("(6, 2)", "(2, 6)"));
    assert!(!j.matches("60", "   "));
    assert!(!j.matches("62", "6,2"));
    assert!(!j.matches("15", "1,5"));
    assert!(j.matches("1200", "1,200"));
  }

  #[test]
  fn tolerance_is_configurable() {
    assert!(!MatchJudge::new(0.0).matches("5/6", "0.83"));
    assert!(MatchJudge::new(0.01).matches("5/6", "0.83"));
  }

  #[tokio::test]
  async fn match_judge_uses_expected_answer() {
    let p = fallback_problem();
    assert!(MatchJudge::default().judge(&p, "60").await.is_correct);
    assert!(!MatchJudge::default().judge(&p, "17").await.is_correct);
  }

  #[tokio::test]
  async fn random_judge_extremes_are_deterministic() {
    let p = fallback_problem();
    assert!(RandomJudge { p_correct: 1.0 }.judge(&p, "anything").await.is_correct);
    assert!(!RandomJudge { p_correct: 0.0 }.judge(&p, "60").await.is_correct);
  }

  #[tokio::test]
  async fn model_policy_without_client_degrades_to_match() {
    let settings = TutorSettings { judge: JudgePolicy::Model, ..TutorSettings::default() };
    let judge = build_judge(&settings, &Prompts::default(), None);
    assert!(judge.judge(&fallback_problem(), "60").await.is_correct);
    assert!(!judge.judge(&fallback_problem(), "61").await.is_correct);
  }
}
