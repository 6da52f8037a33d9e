//! Minimal OpenAI client for our use-cases.
//!
//! We only call chat.completions and request a strict JSON object.
//! Calls are instrumented and log model names, latencies, and token usage (not contents).
//!
//! NOTE: We never log the API key.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::{Attempt, Problem};
use crate::generator::GenerationRequest;
use crate::util::{fill_template, trunc_for_log};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model =
      std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "tutor-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    serde_json::from_str::<T>(&text).map_err(|e| format!("JSON parse error: {}", e))
  }

  /// Generate the next practice problem for a student profile.
  #[instrument(
    level = "info",
    skip(self, prompts, request),
    fields(skill = %request.skill, difficulty = %request.difficulty, history_len = request.history.len())
  )]
  pub async fn generate_problem(
    &self,
    prompts: &Prompts,
    request: &GenerationRequest,
  ) -> Result<Problem, String> {
    let user = render_problem_prompt(prompts, request);
    let start = std::time::Instant::now();
    let result = self.chat_json::<Problem>(&prompts.problem_system, &user, 0.8).await;
    let elapsed = start.elapsed();

    match &result {
      Ok(p) => info!(
        ?elapsed,
        problem_type = %p.problem_type,
        preview = %trunc_for_log(&p.statement, 40),
        "Problem generated"
      ),
      Err(e) => error!(?elapsed, error = %e, "Model call failed during problem generation"),
    }
    result
  }

  /// Ask the model whether `answer` solves `problem`.
  #[instrument(level = "info", skip(self, prompts, problem, answer), fields(answer_len = answer.len()))]
  pub async fn judge_answer(
    &self,
    prompts: &Prompts,
    problem: &Problem,
    answer: &str,
  ) -> Result<(bool, String), String> {
    #[derive(Deserialize)]
    struct Val { correct: bool, #[serde(default)] explanation: String }

    let user = fill_template(
      &prompts.judge_user_template,
      &[
        ("statement", problem.statement.as_str()),
        ("expected", problem.expected_answer.as_str()),
        ("answer", answer),
      ],
    );
    let v: Val = self.chat_json(&prompts.judge_system, &user, 0.0).await?;
    Ok((v.correct, v.explanation))
  }
}

/// Fill the problem prompt from a request. History is rendered one attempt per line.
pub fn render_problem_prompt(prompts: &Prompts, request: &GenerationRequest) -> String {
  let difficulty = request.difficulty.to_string();
  let ability = format!("{:.2}", request.ability.value());
  let history = render_history(&request.history);
  fill_template(
    &prompts.problem_user_template,
    &[
      ("skill", request.skill.as_str()),
      ("difficulty", difficulty.as_str()),
      ("ability", ability.as_str()),
      ("history", history.as_str()),
    ],
  )
}

fn render_history(history: &[Attempt]) -> String {
  if history.is_empty() {
    return "No recent history.".into();
  }
  history
    .iter()
    .map(|a| format!("- Problem: \"{}\", Correct: {}, Time: {:.1}s", a.problem_text, a.is_correct, a.time_taken_seconds))
    .collect::<Vec<_>>()
    .join("\n")
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Ability, Difficulty, Skill};

  #[test]
  fn prompt_includes_profile_and_history() {
    let req = GenerationRequest {
      skill: Skill::Geometry,
      difficulty: Difficulty::new(4),
      ability: Ability::new(0.55),
      history: vec![Attempt { problem_text: "Rotate (1,0) by 90°".into(), is_correct: false, time_taken_seconds: 12.0 }],
    };
    let text = render_problem_prompt(&Prompts::default(), &req);
    assert!(text.contains("Skill focus: geometry"));
    assert!(text.contains("level 4 out of 5"));
    assert!(text.contains("0.55"));
    assert!(text.contains("- Problem: \"Rotate (1,0) by 90°\", Correct: false, Time: 12.0s"));
  }

  #[test]
  fn empty_history_is_spelled_out() {
    assert_eq!(render_history(&[]), "No recent history.");
  }

  #[test]
  fn extracts_error_message() {
    let body = r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Rate limit reached"));
    assert_eq!(extract_openai_error("not json"), None);
  }
}
