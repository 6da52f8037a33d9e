//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Problem, ProblemSource, Skill};
use crate::gamification::ProgressOut;
use crate::session::SessionSnapshot;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartSession {
        skill: Skill,
        /// Keeps XP across sessions. Omitted: the connection's learner is reused.
        #[serde(default, rename = "learnerId")]
        learner_id: Option<String>,
    },
    NextProblem,
    SubmitAnswer {
        answer: String,
        #[serde(default, rename = "elapsedSeconds")]
        elapsed_seconds: Option<f64>,
    },
    Hint,
    Progress,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Problem(ProblemEnvelope),
    AnswerResult(AnswerOut),
    Hint {
        text: String,
    },
    Progress(ProgressEnvelope),
    Error {
        message: String,
    },
}

/// Problem as shown to the student: no expected answer, no common mistake.
#[derive(Debug, Serialize, PartialEq)]
pub struct ProblemOut {
    #[serde(rename = "problemStatement")]
    pub statement: String,
    #[serde(rename = "problemType")]
    pub problem_type: String,
    pub source: ProblemSource,
}

pub fn to_out(p: &Problem) -> ProblemOut {
    ProblemOut {
        statement: p.statement.clone(),
        problem_type: p.problem_type.clone(),
        source: p.source,
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct StartIn {
    pub skill: Skill,
    #[serde(default, rename = "learnerId")]
    pub learner_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProblemEnvelope {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "learnerId")]
    pub learner_id: String,
    pub problem: ProblemOut,
    pub session: SessionSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub answer: String,
    #[serde(default, rename = "elapsedSeconds")]
    pub elapsed_seconds: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AnswerOut {
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
    pub explanation: String,
    #[serde(rename = "expectedAnswer")]
    pub expected_answer: String,
    #[serde(rename = "xpAwarded")]
    pub xp_awarded: u32,
    #[serde(rename = "newBadges")]
    pub new_badges: Vec<&'static str>,
    pub session: SessionSnapshot,
    pub progress: ProgressOut,
}

#[derive(Debug, Serialize)]
pub struct ProgressEnvelope {
    #[serde(rename = "learnerId")]
    pub learner_id: String,
    pub session: SessionSnapshot,
    pub progress: ProgressOut,
}

#[derive(Debug, Serialize)]
pub struct HintOut {
    pub text: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub sessions: usize,
    pub learners: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeds::fallback_problem;

    #[test]
    fn client_messages_parse() {
        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"start_session","skill":"geometry"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::StartSession { skill: Skill::Geometry, learner_id: None }));

        let m: ClientWsMessage =
            serde_json::from_str(r#"{"type":"start_session","skill":"algebra","learnerId":"ana"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::StartSession { learner_id: Some(ref id), .. } if id == "ana"));

        let m: ClientWsMessage = serde_json::from_str(r#"{"type":"submit_answer","answer":"60"}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::SubmitAnswer { elapsed_seconds: None, .. }));

        let m: ClientWsMessage =
            serde_json::from_str(r#"{"type":"submit_answer","answer":"60","elapsedSeconds":4.2}"#).unwrap();
        assert!(matches!(m, ClientWsMessage::SubmitAnswer { elapsed_seconds: Some(_), .. }));
    }

    #[test]
    fn problem_out_hides_answer() {
        let v = serde_json::to_value(to_out(&fallback_problem())).unwrap();
        assert_eq!(v["problemType"], "geometry_area");
        assert_eq!(v["source"], "fallback");
        assert!(v.get("expectedAnswer").is_none());
        assert!(v.get("commonMistake").is_none());
    }
}
