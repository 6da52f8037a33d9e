//! Application state: tutor settings, the practice controller, and the session store.
//!
//! This module owns:
//!   - the controller (configured generator + judge)
//!   - live practice sessions
//!   - learners, whose progress outlives any single session
//!
//! Sessions and learners live only in memory. Each entry sits behind its own
//! mutex so operations on one session run one at a time, while other sessions
//! proceed. Lock order is session entry, then learner.
//!
//! Entries untouched for `idle_ttl` are evicted by a periodic sweeper.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::config::{load_tutor_config_from_env, TutorConfig, TutorSettings};
use crate::domain::Skill;
use crate::gamification::Progress;
use crate::generator::{ConfiguredGenerator, ModelGenerator, ProblemBank};
use crate::judge::{build_judge, AnswerJudge};
use crate::openai::OpenAI;
use crate::seeds::seed_problems;
use crate::session::{PracticeController, Session};

pub type Controller = PracticeController<ConfiguredGenerator, Box<dyn AnswerJudge>>;

/// A learner's progress, shared by every session they start.
pub struct Learner {
    pub progress: Progress,
    last_touched: Instant,
}

impl Learner {
    fn new() -> Self {
        Self { progress: Progress::new(), last_touched: Instant::now() }
    }

    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }
}

pub type SharedLearner = Arc<Mutex<Learner>>;

/// One live practice run and the learner it awards XP to.
pub struct SessionEntry {
    pub session: Session,
    pub learner_id: String,
    pub learner: SharedLearner,
    last_touched: Instant,
}

impl SessionEntry {
    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }
}

pub type SharedEntry = Arc<Mutex<SessionEntry>>;

/// Counts removed by one sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Evicted {
    pub sessions: usize,
    pub learners: usize,
}

pub struct AppState {
    pub controller: Controller,
    pub settings: TutorSettings,
    sessions: RwLock<HashMap<String, SharedEntry>>,
    learners: RwLock<HashMap<String, SharedLearner>>,
}

impl AppState {
    /// Build state from env: load config, seed the bank, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_tutor_config_from_env().unwrap_or_default();
        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "tutor_backend", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
        } else {
            info!(target: "tutor_backend", "OpenAI disabled (no OPENAI_API_KEY). Using problem bank and local judging.");
        }
        Self::from_parts(cfg, openai)
    }

    pub fn from_parts(cfg: TutorConfig, openai: Option<OpenAI>) -> Self {
        let mut bank = ProblemBank::new();
        for pc in &cfg.problems {
            if !bank.insert_cfg(pc) {
                error!(target: "practice", skill = %pc.skill, "Skipping bank item: empty statement or answer.");
            }
        }
        // Built-in seeds always join the bank.
        for (skill, difficulty, problem) in seed_problems() {
            bank.insert(skill, difficulty, problem);
        }
        info!(target: "practice", total = bank.len(), "Problem bank ready");
        for skill in [Skill::FractionsDecimals, Skill::Algebra, Skill::Geometry] {
            info!(target: "practice", %skill, count = bank.count_for(skill), "Startup problem bank inventory");
        }

        let judge = build_judge(&cfg.tutor, &cfg.prompts, openai.clone());
        let model = openai.map(|openai| ModelGenerator { openai, prompts: cfg.prompts.clone() });
        let generator = ConfiguredGenerator { model, bank };
        Self::with_controller(
            PracticeController::new(generator, judge).with_success_message(cfg.tutor.success_message.clone()),
            cfg.tutor,
        )
    }

    pub fn with_controller(controller: Controller, settings: TutorSettings) -> Self {
        Self {
            controller,
            settings,
            sessions: RwLock::new(HashMap::new()),
            learners: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a learner by id, creating it if unknown. `None` mints a new id.
    #[instrument(level = "debug", skip(self))]
    pub async fn learner(&self, id: Option<&str>) -> (String, SharedLearner) {
        let id = id.map(str::to_string).unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut learners = self.learners.write().await;
        let learner = learners
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(target: "practice", learner_id = %id, "New learner");
                Arc::new(Mutex::new(Learner::new()))
            })
            .clone();
        (id, learner)
    }

    /// Register a session for a learner and return its id.
    #[instrument(level = "debug", skip(self, session, learner), fields(skill = %session.skill()))]
    pub async fn insert_session(&self, session: Session, learner_id: String, learner: SharedLearner) -> String {
        let id = Uuid::new_v4().to_string();
        let entry = SessionEntry { session, learner_id, learner, last_touched: Instant::now() };
        self.sessions.write().await.insert(id.clone(), Arc::new(Mutex::new(entry)));
        id
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_session(&self, id: &str) -> Option<SharedEntry> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Drop a session. Returns false if it was unknown.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn end_session(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn learner_count(&self) -> usize {
        self.learners.read().await.len()
    }

    /// Drop sessions idle for longer than `ttl` as of `now`, then learners that
    /// are idle and no longer referenced by a live session.
    /// Entries locked by an in-flight operation are never idle.
    pub async fn evict_idle(&self, ttl: Duration, now: Instant) -> Evicted {
        let idle = |t: Instant| now.saturating_duration_since(t) > ttl;

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| match entry.try_lock() {
            Ok(e) => !idle(e.last_touched),
            Err(_) => true,
        });
        let evicted_sessions = before - sessions.len();
        drop(sessions);

        let mut learners = self.learners.write().await;
        let before = learners.len();
        learners.retain(|_, learner| {
            if Arc::strong_count(learner) > 1 {
                return true;
            }
            match learner.try_lock() {
                Ok(l) => !idle(l.last_touched),
                Err(_) => true,
            }
        });
        Evicted { sessions: evicted_sessions, learners: before - learners.len() }
    }
}

/// Periodically evict idle sessions and learners.
pub fn spawn_idle_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let ttl = state.settings.idle_ttl();
    let every = state.settings.sweep_interval();
    info!(target: "tutor_backend", ttl_secs = ttl.as_secs(), every_secs = every.as_secs(), "Starting idle session sweeper");
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every);
        loop {
            timer.tick().await;
            let evicted = state.evict_idle(ttl, Instant::now()).await;
            if evicted != Evicted::default() {
                let live = state.session_count().await;
                info!(
                    target: "practice",
                    sessions = evicted.sessions,
                    learners = evicted.learners,
                    live = live,
                    "Evicted idle entries"
                );
            }
        }
    })
}
