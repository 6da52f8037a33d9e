//! Learner progress: XP, levels, titles and badges.
//!
//! `Progress` is an owned value handed to whoever awards XP. There is no
//! process-wide instance; each learner carries one across all of their sessions.

use serde::Serialize;

pub const XP_PER_LEVEL: u32 = 100;
pub const MAX_LEVEL: u32 = 50;

/// (minimum level, title). Highest reached entry wins.
const LEVEL_TITLES: &[(u32, &str)] = &[
  (1, "Novice"),
  (2, "Apprentice"),
  (3, "Journeyman"),
  (4, "Adept"),
  (5, "Scholar"),
  (6, "Guru"),
  (10, "Master"),
];

/// (badge id, required XP), ascending.
const BADGES: &[(&str, u32)] = &[
  ("upload-1", 10),
  ("upload-5", 50),
  ("verified", 150),
  ("master", 300),
  ("scholar", 500),
  ("ai-enthusiast", 1000),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
  xp: u32,
  level: u32,
  badges: Vec<&'static str>,
}

/// Public view of a learner's progress.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProgressOut {
  pub xp: u32,
  pub level: u32,
  pub title: &'static str,
  #[serde(rename = "nextLevelXp")]
  pub next_level_xp: u32,
  #[serde(rename = "levelProgress")]
  pub level_progress: f64,
  pub badges: Vec<&'static str>,
}

impl Default for Progress {
  fn default() -> Self { Self { xp: 0, level: 1, badges: Vec::new() } }
}

impl Progress {
  pub fn new() -> Self { Self::default() }

  pub fn xp(&self) -> u32 { self.xp }

  pub fn level(&self) -> u32 { self.level }

  #[cfg(test)]
  pub fn badges(&self) -> &[&'static str] { &self.badges }

  /// Add XP; level and badges only ever move up. Returns newly earned badges.
  pub fn add_xp(&mut self, amount: u32) -> Vec<&'static str> {
    self.xp = self.xp.saturating_add(amount);
    let level = (self.xp / XP_PER_LEVEL + 1).min(MAX_LEVEL);
    if level > self.level {
      self.level = level;
    }
    let earned: Vec<&'static str> = BADGES
      .iter()
      .filter(|(id, req)| self.xp >= *req && !self.badges.contains(id))
      .map(|(id, _)| *id)
      .collect();
    self.badges.extend(earned.iter().copied());
    earned
  }

  pub fn title(&self) -> &'static str {
    LEVEL_TITLES
      .iter()
      .take_while(|(min, _)| self.level >= *min)
      .last()
      .map(|(_, t)| *t)
      .unwrap_or("Novice")
  }

  pub fn next_level_xp(&self) -> u32 { self.level * XP_PER_LEVEL }

  /// Percent of the way through the current level. May exceed 100 at the level cap.
  pub fn level_progress(&self) -> f64 {
    let base = (self.level - 1) * XP_PER_LEVEL;
    (self.xp.saturating_sub(base) as f64 / XP_PER_LEVEL as f64) * 100.0
  }

  pub fn to_out(&self) -> ProgressOut {
    ProgressOut {
      xp: self.xp,
      level: self.level,
      title: self.title(),
      next_level_xp: self.next_level_xp(),
      level_progress: self.level_progress(),
      badges: self.badges.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn starts_as_novice() {
    let p = Progress::new();
    assert_eq!(p.level(), 1);
    assert_eq!(p.title(), "Novice");
    assert_eq!(p.next_level_xp(), 100);
    assert_eq!(p.level_progress(), 0.0);
    assert!(p.badges().is_empty());
  }

  #[test]
  fn xp_drives_level_and_badges() {
    let mut p = Progress::new();
    assert_eq!(p.add_xp(5), Vec::<&str>::new());
    assert_eq!(p.add_xp(5), vec!["upload-1"]);
    assert_eq!(p.add_xp(140), vec!["upload-5", "verified"]);
    assert_eq!(p.xp(), 150);
    assert_eq!(p.level(), 2);
    assert_eq!(p.title(), "Apprentice");
    assert_eq!(p.level_progress(), 50.0);
  }

  #[test]
  fn titles_hold_between_table_entries() {
    let mut p = Progress::new();
    p.add_xp(800);
    assert_eq!(p.level(), 9);
    assert_eq!(p.title(), "Guru");
    p.add_xp(100);
    assert_eq!(p.title(), "Master");
  }

  #[test]
  fn level_is_capped() {
    let mut p = Progress::new();
    let earned = p.add_xp(100_000);
    assert_eq!(p.level(), MAX_LEVEL);
    assert_eq!(earned.len(), BADGES.len());
    assert!(p.add_xp(10).is_empty());
  }
}
