//! User progression record
//!
//! One profile per installation. It is owned by the orchestrator and
//! mirrored to the profile store after every mutation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::PreconditionError;
use crate::types::{QuizResult, Reading};

pub const STARTING_BALANCE: u64 = 10;
pub const EXPERIENCE_PER_LEVEL: u64 = 100;

/// Level reached with the given cumulative experience
pub fn level_for(experience: u64) -> u32 {
    u32::try_from(experience / EXPERIENCE_PER_LEVEL)
        .unwrap_or(u32::MAX - 1)
        .saturating_add(1)
}

/// Cumulative experience at which `level` ends
pub fn experience_for_next_level(level: u32) -> u64 {
    u64::from(level) * EXPERIENCE_PER_LEVEL
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Mystical,
    Dark,
    Light,
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mystical" => Ok(Theme::Mystical),
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err(format!(
                "Invalid theme: '{}'. Valid options: mystical, dark, light",
                s
            )),
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Mystical => write!(f, "mystical"),
            Theme::Dark => write!(f, "dark"),
            Theme::Light => write!(f, "light"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub sound_enabled: bool,
    pub animations_enabled: bool,
    #[serde(default)]
    pub theme: Theme,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            animations_enabled: true,
            theme: Theme::Mystical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Achievement {
    FirstReading,
    TenthReading,
    PerfectQuiz,
    CoinCollector,
}

impl Achievement {
    pub fn title(&self) -> &'static str {
        match self {
            Achievement::FirstReading => "First Steps",
            Achievement::TenthReading => "Dedicated Seeker",
            Achievement::PerfectQuiz => "Tarot Master",
            Achievement::CoinCollector => "Coin Collector",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Achievement::FirstReading => "Completed your first tarot reading",
            Achievement::TenthReading => "Completed 10 tarot readings",
            Achievement::PerfectQuiz => "Achieved 100% on a quiz",
            Achievement::CoinCollector => "Accumulated 100 coins",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub balance: u64,
    pub level: u32,
    pub experience: u64,
    #[serde(default)]
    pub achievements: BTreeSet<Achievement>,
    #[serde(default)]
    pub reading_history: Vec<Reading>,
    #[serde(default)]
    pub quiz_history: Vec<QuizResult>,
    #[serde(default)]
    pub preferences: Preferences,
}

/// Counters shown on the home page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileStats {
    pub readings: usize,
    pub quizzes: usize,
    pub achievements: usize,
    pub experience: u64,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl UserProfile {
    /// Fresh profile with a newly generated id
    pub fn new() -> Self {
        Self::with_id(format!("user_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            balance: STARTING_BALANCE,
            level: 1,
            experience: 0,
            achievements: BTreeSet::new(),
            reading_history: Vec::new(),
            quiz_history: Vec::new(),
            preferences: Preferences::default(),
        }
    }

    /// Re-derive the level from experience
    ///
    /// Returns true if the stored level disagreed.
    pub fn normalize(&mut self) -> bool {
        let level = level_for(self.experience);
        let changed = self.level != level;
        self.level = level;
        changed
    }

    pub fn can_afford(&self, cost: u64) -> bool {
        self.balance >= cost
    }

    /// Take `cost` coins from the balance
    pub fn debit(&mut self, cost: u64) -> Result<u64, PreconditionError> {
        self.balance = self.balance.checked_sub(cost).ok_or(
            PreconditionError::InsufficientBalance {
                required: cost,
                available: self.balance,
            },
        )?;
        Ok(self.balance)
    }

    /// Replace the balance with the service's authoritative value
    pub fn set_balance(&mut self, balance: u64) {
        self.balance = balance;
    }

    /// Add experience and recompute the level; returns (old, new) level
    pub fn add_experience(&mut self, experience: u64) -> (u32, u32) {
        let before = self.level;
        self.experience = self.experience.saturating_add(experience);
        self.level = level_for(self.experience);
        (before, self.level)
    }

    /// Experience still needed to reach the next level
    pub fn experience_to_next_level(&self) -> u64 {
        experience_for_next_level(self.level).saturating_sub(self.experience)
    }

    pub fn record_reading(&mut self, reading: Reading) {
        self.reading_history.push(reading);
    }

    pub fn record_quiz(&mut self, result: QuizResult) {
        self.quiz_history.push(result);
    }

    /// Returns true if the achievement was not held before
    pub fn award(&mut self, achievement: Achievement) -> bool {
        self.achievements.insert(achievement)
    }

    pub fn has_achievement(&self, achievement: Achievement) -> bool {
        self.achievements.contains(&achievement)
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.preferences.sound_enabled = !self.preferences.sound_enabled;
        self.preferences.sound_enabled
    }

    pub fn toggle_animations(&mut self) -> bool {
        self.preferences.animations_enabled = !self.preferences.animations_enabled;
        self.preferences.animations_enabled
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.preferences.theme = theme;
    }

    pub fn stats(&self) -> ProfileStats {
        ProfileStats {
            readings: self.reading_history.len(),
            quizzes: self.quiz_history.len(),
            achievements: self.achievements.len(),
            experience: self.experience,
        }
    }
}
