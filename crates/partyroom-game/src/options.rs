//! Game settings: round count, windows, scoring and prompt sources.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings applied when a room starts a game.
///
/// Every field has a default, so a config file only lists what it
/// changes. Empty prompt lists fall back to the built-in decks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    /// Rounds before the game finishes.
    pub total_rounds: u32,
    pub timings: TurnTimings,
    pub scoring: ScoringRules,
    pub voters: VoterPolicy,
    pub truths: Vec<String>,
    pub dares: Vec<String>,
    pub most_likely_questions: Vec<String>,
    pub compatibility_questions: Vec<String>,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            total_rounds: 5,
            timings: TurnTimings::default(),
            scoring: ScoringRules::default(),
            voters: VoterPolicy::default(),
            truths: Vec::new(),
            dares: Vec::new(),
            most_likely_questions: Vec::new(),
            compatibility_questions: Vec::new(),
            seed: None,
        }
    }
}

impl GameOptions {
    /// Same options with a different round count (at least 1).
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.total_rounds = rounds.max(1);
        self
    }
}

/// How long each window stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnTimings {
    pub selection_delay_ms: u64,
    pub choice_timeout_secs: u64,
    pub truth_timeout_secs: u64,
    pub proof_timeout_secs: u64,
    pub vote_timeout_secs: u64,
    pub round_complete_delay_secs: u64,
    pub question_timeout_secs: u64,
}

impl Default for TurnTimings {
    fn default() -> Self {
        Self {
            selection_delay_ms: 3_000,
            choice_timeout_secs: 15,
            truth_timeout_secs: 30,
            proof_timeout_secs: 60,
            vote_timeout_secs: 30,
            round_complete_delay_secs: 10,
            question_timeout_secs: 20,
        }
    }
}

impl TurnTimings {
    pub fn selection_delay(&self) -> Duration {
        Duration::from_millis(self.selection_delay_ms)
    }

    pub fn choice_timeout(&self) -> Duration {
        Duration::from_secs(self.choice_timeout_secs)
    }

    pub fn truth_timeout(&self) -> Duration {
        Duration::from_secs(self.truth_timeout_secs)
    }

    pub fn proof_timeout(&self) -> Duration {
        Duration::from_secs(self.proof_timeout_secs)
    }

    pub fn vote_timeout(&self) -> Duration {
        Duration::from_secs(self.vote_timeout_secs)
    }

    pub fn round_complete_delay(&self) -> Duration {
        Duration::from_secs(self.round_complete_delay_secs)
    }

    pub fn question_timeout(&self) -> Duration {
        Duration::from_secs(self.question_timeout_secs)
    }
}

/// Point values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringRules {
    /// Awarded for a completed truth or a submitted dare proof.
    pub base_points: i64,
    /// Bonus per streak step.
    pub streak_step: i64,
    /// Upper bound of the streak bonus.
    pub streak_cap: i64,
    /// Majority "yes" on a dare proof.
    pub vote_bonus: i64,
    /// Majority or tied "no" on a dare proof (subtracted).
    pub vote_penalty: i64,
    /// Winning a most-likely or compatibility question.
    pub question_points: i64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            base_points: 25,
            streak_step: 5,
            streak_cap: 25,
            vote_bonus: 10,
            vote_penalty: 5,
            question_points: 10,
        }
    }
}

impl ScoringRules {
    /// `min(streak × step, cap)`.
    pub fn streak_bonus(&self, streak: u32) -> i64 {
        (i64::from(streak) * self.streak_step).min(self.streak_cap)
    }
}

/// Who may vote on a dare proof.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoterPolicy {
    /// Every connected player, the performer included.
    #[default]
    Everyone,
    /// Every connected player except the performer.
    ExcludePerformer,
}
