use serde::{Deserialize, Serialize};

/// A per-day task with a one-time XP reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Prefix selects what advances it: `pomodoro_`, `minutes_` or `streak_`.
    pub id: String,
    pub title: String,
    pub target: u32,
    pub progress: u32,
    pub reward_xp: u64,
    pub completed: bool,
}

/// What a challenge counts, derived from its id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    Pomodoros,
    Minutes,
    Streak,
    Other,
}

impl Challenge {
    pub fn new(id: &str, title: &str, target: u32, reward_xp: u64) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            target,
            progress: 0,
            reward_xp,
            completed: false,
        }
    }

    pub fn kind(&self) -> ChallengeKind {
        if self.id.starts_with("pomodoro_") {
            ChallengeKind::Pomodoros
        } else if self.id.starts_with("minutes_") {
            ChallengeKind::Minutes
        } else if self.id.starts_with("streak_") {
            ChallengeKind::Streak
        } else {
            ChallengeKind::Other
        }
    }

    /// Record one completed Focus interval of `minutes`.
    ///
    /// Returns the reward when this call completes the challenge; a completed
    /// challenge never pays again.
    pub fn record_focus(&mut self, minutes: u32) -> Option<u64> {
        if self.completed {
            return None;
        }
        match self.kind() {
            ChallengeKind::Pomodoros => self.progress = self.progress.saturating_add(1),
            ChallengeKind::Minutes => self.progress = self.progress.saturating_add(minutes),
            ChallengeKind::Streak | ChallengeKind::Other => return None,
        }
        if self.progress >= self.target {
            self.completed = true;
            return Some(self.reward_xp);
        }
        None
    }
}

/// The fixed set handed out at every date rollover.
pub fn daily_challenges() -> Vec<Challenge> {
    vec![
        Challenge::new("pomodoro_2", "Complete 2 pomodoros", 2, 50),
        Challenge::new("minutes_30", "Study for 30 minutes", 30, 30),
        Challenge::new("streak_keep", "Keep your streak", 1, 20),
    ]
}
