use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::challenge::{daily_challenges, Challenge};
use super::level::{level_for_xp, XpProgress};

/// XP granted per focused minute.
pub const XP_PER_MINUTE: f64 = 5.0;

/// Persisted gamification state of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionState {
    /// Calendar day the challenge set belongs to.
    pub date: NaiveDate,
    pub xp: u64,
    pub level: u32,
    pub daily_challenges: Vec<Challenge>,
    /// Local streak, used when the session history is unavailable.
    pub streak_days: u32,
    #[serde(default)]
    pub last_study_date: Option<NaiveDate>,
}

/// Outcome of a single award.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Award {
    /// Base XP plus any challenge rewards.
    pub gained_xp: u64,
    pub completed_challenges: Vec<String>,
    pub progress: XpProgress,
}

impl ProgressionState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            date: today,
            xp: 0,
            level: 1,
            daily_challenges: daily_challenges(),
            streak_days: 0,
            last_study_date: None,
        }
    }

    /// Start a new day if `today` differs from the stored date.
    ///
    /// XP and streak carry over; the challenge set is replaced. Returns true
    /// when a rollover happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.date == today {
            return false;
        }
        self.date = today;
        self.daily_challenges = daily_challenges();
        self.level = level_for_xp(self.xp);
        true
    }

    /// Apply one completed Focus interval of `minutes` studied on `today`.
    pub fn award_focus(&mut self, minutes: u32, today: NaiveDate) -> Award {
        self.roll_over(today);

        let base = (f64::from(minutes) * XP_PER_MINUTE).round().max(0.0) as u64;
        self.update_streak(today);

        let mut bonus = 0u64;
        let mut completed = Vec::new();
        for challenge in &mut self.daily_challenges {
            if let Some(reward) = challenge.record_focus(minutes) {
                bonus += reward;
                completed.push(challenge.id.clone());
            }
        }

        let gained = base + bonus;
        self.xp = self.xp.saturating_add(gained);
        self.level = level_for_xp(self.xp);

        Award {
            gained_xp: gained,
            completed_challenges: completed,
            progress: self.progress(),
        }
    }

    pub fn progress(&self) -> XpProgress {
        XpProgress::from_xp(self.xp)
    }

    fn update_streak(&mut self, today: NaiveDate) {
        if self.last_study_date == Some(today) {
            return;
        }
        let yesterday = today - Duration::days(1);
        self.streak_days = if self.last_study_date == Some(yesterday) {
            self.streak_days.saturating_add(1)
        } else {
            1
        };
        self.last_study_date = Some(today);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn thirty_minutes_pays_base_plus_challenge_once() {
        let today = day(2026, 3, 10);
        let mut state = ProgressionState::new(today);

        let first = state.award_focus(30, today);
        assert_eq!(first.gained_xp, 150 + 30);
        assert_eq!(first.completed_challenges, vec!["minutes_30".to_string()]);

        let second = state.award_focus(30, today);
        // pomodoro_2 completes on the second interval, minutes_30 does not pay again.
        assert_eq!(second.gained_xp, 150 + 50);
        assert_eq!(second.completed_challenges, vec!["pomodoro_2".to_string()]);

        let third = state.award_focus(30, today);
        assert_eq!(third.gained_xp, 150);
        assert_eq!(state.xp, 180 + 200 + 150);
        assert_eq!(state.level, level_for_xp(530));
    }

    #[test]
    fn xp_never_decreases_within_a_day() {
        let today = day(2026, 3, 10);
        let mut state = ProgressionState::new(today);
        let mut last = 0;
        for minutes in [0, 5, 25, 1, 0] {
            state.award_focus(minutes, today);
            assert!(state.xp >= last);
            last = state.xp;
        }
    }

    #[test]
    fn streak_increments_from_yesterday() {
        let today = day(2026, 3, 10);
        let mut state = ProgressionState::new(today);
        state.streak_days = 4;
        state.last_study_date = Some(day(2026, 3, 9));
        state.award_focus(25, today);
        assert_eq!(state.streak_days, 5);
        state.award_focus(25, today);
        assert_eq!(state.streak_days, 5);
    }

    #[test]
    fn streak_resets_after_gap() {
        let today = day(2026, 3, 10);
        let mut state = ProgressionState::new(today);
        state.streak_days = 9;
        state.last_study_date = Some(day(2026, 3, 8));
        state.award_focus(25, today);
        assert_eq!(state.streak_days, 1);
        assert_eq!(state.last_study_date, Some(today));
    }

    #[test]
    fn rollover_resets_challenges_keeps_xp_and_streak() {
        let monday = day(2026, 3, 9);
        let mut state = ProgressionState::new(monday);
        state.award_focus(30, monday);
        let xp = state.xp;
        assert!(state.daily_challenges.iter().any(|c| c.completed));

        let tuesday = day(2026, 3, 10);
        assert!(state.roll_over(tuesday));
        assert!(!state.roll_over(tuesday));
        assert_eq!(state.xp, xp);
        assert_eq!(state.streak_days, 1);
        assert!(state.daily_challenges.iter().all(|c| !c.completed && c.progress == 0));
        assert_eq!(state.date, tuesday);
    }
}
