use serde::{Deserialize, Serialize};

/// Study targets in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGoal {
    pub daily_goal: u32,
    pub weekly_goal: u32,
    pub monthly_goal: u32,
}

impl Default for StudyGoal {
    fn default() -> Self {
        Self {
            daily_goal: 120,
            weekly_goal: 840,
            monthly_goal: 3600,
        }
    }
}

/// Percentage of `goal` reached by `minutes`; 0 for a zero goal.
///
/// Not clamped: studying past the goal reports more than 100.
pub fn goal_progress(minutes: u32, goal: u32) -> f64 {
    if goal == 0 {
        return 0.0;
    }
    f64::from(minutes) / f64::from(goal) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let goal = StudyGoal::default();
        assert_eq!((goal.daily_goal, goal.weekly_goal, goal.monthly_goal), (120, 840, 3600));
    }

    #[test]
    fn progress_handles_zero_and_overshoot() {
        assert_eq!(goal_progress(60, 120), 50.0);
        assert_eq!(goal_progress(60, 0), 0.0);
        assert_eq!(goal_progress(240, 120), 200.0);
    }
}
