//! Statistics module for Studyflow
//!
//! Daily, weekly and monthly rollups, goal progress, streaks and the all-time
//! summary, all derived from persisted session records.

mod aggregator;
mod goal;
mod streak;

pub use aggregator::{DailyStats, MonthlyStats, SessionSummary, StatsAggregator, WeeklyStats};
pub use goal::{goal_progress, StudyGoal};
pub use streak::{compute_streak, UserStreak};
