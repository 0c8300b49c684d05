//! Daily, weekly and monthly rollups.
//!
//! Rollups are always recomputed from session records. A window is fetched
//! once and then sliced per day in memory. Days are UTC calendar days of the
//! session start time.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::goal::{goal_progress, StudyGoal};
use super::streak::{compute_streak, UserStreak};
use crate::error::{CoreError, Result};
use crate::progression::ProgressionState;
use crate::session::SessionRecord;
use crate::storage::{GoalStore, SessionStore, UserContext};
use crate::timer::TimerMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    /// Minutes of completed Focus.
    pub total_time: u32,
    /// Focus sessions started that day.
    pub sessions: u32,
    pub completed_sessions: u32,
    pub goal_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub total_time: u32,
    pub sessions: u32,
    pub completed_sessions: u32,
    pub daily_average: f64,
    pub goal_progress: f64,
    pub daily_stats: Vec<DailyStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub year: i32,
    pub month: u32,
    pub total_time: u32,
    pub sessions: u32,
    pub completed_sessions: u32,
    pub daily_average: f64,
    pub goal_progress: f64,
    pub weekly_stats: Vec<WeeklyStats>,
}

/// All-time totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_sessions: u32,
    pub completed_sessions: u32,
    pub total_focus_time: u32,
    pub total_break_time: u32,
    /// Completed sessions of any kind started today.
    pub today_sessions: u32,
    pub current_streak: u32,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    total_time: u32,
    sessions: u32,
    completed: u32,
}

impl Totals {
    fn of<'a>(records: impl IntoIterator<Item = &'a SessionRecord>) -> Self {
        let mut totals = Self::default();
        for r in records.into_iter().filter(|r| r.kind == TimerMode::Focus) {
            totals.sessions += 1;
            if r.completed {
                totals.completed += 1;
                totals.total_time = totals.total_time.saturating_add(r.planned_minutes);
            }
        }
        totals
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn on_days(
    records: &[SessionRecord],
    from: NaiveDate,
    days: i64,
) -> impl Iterator<Item = &SessionRecord> {
    let until = from + Duration::days(days);
    records
        .iter()
        .filter(move |r| r.date() >= from && r.date() < until)
}

fn daily_from(records: &[SessionRecord], date: NaiveDate, goal: &StudyGoal) -> DailyStats {
    let t = Totals::of(on_days(records, date, 1));
    DailyStats {
        date,
        total_time: t.total_time,
        sessions: t.sessions,
        completed_sessions: t.completed,
        goal_progress: goal_progress(t.total_time, goal.daily_goal),
    }
}

fn weekly_from(records: &[SessionRecord], week_start: NaiveDate, goal: &StudyGoal) -> WeeklyStats {
    let t = Totals::of(on_days(records, week_start, 7));
    WeeklyStats {
        week_start,
        week_end: week_start + Duration::days(6),
        total_time: t.total_time,
        sessions: t.sessions,
        completed_sessions: t.completed,
        daily_average: f64::from(t.total_time) / 7.0,
        goal_progress: goal_progress(t.total_time, goal.weekly_goal),
        daily_stats: (0..7)
            .map(|i| daily_from(records, week_start + Duration::days(i), goal))
            .collect(),
    }
}

/// First day of the month and its length in days.
fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, i64)> {
    let invalid = || CoreError::InvalidDate(format!("{year}-{month:02}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok((first, (next - first).num_days()))
}

/// Seven-day chunk starts from day 1 while the start lies in the month.
/// The last chunk may reach into the next month.
fn month_chunk_starts(first: NaiveDate, days_in_month: i64) -> Vec<NaiveDate> {
    (0..days_in_month)
        .step_by(7)
        .map(|offset| first + Duration::days(offset))
        .collect()
}

pub struct StatsAggregator {
    sessions: Arc<dyn SessionStore>,
    goals: Arc<dyn GoalStore>,
    context: Arc<dyn UserContext>,
}

impl StatsAggregator {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        goals: Arc<dyn GoalStore>,
        context: Arc<dyn UserContext>,
    ) -> Self {
        Self {
            sessions,
            goals,
            context,
        }
    }

    fn user_id(&self) -> Result<String> {
        self.context
            .current_user_id()
            .ok_or(CoreError::NotAuthenticated)
    }

    async fn goal_for(&self, user_id: &str) -> Result<StudyGoal> {
        Ok(self.goals.load_goal(user_id).await?.unwrap_or_default())
    }

    async fn records_on(&self, user_id: &str, from: NaiveDate, days: i64) -> Result<Vec<SessionRecord>> {
        self.sessions
            .sessions_between(user_id, midnight(from), midnight(from + Duration::days(days)))
            .await
    }

    pub async fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats> {
        let user_id = self.user_id()?;
        let goal = self.goal_for(&user_id).await?;
        let records = self.records_on(&user_id, date, 1).await?;
        Ok(daily_from(&records, date, &goal))
    }

    /// Stats for `[week_start, week_start + 6]`.
    pub async fn weekly_stats(&self, week_start: NaiveDate) -> Result<WeeklyStats> {
        let user_id = self.user_id()?;
        let goal = self.goal_for(&user_id).await?;
        let records = self.records_on(&user_id, week_start, 7).await?;
        Ok(weekly_from(&records, week_start, &goal))
    }

    pub async fn monthly_stats(&self, year: i32, month: u32) -> Result<MonthlyStats> {
        let (first, days_in_month) = month_bounds(year, month)?;
        let user_id = self.user_id()?;
        let goal = self.goal_for(&user_id).await?;

        let chunks = month_chunk_starts(first, days_in_month);
        let span = chunks
            .last()
            .map_or(days_in_month, |last| (*last - first).num_days() + 7);
        let records = self.records_on(&user_id, first, span).await?;

        let t = Totals::of(on_days(&records, first, days_in_month));
        Ok(MonthlyStats {
            year,
            month,
            total_time: t.total_time,
            sessions: t.sessions,
            completed_sessions: t.completed,
            daily_average: f64::from(t.total_time) / days_in_month as f64,
            goal_progress: goal_progress(t.total_time, goal.monthly_goal),
            weekly_stats: chunks
                .into_iter()
                .map(|start| weekly_from(&records, start, &goal))
                .collect(),
        })
    }

    pub async fn user_streak(&self, today: NaiveDate) -> Result<UserStreak> {
        let user_id = self.user_id()?;
        let days = self.sessions.completed_focus_days(&user_id).await?;
        Ok(compute_streak(&days, today))
    }

    /// Like [`user_streak`](Self::user_streak), but a failed history read
    /// falls back to the progression state's local streak.
    pub async fn user_streak_or_fallback(
        &self,
        today: NaiveDate,
        local: &ProgressionState,
    ) -> UserStreak {
        match self.user_streak(today).await {
            Ok(streak) => streak,
            Err(e) => {
                tracing::warn!("streak history unavailable, using local streak: {e}");
                UserStreak {
                    current_streak: local.streak_days,
                    longest_streak: local.streak_days,
                    last_study_date: local.last_study_date,
                }
            }
        }
    }

    pub async fn summary(&self, today: NaiveDate) -> Result<SessionSummary> {
        let user_id = self.user_id()?;
        let all = self.sessions.all_sessions(&user_id).await?;
        let completed = || all.iter().filter(|r| r.completed);
        let minutes = |focus: bool| {
            completed()
                .filter(|r| r.kind.is_break() != focus)
                .fold(0u32, |acc, r| acc.saturating_add(r.planned_minutes))
        };
        let streak = self.user_streak(today).await?;
        Ok(SessionSummary {
            total_sessions: u32::try_from(all.len()).unwrap_or(u32::MAX),
            completed_sessions: u32::try_from(completed().count()).unwrap_or(u32::MAX),
            total_focus_time: minutes(true),
            total_break_time: minutes(false),
            today_sessions: u32::try_from(completed().filter(|r| r.date() == today).count())
                .unwrap_or(u32::MAX),
            current_streak: streak.current_streak,
        })
    }

    /// The user's goal, created with defaults on first read.
    pub async fn study_goal(&self) -> Result<StudyGoal> {
        let user_id = self.user_id()?;
        if let Some(goal) = self.goals.load_goal(&user_id).await? {
            return Ok(goal);
        }
        let goal = StudyGoal::default();
        self.goals.save_goal(&user_id, &goal).await?;
        tracing::debug!(user = %user_id, "default study goal created");
        Ok(goal)
    }

    pub async fn update_study_goal(&self, goal: StudyGoal) -> Result<StudyGoal> {
        let user_id = self.user_id()?;
        self.goals.save_goal(&user_id, &goal).await?;
        Ok(goal)
    }
}
