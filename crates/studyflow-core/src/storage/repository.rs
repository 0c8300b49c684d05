//! Repository seams the engine depends on.
//!
//! Every backend (the bundled SQLite [`Database`](super::Database), a remote
//! service binding, a test double) implements these traits. The engine never
//! talks to a concrete store directly.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::progression::ProgressionState;
use crate::session::{DailyHistory, NewSession, SessionRecord};
use crate::stats::StudyGoal;
use crate::timer::PomodoroPreset;

/// Source of the active user.
pub trait UserContext: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}

/// A user context that never changes; `None` models a signed-out client.
#[derive(Debug, Clone, Default)]
pub struct StaticUser(pub Option<String>);

impl StaticUser {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl UserContext for StaticUser {
    fn current_user_id(&self) -> Option<String> {
        self.0.clone()
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: NewSession) -> Result<SessionRecord>;

    async fn get_session(&self, user_id: &str, id: i64) -> Result<Option<SessionRecord>>;

    /// Set end time and completion if the record is still open.
    ///
    /// Returns `false` without touching the row when it was already finalized.
    async fn finalize_session(
        &self,
        user_id: &str,
        id: i64,
        ended_at: DateTime<Utc>,
        completed: bool,
    ) -> Result<bool>;

    /// Sessions whose start time lies in `[from, to)`, oldest first.
    async fn sessions_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>>;

    async fn all_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>>;

    /// Newest first.
    async fn recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>>;

    /// Distinct days with at least one completed Focus session, ascending.
    async fn completed_focus_days(&self, user_id: &str) -> Result<Vec<NaiveDate>>;

    /// Create-or-increment the day's aggregate for one completed Focus.
    async fn add_daily_focus(
        &self,
        user_id: &str,
        date: NaiveDate,
        minutes: u32,
    ) -> Result<DailyHistory>;

    /// Newest first.
    async fn daily_history(&self, user_id: &str, limit: usize) -> Result<Vec<DailyHistory>>;
}

#[async_trait]
pub trait ProgressionStore: Send + Sync {
    async fn load_progression(&self, user_id: &str) -> Result<Option<ProgressionState>>;

    async fn save_progression(&self, user_id: &str, state: &ProgressionState) -> Result<()>;
}

#[async_trait]
pub trait GoalStore: Send + Sync {
    async fn load_goal(&self, user_id: &str) -> Result<Option<StudyGoal>>;

    async fn save_goal(&self, user_id: &str, goal: &StudyGoal) -> Result<()>;
}

/// Durations a timer inherits when started for a routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub id: i64,
    pub name: String,
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub sessions_before_long_break: u32,
}

impl Routine {
    pub fn preset(&self) -> PomodoroPreset {
        PomodoroPreset {
            focus_minutes: self.focus_minutes.max(1),
            short_break_minutes: self.short_break_minutes.max(1),
            long_break_minutes: self.long_break_minutes.max(1),
            sessions_before_long_break: self.sessions_before_long_break.max(1),
        }
    }
}

#[async_trait]
pub trait RoutineLookup: Send + Sync {
    async fn routine(&self, user_id: &str, routine_id: i64) -> Result<Option<Routine>>;
}
