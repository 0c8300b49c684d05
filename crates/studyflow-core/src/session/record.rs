use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerMode;

/// One persisted Focus or break interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub user_id: String,
    pub routine_id: Option<i64>,
    pub kind: TimerMode,
    pub planned_minutes: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl SessionRecord {
    /// A record is finalized once it has an end time.
    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    /// UTC calendar day the interval started on.
    pub fn date(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    pub fn is_completed_focus(&self) -> bool {
        self.completed && self.kind == TimerMode::Focus
    }
}

/// Insert payload for [`crate::storage::SessionStore::insert_session`].
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: String,
    pub routine_id: Option<i64>,
    pub kind: TimerMode,
    pub planned_minutes: u32,
    pub start_time: DateTime<Utc>,
}

/// Per-day aggregate row, created on the first completed Focus of a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyHistory {
    pub date: NaiveDate,
    /// Minutes of completed Focus.
    pub total_time: u32,
    pub focus_count: u32,
    pub completed_count: u32,
    pub short_breaks: u32,
    pub long_breaks: u32,
}
