use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progression::XpProgress;
use crate::timer::TimerMode;

/// Every state change in the engine produces an Event.
/// Renderers poll snapshots; callers log or forward events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Natural completion of an interval.
    TimerCompleted {
        mode: TimerMode,
        next_mode: TimerMode,
        planned_minutes: u32,
        completed_focus_count: u32,
        at: DateTime<Utc>,
    },
    TimerSkipped {
        from: TimerMode,
        to: TimerMode,
        at: DateTime<Utc>,
    },
    TimerStopped {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A session record was opened in the store.
    SessionOpened {
        session_id: i64,
        mode: TimerMode,
        at: DateTime<Utc>,
    },
    /// A session record received its end time.
    SessionFinalized {
        session_id: i64,
        completed: bool,
        at: DateTime<Utc>,
    },
    /// XP was awarded for a completed Focus interval.
    ProgressAwarded {
        gained_xp: u64,
        completed_challenges: Vec<String>,
        progress: XpProgress,
        at: DateTime<Utc>,
    },
}
