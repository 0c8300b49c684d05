//! # Studyflow Core Library
//!
//! This library provides the session and progression engine behind the
//! Studyflow study timer. Every operation is available through the
//! `studyflow-cli` binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A pure, second-granular Pomodoro state machine; the
//!   caller drives it with `tick()` (or lets [`TimerSession`] do so)
//! - **Session Recorder**: Opens and finalizes persisted session records
//! - **Progression**: XP, levels, streak and daily challenges
//! - **Statistics**: Daily/weekly/monthly rollups recomputed from sessions
//! - **Storage**: Repository traits, a bundled SQLite implementation and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerSession`]: Owned controller wiring the engine to persistence
//! - [`ProgressionEngine`]: Per-user gamification state
//! - [`StatsAggregator`]: Rollups, streaks and goals
//! - [`Database`]: Local store implementing every repository trait
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod progression;
pub mod session;
pub mod stats;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, Result};
pub use events::Event;
pub use progression::{Award, Challenge, ProgressionEngine, ProgressionState, XpProgress};
pub use session::{
    Notification, Notifier, SessionOptions, SessionRecord, SessionRecorder, SessionSnapshot,
    SessionUpdate, TimerSession,
};
pub use stats::{StatsAggregator, StudyGoal, UserStreak};
pub use storage::{Config, Database, StaticUser, UserContext};
pub use timer::{PomodoroPreset, TimerEngine, TimerMode, TimerState};
