//! Timer engine implementation.
//!
//! The engine is a pure, second-granular state machine. It owns no thread or
//! scheduler: the caller invokes `tick()` once per second while the timer is
//! running (see [`crate::session::TimerSession`] for the scheduled driver).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!   ^        |
//!   +--------+  (natural completion, skip, stop)
//! ```
//!
//! Modes cycle `Focus -> ShortBreak | LongBreak -> Focus`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::preset::PomodoroPreset;
use crate::error::{CoreError, Result};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub fn is_break(self) -> bool {
        !matches!(self, TimerMode::Focus)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::ShortBreak => "short_break",
            TimerMode::LongBreak => "long_break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "focus" => Some(TimerMode::Focus),
            "short_break" => Some(TimerMode::ShortBreak),
            "long_break" => Some(TimerMode::LongBreak),
            _ => None,
        }
    }
}

/// Run sub-state shared by every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

/// Read-only snapshot handed to renderers and subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub mode: TimerMode,
    pub total_duration_secs: u64,
    pub remaining_secs: u64,
    pub running: bool,
    pub paused: bool,
    pub completed_focus_count: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TimerState {
    /// 0.0 .. 1.0 progress within the current interval.
    pub fn progress(&self) -> f64 {
        if self.total_duration_secs == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / self.total_duration_secs as f64)
    }

    /// `MM:SS` rendering of the remaining time.
    pub fn display_time(&self) -> String {
        format!("{:02}:{:02}", self.remaining_secs / 60, self.remaining_secs % 60)
    }
}

/// Core timer engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    preset: PomodoroPreset,
    mode: TimerMode,
    run_state: RunState,
    remaining_secs: u64,
    completed_focus_count: u32,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    /// Instant the countdown was last advanced; lets a restored engine catch up.
    #[serde(default)]
    last_tick_at: Option<DateTime<Utc>>,
}

impl TimerEngine {
    /// Create an idle engine positioned at the start of a Focus interval.
    pub fn new(preset: PomodoroPreset) -> Self {
        Self {
            preset,
            mode: TimerMode::Focus,
            run_state: RunState::Idle,
            remaining_secs: preset.seconds_for(TimerMode::Focus),
            completed_focus_count: 0,
            started_at: None,
            paused_at: None,
            completed_at: None,
            last_tick_at: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn completed_focus_count(&self) -> u32 {
        self.completed_focus_count
    }

    pub fn preset(&self) -> &PomodoroPreset {
        &self.preset
    }

    pub fn total_secs(&self) -> u64 {
        self.preset.seconds_for(self.mode)
    }

    /// Planned length of the current interval in minutes.
    pub fn planned_minutes(&self) -> u32 {
        self.preset.minutes_for(self.mode)
    }

    pub fn current_state(&self) -> TimerState {
        TimerState {
            mode: self.mode,
            total_duration_secs: self.total_secs(),
            remaining_secs: self.remaining_secs,
            running: self.run_state == RunState::Running,
            paused: self.run_state == RunState::Paused,
            completed_focus_count: self.completed_focus_count,
            started_at: self.started_at,
            paused_at: self.paused_at,
            completed_at: self.completed_at,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin counting down the current interval.
    ///
    /// A paused timer is resumed instead. Starting a running timer is rejected
    /// so a second countdown can never be spawned.
    pub fn start(&mut self) -> Result<Event> {
        match self.run_state {
            RunState::Running => Err(CoreError::AlreadyRunning),
            RunState::Paused => Ok(self
                .resume()
                .unwrap_or_else(|| self.started_event(Utc::now()))),
            RunState::Idle => {
                let now = Utc::now();
                if self.remaining_secs == 0 {
                    self.remaining_secs = self.total_secs();
                }
                self.run_state = RunState::Running;
                self.started_at = Some(now);
                self.paused_at = None;
                self.completed_at = None;
                self.last_tick_at = Some(now);
                tracing::debug!(mode = self.mode.as_str(), remaining = self.remaining_secs, "timer started");
                Ok(self.started_event(now))
            }
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.run_state != RunState::Running {
            return None;
        }
        let now = Utc::now();
        self.run_state = RunState::Paused;
        self.paused_at = Some(now);
        self.last_tick_at = None;
        Some(Event::TimerPaused {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: now,
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.run_state != RunState::Paused {
            return None;
        }
        let now = Utc::now();
        self.run_state = RunState::Running;
        self.paused_at = None;
        self.last_tick_at = Some(now);
        Some(Event::TimerResumed {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: now,
        })
    }

    /// Advance one second. Returns `Some(Event::TimerCompleted)` exactly once
    /// per interval, when the countdown reaches zero.
    pub fn tick(&mut self) -> Option<Event> {
        if self.run_state != RunState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if let Some(last) = self.last_tick_at {
            self.last_tick_at = Some(last + Duration::seconds(1));
        }
        if self.remaining_secs == 0 {
            return Some(self.complete_interval());
        }
        None
    }

    /// Apply the whole seconds that elapsed since the last tick, e.g. after the
    /// engine was restored from storage. Stops at the first completion.
    pub fn catch_up(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.run_state != RunState::Running {
            return None;
        }
        let last = self.last_tick_at.unwrap_or(now);
        let elapsed = (now - last).num_seconds();
        if elapsed <= 0 {
            return None;
        }
        for _ in 0..elapsed {
            if let Some(event) = self.tick() {
                return Some(event);
            }
        }
        None
    }

    /// Jump to the next logical mode without counting the interval.
    ///
    /// Focus always goes to ShortBreak here; the long-break modulus only applies
    /// to natural completions.
    pub fn skip(&mut self) -> Event {
        let from = self.mode;
        let to = match from {
            TimerMode::Focus => TimerMode::ShortBreak,
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
        };
        self.enter_mode(to);
        tracing::debug!(from = from.as_str(), to = to.as_str(), "timer skipped");
        Event::TimerSkipped {
            from,
            to,
            at: Utc::now(),
        }
    }

    /// Cancel the countdown and return to Idle with the interval rewound.
    pub fn stop(&mut self) -> Option<Event> {
        if self.run_state == RunState::Idle {
            return None;
        }
        let remaining = self.remaining_secs;
        let mode = self.mode;
        self.enter_mode(mode);
        Some(Event::TimerStopped {
            mode,
            remaining_secs: remaining,
            at: Utc::now(),
        })
    }

    /// Replace the durations (e.g. a routine override); resets to an idle Focus.
    pub fn set_preset(&mut self, preset: PomodoroPreset) {
        *self = Self::new(preset);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn started_event(&self, at: DateTime<Utc>) -> Event {
        Event::TimerStarted {
            mode: self.mode,
            duration_secs: self.remaining_secs,
            at,
        }
    }

    fn complete_interval(&mut self) -> Event {
        let finished = self.mode;
        let planned_minutes = self.planned_minutes();
        let next = match finished {
            TimerMode::Focus => {
                self.completed_focus_count += 1;
                let every = self.preset.sessions_before_long_break.max(1);
                if self.completed_focus_count % every == 0 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
        };
        let now = Utc::now();
        self.enter_mode(next);
        self.completed_at = Some(now);
        tracing::debug!(
            finished = finished.as_str(),
            next = next.as_str(),
            completed_focus = self.completed_focus_count,
            "interval completed"
        );
        Event::TimerCompleted {
            mode: finished,
            next_mode: next,
            planned_minutes,
            completed_focus_count: self.completed_focus_count,
            at: now,
        }
    }

    fn enter_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.run_state = RunState::Idle;
        self.remaining_secs = self.preset.seconds_for(mode);
        self.started_at = None;
        self.paused_at = None;
        self.last_tick_at = None;
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(PomodoroPreset::default())
    }
}
