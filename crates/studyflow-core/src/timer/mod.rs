mod engine;
mod preset;

pub use engine::{RunState, TimerEngine, TimerMode, TimerState};
pub use preset::{
    derive_break_lengths, parse_minutes, resolve_preset, resolve_requested,
    snap_to_allowed_duration, PomodoroPreset, ALLOWED_FOCUS_MINUTES, DEFAULT_FOCUS_MINUTES,
};
