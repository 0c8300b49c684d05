use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Focus lengths the fixed catalog is keyed by, in ascending order.
pub const ALLOWED_FOCUS_MINUTES: [u32; 4] = [15, 20, 25, 30];

/// Focus length used when nothing else is configured.
pub const DEFAULT_FOCUS_MINUTES: u32 = 25;

/// A focus/break combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroPreset {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    pub sessions_before_long_break: u32,
}

const CATALOG: [PomodoroPreset; 4] = [
    PomodoroPreset::fixed(15, 3, 9),
    PomodoroPreset::fixed(20, 4, 12),
    PomodoroPreset::fixed(25, 5, 15),
    PomodoroPreset::fixed(30, 6, 18),
];

impl PomodoroPreset {
    const fn fixed(focus: u32, short: u32, long: u32) -> Self {
        Self {
            focus_minutes: focus,
            short_break_minutes: short,
            long_break_minutes: long,
            sessions_before_long_break: 4,
        }
    }

    /// Free-form preset whose breaks come from [`derive_break_lengths`].
    pub fn derived(focus_minutes: u32, sessions_before_long_break: u32) -> Self {
        let (short, long) = derive_break_lengths(focus_minutes);
        Self {
            focus_minutes,
            short_break_minutes: short,
            long_break_minutes: long,
            sessions_before_long_break: sessions_before_long_break.max(1),
        }
    }

    /// The shipped catalog, ascending by focus length.
    pub fn catalog() -> &'static [PomodoroPreset] {
        &CATALOG
    }

    /// Planned minutes for a given mode.
    pub fn minutes_for(&self, mode: super::TimerMode) -> u32 {
        match mode {
            super::TimerMode::Focus => self.focus_minutes,
            super::TimerMode::ShortBreak => self.short_break_minutes,
            super::TimerMode::LongBreak => self.long_break_minutes,
        }
    }

    /// Duration of a mode in seconds.
    ///
    /// Uses saturating arithmetic so absurd routine values cannot overflow.
    pub fn seconds_for(&self, mode: super::TimerMode) -> u64 {
        u64::from(self.minutes_for(mode)).saturating_mul(60)
    }
}

impl Default for PomodoroPreset {
    fn default() -> Self {
        resolve_preset(DEFAULT_FOCUS_MINUTES)
    }
}

/// Snap a requested focus length to the closest allowed value.
///
/// Candidates are scanned in ascending order with a strict `<`, so an exact
/// tie keeps the smaller value (22.5 -> 20).
pub fn snap_to_allowed_duration(requested: f64) -> u32 {
    let mut closest = ALLOWED_FOCUS_MINUTES[0];
    let mut best = (requested - f64::from(closest)).abs();
    for &candidate in &ALLOWED_FOCUS_MINUTES {
        let distance = (requested - f64::from(candidate)).abs();
        if distance < best {
            closest = candidate;
            best = distance;
        }
    }
    closest
}

/// Snap then look up the fixed catalog. Never fails.
pub fn resolve_preset(minutes: u32) -> PomodoroPreset {
    let snapped = snap_to_allowed_duration(f64::from(minutes));
    CATALOG
        .iter()
        .copied()
        .find(|p| p.focus_minutes == snapped)
        .unwrap_or(CATALOG[2])
}

/// Validated entry point for user-supplied durations.
pub fn resolve_requested(minutes: f64) -> Result<PomodoroPreset> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(CoreError::InvalidDuration(format!(
            "expected a positive number of minutes, got {minutes}"
        )));
    }
    let snapped = snap_to_allowed_duration(minutes);
    Ok(resolve_preset(snapped))
}

/// Parse a textual minute count, rejecting non-numeric and non-positive input.
pub fn parse_minutes(input: &str) -> Result<f64> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| CoreError::InvalidDuration(format!("'{input}' is not a number")))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(CoreError::InvalidDuration(format!(
            "expected a positive number of minutes, got '{input}'"
        )));
    }
    Ok(value)
}

/// Percentage rule used by settings auto-calculation.
///
/// short = max(1, round(focus * 0.2)); long = max(short + 1, round(focus * 0.6)).
pub fn derive_break_lengths(focus_minutes: u32) -> (u32, u32) {
    let focus = f64::from(focus_minutes);
    let short = ((focus * 0.2).round() as u32).max(1);
    let long = ((focus * 0.6).round() as u32).max(short + 1);
    (short, long)
}
