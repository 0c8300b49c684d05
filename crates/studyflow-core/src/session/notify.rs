use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timer::TimerMode;

/// A user-facing "interval finished" message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub finished: TimerMode,
    pub next: TimerMode,
}

impl Notification {
    pub fn interval_completed(finished: TimerMode, next: TimerMode) -> Self {
        let (title, body) = match finished {
            TimerMode::Focus => (
                "Focus complete",
                match next {
                    TimerMode::LongBreak => "Great work. Time for a long break.",
                    _ => "Nice job. Take a short break.",
                },
            ),
            TimerMode::ShortBreak | TimerMode::LongBreak => {
                ("Break over", "Ready for the next focus session?")
            }
        };
        Self {
            title: title.into(),
            body: body.into(),
            finished,
            next,
        }
    }
}

/// Delivery is fire-and-forget: errors are logged by the caller and never
/// change timer state.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        tracing::info!(title = %notification.title, "{}", notification.body);
        Ok(())
    }
}
