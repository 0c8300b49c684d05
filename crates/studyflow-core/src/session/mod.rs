//! Session recording and the timer session controller.

mod controller;
mod notify;
mod record;
mod recorder;

pub use controller::{
    PendingFinalize, SessionOptions, SessionSnapshot, SessionUpdate, Stopped, TimerSession,
};
pub use notify::{LogNotifier, Notification, Notifier};
pub use record::{DailyHistory, NewSession, SessionRecord};
pub use recorder::{Completion, SessionRecorder};
