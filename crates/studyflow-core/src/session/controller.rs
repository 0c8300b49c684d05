//! Timer session controller.
//!
//! [`TimerSession`] is the explicitly owned handle that wires a
//! [`TimerEngine`] to the recorder, the progression engine and the notifier,
//! and owns the one-second tick scheduler.
//!
//! The scheduler is a `tokio::time::Interval` created lazily by
//! [`TimerSession::next_tick`] and dropped synchronously whenever the engine
//! leaves the running state, so at most one countdown can ever be driven.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::notify::{Notification, Notifier};
use super::recorder::SessionRecorder;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::progression::{Award, ProgressionEngine};
use crate::storage::RoutineLookup;
use crate::timer::{PomodoroPreset, RunState, TimerEngine, TimerMode, TimerState};

const TICK: Duration = Duration::from_secs(1);

/// Behaviour switches, usually taken from the `[timer]` config section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Start the next interval as soon as one completes.
    pub auto_start_next: bool,
    /// Open records for break intervals too.
    pub record_breaks: bool,
}

/// A record whose finalization failed in the store and is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFinalize {
    pub session_id: i64,
    pub completed: bool,
}

/// Everything that happened while handling one command or tick.
///
/// Persistence problems end up in `errors`; the timer state is already
/// updated when they are reported. Records the store failed to finalize are
/// listed in `unfinalized` and kept for [`TimerSession::retry_pending`].
#[derive(Debug, Default)]
pub struct SessionUpdate {
    pub events: Vec<Event>,
    pub award: Option<Award>,
    pub errors: Vec<CoreError>,
    pub unfinalized: Vec<PendingFinalize>,
}

impl SessionUpdate {
    fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    fn push_error(&mut self, error: CoreError) {
        tracing::warn!("session persistence error: {error}");
        self.errors.push(error);
    }

    /// True when an interval finished naturally during this update.
    pub fn completed_interval(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, Event::TimerCompleted { .. }))
    }
}

/// Result of [`TimerSession::stop`]: the open record is handed back so the
/// caller decides whether to finalize it.
#[derive(Debug, Default)]
pub struct Stopped {
    pub event: Option<Event>,
    pub open_session: Option<i64>,
}

/// Serializable state that lets a session survive a process restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub engine: TimerEngine,
    #[serde(default)]
    pub active_session: Option<i64>,
    #[serde(default)]
    pub routine_id: Option<i64>,
    #[serde(default)]
    pub pending_finalize: Vec<PendingFinalize>,
}

pub struct TimerSession {
    engine: TimerEngine,
    recorder: SessionRecorder,
    progression: ProgressionEngine,
    notifier: Arc<dyn Notifier>,
    options: SessionOptions,
    routine_id: Option<i64>,
    active_session: Option<i64>,
    pending: Vec<PendingFinalize>,
    ticker: Option<Interval>,
    state_tx: watch::Sender<TimerState>,
}

impl TimerSession {
    pub fn new(
        engine: TimerEngine,
        recorder: SessionRecorder,
        progression: ProgressionEngine,
        notifier: Arc<dyn Notifier>,
        options: SessionOptions,
    ) -> Self {
        let (state_tx, _) = watch::channel(engine.current_state());
        Self {
            engine,
            recorder,
            progression,
            notifier,
            options,
            routine_id: None,
            active_session: None,
            pending: Vec::new(),
            ticker: None,
            state_tx,
        }
    }

    /// Rebuild a session from a snapshot. Call [`recover`](Self::recover)
    /// afterwards to apply the time that passed meanwhile.
    pub fn restore(
        snapshot: SessionSnapshot,
        recorder: SessionRecorder,
        progression: ProgressionEngine,
        notifier: Arc<dyn Notifier>,
        options: SessionOptions,
    ) -> Self {
        let mut session = Self::new(snapshot.engine, recorder, progression, notifier, options);
        session.active_session = snapshot.active_session;
        session.routine_id = snapshot.routine_id;
        session.pending = snapshot.pending_finalize;
        session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            engine: self.engine.clone(),
            active_session: self.active_session,
            routine_id: self.routine_id,
            pending_finalize: self.pending.clone(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn current_state(&self) -> TimerState {
        self.engine.current_state()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.state_tx.subscribe()
    }

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn progression(&self) -> &ProgressionEngine {
        &self.progression
    }

    pub fn active_session(&self) -> Option<i64> {
        self.active_session
    }

    /// Records still waiting for a successful finalization.
    pub fn pending_finalize(&self) -> &[PendingFinalize] {
        &self.pending
    }

    pub fn routine_id(&self) -> Option<i64> {
        self.routine_id
    }

    /// Whether a tick scheduler currently exists.
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Use a routine's durations for the following intervals.
    ///
    /// Resets the engine to an idle Focus, so it is rejected while running.
    pub async fn apply_routine(&mut self, lookup: &dyn RoutineLookup, routine_id: i64) -> Result<()> {
        if self.engine.run_state() != RunState::Idle {
            return Err(CoreError::AlreadyRunning);
        }
        let routine = lookup
            .routine(self.progression.user_id(), routine_id)
            .await?
            .ok_or(CoreError::RoutineNotFound(routine_id))?;
        self.set_preset(routine.preset())?;
        self.routine_id = Some(routine.id);
        tracing::debug!(routine_id, name = %routine.name, "routine applied");
        Ok(())
    }

    /// Replace the durations, resetting to an idle Focus. Only allowed while idle.
    pub fn set_preset(&mut self, preset: PomodoroPreset) -> Result<()> {
        if self.engine.run_state() != RunState::Idle {
            return Err(CoreError::AlreadyRunning);
        }
        self.engine.set_preset(preset);
        self.routine_id = None;
        self.publish();
        Ok(())
    }

    /// Start (or resume) the countdown.
    ///
    /// Fails only with [`CoreError::AlreadyRunning`]; a record that cannot be
    /// opened is reported in the update while the timer keeps running.
    pub async fn start(&mut self) -> Result<SessionUpdate> {
        let mut update = SessionUpdate::default();
        let event = self.engine.start()?;
        let fresh = matches!(event, Event::TimerStarted { .. });
        update.push_event(event);
        if fresh {
            self.open_record(&mut update).await;
        }
        self.publish();
        Ok(update)
    }

    pub fn pause(&mut self) -> Option<Event> {
        let event = self.engine.pause()?;
        self.ticker = None;
        self.publish();
        Some(event)
    }

    pub fn resume(&mut self) -> Option<Event> {
        let event = self.engine.resume()?;
        self.publish();
        Some(event)
    }

    /// Move to the next mode without counting or awarding the interval.
    pub async fn skip(&mut self) -> SessionUpdate {
        let mut update = SessionUpdate::default();
        self.ticker = None;
        update.push_event(self.engine.skip());
        if let Some(id) = self.active_session.take() {
            self.finalize_record(id, false, &mut update).await;
        }
        self.publish();
        update
    }

    /// Cancel the countdown and rewind the interval.
    pub fn stop(&mut self) -> Stopped {
        self.ticker = None;
        let stopped = Stopped {
            event: self.engine.stop(),
            open_session: self.active_session.take(),
        };
        self.publish();
        stopped
    }

    /// Stop and finalize the open record as not completed.
    pub async fn abandon(&mut self) -> SessionUpdate {
        let stopped = self.stop();
        let mut update = SessionUpdate::default();
        update.events.extend(stopped.event);
        if let Some(id) = stopped.open_session {
            self.finalize_record(id, false, &mut update).await;
        }
        update
    }

    /// Try again to finalize records the store rejected earlier.
    ///
    /// Records that fail again stay pending; records the store reports as
    /// already finalized or unknown are dropped.
    pub async fn retry_pending(&mut self) -> SessionUpdate {
        let mut update = SessionUpdate::default();
        for pending in std::mem::take(&mut self.pending) {
            self.finalize_record(pending.session_id, pending.completed, &mut update)
                .await;
        }
        update
    }

    /// Wait for the next scheduled tick and apply it.
    ///
    /// Returns `None` immediately when the timer is not running.
    pub async fn next_tick(&mut self) -> Option<SessionUpdate> {
        if !self.engine.is_running() {
            self.ticker = None;
            return None;
        }
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            interval
        });
        ticker.tick().await;
        Some(self.tick_once().await)
    }

    /// Apply one second without waiting.
    pub async fn tick_once(&mut self) -> SessionUpdate {
        match self.engine.tick() {
            Some(event) => self.handle_completion(event).await,
            None => {
                self.publish();
                SessionUpdate::default()
            }
        }
    }

    /// Replay the seconds elapsed since the last tick, e.g. after [`restore`](Self::restore).
    pub async fn recover(&mut self, now: DateTime<Utc>) -> SessionUpdate {
        match self.engine.catch_up(now) {
            Some(event) => self.handle_completion(event).await,
            None => {
                self.publish();
                SessionUpdate::default()
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn should_record(&self, mode: TimerMode) -> bool {
        mode == TimerMode::Focus || self.options.record_breaks
    }

    async fn open_record(&mut self, update: &mut SessionUpdate) {
        let mode = self.engine.mode();
        if !self.should_record(mode) || self.active_session.is_some() {
            return;
        }
        match self
            .recorder
            .begin(mode, self.engine.planned_minutes(), self.routine_id)
            .await
        {
            Ok(record) => {
                self.active_session = Some(record.id);
                update.push_event(Event::SessionOpened {
                    session_id: record.id,
                    mode,
                    at: record.start_time,
                });
            }
            Err(e) => update.push_error(e),
        }
    }

    async fn finalize_record(&mut self, id: i64, success: bool, update: &mut SessionUpdate) {
        match self.recorder.complete(id, success).await {
            Ok(completion) => {
                update.push_event(Event::SessionFinalized {
                    session_id: id,
                    completed: completion.record.completed,
                    at: completion.record.end_time.unwrap_or_else(Utc::now),
                });
                if let Some(e) = completion.aggregate_error {
                    update.push_error(e);
                }
            }
            Err(e) => {
                if e.is_persistence() {
                    let pending = PendingFinalize {
                        session_id: id,
                        completed: success,
                    };
                    tracing::warn!(session_id = id, "session left unfinalized");
                    self.pending.push(pending);
                    update.unfinalized.push(pending);
                }
                update.push_error(e);
            }
        }
    }

    async fn handle_completion(&mut self, event: Event) -> SessionUpdate {
        let mut update = SessionUpdate::default();
        self.ticker = None;

        let (finished, next, minutes) = match &event {
            Event::TimerCompleted {
                mode,
                next_mode,
                planned_minutes,
                ..
            } => (*mode, *next_mode, *planned_minutes),
            _ => {
                update.push_event(event);
                self.publish();
                return update;
            }
        };
        update.push_event(event);

        if let Some(id) = self.active_session.take() {
            self.finalize_record(id, true, &mut update).await;
        }

        if finished == TimerMode::Focus {
            match self.progression.award_focus_completion(minutes).await {
                Ok(award) => {
                    update.push_event(Event::ProgressAwarded {
                        gained_xp: award.gained_xp,
                        completed_challenges: award.completed_challenges.clone(),
                        progress: award.progress,
                        at: Utc::now(),
                    });
                    update.award = Some(award);
                }
                Err(e) => update.push_error(e),
            }
        }

        let notification = Notification::interval_completed(finished, next);
        if let Err(e) = self.notifier.notify(&notification) {
            tracing::warn!("notification failed: {e}");
        }

        if self.options.auto_start_next {
            match self.engine.start() {
                Ok(started) => {
                    update.push_event(started);
                    self.open_record(&mut update).await;
                }
                Err(e) => update.push_error(e),
            }
        }

        self.publish();
        update
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.engine.current_state());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::ProgressionState;
    use crate::storage::{Database, SessionStore, StaticUser};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<Notification>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: &Notification) -> Result<()> {
            self.0.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify(&self, _notification: &Notification) -> Result<()> {
            Err(CoreError::Io(std::io::Error::other("no display")))
        }
    }

    fn one_minute() -> PomodoroPreset {
        PomodoroPreset {
            focus_minutes: 1,
            short_break_minutes: 1,
            long_break_minutes: 2,
            sessions_before_long_break: 2,
        }
    }

    fn session_with(
        db: &Arc<Database>,
        notifier: Arc<dyn Notifier>,
        options: SessionOptions,
    ) -> TimerSession {
        let recorder = SessionRecorder::new(db.clone(), Arc::new(StaticUser::signed_in("u1")));
        let today = Utc::now().date_naive();
        let progression = ProgressionEngine::with_state(db.clone(), "u1", ProgressionState::new(today));
        TimerSession::new(TimerEngine::new(one_minute()), recorder, progression, notifier, options)
    }

    fn session(db: &Arc<Database>) -> TimerSession {
        session_with(db, Arc::new(RecordingNotifier::default()), SessionOptions::default())
    }

    async fn run_to_completion(session: &mut TimerSession) -> SessionUpdate {
        loop {
            let update = session.next_tick().await.expect("timer should be running");
            if update.completed_interval() {
                return update;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn focus_completion_records_and_awards() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session(&db);

        let started = session.start().await.unwrap();
        assert!(matches!(started.events[1], Event::SessionOpened { .. }));
        let id = session.active_session().unwrap();

        let update = run_to_completion(&mut session).await;
        assert!(update.errors.is_empty());
        assert_eq!(update.award.as_ref().map(|a| a.gained_xp), Some(5));
        assert!(!session.is_ticking());
        assert!(session.active_session().is_none());

        let state = session.current_state();
        assert_eq!(state.mode, TimerMode::ShortBreak);
        assert_eq!(state.completed_focus_count, 1);
        assert!(!state.running);

        let stored = db.get_session("u1", id).await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(db.daily_history("u1", 5).await.unwrap()[0].total_time, 1);
        assert!(session.next_tick().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn award_lands_on_the_record_day() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session(&db);
        session.start().await.unwrap();
        let id = session.active_session().unwrap();
        run_to_completion(&mut session).await;

        let record = db.get_session("u1", id).await.unwrap().unwrap();
        let state = session.progression().state();
        assert_eq!(state.last_study_date, Some(record.date()));
        assert_eq!(state.date, record.date());
        assert_eq!(db.completed_focus_days("u1").await.unwrap(), vec![record.date()]);
        assert_eq!(db.daily_history("u1", 1).await.unwrap()[0].date, record.date());
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_rejected() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session(&db);
        session.start().await.unwrap();
        assert!(matches!(session.start().await, Err(CoreError::AlreadyRunning)));
        assert_eq!(db.all_sessions("u1").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_drops_the_scheduler_and_freezes_time() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session(&db);
        session.start().await.unwrap();
        for _ in 0..10 {
            session.next_tick().await.unwrap();
        }
        assert!(session.is_ticking());

        session.pause().unwrap();
        assert!(!session.is_ticking());
        assert!(session.next_tick().await.is_none());
        assert_eq!(session.current_state().remaining_secs, 50);

        let resumed = session.start().await.unwrap();
        assert!(matches!(resumed.events[..], [Event::TimerResumed { .. }]));
        session.next_tick().await.unwrap();
        assert_eq!(session.current_state().remaining_secs, 49);
        assert_eq!(db.all_sessions("u1").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_finalizes_without_counting_or_awarding() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session(&db);
        session.start().await.unwrap();
        let id = session.active_session().unwrap();

        let update = session.skip().await;
        assert!(update.award.is_none());
        assert!(update
            .events
            .iter()
            .any(|e| matches!(e, Event::SessionFinalized { completed: false, .. })));
        assert_eq!(session.current_state().completed_focus_count, 0);
        assert_eq!(session.current_state().mode, TimerMode::ShortBreak);
        assert_eq!(session.progression().state().xp, 0);
        assert!(!db.get_session("u1", id).await.unwrap().unwrap().completed);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_hands_back_the_open_record() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session(&db);
        session.start().await.unwrap();
        session.next_tick().await.unwrap();
        let id = session.active_session();

        let stopped = session.stop();
        assert_eq!(stopped.open_session, id);
        assert!(matches!(stopped.event, Some(Event::TimerStopped { remaining_secs: 59, .. })));
        assert_eq!(session.current_state().remaining_secs, 60);
        assert!(db.get_session("u1", id.unwrap()).await.unwrap().unwrap().end_time.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn abandon_finalizes_as_incomplete() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session(&db);
        session.start().await.unwrap();
        let id = session.active_session().unwrap();
        let update = session.abandon().await;
        assert!(update.errors.is_empty());
        let stored = db.get_session("u1", id).await.unwrap().unwrap();
        assert!(stored.end_time.is_some());
        assert!(!stored.completed);
    }

    #[tokio::test(start_paused = true)]
    async fn long_break_follows_configured_count() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session(&db);
        let mut modes = Vec::new();
        for _ in 0..4 {
            session.start().await.unwrap();
            run_to_completion(&mut session).await;
            modes.push(session.current_state().mode);
        }
        assert_eq!(
            modes,
            vec![
                TimerMode::ShortBreak,
                TimerMode::Focus,
                TimerMode::LongBreak,
                TimerMode::Focus
            ]
        );
        // breaks are not recorded by default
        assert_eq!(db.all_sessions("u1").await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn record_breaks_and_auto_start() {
        let db = Arc::new(Database::open_memory().unwrap());
        let options = SessionOptions {
            auto_start_next: true,
            record_breaks: true,
        };
        let notifier = Arc::new(RecordingNotifier::default());
        let mut session = session_with(&db, notifier.clone(), options);
        session.start().await.unwrap();
        run_to_completion(&mut session).await;

        let state = session.current_state();
        assert_eq!(state.mode, TimerMode::ShortBreak);
        assert!(state.running);
        assert!(session.active_session().is_some());
        assert_eq!(db.all_sessions("u1").await.unwrap().len(), 2);
        assert_eq!(notifier.0.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn notifier_failure_does_not_affect_timer() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session_with(&db, Arc::new(FailingNotifier), SessionOptions::default());
        session.start().await.unwrap();
        let update = run_to_completion(&mut session).await;
        assert!(update.errors.is_empty());
        assert_eq!(session.current_state().mode, TimerMode::ShortBreak);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_each_tick() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session(&db);
        let mut rx = session.subscribe();
        session.start().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().running);

        session.next_tick().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().remaining_secs, 59);
    }

    #[tokio::test]
    async fn snapshot_restore_catches_up() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session(&db);
        session.start().await.unwrap();
        let snapshot = session.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        drop(session);

        let snapshot: SessionSnapshot = serde_json::from_str(&json).unwrap();
        let recorder = SessionRecorder::new(db.clone(), Arc::new(StaticUser::signed_in("u1")));
        let today = Utc::now().date_naive();
        let progression = ProgressionEngine::load(db.clone(), "u1", today).await.unwrap();
        let mut restored = TimerSession::restore(
            snapshot,
            recorder,
            progression,
            Arc::new(RecordingNotifier::default()),
            SessionOptions::default(),
        );

        let update = restored.recover(Utc::now() + chrono::Duration::seconds(61)).await;
        assert!(update.completed_interval());
        assert_eq!(restored.current_state().mode, TimerMode::ShortBreak);
        assert!(db.all_sessions("u1").await.unwrap()[0].completed);
    }

    #[tokio::test]
    async fn routine_overrides_durations() {
        let db = Arc::new(Database::open_memory().unwrap());
        let routine = db
            .insert_routine("u1", "Essay", PomodoroPreset::derived(45, 3))
            .unwrap();
        let mut session = session(&db);
        session.apply_routine(db.as_ref(), routine.id).await.unwrap();
        assert_eq!(session.current_state().total_duration_secs, 45 * 60);
        assert_eq!(session.routine_id(), Some(routine.id));

        assert!(matches!(
            session.apply_routine(db.as_ref(), 999).await,
            Err(CoreError::RoutineNotFound(999))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn preset_change_only_while_idle() {
        let db = Arc::new(Database::open_memory().unwrap());
        let mut session = session(&db);
        session.start().await.unwrap();
        assert!(matches!(
            session.set_preset(PomodoroPreset::default()),
            Err(CoreError::AlreadyRunning)
        ));
        session.pause().unwrap();
        assert!(session.set_preset(PomodoroPreset::default()).is_err());

        session.abandon().await;
        session.set_preset(PomodoroPreset::default()).unwrap();
        assert_eq!(session.current_state().total_duration_secs, 1500);
    }
}
