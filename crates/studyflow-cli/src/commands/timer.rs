use std::io::Write;
use std::sync::Arc;

use chrono::Utc;
use clap::Subcommand;
use serde::Serialize;
use studyflow_core::session::{Notification, Notifier, PendingFinalize, SessionSnapshot};
use studyflow_core::storage::NotificationsConfig;
use studyflow_core::timer::{parse_minutes, resolve_requested};
use studyflow_core::{Event, SessionOptions, SessionUpdate, TimerEngine, TimerSession, TimerState};

use super::{App, CliResult};

const TIMER_KEY_PREFIX: &str = "timer:";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the current interval (resumes a paused one)
    Start {
        /// Focus length in minutes, snapped to the nearest preset
        #[arg(long)]
        minutes: Option<String>,
        /// Use a routine's durations
        #[arg(long)]
        routine: Option<i64>,
    },
    /// Pause the countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Skip to the next interval without counting this one
    Skip,
    /// Stop and rewind the current interval
    Stop {
        /// Leave the open session record unfinalized
        #[arg(long)]
        keep_open: bool,
    },
    /// Print current timer state as JSON
    Status,
    /// Run the countdown in the foreground until the interval ends
    Run {
        #[arg(long)]
        minutes: Option<String>,
        #[arg(long)]
        routine: Option<i64>,
    },
}

/// Bell plus a one-line message on stderr.
struct TerminalNotifier {
    settings: NotificationsConfig,
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: &Notification) -> studyflow_core::Result<()> {
        if !self.settings.enabled {
            return Ok(());
        }
        let mut stderr = std::io::stderr().lock();
        if self.settings.bell {
            write!(stderr, "\x07")?;
        }
        writeln!(stderr, "{}: {}", notification.title, notification.body)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct Report<'a> {
    events: &'a [Event],
    errors: Vec<String>,
    unfinalized: &'a [PendingFinalize],
    display_time: String,
    progress: f64,
    state: TimerState,
}

fn report(updates: &[SessionUpdate], session: &TimerSession) -> CliResult {
    let events: Vec<Event> = updates.iter().flat_map(|u| u.events.iter().cloned()).collect();
    let errors = updates
        .iter()
        .flat_map(|u| u.errors.iter().map(ToString::to_string))
        .collect();
    let state = session.current_state();
    super::print_json(&Report {
        events: &events,
        errors,
        unfinalized: session.pending_finalize(),
        display_time: state.display_time(),
        progress: state.progress(),
        state,
    })
}

fn timer_key(app: &App) -> String {
    format!("{TIMER_KEY_PREFIX}{}", app.user_id)
}

fn options(app: &App) -> SessionOptions {
    SessionOptions {
        auto_start_next: app.config.timer.auto_start_next,
        record_breaks: app.config.timer.record_breaks,
    }
}

/// Restore the persisted session, retry records left open by an earlier
/// store failure and apply the time that passed since.
async fn load_session(
    app: &App,
) -> Result<(TimerSession, Vec<SessionUpdate>), Box<dyn std::error::Error>> {
    let progression = app.progression().await?;
    let notifier = Arc::new(TerminalNotifier {
        settings: app.config.notifications.clone(),
    });

    let snapshot = match app.db.kv_get(&timer_key(app))? {
        Some(json) => match serde_json::from_str::<SessionSnapshot>(&json) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("discarding unreadable timer state: {e}");
                None
            }
        },
        None => None,
    };

    let mut session = match snapshot {
        Some(snapshot) => {
            TimerSession::restore(snapshot, app.recorder(), progression, notifier, options(app))
        }
        None => TimerSession::new(
            TimerEngine::new(app.config.timer.preset()),
            app.recorder(),
            progression,
            notifier,
            options(app),
        ),
    };
    let mut updates = Vec::new();
    if !session.pending_finalize().is_empty() {
        updates.push(session.retry_pending().await);
    }
    updates.push(session.recover(Utc::now()).await);
    Ok((session, updates))
}

fn save_session(app: &App, session: &TimerSession) -> CliResult {
    let json = serde_json::to_string(&session.snapshot())?;
    app.db.kv_set(&timer_key(app), &json)?;
    Ok(())
}

/// Apply `--minutes` / `--routine` before a fresh start.
async fn configure(
    app: &App,
    session: &mut TimerSession,
    minutes: Option<String>,
    routine: Option<i64>,
) -> CliResult {
    if let Some(raw) = minutes {
        session.set_preset(resolve_requested(parse_minutes(&raw)?)?)?;
    }
    if let Some(routine_id) = routine {
        session.apply_routine(app.db.as_ref(), routine_id).await?;
    }
    Ok(())
}

pub async fn run(action: TimerAction) -> CliResult {
    let app = App::open()?;
    let (mut session, mut updates) = load_session(&app).await?;

    match action {
        TimerAction::Start { minutes, routine } => {
            configure(&app, &mut session, minutes, routine).await?;
            updates.push(session.start().await?);
        }
        TimerAction::Pause => {
            let event = session.pause();
            updates.push(SessionUpdate {
                events: event.into_iter().collect(),
                ..SessionUpdate::default()
            });
        }
        TimerAction::Resume => {
            let event = session.resume();
            updates.push(SessionUpdate {
                events: event.into_iter().collect(),
                ..SessionUpdate::default()
            });
        }
        TimerAction::Skip => {
            updates.push(session.skip().await);
        }
        TimerAction::Stop { keep_open } => {
            if keep_open {
                let stopped = session.stop();
                if let Some(id) = stopped.open_session {
                    tracing::info!(session_id = id, "session left open");
                }
                updates.push(SessionUpdate {
                    events: stopped.event.into_iter().collect(),
                    ..SessionUpdate::default()
                });
            } else {
                updates.push(session.abandon().await);
            }
        }
        TimerAction::Status => {}
        TimerAction::Run { minutes, routine } => {
            configure(&app, &mut session, minutes, routine).await?;
            save_session(&app, &session)?;
            return run_foreground(&app, session, updates).await;
        }
    }

    save_session(&app, &session)?;
    report(&updates, &session)
}

enum Step {
    Tick(Option<SessionUpdate>),
    Interrupted,
}

/// Tick until the interval ends or Ctrl-C pauses it. Events are printed as
/// JSON lines while running.
async fn run_foreground(app: &App, mut session: TimerSession, pending: Vec<SessionUpdate>) -> CliResult {
    let print_events = |update: &SessionUpdate| -> CliResult {
        for event in &update.events {
            println!("{}", serde_json::to_string(event)?);
        }
        for error in &update.errors {
            tracing::warn!("{error}");
        }
        Ok(())
    };

    for update in &pending {
        print_events(update)?;
    }
    if !session.engine().is_running() {
        let started = session.start().await?;
        print_events(&started)?;
        save_session(app, &session)?;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let step = tokio::select! {
            update = session.next_tick() => Step::Tick(update),
            _ = &mut ctrl_c => Step::Interrupted,
        };
        match step {
            Step::Tick(Some(update)) => {
                print_events(&update)?;
                if update.completed_interval() {
                    save_session(app, &session)?;
                }
            }
            Step::Tick(None) => break,
            Step::Interrupted => {
                if let Some(event) = session.pause() {
                    println!("{}", serde_json::to_string(&event)?);
                }
                break;
            }
        }
    }

    save_session(app, &session)?;
    println!("{}", serde_json::to_string(&session.current_state())?);
    Ok(())
}
