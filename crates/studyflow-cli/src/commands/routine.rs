use clap::Subcommand;
use studyflow_core::PomodoroPreset;

use super::{print_json, App, CliResult};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// Create a routine; breaks default to the derived lengths
    Add {
        name: String,
        #[arg(long)]
        focus: u32,
        #[arg(long)]
        short_break: Option<u32>,
        #[arg(long)]
        long_break: Option<u32>,
        #[arg(long, default_value = "4")]
        sessions: u32,
    },
    /// List routines
    List,
}

pub fn run(action: RoutineAction) -> CliResult {
    let app = App::open()?;

    match action {
        RoutineAction::Add {
            name,
            focus,
            short_break,
            long_break,
            sessions,
        } => {
            if focus == 0 {
                return Err(studyflow_core::CoreError::InvalidDuration(
                    "focus must be positive".into(),
                )
                .into());
            }
            let derived = PomodoroPreset::derived(focus, sessions);
            let preset = PomodoroPreset {
                short_break_minutes: short_break.unwrap_or(derived.short_break_minutes),
                long_break_minutes: long_break.unwrap_or(derived.long_break_minutes),
                ..derived
            };
            print_json(&app.db.insert_routine(&app.user_id, &name, preset)?)
        }
        RoutineAction::List => print_json(&app.db.list_routines(&app.user_id)?),
    }
}
