use clap::Subcommand;
use serde_json::json;
use studyflow_core::timer::{derive_break_lengths, parse_minutes, resolve_requested};
use studyflow_core::PomodoroPreset;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum PresetAction {
    /// Show the preset catalog, or the preset a focus length snaps to
    Show {
        #[arg(long)]
        minutes: Option<String>,
    },
    /// Break lengths derived from a free-form focus length
    Derive {
        /// Focus minutes
        focus: u32,
    },
}

pub fn run(action: PresetAction) -> CliResult {
    match action {
        PresetAction::Show { minutes: None } => print_json(PomodoroPreset::catalog()),
        PresetAction::Show { minutes: Some(raw) } => {
            print_json(&resolve_requested(parse_minutes(&raw)?)?)
        }
        PresetAction::Derive { focus } => {
            let (short, long) = derive_break_lengths(focus);
            print_json(&json!({
                "focus_minutes": focus,
                "short_break_minutes": short,
                "long_break_minutes": long,
            }))
        }
    }
}
