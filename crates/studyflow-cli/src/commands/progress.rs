use clap::Subcommand;
use serde::Serialize;
use studyflow_core::XpProgress;

use super::{print_json, App, CliResult};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// XP, level and local streak
    Show,
    /// Today's challenges
    Challenges,
}

#[derive(Serialize)]
struct ProgressView {
    #[serde(flatten)]
    progress: XpProgress,
    streak_days: u32,
    last_study_date: Option<chrono::NaiveDate>,
}

pub async fn run(action: ProgressAction) -> CliResult {
    let app = App::open()?;
    let progression = app.progression().await?;

    match action {
        ProgressAction::Show => {
            let state = progression.state();
            print_json(&ProgressView {
                progress: progression.get_progress(),
                streak_days: state.streak_days,
                last_study_date: state.last_study_date,
            })
        }
        ProgressAction::Challenges => print_json(progression.daily_challenges()),
    }
}
