use clap::Subcommand;
use studyflow_core::StudyGoal;

use super::{print_json, App, CliResult};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Show the study goal (created with defaults on first use)
    Show,
    /// Update one or more goals, in minutes
    Set {
        #[arg(long)]
        daily: Option<u32>,
        #[arg(long)]
        weekly: Option<u32>,
        #[arg(long)]
        monthly: Option<u32>,
    },
}

pub async fn run(action: GoalAction) -> CliResult {
    let app = App::open()?;
    let stats = app.stats();

    match action {
        GoalAction::Show => print_json(&stats.study_goal().await?),
        GoalAction::Set {
            daily,
            weekly,
            monthly,
        } => {
            let current = stats.study_goal().await?;
            let goal = StudyGoal {
                daily_goal: daily.unwrap_or(current.daily_goal),
                weekly_goal: weekly.unwrap_or(current.weekly_goal),
                monthly_goal: monthly.unwrap_or(current.monthly_goal),
            };
            print_json(&stats.update_study_goal(goal).await?)
        }
    }
}
