use chrono::{Datelike, Duration};
use clap::Subcommand;
use serde::Serialize;

use super::{parse_date, print_json, today, App, CliResult};
use studyflow_core::session::{DailyHistory, SessionRecord};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's totals (UTC day)
    Today,
    /// Totals for one day
    Day {
        /// Date as YYYY-MM-DD
        date: String,
    },
    /// Seven days starting at --start (default: this week's Monday)
    Week {
        #[arg(long)]
        start: Option<String>,
    },
    /// Month totals with weekly chunks
    Month {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// Current and longest streak
    Streak,
    /// All-time totals
    Summary,
    /// Recent sessions and per-day aggregates
    History {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Serialize)]
struct History {
    sessions: Vec<SessionRecord>,
    days: Vec<DailyHistory>,
}

pub async fn run(action: StatsAction) -> CliResult {
    let app = App::open()?;
    let stats = app.stats();
    let today = today();

    match action {
        StatsAction::Today => print_json(&stats.daily_stats(today).await?),
        StatsAction::Day { date } => print_json(&stats.daily_stats(parse_date(&date)?).await?),
        StatsAction::Week { start } => {
            let start = match start {
                Some(raw) => parse_date(&raw)?,
                None => today - Duration::days(i64::from(today.weekday().num_days_from_monday())),
            };
            print_json(&stats.weekly_stats(start).await?)
        }
        StatsAction::Month { year, month } => {
            let year = year.unwrap_or_else(|| today.year());
            let month = month.unwrap_or_else(|| today.month());
            print_json(&stats.monthly_stats(year, month).await?)
        }
        StatsAction::Streak => {
            let progression = app.progression().await?;
            print_json(&stats.user_streak_or_fallback(today, progression.state()).await)
        }
        StatsAction::Summary => print_json(&stats.summary(today).await?),
        StatsAction::History { limit } => {
            let recorder = app.recorder();
            print_json(&History {
                sessions: recorder.recent_sessions(limit).await?,
                days: recorder.daily_history(limit).await?,
            })
        }
    }
}
