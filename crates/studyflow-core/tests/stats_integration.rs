//! Integration tests for statistics over the SQLite store.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use studyflow_core::session::NewSession;
use studyflow_core::storage::SessionStore;
use studyflow_core::{
    CoreError, Database, ProgressionState, StaticUser, StatsAggregator, StudyGoal, TimerMode,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
}

async fn add(db: &Database, date: NaiveDate, kind: TimerMode, minutes: u32, completed: bool) {
    let start = at(date, 10);
    let record = db
        .insert_session(NewSession {
            user_id: "u1".into(),
            routine_id: None,
            kind,
            planned_minutes: minutes,
            start_time: start,
        })
        .await
        .unwrap();
    db.finalize_session("u1", record.id, start + Duration::minutes(i64::from(minutes)), completed)
        .await
        .unwrap();
}

fn aggregator(db: &Arc<Database>) -> StatsAggregator {
    StatsAggregator::new(db.clone(), db.clone(), Arc::new(StaticUser::signed_in("u1")))
}

#[tokio::test]
async fn test_daily_stats_use_default_goal() {
    let db = Arc::new(Database::open_memory().unwrap());
    let today = day(2026, 3, 10);
    add(&db, today, TimerMode::Focus, 30, true).await;
    add(&db, today, TimerMode::Focus, 30, true).await;
    add(&db, today, TimerMode::Focus, 25, false).await;
    add(&db, today, TimerMode::ShortBreak, 6, true).await;

    let stats = aggregator(&db).daily_stats(today).await.unwrap();
    assert_eq!(stats.total_time, 60);
    assert_eq!(stats.sessions, 3);
    assert_eq!(stats.completed_sessions, 2);
    assert_eq!(stats.goal_progress, 50.0);
}

#[tokio::test]
async fn test_zero_goal_reports_zero_progress() {
    let db = Arc::new(Database::open_memory().unwrap());
    let agg = aggregator(&db);
    agg.update_study_goal(StudyGoal {
        daily_goal: 0,
        weekly_goal: 0,
        monthly_goal: 0,
    })
    .await
    .unwrap();
    add(&db, day(2026, 3, 10), TimerMode::Focus, 25, true).await;
    assert_eq!(agg.daily_stats(day(2026, 3, 10)).await.unwrap().goal_progress, 0.0);
}

#[tokio::test]
async fn test_weekly_stats_window() {
    let db = Arc::new(Database::open_memory().unwrap());
    let start = day(2026, 3, 2);
    add(&db, day(2026, 3, 1), TimerMode::Focus, 25, true).await;
    add(&db, start, TimerMode::Focus, 28, true).await;
    add(&db, day(2026, 3, 8), TimerMode::Focus, 56, true).await;
    add(&db, day(2026, 3, 9), TimerMode::Focus, 25, true).await;

    let week = aggregator(&db).weekly_stats(start).await.unwrap();
    assert_eq!(week.total_time, 84);
    assert_eq!(week.daily_average, 12.0);
    assert_eq!(week.goal_progress, 10.0);
    assert_eq!(week.daily_stats.first().unwrap().total_time, 28);
}

#[tokio::test]
async fn test_monthly_stats_chunks_run_past_month_end() {
    let db = Arc::new(Database::open_memory().unwrap());
    add(&db, day(2026, 4, 1), TimerMode::Focus, 31, true).await;
    add(&db, day(2026, 4, 30), TimerMode::Focus, 62, true).await;
    add(&db, day(2026, 5, 2), TimerMode::Focus, 25, true).await;

    let month = aggregator(&db).monthly_stats(2026, 4).await.unwrap();
    assert_eq!(month.total_time, 93);
    assert_eq!(month.daily_average, 3.1);
    assert_eq!(month.weekly_stats.len(), 5);

    let last = month.weekly_stats.last().unwrap();
    assert_eq!(last.week_start, day(2026, 4, 29));
    assert_eq!(last.week_end, day(2026, 5, 5));
    // the last chunk still counts the first days of May
    assert_eq!(last.total_time, 62 + 25);
}

#[tokio::test]
async fn test_invalid_month_is_rejected() {
    let db = Arc::new(Database::open_memory().unwrap());
    let err = aggregator(&db).monthly_stats(2026, 0).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidDate(_)));
}

#[tokio::test]
async fn test_streak_from_history() {
    let db = Arc::new(Database::open_memory().unwrap());
    for d in [3, 4, 5, 8, 9] {
        add(&db, day(2026, 3, d), TimerMode::Focus, 25, true).await;
    }
    add(&db, day(2026, 3, 10), TimerMode::Focus, 25, false).await;

    let streak = aggregator(&db).user_streak(day(2026, 3, 10)).await.unwrap();
    assert_eq!(streak.current_streak, 2);
    assert_eq!(streak.longest_streak, 3);
    assert_eq!(streak.last_study_date, Some(day(2026, 3, 9)));
}

#[tokio::test]
async fn test_streak_falls_back_when_signed_out() {
    let db = Arc::new(Database::open_memory().unwrap());
    let agg = StatsAggregator::new(db.clone(), db.clone(), Arc::new(StaticUser::signed_out()));
    let mut local = ProgressionState::new(day(2026, 3, 10));
    local.streak_days = 6;
    local.last_study_date = Some(day(2026, 3, 10));

    let streak = agg.user_streak_or_fallback(day(2026, 3, 10), &local).await;
    assert_eq!(streak.current_streak, 6);
    assert_eq!(streak.last_study_date, Some(day(2026, 3, 10)));
}

#[tokio::test]
async fn test_summary_totals() {
    let db = Arc::new(Database::open_memory().unwrap());
    let today = day(2026, 3, 10);
    add(&db, day(2026, 3, 9), TimerMode::Focus, 25, true).await;
    add(&db, today, TimerMode::Focus, 25, true).await;
    add(&db, today, TimerMode::ShortBreak, 5, true).await;
    add(&db, today, TimerMode::LongBreak, 15, false).await;

    let summary = aggregator(&db).summary(today).await.unwrap();
    assert_eq!(summary.total_sessions, 4);
    assert_eq!(summary.completed_sessions, 3);
    assert_eq!(summary.total_focus_time, 50);
    assert_eq!(summary.total_break_time, 5);
    assert_eq!(summary.today_sessions, 2);
    assert_eq!(summary.current_streak, 2);
}

#[tokio::test]
async fn test_study_goal_created_once_then_updated() {
    let db = Arc::new(Database::open_memory().unwrap());
    let agg = aggregator(&db);
    assert_eq!(agg.study_goal().await.unwrap(), StudyGoal::default());

    let custom = StudyGoal {
        daily_goal: 90,
        weekly_goal: 600,
        monthly_goal: 2400,
    };
    agg.update_study_goal(custom).await.unwrap();
    assert_eq!(agg.study_goal().await.unwrap(), custom);
}
