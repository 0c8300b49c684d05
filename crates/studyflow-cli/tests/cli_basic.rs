//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify the JSON it prints.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_studyflow-cli"))
        .args(args)
        .env("STUDYFLOW_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_config_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let config = run_json(dir.path(), &["config", "list"]);
    assert!(config["user"]["user_id"].is_string());
    assert_eq!(config["timer"]["focus_minutes"], 25);

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "timer.focus_minutes", "50"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "timer.short_break"]);
    assert_eq!(stdout.trim(), "10");
}

#[test]
fn test_config_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "timer.nope", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_preset_snapping() {
    let dir = tempfile::tempdir().unwrap();
    let preset = run_json(dir.path(), &["preset", "show", "--minutes", "22.5"]);
    assert_eq!(preset["focus_minutes"], 20);
    assert_eq!(preset["short_break_minutes"], 4);

    let catalog = run_json(dir.path(), &["preset", "show"]);
    assert_eq!(catalog.as_array().unwrap().len(), 4);

    let (_, _, code) = run_cli(dir.path(), &["preset", "show", "--minutes", "abc"]);
    assert_eq!(code, 1);
}

#[test]
fn test_preset_derive() {
    let dir = tempfile::tempdir().unwrap();
    let derived = run_json(dir.path(), &["preset", "derive", "45"]);
    assert_eq!(derived["short_break_minutes"], 9);
    assert_eq!(derived["long_break_minutes"], 27);
}

#[test]
fn test_timer_lifecycle() {
    let dir = tempfile::tempdir().unwrap();

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["state"]["mode"], "focus");
    assert_eq!(status["state"]["running"], false);
    assert_eq!(status["display_time"], "25:00");
    assert_eq!(status["progress"], 0.0);
    assert!(status["unfinalized"].as_array().unwrap().is_empty());

    let started = run_json(dir.path(), &["timer", "start"]);
    assert_eq!(started["state"]["running"], true);
    let types: Vec<&str> = started["events"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["type"].as_str())
        .collect();
    assert_eq!(types, vec!["timer_started", "session_opened"]);

    let (_, stderr, code) = run_cli(dir.path(), &["timer", "start", "--minutes", "30"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already running"));

    let paused = run_json(dir.path(), &["timer", "pause"]);
    assert_eq!(paused["state"]["paused"], true);

    let stopped = run_json(dir.path(), &["timer", "stop"]);
    assert_eq!(stopped["state"]["running"], false);
    assert_eq!(stopped["state"]["remaining_secs"], 1500);
    assert_eq!(stopped["display_time"], "25:00");

    let history = run_json(dir.path(), &["stats", "history"]);
    let sessions = history["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["completed"], false);
    assert!(sessions[0]["end_time"].is_string());
}

#[test]
fn test_timer_skip_does_not_count() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["timer", "start", "--minutes", "15"]);
    let skipped = run_json(dir.path(), &["timer", "skip"]);
    assert_eq!(skipped["state"]["mode"], "short_break");
    assert_eq!(skipped["state"]["completed_focus_count"], 0);

    let progress = run_json(dir.path(), &["progress", "show"]);
    assert_eq!(progress["xp"], 0);
    assert_eq!(progress["level"], 1);
}

#[test]
fn test_stats_and_goals() {
    let dir = tempfile::tempdir().unwrap();
    let today = run_json(dir.path(), &["stats", "today"]);
    assert_eq!(today["total_time"], 0);
    assert_eq!(today["goal_progress"], 0.0);

    let goal = run_json(dir.path(), &["goal", "show"]);
    assert_eq!(goal["daily_goal"], 120);
    let goal = run_json(dir.path(), &["goal", "set", "--daily", "60"]);
    assert_eq!(goal["daily_goal"], 60);
    assert_eq!(goal["weekly_goal"], 840);

    let month = run_json(dir.path(), &["stats", "month", "--year", "2026", "--month", "2"]);
    assert_eq!(month["weekly_stats"].as_array().unwrap().len(), 4);

    let streak = run_json(dir.path(), &["stats", "streak"]);
    assert_eq!(streak["current_streak"], 0);

    let summary = run_json(dir.path(), &["stats", "summary"]);
    assert_eq!(summary["total_sessions"], 0);

    let (_, _, code) = run_cli(dir.path(), &["stats", "day", "2026-02-30"]);
    assert_eq!(code, 1);
}

#[test]
fn test_progress_challenges() {
    let dir = tempfile::tempdir().unwrap();
    let challenges = run_json(dir.path(), &["progress", "challenges"]);
    let ids: Vec<&str> = challenges
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["pomodoro_2", "minutes_30", "streak_keep"]);
}

#[test]
fn test_routine_start() {
    let dir = tempfile::tempdir().unwrap();
    let routine = run_json(dir.path(), &["routine", "add", "Reading", "--focus", "40"]);
    assert_eq!(routine["short_break_minutes"], 8);
    let id = routine["id"].as_i64().unwrap().to_string();

    let listed = run_json(dir.path(), &["routine", "list"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let started = run_json(dir.path(), &["timer", "start", "--routine", &id]);
    assert_eq!(started["state"]["total_duration_secs"], 2400);
}
