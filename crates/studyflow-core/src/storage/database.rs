//! SQLite-based local store.
//!
//! Provides persistent storage for:
//! - Session records and the per-day aggregate history
//! - Progression state (JSON in the key-value table)
//! - Study goals and routines
//! - Key-value store for application state

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use super::migrations;
use super::repository::{GoalStore, ProgressionStore, Routine, RoutineLookup, SessionStore};
use crate::error::{DatabaseError, Result};
use crate::progression::ProgressionState;
use crate::session::{DailyHistory, NewSession, SessionRecord};
use crate::stats::StudyGoal;
use crate::timer::{PomodoroPreset, TimerMode};

const SESSION_COLUMNS: &str =
    "id, user_id, routine_id, kind, planned_minutes, start_time, end_time, completed";

/// SQLite database implementing every repository trait.
pub struct Database {
    conn: Mutex<Connection>,
}

/// Raw session row before kind/timestamp decoding.
struct SessionRow {
    id: i64,
    user_id: String,
    routine_id: Option<i64>,
    kind: String,
    planned_minutes: u32,
    start_time: String,
    end_time: Option<String>,
    completed: bool,
}

impl SessionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            routine_id: row.get(2)?,
            kind: row.get(3)?,
            planned_minutes: row.get(4)?,
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            completed: row.get(7)?,
        })
    }

    fn decode(self) -> Result<SessionRecord, DatabaseError> {
        let kind = TimerMode::parse(&self.kind).ok_or_else(|| corrupt(format!(
            "session {} has unknown kind '{}'",
            self.id, self.kind
        )))?;
        let end_time = self.end_time.as_deref().map(parse_ts).transpose()?;
        Ok(SessionRecord {
            id: self.id,
            user_id: self.user_id,
            routine_id: self.routine_id,
            kind,
            planned_minutes: self.planned_minutes,
            start_time: parse_ts(&self.start_time)?,
            end_time,
            completed: self.completed,
        })
    }
}

fn corrupt(message: String) -> DatabaseError {
    DatabaseError::CorruptRow {
        table: "sessions".into(),
        message,
    }
}

/// Fixed-width UTC timestamps so lexical order matches time order.
fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(format!("bad timestamp '{raw}': {e}")))
}

fn parse_day(raw: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| DatabaseError::CorruptRow {
        table: "study_history".into(),
        message: format!("bad date '{raw}': {e}"),
    })
}

fn progression_key(user_id: &str) -> String {
    format!("progression:{user_id}")
}

impl Database {
    /// Open the database at `<data_dir>/studyflow.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("studyflow.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (tests, dry runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    pub fn insert_routine(&self, user_id: &str, name: &str, preset: PomodoroPreset) -> Result<Routine> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO routines (user_id, name, focus_minutes, short_break_minutes,
                                   long_break_minutes, sessions_before_long_break)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                name,
                preset.focus_minutes,
                preset.short_break_minutes,
                preset.long_break_minutes,
                preset.sessions_before_long_break,
            ],
        )
        .map_err(DatabaseError::from)?;
        Ok(Routine {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            focus_minutes: preset.focus_minutes,
            short_break_minutes: preset.short_break_minutes,
            long_break_minutes: preset.long_break_minutes,
            sessions_before_long_break: preset.sessions_before_long_break,
        })
    }

    pub fn list_routines(&self, user_id: &str) -> Result<Vec<Routine>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, focus_minutes, short_break_minutes, long_break_minutes,
                        sessions_before_long_break
                 FROM routines WHERE user_id = ?1 ORDER BY id",
            )
            .map_err(DatabaseError::from)?;
        let rows = stmt
            .query_map(params![user_id], routine_from_row)
            .map_err(DatabaseError::from)?;
        let routines = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(DatabaseError::from)?;
        Ok(routines)
    }

    fn query_sessions(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<SessionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(DatabaseError::from)?;
        let rows = stmt
            .query_map(args, SessionRow::from_row)
            .map_err(DatabaseError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(DatabaseError::from)?;
        let records = rows
            .into_iter()
            .map(SessionRow::decode)
            .collect::<Result<Vec<_>, DatabaseError>>()?;
        Ok(records)
    }

    fn history_row(conn: &Connection, user_id: &str, date: NaiveDate) -> Result<DailyHistory> {
        let history = conn
            .query_row(
                "SELECT date, total_time, focus_count, completed_count, short_breaks, long_breaks
                 FROM study_history WHERE user_id = ?1 AND date = ?2",
                params![user_id, date.format("%Y-%m-%d").to_string()],
                history_from_row,
            )
            .map_err(DatabaseError::from)?;
        history.decode()
    }
}

fn routine_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Routine> {
    Ok(Routine {
        id: row.get(0)?,
        name: row.get(1)?,
        focus_minutes: row.get(2)?,
        short_break_minutes: row.get(3)?,
        long_break_minutes: row.get(4)?,
        sessions_before_long_break: row.get(5)?,
    })
}

struct HistoryRow {
    date: String,
    counts: [u32; 5],
}

impl HistoryRow {
    fn decode(self) -> Result<DailyHistory> {
        let [total_time, focus_count, completed_count, short_breaks, long_breaks] = self.counts;
        Ok(DailyHistory {
            date: parse_day(&self.date)?,
            total_time,
            focus_count,
            completed_count,
            short_breaks,
            long_breaks,
        })
    }
}

fn history_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRow> {
    Ok(HistoryRow {
        date: row.get(0)?,
        counts: [row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?],
    })
}

#[async_trait]
impl SessionStore for Database {
    async fn insert_session(&self, session: NewSession) -> Result<SessionRecord> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (user_id, routine_id, kind, planned_minutes, start_time, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                session.user_id,
                session.routine_id,
                session.kind.as_str(),
                session.planned_minutes,
                ts(session.start_time),
            ],
        )
        .map_err(DatabaseError::from)?;
        Ok(SessionRecord {
            id: conn.last_insert_rowid(),
            user_id: session.user_id,
            routine_id: session.routine_id,
            kind: session.kind,
            planned_minutes: session.planned_minutes,
            start_time: session.start_time,
            end_time: None,
            completed: false,
        })
    }

    async fn get_session(&self, user_id: &str, id: i64) -> Result<Option<SessionRecord>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ?1 AND id = ?2");
        Ok(self.query_sessions(&sql, params![user_id, id])?.into_iter().next())
    }

    async fn finalize_session(
        &self,
        user_id: &str,
        id: i64,
        ended_at: DateTime<Utc>,
        completed: bool,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE sessions SET end_time = ?1, completed = ?2
                 WHERE id = ?3 AND user_id = ?4 AND end_time IS NULL",
                params![ts(ended_at), completed, id, user_id],
            )
            .map_err(DatabaseError::from)?;
        Ok(changed == 1)
    }

    async fn sessions_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE user_id = ?1 AND start_time >= ?2 AND start_time < ?3
             ORDER BY start_time, id"
        );
        self.query_sessions(&sql, params![user_id, ts(from), ts(to)])
    }

    async fn all_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ?1 ORDER BY start_time, id"
        );
        self.query_sessions(&sql, params![user_id])
    }

    async fn recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ?1
             ORDER BY start_time DESC, id DESC LIMIT ?2"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_sessions(&sql, params![user_id, limit])
    }

    async fn completed_focus_days(&self, user_id: &str) -> Result<Vec<NaiveDate>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT substr(start_time, 1, 10) AS day FROM sessions
                 WHERE user_id = ?1 AND kind = 'focus' AND completed = 1
                 ORDER BY day",
            )
            .map_err(DatabaseError::from)?;
        let raw = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))
            .map_err(DatabaseError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(DatabaseError::from)?;
        let days = raw
            .iter()
            .map(|d| parse_day(d))
            .collect::<Result<Vec<_>, DatabaseError>>()?;
        Ok(days)
    }

    async fn add_daily_focus(
        &self,
        user_id: &str,
        date: NaiveDate,
        minutes: u32,
    ) -> Result<DailyHistory> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO study_history (user_id, date, total_time, focus_count, completed_count)
             VALUES (?1, ?2, ?3, 1, 1)
             ON CONFLICT(user_id, date) DO UPDATE SET
                total_time = total_time + excluded.total_time,
                focus_count = focus_count + 1,
                completed_count = completed_count + 1",
            params![user_id, date.format("%Y-%m-%d").to_string(), minutes],
        )
        .map_err(DatabaseError::from)?;
        Self::history_row(&conn, user_id, date)
    }

    async fn daily_history(&self, user_id: &str, limit: usize) -> Result<Vec<DailyHistory>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, total_time, focus_count, completed_count, short_breaks, long_breaks
                 FROM study_history WHERE user_id = ?1 ORDER BY date DESC LIMIT ?2",
            )
            .map_err(DatabaseError::from)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![user_id, limit], history_from_row)
            .map_err(DatabaseError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(DatabaseError::from)?;
        rows.into_iter().map(HistoryRow::decode).collect()
    }
}

#[async_trait]
impl ProgressionStore for Database {
    async fn load_progression(&self, user_id: &str) -> Result<Option<ProgressionState>> {
        match self.kv_get(&progression_key(user_id))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_progression(&self, user_id: &str, state: &ProgressionState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.kv_set(&progression_key(user_id), &json)
    }
}

#[async_trait]
impl GoalStore for Database {
    async fn load_goal(&self, user_id: &str) -> Result<Option<StudyGoal>> {
        let conn = self.conn()?;
        let goal = conn
            .query_row(
                "SELECT daily_goal, weekly_goal, monthly_goal FROM study_goals WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(StudyGoal {
                        daily_goal: row.get(0)?,
                        weekly_goal: row.get(1)?,
                        monthly_goal: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(goal)
    }

    async fn save_goal(&self, user_id: &str, goal: &StudyGoal) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO study_goals (user_id, daily_goal, weekly_goal, monthly_goal)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                daily_goal = excluded.daily_goal,
                weekly_goal = excluded.weekly_goal,
                monthly_goal = excluded.monthly_goal",
            params![user_id, goal.daily_goal, goal.weekly_goal, goal.monthly_goal],
        )
        .map_err(DatabaseError::from)?;
        Ok(())
    }
}

#[async_trait]
impl RoutineLookup for Database {
    async fn routine(&self, user_id: &str, routine_id: i64) -> Result<Option<Routine>> {
        let conn = self.conn()?;
        let routine = conn
            .query_row(
                "SELECT id, name, focus_minutes, short_break_minutes, long_break_minutes,
                        sessions_before_long_break
                 FROM routines WHERE user_id = ?1 AND id = ?2",
                params![user_id, routine_id],
                routine_from_row,
            )
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(routine)
    }
}
