use std::sync::Arc;

use chrono::Utc;

use super::record::{DailyHistory, NewSession, SessionRecord};
use crate::error::{CoreError, Result};
use crate::storage::{SessionStore, UserContext};
use crate::timer::TimerMode;

/// Outcome of [`SessionRecorder::complete`].
///
/// The record is finalized even when the day aggregate could not be
/// updated; that failure is carried in `aggregate_error`.
#[derive(Debug)]
pub struct Completion {
    pub record: SessionRecord,
    pub history: Option<DailyHistory>,
    pub aggregate_error: Option<CoreError>,
}

/// Opens and finalizes session records for the active user.
#[derive(Clone)]
pub struct SessionRecorder {
    store: Arc<dyn SessionStore>,
    context: Arc<dyn UserContext>,
}

impl SessionRecorder {
    pub fn new(store: Arc<dyn SessionStore>, context: Arc<dyn UserContext>) -> Self {
        Self { store, context }
    }

    fn user_id(&self) -> Result<String> {
        self.context
            .current_user_id()
            .ok_or(CoreError::NotAuthenticated)
    }

    /// Open a record starting now.
    pub async fn begin(
        &self,
        kind: TimerMode,
        planned_minutes: u32,
        routine_id: Option<i64>,
    ) -> Result<SessionRecord> {
        let user_id = self.user_id()?;
        let record = self
            .store
            .insert_session(NewSession {
                user_id,
                routine_id,
                kind,
                planned_minutes,
                start_time: Utc::now(),
            })
            .await?;
        tracing::debug!(session_id = record.id, kind = kind.as_str(), "session opened");
        Ok(record)
    }

    /// Finalize a record with `completed = success`.
    ///
    /// A successful Focus also adds its planned minutes to the aggregate of
    /// the day the session started on.
    pub async fn complete(&self, session_id: i64, success: bool) -> Result<Completion> {
        let user_id = self.user_id()?;
        let existing = self
            .store
            .get_session(&user_id, session_id)
            .await?
            .ok_or(CoreError::SessionNotFound(session_id))?;
        if existing.is_finalized() {
            return Err(CoreError::AlreadyFinalized { session_id });
        }

        let ended_at = Utc::now();
        if !self
            .store
            .finalize_session(&user_id, session_id, ended_at, success)
            .await?
        {
            return Err(CoreError::AlreadyFinalized { session_id });
        }
        let record = SessionRecord {
            end_time: Some(ended_at),
            completed: success,
            ..existing
        };
        tracing::info!(session_id, completed = success, kind = record.kind.as_str(), "session finalized");

        let mut completion = Completion {
            record,
            history: None,
            aggregate_error: None,
        };
        if completion.record.is_completed_focus() {
            match self
                .store
                .add_daily_focus(&user_id, completion.record.date(), completion.record.planned_minutes)
                .await
            {
                Ok(history) => completion.history = Some(history),
                Err(e) => {
                    tracing::warn!(session_id, "failed to update daily history: {e}");
                    completion.aggregate_error = Some(e);
                }
            }
        }
        Ok(completion)
    }

    /// Newest sessions first.
    pub async fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let user_id = self.user_id()?;
        self.store.recent_sessions(&user_id, limit).await
    }

    /// Newest days first.
    pub async fn daily_history(&self, limit: usize) -> Result<Vec<DailyHistory>> {
        let user_id = self.user_id()?;
        self.store.daily_history(&user_id, limit).await
    }
}
