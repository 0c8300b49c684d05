use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use super::challenge::Challenge;
use super::level::XpProgress;
use super::state::{Award, ProgressionState};
use crate::error::Result;
use crate::storage::ProgressionStore;

/// Per-user progression bound to a store.
///
/// State is updated in memory first and then persisted. A failed save is
/// returned to the caller, but the in-memory award stands.
pub struct ProgressionEngine {
    store: Arc<dyn ProgressionStore>,
    user_id: String,
    state: ProgressionState,
}

impl ProgressionEngine {
    /// Load the user's state (or a fresh one), rolling it over to `today`.
    ///
    /// A rollover is written back immediately.
    pub async fn load(
        store: Arc<dyn ProgressionStore>,
        user_id: impl Into<String>,
        today: NaiveDate,
    ) -> Result<Self> {
        let user_id = user_id.into();
        let (mut state, fresh) = match store.load_progression(&user_id).await? {
            Some(state) => (state, false),
            None => (ProgressionState::new(today), true),
        };
        if state.roll_over(today) || fresh {
            tracing::debug!(user = %user_id, date = %today, "progression day initialised");
            store.save_progression(&user_id, &state).await?;
        }
        Ok(Self {
            store,
            user_id,
            state,
        })
    }

    /// Build an engine around an existing state without touching the store.
    pub fn with_state(
        store: Arc<dyn ProgressionStore>,
        user_id: impl Into<String>,
        state: ProgressionState,
    ) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            state,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn get_progress(&self) -> XpProgress {
        self.state.progress()
    }

    pub fn daily_challenges(&self) -> &[Challenge] {
        &self.state.daily_challenges
    }

    /// Award a completed Focus interval studied today.
    ///
    /// Days are UTC calendar days, the same days session records and the
    /// daily history are keyed by.
    pub async fn award_focus_completion(&mut self, minutes: u32) -> Result<Award> {
        self.award_focus_completion_on(minutes, Utc::now().date_naive())
            .await
    }

    pub async fn award_focus_completion_on(
        &mut self,
        minutes: u32,
        today: NaiveDate,
    ) -> Result<Award> {
        let award = self.state.award_focus(minutes, today);
        tracing::info!(
            user = %self.user_id,
            minutes,
            gained_xp = award.gained_xp,
            level = award.progress.level,
            "focus completion awarded"
        );
        if let Err(e) = self.store.save_progression(&self.user_id, &self.state).await {
            tracing::warn!(user = %self.user_id, "failed to save progression: {e}");
            return Err(e);
        }
        Ok(award)
    }
}
