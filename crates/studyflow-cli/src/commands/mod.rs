pub mod config;
pub mod goal;
pub mod preset;
pub mod progress;
pub mod routine;
pub mod stats;
pub mod timer;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use studyflow_core::{
    Config, CoreError, Database, ProgressionEngine, SessionRecorder, StaticUser, StatsAggregator,
};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Config, store and identity shared by the commands that touch user data.
pub struct App {
    pub config: Config,
    pub db: Arc<Database>,
    pub user_id: String,
}

impl App {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let user_id = config
            .user_id()
            .map(str::to_owned)
            .ok_or(CoreError::NotAuthenticated)?;
        let db = Arc::new(Database::open()?);
        Ok(Self {
            config,
            db,
            user_id,
        })
    }

    fn user(&self) -> Arc<StaticUser> {
        Arc::new(StaticUser::signed_in(self.user_id.clone()))
    }

    pub fn recorder(&self) -> SessionRecorder {
        SessionRecorder::new(self.db.clone(), self.user())
    }

    pub fn stats(&self) -> StatsAggregator {
        StatsAggregator::new(self.db.clone(), self.db.clone(), self.user())
    }

    pub async fn progression(&self) -> Result<ProgressionEngine, CoreError> {
        ProgressionEngine::load(self.db.clone(), &self.user_id, today()).await
    }
}

/// Today as a UTC calendar day, matching how sessions are bucketed.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn parse_date(input: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| CoreError::InvalidDate(format!("'{input}': {e}")))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
