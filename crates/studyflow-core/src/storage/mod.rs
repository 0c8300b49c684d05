mod config;
pub mod database;
pub mod migrations;
pub mod repository;

pub use config::{Config, LoggingConfig, NotificationsConfig, TimerConfig, UserConfig};
pub use database::Database;
pub use repository::{
    GoalStore, ProgressionStore, Routine, RoutineLookup, SessionStore, StaticUser, UserContext,
};

use std::path::PathBuf;

use crate::error::Result;

/// Resolve the data directory.
///
/// `STUDYFLOW_DATA_DIR` wins when set; otherwise `~/.config/studyflow[-dev]/`
/// depending on `STUDYFLOW_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("STUDYFLOW_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYFLOW_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studyflow-dev")
            } else {
                base_dir.join("studyflow")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
