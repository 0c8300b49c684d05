//! Gamification: XP, levels, streak and daily challenges.
//!
//! The pure rules live in [`ProgressionState`]; [`ProgressionEngine`] binds a
//! state to a user and a [`ProgressionStore`](crate::storage::ProgressionStore).

mod challenge;
mod engine;
mod level;
mod state;

pub use challenge::{daily_challenges, Challenge, ChallengeKind};
pub use engine::ProgressionEngine;
pub use level::{level_for_xp, xp_for_level, XpProgress};
pub use state::{Award, ProgressionState, XP_PER_MINUTE};
