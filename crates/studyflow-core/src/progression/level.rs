//! Level curve.
//!
//! Level 1 -> 2 costs 100 XP and every following level costs 50 XP more than
//! the previous one: 0, 100, 250, 450, 700, ...

use serde::{Deserialize, Serialize};

const FIRST_LEVEL_COST: u64 = 100;
const LEVEL_COST_STEP: u64 = 50;

/// Cumulative XP needed to reach `level`.
pub fn xp_for_level(level: u32) -> u64 {
    if level <= 1 {
        return 0;
    }
    (1..u64::from(level))
        .map(|l| FIRST_LEVEL_COST + (l - 1) * LEVEL_COST_STEP)
        .sum()
}

/// Largest level whose threshold is `<= xp`.
pub fn level_for_xp(xp: u64) -> u32 {
    let mut level = 1;
    while xp >= xp_for_level(level + 1) {
        level += 1;
    }
    level
}

/// Where a player stands on the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpProgress {
    pub xp: u64,
    pub level: u32,
    /// Cumulative XP at which the next level starts.
    pub next_level_xp: u64,
    /// 0-100 progress through the current level.
    pub progress_pct: u8,
}

impl XpProgress {
    pub fn from_xp(xp: u64) -> Self {
        let level = level_for_xp(xp);
        let floor = xp_for_level(level);
        let ceiling = xp_for_level(level + 1);
        let span = ceiling.saturating_sub(floor);
        let pct = if span == 0 {
            0.0
        } else {
            (xp.saturating_sub(floor) as f64 / span as f64 * 100.0).round()
        };
        Self {
            xp,
            level,
            next_level_xp: ceiling,
            progress_pct: pct.clamp(0.0, 100.0) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_thresholds() {
        assert_eq!(xp_for_level(0), 0);
        assert_eq!(xp_for_level(1), 0);
        assert_eq!(xp_for_level(2), 100);
        assert_eq!(xp_for_level(3), 250);
        assert_eq!(xp_for_level(4), 450);
        assert_eq!(xp_for_level(5), 700);
    }

    #[test]
    fn levels_at_boundaries() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(249), 2);
        assert_eq!(level_for_xp(250), 3);
    }

    #[test]
    fn progress_within_level() {
        let p = XpProgress::from_xp(175);
        assert_eq!(p.level, 2);
        assert_eq!(p.next_level_xp, 250);
        assert_eq!(p.progress_pct, 50);

        let fresh = XpProgress::from_xp(0);
        assert_eq!(fresh.progress_pct, 0);
        assert_eq!(fresh.next_level_xp, 100);
    }

    proptest! {
        #[test]
        fn level_curve_roundtrip(level in 1u32..300) {
            prop_assert_eq!(level_for_xp(xp_for_level(level)), level);
        }

        #[test]
        fn progress_pct_in_range(xp in 0u64..5_000_000) {
            let p = XpProgress::from_xp(xp);
            prop_assert!(p.progress_pct <= 100);
            prop_assert!(p.next_level_xp > xp);
        }
    }
}
