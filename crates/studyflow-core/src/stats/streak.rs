use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Consecutive-day study streak derived from the session history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStreak {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<NaiveDate>,
}

/// Compute streaks from the days that have a completed Focus session.
///
/// `days` may be unsorted and contain duplicates. The current streak only
/// counts when the last study day is today or yesterday.
pub fn compute_streak(days: &[NaiveDate], today: NaiveDate) -> UserStreak {
    let mut days = days.to_vec();
    days.sort_unstable();
    days.dedup();

    let Some(&last) = days.last() else {
        return UserStreak::default();
    };

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for &day in &days {
        run = match prev {
            Some(p) if day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(day);
    }

    // `run` now holds the length of the streak ending at `last`.
    let current = if last == today || last == today - Duration::days(1) {
        run
    } else {
        0
    };

    UserStreak {
        current_streak: current,
        longest_streak: longest,
        last_study_date: Some(last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    #[test]
    fn empty_history() {
        assert_eq!(compute_streak(&[], d(10)), UserStreak::default());
    }

    #[test]
    fn streak_ending_yesterday_is_current() {
        let s = compute_streak(&[d(7), d(8), d(9)], d(10));
        assert_eq!(s.current_streak, 3);
        assert_eq!(s.longest_streak, 3);
        assert_eq!(s.last_study_date, Some(d(9)));
    }

    #[test]
    fn gap_breaks_current_but_keeps_longest() {
        let s = compute_streak(&[d(1), d(2), d(3), d(4), d(8)], d(10));
        assert_eq!(s.current_streak, 0);
        assert_eq!(s.longest_streak, 4);
    }

    #[test]
    fn unsorted_duplicates() {
        let s = compute_streak(&[d(10), d(9), d(10), d(5)], d(10));
        assert_eq!(s.current_streak, 2);
        assert_eq!(s.longest_streak, 2);
    }

    proptest! {
        #[test]
        fn current_never_exceeds_longest(days in proptest::collection::vec(1u32..=28, 0..20), today in 1u32..=28) {
            let days: Vec<_> = days.into_iter().map(d).collect();
            let s = compute_streak(&days, d(today));
            prop_assert!(s.current_streak <= s.longest_streak);
        }
    }
}
