//! Study and revision streaks plus the per-day activity series behind them.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::StudySession;

/// Activity total for one calendar day. Serializes the date as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u32,
}

/// Streaks and daily series derived from the full set of sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StreakReport {
    /// Entries in the longest run where each session was logged exactly one
    /// day after the previous one.
    pub study_streak: u32,
    /// Days in the longest run of consecutive study days with completed reviews.
    pub revision_streak: u32,
    /// Sessions logged per day, ascending.
    pub daily_study_counts: Vec<DailyCount>,
    /// Completed reviews summed per study day, ascending, zero days included.
    pub daily_revision_counts: Vec<DailyCount>,
}

/// Derive streaks and daily series from every stored session.
///
/// Completions are attributed to the day the topic was studied, since the
/// store only keeps a count, not when each review was done.
#[must_use]
pub fn compute(sessions: &[StudySession]) -> StreakReport {
    let mut study_dates: Vec<NaiveDate> = sessions.iter().map(StudySession::study_date).collect();
    study_dates.sort_unstable();

    let mut studied_per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    let mut completed_per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for session in sessions {
        let studied = studied_per_day.entry(session.study_date()).or_default();
        *studied = studied.saturating_add(1);
        let completed = completed_per_day.entry(session.study_date()).or_default();
        *completed = completed.saturating_add(session.completed_reviews());
    }

    let revision_days: Vec<NaiveDate> = completed_per_day
        .iter()
        .filter(|(_, total)| **total > 0)
        .map(|(day, _)| *day)
        .collect();

    StreakReport {
        study_streak: longest_run(&study_dates),
        revision_streak: longest_run(&revision_days),
        daily_study_counts: to_series(&studied_per_day),
        daily_revision_counts: to_series(&completed_per_day),
    }
}

/// Length of the longest run in `sorted` where every entry is exactly one day
/// after its predecessor. A repeated date breaks the run.
fn longest_run(sorted: &[NaiveDate]) -> u32 {
    let mut longest = 0_u32;
    let mut current = 0_u32;
    let mut previous: Option<NaiveDate> = None;

    for day in sorted {
        current = match previous {
            Some(prev) if prev.succ_opt() == Some(*day) => current.saturating_add(1),
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(*day);
    }
    longest
}

fn to_series(per_day: &BTreeMap<NaiveDate, u32>) -> Vec<DailyCount> {
    per_day
        .iter()
        .map(|(date, count)| DailyCount {
            date: *date,
            count: *count,
        })
        .collect()
}
