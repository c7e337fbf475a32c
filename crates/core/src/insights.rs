//! Summary figures for the insights view: topic spread, completion rate and streaks.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::StudySession;
use crate::streaks::{self, StreakReport};

/// How many sessions were logged for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub topic: String,
    pub sessions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub total_sessions: usize,
    /// Review dates across all sessions.
    pub total_scheduled: u64,
    pub total_completed: u64,
    /// `total_completed / total_scheduled` as a percentage, 0 when nothing is scheduled.
    pub completion_rate: f64,
    /// Most studied first; ties ordered by topic.
    pub topic_distribution: Vec<TopicCount>,
    pub streaks: StreakReport,
}

impl Insights {
    #[must_use]
    pub fn from_sessions(sessions: &[StudySession]) -> Self {
        let total_scheduled: u64 = sessions
            .iter()
            .map(|s| u64::try_from(s.review_count()).unwrap_or(u64::MAX))
            .sum();
        let total_completed: u64 = sessions
            .iter()
            .map(|s| u64::from(s.completed_reviews()))
            .sum();

        Self {
            total_sessions: sessions.len(),
            total_scheduled,
            total_completed,
            completion_rate: completion_rate(total_completed, total_scheduled),
            topic_distribution: topic_distribution(sessions),
            streaks: streaks::compute(sessions),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn completion_rate(completed: u64, scheduled: u64) -> f64 {
    if scheduled == 0 {
        return 0.0;
    }
    completed as f64 / scheduled as f64 * 100.0
}

fn topic_distribution(sessions: &[StudySession]) -> Vec<TopicCount> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for session in sessions {
        let count = counts.entry(session.topic()).or_default();
        *count = count.saturating_add(1);
    }

    let mut out: Vec<TopicCount> = counts
        .into_iter()
        .map(|(topic, sessions)| TopicCount {
            topic: topic.to_owned(),
            sessions,
        })
        .collect();
    out.sort_by(|a, b| b.sessions.cmp(&a.sessions).then_with(|| a.topic.cmp(&b.topic)));
    out
}
