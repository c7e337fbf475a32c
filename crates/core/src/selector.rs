//! Picks the sessions whose review falls on a given day.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{SessionId, StudySession};

/// A review to do on the selected day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueReview {
    pub session_id: SessionId,
    pub topic: String,
    /// 1-based index into the session's review dates.
    pub review_number: usize,
    pub completed_reviews: u32,
}

/// Sessions with a review scheduled exactly on `today`, in store order.
///
/// A session contributes at most one entry even if it somehow lists the same
/// date twice.
#[must_use]
pub fn due_today(sessions: &[StudySession], today: NaiveDate) -> Vec<DueReview> {
    sessions
        .iter()
        .filter_map(|session| {
            session.review_number_on(today).map(|review_number| DueReview {
                session_id: session.id(),
                topic: session.topic().to_owned(),
                review_number,
                completed_reviews: session.completed_reviews(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewSession;
    use crate::schedule::{IntervalPolicy, SpacingSchedule};
    use crate::time::fixed_today;
    use chrono::Days;

    fn session(id: u64, topic: &str, studied: NaiveDate) -> StudySession {
        let dates = SpacingSchedule::sparse().review_dates(studied).unwrap();
        NewSession::new(topic, studied, dates)
            .unwrap()
            .into_session(SessionId::new(id))
    }

    #[test]
    fn selects_sessions_due_today_in_store_order() {
        let start = fixed_today();
        let sessions = vec![
            session(1, "Borrowing", start),
            session(2, "Traits", start.checked_add_days(Days::new(1)).unwrap()),
            session(3, "Macros", start),
        ];

        // 2024-01-04 is review 2 for sessions 1 and 3; session 2's reviews start on the 3rd.
        let due = due_today(&sessions, start.checked_add_days(Days::new(3)).unwrap());
        let topics: Vec<_> = due.iter().map(|d| d.topic.as_str()).collect();
        assert_eq!(topics, vec!["Borrowing", "Macros"]);
        assert_eq!(due[0].session_id, SessionId::new(1));
        assert_eq!(due[0].review_number, 2);
    }

    #[test]
    fn nothing_due_returns_empty() {
        let start = fixed_today();
        let sessions = vec![session(1, "Borrowing", start)];
        assert!(due_today(&sessions, start).is_empty());
        assert!(due_today(&[], start).is_empty());
    }
}
