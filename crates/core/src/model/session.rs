use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::model::SessionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("a study session needs at least one review date")]
    NoReviewDates,

    #[error("review {position} ({date}) is not after the previous date")]
    UnorderedReviewDates { position: usize, date: NaiveDate },
}

fn validate(
    topic: &str,
    study_date: NaiveDate,
    review_dates: &[NaiveDate],
) -> Result<(), SessionError> {
    if topic.trim().is_empty() {
        return Err(SessionError::EmptyTopic);
    }
    if review_dates.is_empty() {
        return Err(SessionError::NoReviewDates);
    }

    let mut previous = study_date;
    for (idx, date) in review_dates.iter().enumerate() {
        if *date <= previous {
            return Err(SessionError::UnorderedReviewDates {
                position: idx + 1,
                date: *date,
            });
        }
        previous = *date;
    }
    Ok(())
}

//
// ─── NEW SESSION ───────────────────────────────────────────────────────────────
//

/// A study session that has not been stored yet, so it has no id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    topic: String,
    study_date: NaiveDate,
    review_dates: Vec<NaiveDate>,
}

impl NewSession {
    /// Validate and build a session awaiting its id.
    ///
    /// The topic is trimmed; review dates must be non-empty, strictly ascending
    /// and after `study_date`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if any of the above does not hold.
    pub fn new(
        topic: impl Into<String>,
        study_date: NaiveDate,
        review_dates: Vec<NaiveDate>,
    ) -> Result<Self, SessionError> {
        let topic = topic.into().trim().to_owned();
        validate(&topic, study_date, &review_dates)?;
        Ok(Self {
            topic,
            study_date,
            review_dates,
        })
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn study_date(&self) -> NaiveDate {
        self.study_date
    }

    #[must_use]
    pub fn review_dates(&self) -> &[NaiveDate] {
        &self.review_dates
    }

    #[must_use]
    pub fn review_count(&self) -> usize {
        self.review_dates.len()
    }

    /// Attach the store-assigned id. Completion count starts at zero.
    #[must_use]
    pub fn into_session(self, id: SessionId) -> StudySession {
        StudySession {
            id,
            topic: self.topic,
            study_date: self.study_date,
            review_dates: self.review_dates,
            completed_reviews: 0,
        }
    }
}

//
// ─── STUDY SESSION ─────────────────────────────────────────────────────────────
//

/// One logged topic and the review dates derived for it.
///
/// Everything except `completed_reviews` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudySession {
    id: SessionId,
    topic: String,
    study_date: NaiveDate,
    review_dates: Vec<NaiveDate>,
    completed_reviews: u32,
}

impl StudySession {
    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the stored row breaks the session invariants.
    pub fn from_persisted(
        id: SessionId,
        topic: String,
        study_date: NaiveDate,
        review_dates: Vec<NaiveDate>,
        completed_reviews: u32,
    ) -> Result<Self, SessionError> {
        validate(&topic, study_date, &review_dates)?;
        Ok(Self {
            id,
            topic,
            study_date,
            review_dates,
            completed_reviews,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn study_date(&self) -> NaiveDate {
        self.study_date
    }

    #[must_use]
    pub fn review_dates(&self) -> &[NaiveDate] {
        &self.review_dates
    }

    #[must_use]
    pub fn review_count(&self) -> usize {
        self.review_dates.len()
    }

    #[must_use]
    pub fn completed_reviews(&self) -> u32 {
        self.completed_reviews
    }

    /// 1-based position of the review falling on `day`, if any.
    #[must_use]
    pub fn review_number_on(&self, day: NaiveDate) -> Option<usize> {
        self.review_dates
            .iter()
            .position(|date| *date == day)
            .map(|idx| idx + 1)
    }

    /// Number of reviews whose date is on or before `today`.
    #[must_use]
    pub fn due_count(&self, today: NaiveDate) -> usize {
        // review_dates is sorted, so the partition point is the count.
        self.review_dates.partition_point(|date| *date <= today)
    }

    /// Reviews that have come due but are not marked complete yet.
    #[must_use]
    pub fn pending_reviews(&self, today: NaiveDate) -> usize {
        let completed = usize::try_from(self.completed_reviews).unwrap_or(usize::MAX);
        self.due_count(today).saturating_sub(completed)
    }

    /// The next review date strictly after `today`.
    #[must_use]
    pub fn next_review_after(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.review_dates.get(self.due_count(today)).copied()
    }

    /// Count one more completed review.
    pub fn record_completion(&mut self) {
        self.completed_reviews = self.completed_reviews.saturating_add(1);
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
