use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use storage::repository::{SessionRepository, StorageError};
use study_core::{
    Clock,
    insights::Insights,
    model::{NewSession, SessionId, StudySession},
    schedule::IntervalPolicy,
    selector::{self, DueReview},
};

use crate::config::SchedulerConfig;
use crate::error::{ConfigError, ServiceError};

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Logs study sessions, tracks completed reviews, and derives the read-only
/// views (today's reviews, insights) from the record store.
///
/// A completion is accepted only while the session has a review that has come
/// due and is not yet marked complete, so `completed_reviews` never exceeds the
/// number of review dates on or before today.
#[derive(Clone)]
pub struct SchedulerService {
    clock: Clock,
    policy: Arc<dyn IntervalPolicy>,
    sessions: Arc<dyn SessionRepository>,
}

impl SchedulerService {
    #[must_use]
    pub fn new(
        clock: Clock,
        policy: Arc<dyn IntervalPolicy>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            clock,
            policy,
            sessions,
        }
    }

    /// Build the policy and open the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Schedule` for an invalid spacing schedule,
    /// `ConfigError::MissingStore` when no store is configured, and
    /// `ConfigError::Sqlite` if a database store cannot be opened.
    pub async fn from_config(config: &SchedulerConfig, clock: Clock) -> Result<Self, ConfigError> {
        let policy = config.schedule.build_policy()?;
        let store = config.store.as_ref().ok_or(ConfigError::MissingStore)?;
        let storage = store.open().await?;
        info!(
            schedule = policy.name(),
            reviews = policy.review_count(),
            "scheduler ready"
        );
        Ok(Self::new(clock, policy, storage.sessions))
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current day according to the service's clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    #[must_use]
    pub fn policy(&self) -> &dyn IntervalPolicy {
        self.policy.as_ref()
    }

    /// Record that `topic` was studied on `study_date` and schedule its reviews.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Session` for a blank topic,
    /// `ServiceError::Schedule` if a review date overflows the calendar, and
    /// `ServiceError::Storage` if the store rejects the row.
    pub async fn log_session(
        &self,
        topic: &str,
        study_date: NaiveDate,
    ) -> Result<StudySession, ServiceError> {
        let review_dates = self.policy.review_dates(study_date)?;
        let session = NewSession::new(topic, study_date, review_dates)?;
        let stored = self.sessions.append(session).await?;

        info!(
            id = %stored.id(),
            topic = stored.topic(),
            study_date = %stored.study_date(),
            "logged study session"
        );
        Ok(stored)
    }

    /// `log_session` for the clock's current day.
    ///
    /// # Errors
    ///
    /// See [`SchedulerService::log_session`].
    pub async fn log_session_today(&self, topic: &str) -> Result<StudySession, ServiceError> {
        self.log_session(topic, self.today()).await
    }

    /// Count one completed review for the session.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::UnknownSession` if no session has this id and
    /// `ServiceError::NoReviewPending` if every review due so far is already
    /// marked complete.
    pub async fn mark_review_done(&self, id: SessionId) -> Result<StudySession, ServiceError> {
        let session = self
            .sessions
            .get(id)
            .await?
            .ok_or(ServiceError::UnknownSession(id))?;

        let today = self.today();
        if session.pending_reviews(today) == 0 {
            return Err(ServiceError::NoReviewPending {
                id,
                completed: session.completed_reviews(),
                due: session.due_count(today),
            });
        }

        let updated = match self.sessions.increment_completion(id).await {
            Ok(updated) => updated,
            Err(StorageError::NotFound) => return Err(ServiceError::UnknownSession(id)),
            Err(err) => return Err(err.into()),
        };

        info!(
            id = %updated.id(),
            completed = updated.completed_reviews(),
            "marked review complete"
        );
        Ok(updated)
    }

    /// Reviews scheduled for the clock's current day.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the store cannot be read.
    pub async fn todays_reviews(&self) -> Result<Vec<DueReview>, ServiceError> {
        self.reviews_due_on(self.today()).await
    }

    /// Reviews scheduled for `day`, in store order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the store cannot be read.
    pub async fn reviews_due_on(&self, day: NaiveDate) -> Result<Vec<DueReview>, ServiceError> {
        let sessions = self.sessions.load_all().await?;
        let due = selector::due_today(&sessions, day);
        debug!(%day, due = due.len(), "selected reviews");
        Ok(due)
    }

    /// Every stored session in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the store cannot be read.
    pub async fn sessions(&self) -> Result<Vec<StudySession>, ServiceError> {
        Ok(self.sessions.load_all().await?)
    }

    /// Streaks, daily activity, topic spread and completion rate.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Storage` if the store cannot be read.
    pub async fn insights(&self) -> Result<Insights, ServiceError> {
        let sessions = self.sessions.load_all().await?;
        Ok(Insights::from_sessions(&sessions))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use storage::repository::InMemoryRepository;
    use study_core::schedule::SpacingSchedule;
    use study_core::time::{fixed_clock, fixed_today};

    fn service(clock: Clock) -> (SchedulerService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let svc = SchedulerService::new(
            clock,
            Arc::new(SpacingSchedule::sparse()),
            Arc::new(repo.clone()),
        );
        (svc, repo)
    }

    fn days_later(days: u64) -> NaiveDate {
        fixed_today().checked_add_days(Days::new(days)).unwrap()
    }

    #[tokio::test]
    async fn log_session_stores_policy_dates() {
        let (svc, repo) = service(fixed_clock());
        let stored = svc.log_session("Topic A", fixed_today()).await.unwrap();

        let all = repo.load_all().await.unwrap();
        assert_eq!(all, vec![stored.clone()]);
        assert_eq!(stored.topic(), "Topic A");
        assert_eq!(stored.completed_reviews(), 0);
        assert_eq!(
            stored.review_dates(),
            SpacingSchedule::sparse()
                .review_dates(fixed_today())
                .unwrap()
                .as_slice()
        );
    }

    #[tokio::test]
    async fn log_session_today_uses_clock() {
        let (svc, _) = service(Clock::fixed(days_later(9)));
        let stored = svc.log_session_today("Generics").await.unwrap();
        assert_eq!(stored.study_date(), days_later(9));
    }

    #[tokio::test]
    async fn blank_topic_is_rejected() {
        let (svc, repo) = service(fixed_clock());
        let err = svc.log_session("  ", fixed_today()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Session(_)));
        assert!(repo.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn todays_reviews_follow_the_clock() {
        let (svc, _) = service(fixed_clock());
        let stored = svc.log_session("Traits", fixed_today()).await.unwrap();

        assert!(svc.todays_reviews().await.unwrap().is_empty());

        let later = svc.clone().with_clock(Clock::fixed(days_later(3)));
        let due = later.todays_reviews().await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].session_id, stored.id());
        assert_eq!(due[0].review_number, 2);
    }

    #[tokio::test]
    async fn mark_review_done_increments_only_target() {
        let (svc, _) = service(Clock::fixed(days_later(60)));
        let a = svc.log_session("A", fixed_today()).await.unwrap();
        let b = svc.log_session("B", fixed_today()).await.unwrap();

        for _ in 0..3 {
            svc.mark_review_done(a.id()).await.unwrap();
        }

        let all = svc.sessions().await.unwrap();
        assert_eq!(all[0].completed_reviews(), 3);
        assert_eq!(all[1], b);
    }

    #[tokio::test]
    async fn completions_are_capped_at_due_reviews() {
        // On day 3 reviews 1 (day 1) and 2 (day 3) have come due.
        let (svc, _) = service(Clock::fixed(days_later(3)));
        let stored = svc.log_session("Closures", fixed_today()).await.unwrap();

        svc.mark_review_done(stored.id()).await.unwrap();
        svc.mark_review_done(stored.id()).await.unwrap();
        let err = svc.mark_review_done(stored.id()).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::NoReviewPending {
                completed: 2,
                due: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn nothing_due_yet_cannot_be_completed() {
        let (svc, _) = service(fixed_clock());
        let stored = svc.log_session("Macros", fixed_today()).await.unwrap();
        assert!(matches!(
            svc.mark_review_done(stored.id()).await,
            Err(ServiceError::NoReviewPending { due: 0, .. })
        ));
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let (svc, _) = service(fixed_clock());
        let err = svc.mark_review_done(SessionId::new(7)).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownSession(id) if id == SessionId::new(7)));
    }

    #[tokio::test]
    async fn insights_are_idempotent() {
        let (svc, _) = service(Clock::fixed(days_later(5)));
        svc.log_session("A", fixed_today()).await.unwrap();
        let b = svc.log_session("B", days_later(1)).await.unwrap();
        svc.log_session("A", days_later(3)).await.unwrap();
        svc.mark_review_done(b.id()).await.unwrap();

        let first = svc.insights().await.unwrap();
        let second = svc.insights().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total_sessions, 3);
        assert_eq!(first.streaks.study_streak, 2);
        assert_eq!(first.streaks.revision_streak, 1);
    }
}
