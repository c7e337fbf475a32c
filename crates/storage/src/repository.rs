use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use study_core::model::{NewSession, SessionId, StudySession};
use thiserror::Error;

use crate::tabular::CsvRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Id for the next appended session, given the highest id stored so far.
///
/// # Errors
///
/// Returns `StorageError::Schema` once `u64` ids are exhausted.
pub(crate) fn next_session_id(last: Option<SessionId>) -> Result<SessionId, StorageError> {
    match last {
        None => Ok(SessionId::new(1)),
        Some(last) => last
            .next()
            .ok_or_else(|| StorageError::Schema(format!("session ids exhausted after {last}"))),
    }
}

/// Record store for study sessions.
///
/// Rows keep insertion order. Every call sees the store as it is on disk right
/// now; nothing is cached between calls.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn append(&self, session: NewSession) -> Result<StudySession, StorageError>;

    /// Read every stored session in insertion order.
    ///
    /// An uninitialized store reads as empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store exists but cannot be read.
    async fn load_all(&self) -> Result<Vec<StudySession>, StorageError>;

    /// Fetch one session by id.
    ///
    /// Returns `Ok(None)` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn get(&self, id: SessionId) -> Result<Option<StudySession>, StorageError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .find(|session| session.id() == id))
    }

    /// Add one completed review to the session and return the updated row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no session has this id; other rows
    /// are never touched in that case.
    async fn increment_completion(&self, id: SessionId) -> Result<StudySession, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<Vec<StudySession>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn append(&self, session: NewSession) -> Result<StudySession, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = next_session_id(guard.iter().map(StudySession::id).max())?;
        let stored = session.into_session(id);
        guard.push(stored.clone());
        Ok(stored)
    }

    async fn load_all(&self) -> Result<Vec<StudySession>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn increment_completion(&self, id: SessionId) -> Result<StudySession, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let session = guard
            .iter_mut()
            .find(|session| session.id() == id)
            .ok_or(StorageError::NotFound)?;
        session.record_completion();
        Ok(session.clone())
    }
}

/// Holds the active session repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let sessions: Arc<dyn SessionRepository> = Arc::new(InMemoryRepository::new());
        Self { sessions }
    }

    /// Build a `Storage` backed by a CSV file. The file is created on first append.
    #[must_use]
    pub fn csv(path: impl Into<PathBuf>) -> Self {
        let sessions: Arc<dyn SessionRepository> = Arc::new(CsvRepository::new(path));
        Self { sessions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;
    use study_core::time::fixed_today;

    fn new_session(topic: &str) -> NewSession {
        let start = fixed_today();
        NewSession::new(
            topic,
            start,
            vec![
                start.checked_add_days(Days::new(1)).unwrap(),
                start.checked_add_days(Days::new(3)).unwrap(),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let repo = InMemoryRepository::new();
        let first = repo.append(new_session("A")).await.unwrap();
        let second = repo.append(new_session("B")).await.unwrap();

        assert_eq!(first.id(), SessionId::new(1));
        assert_eq!(second.id(), SessionId::new(2));

        let all = repo.load_all().await.unwrap();
        assert_eq!(all, vec![first, second]);
    }

    #[tokio::test]
    async fn increment_touches_only_the_target() {
        let repo = InMemoryRepository::new();
        let a = repo.append(new_session("A")).await.unwrap();
        let b = repo.append(new_session("B")).await.unwrap();

        let updated = repo.increment_completion(b.id()).await.unwrap();
        assert_eq!(updated.completed_reviews(), 1);

        assert_eq!(repo.get(a.id()).await.unwrap().unwrap().completed_reviews(), 0);
        assert_eq!(repo.get(b.id()).await.unwrap().unwrap().completed_reviews(), 1);
    }

    #[test]
    fn next_id_starts_at_one_and_stops_at_the_end() {
        assert_eq!(next_session_id(None).unwrap(), SessionId::new(1));
        assert_eq!(
            next_session_id(Some(SessionId::new(4))).unwrap(),
            SessionId::new(5)
        );
        assert!(matches!(
            next_session_id(Some(SessionId::new(u64::MAX))),
            Err(StorageError::Schema(_))
        ));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let repo = InMemoryRepository::new();
        repo.append(new_session("A")).await.unwrap();

        let err = repo
            .increment_completion(SessionId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert!(repo.get(SessionId::new(99)).await.unwrap().is_none());
    }
}
