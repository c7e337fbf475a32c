//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::{SessionError, SessionId};
use study_core::schedule::ScheduleError;

/// Errors emitted by `SchedulerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("no study session with id {0}")]
    UnknownSession(SessionId),
    #[error(
        "session {id} has no pending review: {completed} of {due} due reviews already completed"
    )]
    NoReviewPending {
        id: SessionId,
        completed: u32,
        due: usize,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while loading configuration or opening the configured store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no session store configured")]
    MissingStore,
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
