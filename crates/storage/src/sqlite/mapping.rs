use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::Row;
use study_core::model::{SessionId, StudySession};

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    u64::try_from(v)
        .map(SessionId::new)
        .map_err(|_| StorageError::Serialization("session_id sign overflow".into()))
}

pub(crate) fn session_id_to_i64(id: SessionId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("session_id overflow".into()))
}

pub(crate) fn position_to_i64(idx: usize) -> Result<i64, StorageError> {
    i64::try_from(idx + 1).map_err(|_| StorageError::Serialization("position overflow".into()))
}

/// Group `session_reviews` rows (ordered by session and position) by session id.
pub(crate) fn group_review_rows(
    rows: &[sqlx::sqlite::SqliteRow],
) -> Result<HashMap<i64, Vec<NaiveDate>>, StorageError> {
    let mut grouped: HashMap<i64, Vec<NaiveDate>> = HashMap::new();
    for row in rows {
        let session_id: i64 = row.try_get("session_id").map_err(ser)?;
        let date: NaiveDate = row.try_get("review_date").map_err(ser)?;
        grouped.entry(session_id).or_default().push(date);
    }
    Ok(grouped)
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
    review_dates: Vec<NaiveDate>,
) -> Result<StudySession, StorageError> {
    let id = session_id_from_i64(row.try_get("id").map_err(ser)?)?;
    let topic: String = row.try_get("topic").map_err(ser)?;
    let study_date: NaiveDate = row.try_get("study_date").map_err(ser)?;

    let completed_i64: i64 = row.try_get("completed_reviews").map_err(ser)?;
    let completed = u32::try_from(completed_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid completed_reviews: {completed_i64}"))
    })?;

    StudySession::from_persisted(id, topic, study_date, review_dates, completed)
        .map_err(|e| StorageError::Serialization(format!("session {id}: {e}")))
}
