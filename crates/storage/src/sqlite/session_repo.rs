use sqlx::Row;
use study_core::model::{NewSession, SessionId, StudySession};
use tracing::debug;

use super::{
    SqliteRepository,
    mapping::{
        group_review_rows, map_session_row, position_to_i64, session_id_from_i64,
        session_id_to_i64,
    },
};
use crate::repository::{SessionRepository, StorageError};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn append(&self, session: NewSession) -> Result<StudySession, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        // Every session in one store shares the review count of the first.
        let existing: i64 = sqlx::query_scalar(
            r"
                SELECT COUNT(*)
                FROM session_reviews
                WHERE session_id = (SELECT MIN(id) FROM study_sessions)
            ",
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(conn)?;
        let incoming = i64::try_from(session.review_count())
            .map_err(|_| StorageError::Serialization("review count overflow".into()))?;
        if existing > 0 && existing != incoming {
            return Err(StorageError::Schema(format!(
                "store has {existing} review dates per session but the session has {incoming}"
            )));
        }

        let res = sqlx::query(
            r"
                INSERT INTO study_sessions (topic, study_date, completed_reviews)
                VALUES (?1, ?2, 0)
            ",
        )
        .bind(session.topic())
        .bind(session.study_date())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let raw_id = res.last_insert_rowid();

        for (idx, date) in session.review_dates().iter().enumerate() {
            sqlx::query(
                r"
                    INSERT INTO session_reviews (session_id, position, review_date)
                    VALUES (?1, ?2, ?3)
                ",
            )
            .bind(raw_id)
            .bind(position_to_i64(idx)?)
            .bind(*date)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;

        let stored = session.into_session(session_id_from_i64(raw_id)?);
        debug!(id = %stored.id(), topic = stored.topic(), "appended study session");
        Ok(stored)
    }

    async fn load_all(&self) -> Result<Vec<StudySession>, StorageError> {
        let sessions = sqlx::query(
            r"
                SELECT id, topic, study_date, completed_reviews
                FROM study_sessions
                ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let reviews = sqlx::query(
            r"
                SELECT session_id, review_date
                FROM session_reviews
                ORDER BY session_id ASC, position ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        let mut grouped = group_review_rows(&reviews)?;

        let mut out = Vec::with_capacity(sessions.len());
        for row in sessions {
            let id: i64 = row
                .try_get("id")
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            let dates = grouped.remove(&id).unwrap_or_default();
            out.push(map_session_row(&row, dates)?);
        }
        Ok(out)
    }

    async fn get(&self, id: SessionId) -> Result<Option<StudySession>, StorageError> {
        let raw_id = session_id_to_i64(id)?;

        let Some(row) = sqlx::query(
            r"
                SELECT id, topic, study_date, completed_reviews
                FROM study_sessions
                WHERE id = ?1
            ",
        )
        .bind(raw_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let reviews = sqlx::query(
            r"
                SELECT session_id, review_date
                FROM session_reviews
                WHERE session_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(raw_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        let dates = group_review_rows(&reviews)?
            .remove(&raw_id)
            .unwrap_or_default();

        map_session_row(&row, dates).map(Some)
    }

    async fn increment_completion(&self, id: SessionId) -> Result<StudySession, StorageError> {
        let raw_id = session_id_to_i64(id)?;

        let res = sqlx::query(
            r"
                UPDATE study_sessions
                SET completed_reviews = completed_reviews + 1
                WHERE id = ?1
            ",
        )
        .bind(raw_id)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get(id).await?.ok_or(StorageError::NotFound)
    }
}
