use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::SqliteInitError;

/// Runs the versioned migrations for the study schedule.
///
/// Version 1 creates sessions, their review dates, and the lookup index used
/// to find reviews due on a given day.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: sessions and review dates.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        // AUTOINCREMENT keeps ids from being reused.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS study_sessions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    topic TEXT NOT NULL,
                    study_date TEXT NOT NULL,
                    completed_reviews INTEGER NOT NULL DEFAULT 0 CHECK (completed_reviews >= 0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS session_reviews (
                    session_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 1),
                    review_date TEXT NOT NULL,
                    PRIMARY KEY (session_id, position),
                    FOREIGN KEY (session_id) REFERENCES study_sessions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_session_reviews_date
                    ON session_reviews (review_date, session_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(version = 1, "applied study schedule migration");
    }

    Ok(())
}
