use chrono::{DateTime, Utc};

use civics_core::model::{LessonId, LessonProgress, UserId};

use super::{SqliteRepository, mapping::map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str =
    "user_id, lesson_id, status, quiz_attempts, quiz_score, completed_at, updated_at";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn start_lesson(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
        now: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError> {
        // Single conditional upsert; a completed row passes through
        // unchanged, so two racing starts cannot clobber each other.
        let sql = format!(
            r"
            INSERT INTO user_lesson_progress
                (user_id, lesson_id, status, quiz_attempts, quiz_score, completed_at, updated_at)
            VALUES (?1, ?2, 'in_progress', 0, NULL, NULL, ?3)
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                status = CASE
                    WHEN user_lesson_progress.status = 'completed'
                        THEN user_lesson_progress.status
                    ELSE 'in_progress'
                END,
                updated_at = CASE
                    WHEN user_lesson_progress.status = 'completed'
                        THEN user_lesson_progress.updated_at
                    ELSE excluded.updated_at
                END
            RETURNING {PROGRESS_COLUMNS}
            "
        );
        let row = sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(lesson_id.value())
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        map_progress_row(&row)
    }

    async fn record_quiz_attempt(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
        score: u32,
        passed: bool,
        now: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError> {
        // The attempt counter increments in the same statement that moves
        // the status, so every submission counts exactly once. A failing
        // attempt after a pass drops the status back to in_progress but
        // leaves the earlier completed_at stamp alone.
        let sql = format!(
            r"
            INSERT INTO user_lesson_progress
                (user_id, lesson_id, status, quiz_attempts, quiz_score, completed_at, updated_at)
            VALUES (
                ?1, ?2,
                CASE WHEN ?4 THEN 'completed' ELSE 'in_progress' END,
                1, ?3,
                CASE WHEN ?4 THEN ?5 END,
                ?5
            )
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                quiz_attempts = user_lesson_progress.quiz_attempts + 1,
                quiz_score = excluded.quiz_score,
                status = excluded.status,
                completed_at = CASE
                    WHEN ?4 THEN excluded.completed_at
                    ELSE user_lesson_progress.completed_at
                END,
                updated_at = excluded.updated_at
            RETURNING {PROGRESS_COLUMNS}
            "
        );
        let row = sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(lesson_id.value())
            .bind(i64::from(score))
            .bind(passed)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        map_progress_row(&row)
    }

    async fn get_progress(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_lesson_progress
             WHERE user_id = ?1 AND lesson_id = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(lesson_id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        row.as_ref().map(map_progress_row).transpose()
    }

    async fn progress_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_lesson_progress
             WHERE user_id = ?1 ORDER BY lesson_id"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        rows.iter().map(map_progress_row).collect()
    }
}
