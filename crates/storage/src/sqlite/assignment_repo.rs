use civics_core::model::UserId;

use super::{SqliteRepository, mapping::map_assigned_lesson_row};
use crate::repository::{AssignedLesson, AssignmentRepository, StorageError};

#[async_trait::async_trait]
impl AssignmentRepository for SqliteRepository {
    async fn assignments_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AssignedLesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                a.lesson_id, a.assignment_reason, a.assigned_at,
                l.title, l.description, l.lesson_order, l.tier, l.target_domains,
                (
                    SELECT COUNT(*)
                    FROM lesson_cards c
                    WHERE c.lesson_id = l.id AND c.card_type = 'text'
                ) AS text_cards
            FROM user_lesson_assignments a
            JOIN lessons l ON l.id = a.lesson_id
            WHERE a.user_id = ?1
            ORDER BY l.lesson_order
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        rows.iter().map(map_assigned_lesson_row).collect()
    }
}
