use civics_core::model::UserId;

use super::SqliteRepository;
use crate::repository::{AssessmentRepository, StorageError};

#[async_trait::async_trait]
impl AssessmentRepository for SqliteRepository {
    async fn has_completed_assessment(&self, user_id: &UserId) -> Result<bool, StorageError> {
        let row = sqlx::query(
            "SELECT 1 FROM user_assessments WHERE user_id = ?1 AND status = 'completed' LIMIT 1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(row.is_some())
    }
}
