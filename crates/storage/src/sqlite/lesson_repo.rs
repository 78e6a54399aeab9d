use std::collections::HashMap;

use civics_core::model::{
    AssessmentQuestion, CardId, Citation, LessonContent, LessonId, QuizQuestion,
};

use super::{
    SqliteRepository,
    mapping::{map_assessment_question_row, map_card_row, map_citation_row, map_lesson_row,
        map_quiz_question_row},
};
use crate::repository::{LessonRepository, StorageError};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn lesson_content(
        &self,
        lesson_id: LessonId,
    ) -> Result<Option<LessonContent>, StorageError> {
        let lesson_row = sqlx::query(
            "SELECT id, title, description, lesson_order FROM lessons WHERE id = ?1",
        )
        .bind(lesson_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(lesson_row) = lesson_row else {
            return Ok(None);
        };
        let lesson = map_lesson_row(&lesson_row)?;

        let card_rows = sqlx::query(
            r"
            SELECT id, lesson_id, card_order, card_type, title, content
            FROM lesson_cards
            WHERE lesson_id = ?1
            ORDER BY card_order
            ",
        )
        .bind(lesson_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        let mut cards = card_rows
            .iter()
            .map(map_card_row)
            .collect::<Result<Vec<_>, _>>()?;

        let citation_rows = sqlx::query(
            r"
            SELECT ct.id, ct.card_id, ct.citation_text, ct.source_name, ct.source_url
            FROM card_citations ct
            JOIN lesson_cards c ON c.id = ct.card_id
            WHERE c.lesson_id = ?1
            ORDER BY ct.id
            ",
        )
        .bind(lesson_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut by_card: HashMap<CardId, Vec<Citation>> = HashMap::new();
        for row in &citation_rows {
            let citation = map_citation_row(row)?;
            by_card.entry(citation.card_id).or_default().push(citation);
        }
        for card in &mut cards {
            if let Some(citations) = by_card.remove(&card.id) {
                card.citations = citations;
            }
        }

        Ok(Some(LessonContent { lesson, cards }))
    }

    async fn quiz_questions(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<QuizQuestion>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, question_order, question_text,
                   option_a, option_b, option_c, option_d, correct_answer, explanation
            FROM lesson_quiz_questions
            WHERE lesson_id = ?1
            ORDER BY question_order
            ",
        )
        .bind(lesson_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_quiz_question_row).collect()
    }

    async fn assessment_questions(&self) -> Result<Vec<AssessmentQuestion>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, question_text, domain, question_order
            FROM assessment_questions
            ORDER BY question_order
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        rows.iter().map(map_assessment_question_row).collect()
    }
}
