use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use civics_core::model::{
    AnswerChoice, LessonContent, LessonId, LessonProgress, QuestionId, QuizGrade, QuizQuestion,
    UserId,
};
use civics_core::time::Clock;
use storage::repository::{LessonRepository, ProgressRepository, Storage};

use crate::error::ProgressServiceError;

/// Outcome of a graded quiz submission.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizResult {
    pub grade: QuizGrade,
    pub progress: LessonProgress,
}

/// Lesson progress operations: starting lessons and grading quiz
/// submissions against the stored answer key.
#[derive(Clone)]
pub struct ProgressService {
    progress: Arc<dyn ProgressRepository>,
    lessons: Arc<dyn LessonRepository>,
    clock: Clock,
}

impl ProgressService {
    #[must_use]
    pub fn new(storage: &Storage, clock: Clock) -> Self {
        Self {
            progress: Arc::clone(&storage.progress),
            lessons: Arc::clone(&storage.lessons),
            clock,
        }
    }

    /// Marks a lesson as started. Idempotent: restarting an in-progress
    /// lesson refreshes its timestamp and restarting a completed one
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` if the write fails.
    pub async fn start_lesson(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
    ) -> Result<LessonProgress, ProgressServiceError> {
        let progress = self
            .progress
            .start_lesson(user_id, lesson_id, self.clock.now())
            .await?;
        Ok(progress)
    }

    /// Grades a submission against the lesson's answer key and records the
    /// attempt. Unanswered questions count as incorrect; the quiz passes
    /// when at most one question is missed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::EmptyQuiz` when the lesson has no
    /// questions, or a storage error if the write fails.
    pub async fn submit_quiz(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
        answers: &HashMap<QuestionId, AnswerChoice>,
    ) -> Result<QuizResult, ProgressServiceError> {
        let questions = self.lessons.quiz_questions(lesson_id).await?;
        if questions.is_empty() {
            return Err(ProgressServiceError::EmptyQuiz(lesson_id));
        }

        let grade = QuizGrade::grade(&questions, answers);
        let passed = grade.passed();
        let progress = self
            .progress
            .record_quiz_attempt(user_id, lesson_id, grade.num_correct, passed, self.clock.now())
            .await?;

        info!(
            user = %user_id,
            lesson = %lesson_id,
            score = grade.num_correct,
            total = grade.total,
            passed,
            "quiz attempt recorded"
        );
        Ok(QuizResult { grade, progress })
    }

    /// The lesson and its cards, or `None` for an unknown lesson.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` on query failure.
    pub async fn lesson_content(
        &self,
        lesson_id: LessonId,
    ) -> Result<Option<LessonContent>, ProgressServiceError> {
        Ok(self.lessons.lesson_content(lesson_id).await?)
    }

    /// Quiz questions for a lesson, in question order.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` on query failure.
    pub async fn quiz_questions(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<QuizQuestion>, ProgressServiceError> {
        Ok(self.lessons.quiz_questions(lesson_id).await?)
    }

    /// Progress for one (user, lesson) pair; `None` when never started.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError` on query failure.
    pub async fn get_progress(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, ProgressServiceError> {
        Ok(self.progress.get_progress(user_id, lesson_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civics_core::model::ProgressStatus;
    use storage::repository::InMemoryRepository;

    fn seeded_service() -> (ProgressService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let questions: Vec<QuizQuestion> = (1..=5)
            .map(|i| QuizQuestion {
                id: QuestionId::new(i),
                lesson_id: LessonId::new(1),
                question_order: u32::try_from(i).unwrap(),
                question_text: format!("Q{i}"),
                option_a: "a".into(),
                option_b: "b".into(),
                option_c: "c".into(),
                option_d: "d".into(),
                correct_answer: AnswerChoice::A,
                explanation: String::new(),
            })
            .collect();
        repo.insert_quiz_questions(LessonId::new(1), questions)
            .unwrap();

        let storage = Storage {
            progress: Arc::new(repo.clone()),
            assignments: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            assessments: Arc::new(repo.clone()),
            officials: Arc::new(repo.clone()),
            bills: Arc::new(repo.clone()),
        };
        let service = ProgressService::new(&storage, Clock::fixed(civics_core::time::fixed_now()));
        (service, repo)
    }

    fn answers(correct: usize) -> HashMap<QuestionId, AnswerChoice> {
        (1..=5)
            .map(|i| {
                let choice = if i <= correct {
                    AnswerChoice::A
                } else {
                    AnswerChoice::B
                };
                (QuestionId::new(i64::try_from(i).unwrap()), choice)
            })
            .collect()
    }

    #[tokio::test]
    async fn one_miss_still_passes() {
        let (service, _) = seeded_service();
        let user = UserId::new("u-1");
        let result = service
            .submit_quiz(&user, LessonId::new(1), &answers(4))
            .await
            .unwrap();
        assert_eq!(result.grade.num_correct, 4);
        assert!(result.grade.passed());
        assert_eq!(result.progress.status, ProgressStatus::Completed);
    }

    #[tokio::test]
    async fn two_misses_fail_and_count_the_attempt() {
        let (service, _) = seeded_service();
        let user = UserId::new("u-1");
        let result = service
            .submit_quiz(&user, LessonId::new(1), &answers(3))
            .await
            .unwrap();
        assert!(!result.grade.passed());
        assert_eq!(result.progress.status, ProgressStatus::InProgress);
        assert_eq!(result.progress.quiz_attempts, 1);

        let again = service
            .submit_quiz(&user, LessonId::new(1), &answers(5))
            .await
            .unwrap();
        assert_eq!(again.progress.quiz_attempts, 2);
        assert_eq!(again.progress.status, ProgressStatus::Completed);
    }

    #[tokio::test]
    async fn submitting_against_a_lesson_without_questions_is_an_error() {
        let (service, _) = seeded_service();
        let user = UserId::new("u-1");
        let err = service
            .submit_quiz(&user, LessonId::new(9), &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::EmptyQuiz(id) if id == LessonId::new(9)));
    }
}
