use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::{LessonId, QuestionId};

/// One of the four answer options on a quiz question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerChoice {
    A,
    B,
    C,
    D,
}

impl AnswerChoice {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

/// A multiple-choice quiz question belonging to a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub lesson_id: LessonId,
    pub question_order: u32,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerChoice,
    pub explanation: String,
}

/// Result of grading one quiz submission.
///
/// The passing rule is fixed: at most one miss is allowed. An unanswered
/// question counts as incorrect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizGrade {
    pub num_correct: u32,
    pub total: u32,
}

impl QuizGrade {
    /// Grades submitted answers against the lesson's questions.
    #[must_use]
    pub fn grade(
        questions: &[QuizQuestion],
        answers: &HashMap<QuestionId, AnswerChoice>,
    ) -> Self {
        let num_correct = questions
            .iter()
            .filter(|q| answers.get(&q.id) == Some(&q.correct_answer))
            .count();

        #[allow(clippy::cast_possible_truncation)]
        Self {
            num_correct: num_correct as u32,
            total: questions.len() as u32,
        }
    }

    /// True when the submission missed at most one question.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.num_correct >= self.total.saturating_sub(1)
    }
}
