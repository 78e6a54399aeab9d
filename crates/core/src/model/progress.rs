use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{LessonId, UserId};

/// Lifecycle of a user's progress through one lesson.
///
/// `Completed` is only reached by passing the quiz; a failed attempt moves
/// (or keeps) the lesson at `InProgress`, never back to `NotStarted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// The two events that can mutate lesson progress.
///
/// This is the single canonical entry point for the state machine; every
/// caller (and every storage backend) expresses its writes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The user opened the lesson.
    Started,
    /// The user submitted the lesson quiz.
    QuizAttempt { score: u32, passed: bool },
}

/// Progress bookkeeping for one (user, lesson) pair.
///
/// At most one record exists per pair; storage enforces this with a
/// uniqueness constraint and conditional upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonProgress {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub status: ProgressStatus,
    pub quiz_attempts: u32,
    pub quiz_score: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl LessonProgress {
    /// A record as created the first time a user opens a lesson.
    #[must_use]
    pub fn fresh(user_id: UserId, lesson_id: LessonId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            lesson_id,
            status: ProgressStatus::InProgress,
            quiz_attempts: 0,
            quiz_score: None,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Applies one progress event.
    ///
    /// - `Started` on a completed lesson is a no-op; re-starting never
    ///   resets earlier work.
    /// - `QuizAttempt` increments the attempt counter exactly once, records
    ///   the score, and moves the status: pass stamps `completed_at`, fail
    ///   leaves any earlier `completed_at` untouched.
    pub fn apply(&mut self, event: ProgressEvent, now: DateTime<Utc>) {
        match event {
            ProgressEvent::Started => {
                if self.status == ProgressStatus::Completed {
                    return;
                }
                self.status = ProgressStatus::InProgress;
                self.updated_at = now;
            }
            ProgressEvent::QuizAttempt { score, passed } => {
                self.quiz_attempts += 1;
                self.quiz_score = Some(score);
                if passed {
                    self.status = ProgressStatus::Completed;
                    self.completed_at = Some(now);
                } else {
                    self.status = ProgressStatus::InProgress;
                }
                self.updated_at = now;
            }
        }
    }
}
