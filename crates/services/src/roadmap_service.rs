use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use civics_core::model::{
    LessonId, LessonProgress, ProgressStatus, Roadmap, RoadmapEntry, RoadmapOverview, Tier, UserId,
};
use storage::repository::{
    AssessmentRepository, AssignmentRepository, ProgressRepository, Storage,
};

use crate::error::RoadmapError;

/// Assembles a user's roadmap from their assignments, progress, and
/// assessment status.
#[derive(Clone)]
pub struct RoadmapService {
    assignments: Arc<dyn AssignmentRepository>,
    progress: Arc<dyn ProgressRepository>,
    assessments: Arc<dyn AssessmentRepository>,
}

impl RoadmapService {
    #[must_use]
    pub fn new(storage: &Storage) -> Self {
        Self {
            assignments: Arc::clone(&storage.assignments),
            progress: Arc::clone(&storage.progress),
            assessments: Arc::clone(&storage.assessments),
        }
    }

    /// The user's roadmap bucketed by tier, plus whether they have a
    /// completed assessment on record.
    ///
    /// Assignments without a progress row are skipped: the assignment
    /// process writes both together, so a missing row means a half-created
    /// assignment that should not surface. Unknown tiers are skipped the
    /// same way rather than failing the whole roadmap.
    ///
    /// # Errors
    ///
    /// Returns `RoadmapError` if any of the three lookups fail.
    pub async fn overview(&self, user_id: &UserId) -> Result<RoadmapOverview, RoadmapError> {
        let (assignments, progress_rows, completed_assessment) = tokio::try_join!(
            self.assignments.assignments_for_user(user_id),
            self.progress.progress_for_user(user_id),
            self.assessments.has_completed_assessment(user_id),
        )?;

        let progress_by_lesson: HashMap<LessonId, LessonProgress> = progress_rows
            .into_iter()
            .map(|p| (p.lesson_id, p))
            .collect();

        let mut roadmap = Roadmap::default();
        for assigned in assignments {
            let Some(progress) = progress_by_lesson.get(&assigned.lesson_id) else {
                warn!(
                    user = %user_id,
                    lesson = %assigned.lesson_id,
                    "assignment has no progress row, skipping"
                );
                continue;
            };
            let Some(tier) = Tier::parse(&assigned.tier) else {
                warn!(
                    lesson = %assigned.lesson_id,
                    tier = %assigned.tier,
                    "unknown lesson tier, skipping"
                );
                continue;
            };

            roadmap.push(RoadmapEntry {
                lesson_id: assigned.lesson_id,
                title: assigned.title,
                description: assigned.description,
                lesson_order: assigned.lesson_order,
                tier,
                target_domains: assigned.target_domains,
                assignment_reason: assigned.assignment_reason,
                assigned_at: assigned.assigned_at,
                status: progress.status,
                quiz_score: progress.quiz_score,
                quiz_attempts: progress.quiz_attempts,
                completed_at: progress.completed_at,
                sublessons: assigned.text_cards,
            });
        }

        Ok(RoadmapOverview {
            roadmap,
            completed_assessment,
        })
    }

    /// Whether the user has finished every required lesson, meaning every
    /// assignment whose reason is `core` or `gap_targeted`. A user with no
    /// required assignments has not completed anything, so this is false
    /// rather than vacuously true.
    ///
    /// # Errors
    ///
    /// Returns `RoadmapError` if the assignment or progress lookup fails.
    pub async fn has_completed_roadmap(&self, user_id: &UserId) -> Result<bool, RoadmapError> {
        let (assignments, progress_rows) = tokio::try_join!(
            self.assignments.assignments_for_user(user_id),
            self.progress.progress_for_user(user_id),
        )?;

        let completed: HashMap<LessonId, ProgressStatus> = progress_rows
            .into_iter()
            .map(|p| (p.lesson_id, p.status))
            .collect();

        let mut required = assignments
            .iter()
            .filter(|a| matches!(a.assignment_reason.as_str(), "core" | "gap_targeted"))
            .peekable();
        if required.peek().is_none() {
            return Ok(false);
        }
        Ok(required.all(|a| completed.get(&a.lesson_id) == Some(&ProgressStatus::Completed)))
    }
}
