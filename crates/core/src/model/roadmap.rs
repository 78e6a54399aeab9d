use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::LessonId;
use crate::model::lesson::Tier;
use crate::model::progress::ProgressStatus;

/// One lesson on a user's roadmap: assignment, lesson metadata, and
/// progress merged into a single record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapEntry {
    pub lesson_id: LessonId,
    pub title: String,
    pub description: String,
    pub lesson_order: u32,
    pub tier: Tier,
    pub target_domains: Vec<String>,
    pub assignment_reason: String,
    pub assigned_at: DateTime<Utc>,
    pub status: ProgressStatus,
    pub quiz_score: Option<u32>,
    pub quiz_attempts: u32,
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of text cards in the lesson; the unit of lesson navigation.
    pub sublessons: u32,
}

/// A user's lessons bucketed by tier, each bucket ordered by lesson order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    pub core: Vec<RoadmapEntry>,
    pub targeted: Vec<RoadmapEntry>,
    pub optional: Vec<RoadmapEntry>,
}

impl Roadmap {
    /// Places an entry into the bucket named by its tier. Entries must be
    /// pushed in lesson order; buckets preserve insertion order.
    pub fn push(&mut self, entry: RoadmapEntry) {
        match entry.tier {
            Tier::Core => self.core.push(entry),
            Tier::Targeted => self.targeted.push(entry),
            Tier::Optional => self.optional.push(entry),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.targeted.is_empty() && self.optional.is_empty()
    }
}

/// Roadmap plus the assessment-completion flag, fetched together for the
/// roadmap page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapOverview {
    pub roadmap: Roadmap,
    pub completed_assessment: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn entry(lesson_id: i64, tier: Tier) -> RoadmapEntry {
        RoadmapEntry {
            lesson_id: LessonId::new(lesson_id),
            title: format!("Lesson {lesson_id}"),
            description: String::new(),
            lesson_order: u32::try_from(lesson_id).unwrap(),
            tier,
            target_domains: vec![],
            assignment_reason: "core".into(),
            assigned_at: fixed_now(),
            status: ProgressStatus::NotStarted,
            quiz_score: None,
            quiz_attempts: 0,
            completed_at: None,
            sublessons: 0,
        }
    }

    #[test]
    fn entries_land_in_their_tier_bucket_in_order() {
        let mut roadmap = Roadmap::default();
        roadmap.push(entry(1, Tier::Core));
        roadmap.push(entry(2, Tier::Optional));
        roadmap.push(entry(3, Tier::Core));
        roadmap.push(entry(4, Tier::Targeted));

        assert_eq!(roadmap.core.len(), 2);
        assert_eq!(roadmap.core[0].lesson_id, LessonId::new(1));
        assert_eq!(roadmap.core[1].lesson_id, LessonId::new(3));
        assert_eq!(roadmap.targeted.len(), 1);
        assert_eq!(roadmap.optional.len(), 1);
        assert!(!roadmap.is_empty());
    }
}
