use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use civics_core::model::{
    AssessmentQuestion, Bill, BillId, BillType, BillWithSponsorship, BioguideId, LessonContent,
    LessonId, LessonProgress, Official, OfficialFilter, OfficialPage, ProgressEvent, QuizQuestion,
    UserId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A lesson assignment joined with the lesson metadata the roadmap needs.
///
/// `tier` stays raw text here; the roadmap assembler owns the decision of
/// what to do with values it does not recognize.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedLesson {
    pub lesson_id: LessonId,
    pub assignment_reason: String,
    pub assigned_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub lesson_order: u32,
    pub tier: String,
    pub target_domains: Vec<String>,
    /// Number of text cards in the lesson.
    pub text_cards: u32,
}

/// Persisted shape for a bill upsert; storage assigns the id and the
/// created/updated timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBill {
    pub congress: u32,
    pub bill_type: BillType,
    pub bill_number: u32,
    pub title: String,
    pub summary: Option<String>,
    pub latest_action_date: Option<NaiveDate>,
    pub latest_action_text: Option<String>,
    pub introduced_date: Option<NaiveDate>,
    pub congress_api_url: Option<String>,
    pub congress_gov_url: Option<String>,
}

/// Sponsorship link between a stored bill and an official.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSponsorship {
    pub bill_id: BillId,
    pub bioguide_id: BioguideId,
    pub is_primary_sponsor: bool,
    pub sponsored_date: Option<NaiveDate>,
}

/// Progress rows for the lesson state machine.
///
/// Both writes are atomic conditional upserts keyed on the
/// (user_id, lesson_id) uniqueness constraint; there is no separate
/// read-then-write step for a concurrent submission to race against.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Marks a lesson as started. Creates the row on first start; a row
    /// already `completed` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn start_lesson(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
        now: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError>;

    /// Records one quiz attempt: increments the attempt counter exactly
    /// once, stores the score, and moves the status per pass/fail.
    /// Creates the row with `quiz_attempts = 1` when none exists yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn record_quiz_attempt(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
        score: u32,
        passed: bool,
        now: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError>;

    /// Fetches the progress row for one (user, lesson) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure; a missing row is `Ok(None)`.
    async fn get_progress(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// All progress rows for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn progress_for_user(&self, user_id: &UserId)
    -> Result<Vec<LessonProgress>, StorageError>;
}

/// Lesson assignments, created by an external assignment process and
/// read-only here.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Assignments for a user with nested lesson metadata, ordered by
    /// lesson order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn assignments_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AssignedLesson>, StorageError>;
}

/// Static lesson, quiz, and assessment content.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// The lesson and its cards (with citations) ordered by card order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure; an unknown lesson is
    /// `Ok(None)`.
    async fn lesson_content(
        &self,
        lesson_id: LessonId,
    ) -> Result<Option<LessonContent>, StorageError>;

    /// Quiz questions for a lesson, ordered by question order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn quiz_questions(&self, lesson_id: LessonId)
    -> Result<Vec<QuizQuestion>, StorageError>;

    /// All assessment questions, ordered by question order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn assessment_questions(&self) -> Result<Vec<AssessmentQuestion>, StorageError>;
}

/// Completed-assessment lookups. Assessment rows themselves are written by
/// the external scoring service.
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Whether the user has any completed assessment on record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn has_completed_assessment(&self, user_id: &UserId) -> Result<bool, StorageError>;
}

/// The officials directory.
#[async_trait]
pub trait OfficialRepository: Send + Sync {
    /// Upserts a batch of officials keyed on bioguide id; later writes win.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any write fails.
    async fn upsert_officials(&self, officials: &[Official]) -> Result<(), StorageError>;

    /// Fetches one official by bioguide id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure; a missing official is
    /// `Ok(None)`.
    async fn get_official(
        &self,
        bioguide_id: &BioguideId,
    ) -> Result<Option<Official>, StorageError>;

    /// Filtered, paginated directory search. `page` is 1-indexed; the page
    /// count is computed from the total matching row count.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn search_officials(
        &self,
        filter: &OfficialFilter,
        page: u32,
        page_size: u32,
    ) -> Result<OfficialPage, StorageError>;
}

/// Locally cached bills and their sponsorship links.
#[async_trait]
pub trait BillRepository: Send + Sync {
    /// Bills sponsored by an official, ordered by introduced date
    /// descending, with sponsorship fields merged in.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failure.
    async fn sponsored_bills(
        &self,
        bioguide_id: &BioguideId,
        primary_only: bool,
    ) -> Result<Vec<BillWithSponsorship>, StorageError>;

    /// Upserts a bill keyed on (congress, bill_type, bill_number). An
    /// existing row keeps its id and created_at; mutable fields and
    /// updated_at take the new values.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_bill(&self, bill: &NewBill, now: DateTime<Utc>) -> Result<Bill, StorageError>;

    /// Upserts a sponsorship keyed on (bill_id, bioguide_id) with
    /// duplicate-ignore semantics: the first write wins and later calls
    /// never update sponsored_date.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_sponsorship(&self, sponsorship: &NewSponsorship) -> Result<(), StorageError>;
}

/// Simple in-memory backend for testing and prototyping. Implements every
/// repository trait over shared maps, reusing the core state machine and
/// filter predicate so the semantics match the SQL backend.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<(UserId, LessonId), LessonProgress>>>,
    assignments: Arc<Mutex<HashMap<UserId, Vec<AssignedLesson>>>>,
    lessons: Arc<Mutex<HashMap<LessonId, LessonContent>>>,
    quizzes: Arc<Mutex<HashMap<LessonId, Vec<QuizQuestion>>>>,
    assessment_questions: Arc<Mutex<Vec<AssessmentQuestion>>>,
    completed_assessments: Arc<Mutex<HashSet<UserId>>>,
    officials: Arc<Mutex<HashMap<BioguideId, Official>>>,
    bills: Arc<Mutex<Vec<Bill>>>,
    sponsorships: Arc<Mutex<Vec<NewSponsorship>>>,
    next_bill_id: Arc<Mutex<i64>>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> Result<std::sync::MutexGuard<'a, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an assignment; assignments are created by an external process
    /// in production, so this only exists for tests and prototyping.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_assignment(
        &self,
        user_id: &UserId,
        assignment: AssignedLesson,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.assignments)?;
        guard.entry(user_id.clone()).or_default().push(assignment);
        Ok(())
    }

    /// Seeds lesson content.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_lesson_content(&self, content: LessonContent) -> Result<(), StorageError> {
        let mut guard = lock(&self.lessons)?;
        guard.insert(content.lesson.id, content);
        Ok(())
    }

    /// Seeds quiz questions for a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_quiz_questions(
        &self,
        lesson_id: LessonId,
        questions: Vec<QuizQuestion>,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.quizzes)?;
        guard.insert(lesson_id, questions);
        Ok(())
    }

    /// Seeds the assessment question bank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn set_assessment_questions(
        &self,
        questions: Vec<AssessmentQuestion>,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.assessment_questions)?;
        *guard = questions;
        Ok(())
    }

    /// Marks a user as having completed the assessment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn mark_assessment_completed(&self, user_id: &UserId) -> Result<(), StorageError> {
        let mut guard = lock(&self.completed_assessments)?;
        guard.insert(user_id.clone());
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn start_lesson(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
        now: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError> {
        let mut guard = lock(&self.progress)?;
        let entry = guard
            .entry((user_id.clone(), lesson_id))
            .or_insert_with(|| LessonProgress::fresh(user_id.clone(), lesson_id, now));
        entry.apply(ProgressEvent::Started, now);
        Ok(entry.clone())
    }

    async fn record_quiz_attempt(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
        score: u32,
        passed: bool,
        now: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError> {
        let mut guard = lock(&self.progress)?;
        let entry = guard
            .entry((user_id.clone(), lesson_id))
            .or_insert_with(|| LessonProgress::fresh(user_id.clone(), lesson_id, now));
        entry.apply(ProgressEvent::QuizAttempt { score, passed }, now);
        Ok(entry.clone())
    }

    async fn get_progress(
        &self,
        user_id: &UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = lock(&self.progress)?;
        Ok(guard.get(&(user_id.clone(), lesson_id)).cloned())
    }

    async fn progress_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = lock(&self.progress)?;
        Ok(guard
            .values()
            .filter(|p| p.user_id == *user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryRepository {
    async fn assignments_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<AssignedLesson>, StorageError> {
        let guard = lock(&self.assignments)?;
        let mut assigned = guard.get(user_id).cloned().unwrap_or_default();
        assigned.sort_by_key(|a| a.lesson_order);
        Ok(assigned)
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn lesson_content(
        &self,
        lesson_id: LessonId,
    ) -> Result<Option<LessonContent>, StorageError> {
        let guard = lock(&self.lessons)?;
        Ok(guard.get(&lesson_id).cloned())
    }

    async fn quiz_questions(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<QuizQuestion>, StorageError> {
        let guard = lock(&self.quizzes)?;
        let mut questions = guard.get(&lesson_id).cloned().unwrap_or_default();
        questions.sort_by_key(|q| q.question_order);
        Ok(questions)
    }

    async fn assessment_questions(&self) -> Result<Vec<AssessmentQuestion>, StorageError> {
        let guard = lock(&self.assessment_questions)?;
        let mut questions = guard.clone();
        questions.sort_by_key(|q| q.question_order);
        Ok(questions)
    }
}

#[async_trait]
impl AssessmentRepository for InMemoryRepository {
    async fn has_completed_assessment(&self, user_id: &UserId) -> Result<bool, StorageError> {
        let guard = lock(&self.completed_assessments)?;
        Ok(guard.contains(user_id))
    }
}

#[async_trait]
impl OfficialRepository for InMemoryRepository {
    async fn upsert_officials(&self, officials: &[Official]) -> Result<(), StorageError> {
        let mut guard = lock(&self.officials)?;
        for official in officials {
            guard.insert(official.bioguide_id.clone(), official.clone());
        }
        Ok(())
    }

    async fn get_official(
        &self,
        bioguide_id: &BioguideId,
    ) -> Result<Option<Official>, StorageError> {
        let guard = lock(&self.officials)?;
        Ok(guard.get(bioguide_id).cloned())
    }

    async fn search_officials(
        &self,
        filter: &OfficialFilter,
        page: u32,
        page_size: u32,
    ) -> Result<OfficialPage, StorageError> {
        let guard = lock(&self.officials)?;
        let mut matching: Vec<Official> =
            guard.values().filter(|o| filter.matches(o)).cloned().collect();
        matching.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });

        let total = u32::try_from(matching.len())
            .map_err(|_| StorageError::Serialization("result count overflow".into()))?;
        let offset = (page.saturating_sub(1) as usize) * page_size as usize;
        let officials = matching
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();
        Ok(OfficialPage::new(officials, total, page, page_size))
    }
}

#[async_trait]
impl BillRepository for InMemoryRepository {
    async fn sponsored_bills(
        &self,
        bioguide_id: &BioguideId,
        primary_only: bool,
    ) -> Result<Vec<BillWithSponsorship>, StorageError> {
        let bills = lock(&self.bills)?;
        let sponsorships = lock(&self.sponsorships)?;

        let mut joined: Vec<BillWithSponsorship> = sponsorships
            .iter()
            .filter(|s| s.bioguide_id == *bioguide_id)
            .filter(|s| !primary_only || s.is_primary_sponsor)
            .filter_map(|s| {
                bills.iter().find(|b| b.id == s.bill_id).map(|bill| {
                    BillWithSponsorship {
                        bill: bill.clone(),
                        sponsored_date: s.sponsored_date,
                        is_primary_sponsor: s.is_primary_sponsor,
                    }
                })
            })
            .collect();
        joined.sort_by(|a, b| b.bill.introduced_date.cmp(&a.bill.introduced_date));
        Ok(joined)
    }

    async fn upsert_bill(&self, bill: &NewBill, now: DateTime<Utc>) -> Result<Bill, StorageError> {
        let mut bills = lock(&self.bills)?;
        if let Some(existing) = bills.iter_mut().find(|b| {
            b.congress == bill.congress
                && b.bill_type == bill.bill_type
                && b.bill_number == bill.bill_number
        }) {
            existing.title = bill.title.clone();
            existing.summary = bill.summary.clone();
            existing.latest_action_date = bill.latest_action_date;
            existing.latest_action_text = bill.latest_action_text.clone();
            existing.introduced_date = bill.introduced_date;
            existing.congress_api_url = bill.congress_api_url.clone();
            existing.congress_gov_url = bill.congress_gov_url.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let mut next_id = lock(&self.next_bill_id)?;
        *next_id += 1;
        let stored = Bill {
            id: BillId::new(*next_id),
            congress: bill.congress,
            bill_type: bill.bill_type,
            bill_number: bill.bill_number,
            title: bill.title.clone(),
            summary: bill.summary.clone(),
            latest_action_date: bill.latest_action_date,
            latest_action_text: bill.latest_action_text.clone(),
            introduced_date: bill.introduced_date,
            congress_api_url: bill.congress_api_url.clone(),
            congress_gov_url: bill.congress_gov_url.clone(),
            created_at: now,
            updated_at: now,
        };
        bills.push(stored.clone());
        Ok(stored)
    }

    async fn upsert_sponsorship(&self, sponsorship: &NewSponsorship) -> Result<(), StorageError> {
        let mut sponsorships = lock(&self.sponsorships)?;
        let exists = sponsorships
            .iter()
            .any(|s| s.bill_id == sponsorship.bill_id && s.bioguide_id == sponsorship.bioguide_id);
        if !exists {
            sponsorships.push(sponsorship.clone());
        }
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub assessments: Arc<dyn AssessmentRepository>,
    pub officials: Arc<dyn OfficialRepository>,
    pub bills: Arc<dyn BillRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            progress: Arc::new(repo.clone()),
            assignments: Arc::new(repo.clone()),
            lessons: Arc::new(repo.clone()),
            assessments: Arc::new(repo.clone()),
            officials: Arc::new(repo.clone()),
            bills: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use civics_core::model::ProgressStatus;
    use civics_core::time::fixed_now;

    fn user() -> UserId {
        UserId::new("u-1")
    }

    #[tokio::test]
    async fn start_lesson_creates_an_in_progress_row_once() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();

        let first = repo.start_lesson(&user(), LessonId::new(1), now).await.unwrap();
        assert_eq!(first.status, ProgressStatus::InProgress);
        assert_eq!(first.quiz_attempts, 0);

        let again = repo
            .start_lesson(&user(), LessonId::new(1), now + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(again.quiz_attempts, 0);
        assert_eq!(again.updated_at, now + Duration::minutes(1));
    }

    #[tokio::test]
    async fn quiz_attempt_without_prior_row_creates_one_with_a_single_attempt() {
        let repo = InMemoryRepository::new();
        let progress = repo
            .record_quiz_attempt(&user(), LessonId::new(2), 3, false, fixed_now())
            .await
            .unwrap();
        assert_eq!(progress.quiz_attempts, 1);
        assert_eq!(progress.quiz_score, Some(3));
        assert_eq!(progress.status, ProgressStatus::InProgress);
    }

    #[tokio::test]
    async fn start_after_completion_is_a_no_op() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        repo.record_quiz_attempt(&user(), LessonId::new(3), 5, true, now)
            .await
            .unwrap();

        let after = repo
            .start_lesson(&user(), LessonId::new(3), now + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(after.status, ProgressStatus::Completed);
        assert_eq!(after.completed_at, Some(now));
        assert_eq!(after.updated_at, now);
    }

    #[tokio::test]
    async fn duplicate_sponsorship_upsert_keeps_the_first_row() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let bill = repo
            .upsert_bill(
                &NewBill {
                    congress: 118,
                    bill_type: BillType::Hr,
                    bill_number: 1,
                    title: "A bill".into(),
                    summary: None,
                    latest_action_date: None,
                    latest_action_text: None,
                    introduced_date: None,
                    congress_api_url: None,
                    congress_gov_url: None,
                },
                now,
            )
            .await
            .unwrap();

        let first = NewSponsorship {
            bill_id: bill.id,
            bioguide_id: BioguideId::new("A000001"),
            is_primary_sponsor: true,
            sponsored_date: Some(now.date_naive()),
        };
        repo.upsert_sponsorship(&first).await.unwrap();
        repo.upsert_sponsorship(&NewSponsorship {
            sponsored_date: None,
            ..first.clone()
        })
        .await
        .unwrap();

        let bills = repo
            .sponsored_bills(&BioguideId::new("A000001"), true)
            .await
            .unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].sponsored_date, Some(now.date_naive()));
    }

    #[tokio::test]
    async fn bill_upsert_preserves_id_and_created_at() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let new_bill = NewBill {
            congress: 118,
            bill_type: BillType::S,
            bill_number: 10,
            title: "First title".into(),
            summary: None,
            latest_action_date: None,
            latest_action_text: None,
            introduced_date: None,
            congress_api_url: None,
            congress_gov_url: None,
        };
        let first = repo.upsert_bill(&new_bill, now).await.unwrap();
        let second = repo
            .upsert_bill(
                &NewBill {
                    title: "Second title".into(),
                    ..new_bill
                },
                now + Duration::days(2),
            )
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, now);
        assert_eq!(second.updated_at, now + Duration::days(2));
        assert_eq!(second.title, "Second title");
    }
}
