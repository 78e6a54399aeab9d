use std::env;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use civics_core::model::{AssessmentOutcome, AssessmentQuestion, AssessmentRequest, UserId};
use storage::repository::{AssessmentRepository, LessonRepository, Storage};

use crate::error::AssessmentError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct AssessmentConfig {
    pub base_url: String,
}

impl AssessmentConfig {
    /// Reads the scoring server URL from `ASSESSMENT_SERVER_URL`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("ASSESSMENT_SERVER_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self { base_url })
    }
}

/// Relays assessment submissions to the external scoring service and
/// answers completion lookups from storage.
///
/// The scoring service owns grading and persistence of assessment rows;
/// this service only forwards the submission and surfaces the outcome.
#[derive(Clone)]
pub struct AssessmentService {
    client: Client,
    config: Option<AssessmentConfig>,
    assessments: Arc<dyn AssessmentRepository>,
    lessons: Arc<dyn LessonRepository>,
}

impl AssessmentService {
    /// # Errors
    ///
    /// Returns `AssessmentError` if the HTTP client cannot be constructed.
    pub fn new(
        storage: &Storage,
        config: Option<AssessmentConfig>,
    ) -> Result<Self, AssessmentError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            config,
            assessments: Arc::clone(&storage.assessments),
            lessons: Arc::clone(&storage.lessons),
        })
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// The assessment question bank, in question order.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError` on query failure.
    pub async fn questions(&self) -> Result<Vec<AssessmentQuestion>, AssessmentError> {
        Ok(self.lessons.assessment_questions().await?)
    }

    /// Whether the user has a completed assessment on record.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError` on query failure.
    pub async fn has_completed(&self, user_id: &UserId) -> Result<bool, AssessmentError> {
        Ok(self.assessments.has_completed_assessment(user_id).await?)
    }

    /// Forwards a submission to the scoring service.
    ///
    /// A non-success response surfaces the body verbatim; the scoring
    /// service writes its error messages for end users.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::Disabled` when no scoring server is
    /// configured, `Scoring` for a non-success response, or `Http` on
    /// transport failure.
    pub async fn submit(
        &self,
        request: &AssessmentRequest,
    ) -> Result<AssessmentOutcome, AssessmentError> {
        let config = self.config.as_ref().ok_or(AssessmentError::Disabled)?;

        let url = format!("{}/assess", config.base_url.trim_end_matches('/'));
        let response = self.client.post(url).json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AssessmentError::Scoring { status, body });
        }

        let outcome: AssessmentOutcome = response.json().await?;
        info!(
            user = %request.user_id,
            classification = %outcome.classification,
            "assessment scored"
        );
        Ok(outcome)
    }
}
