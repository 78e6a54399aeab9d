//! Shared error types for the services crate.

use thiserror::Error;

use civics_core::model::{BioguideId, LessonId};
use storage::repository::StorageError;

/// Errors emitted by the Congress.gov client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CongressApiError {
    #[error("congress.gov request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("lesson {0} has no quiz questions")]
    EmptyQuiz(LessonId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `RoadmapService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RoadmapError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `BillCacheService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BillCacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] CongressApiError),
}

/// Errors emitted by `AssessmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("assessment scoring is not configured")]
    Disabled,
    #[error("assessment scoring failed with status {status}: {body}")]
    Scoring {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DirectoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DirectoryError {
    #[error("no official with bioguide id {0}")]
    UnknownOfficial(BioguideId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
