#![forbid(unsafe_code)]

pub mod assessment_service;
pub mod bill_cache_service;
pub mod congress;
pub mod directory_service;
pub mod error;
pub mod progress_service;
pub mod roadmap_service;

pub use civics_core::Clock;

pub use assessment_service::{AssessmentConfig, AssessmentService};
pub use bill_cache_service::BillCacheService;
pub use congress::{CongressApi, CongressClient, CongressConfig};
pub use directory_service::{DirectoryQuery, DirectoryService, MemberProfile, PAGE_SIZE};
pub use error::{
    AssessmentError, BillCacheError, CongressApiError, DirectoryError, ProgressServiceError,
    RoadmapError,
};
pub use progress_service::{ProgressService, QuizResult};
pub use roadmap_service::RoadmapService;
