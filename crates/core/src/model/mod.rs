mod assessment;
mod bill;
mod ids;
mod lesson;
mod official;
mod progress;
mod quiz;
mod roadmap;

pub use ids::{BillId, BioguideId, CardId, LessonId, ParseIdError, QuestionId, UserId};

pub use assessment::{
    AssessmentOutcome, AssessmentQuestion, AssessmentRequest, DomainEvaluation, QuestionResponse,
};
pub use bill::{Bill, BillType, BillWithSponsorship, ParseBillTypeError};
pub use lesson::{CardType, Citation, Lesson, LessonCard, LessonContent, Tier};
pub use official::{Official, OfficialFilter, OfficialPage, YearFilter};
pub use progress::{LessonProgress, ProgressEvent, ProgressStatus};
pub use quiz::{AnswerChoice, QuizGrade, QuizQuestion};
pub use roadmap::{Roadmap, RoadmapEntry, RoadmapOverview};
