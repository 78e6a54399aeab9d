use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;

use civics_core::model::{
    AnswerChoice, AssessmentQuestion, Bill, BillId, BillType, BillWithSponsorship, BioguideId,
    CardId, CardType, Citation, Lesson, LessonCard, LessonId, LessonProgress, Official,
    ProgressStatus, QuestionId, QuizQuestion, UserId,
};

use crate::repository::{AssignedLesson, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range")))
}

pub(crate) fn parse_status(s: &str) -> Result<ProgressStatus, StorageError> {
    ProgressStatus::parse(s)
        .ok_or_else(|| StorageError::Serialization(format!("invalid progress status: {s}")))
}

pub(crate) fn parse_card_type(s: &str) -> Result<CardType, StorageError> {
    CardType::parse(s)
        .ok_or_else(|| StorageError::Serialization(format!("invalid card type: {s}")))
}

fn parse_answer_choice(s: &str) -> Result<AnswerChoice, StorageError> {
    AnswerChoice::parse(s)
        .ok_or_else(|| StorageError::Serialization(format!("invalid answer choice: {s}")))
}

pub(crate) fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<LessonProgress, StorageError> {
    let quiz_score = row
        .try_get::<Option<i64>, _>("quiz_score")
        .map_err(ser)?
        .map(|v| i64_to_u32("quiz_score", v))
        .transpose()?;

    Ok(LessonProgress {
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        lesson_id: LessonId::new(row.try_get("lesson_id").map_err(ser)?),
        status: parse_status(&row.try_get::<String, _>("status").map_err(ser)?)?,
        quiz_attempts: i64_to_u32("quiz_attempts", row.try_get("quiz_attempts").map_err(ser)?)?,
        quiz_score,
        completed_at: row
            .try_get::<Option<DateTime<Utc>>, _>("completed_at")
            .map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_lesson_row(row: &sqlx::sqlite::SqliteRow) -> Result<Lesson, StorageError> {
    Ok(Lesson {
        id: LessonId::new(row.try_get("id").map_err(ser)?),
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        lesson_order: i64_to_u32("lesson_order", row.try_get("lesson_order").map_err(ser)?)?,
    })
}

pub(crate) fn map_card_row(row: &sqlx::sqlite::SqliteRow) -> Result<LessonCard, StorageError> {
    Ok(LessonCard {
        id: CardId::new(row.try_get("id").map_err(ser)?),
        lesson_id: LessonId::new(row.try_get("lesson_id").map_err(ser)?),
        card_order: i64_to_u32("card_order", row.try_get("card_order").map_err(ser)?)?,
        card_type: parse_card_type(&row.try_get::<String, _>("card_type").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        content: row.try_get("content").map_err(ser)?,
        citations: Vec::new(),
    })
}

pub(crate) fn map_citation_row(row: &sqlx::sqlite::SqliteRow) -> Result<Citation, StorageError> {
    Ok(Citation {
        id: row.try_get("id").map_err(ser)?,
        card_id: CardId::new(row.try_get("card_id").map_err(ser)?),
        citation_text: row.try_get("citation_text").map_err(ser)?,
        source_name: row.try_get("source_name").map_err(ser)?,
        source_url: row.try_get("source_url").map_err(ser)?,
    })
}

pub(crate) fn map_quiz_question_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<QuizQuestion, StorageError> {
    Ok(QuizQuestion {
        id: QuestionId::new(row.try_get("id").map_err(ser)?),
        lesson_id: LessonId::new(row.try_get("lesson_id").map_err(ser)?),
        question_order: i64_to_u32(
            "question_order",
            row.try_get("question_order").map_err(ser)?,
        )?,
        question_text: row.try_get("question_text").map_err(ser)?,
        option_a: row.try_get("option_a").map_err(ser)?,
        option_b: row.try_get("option_b").map_err(ser)?,
        option_c: row.try_get("option_c").map_err(ser)?,
        option_d: row.try_get("option_d").map_err(ser)?,
        correct_answer: parse_answer_choice(
            &row.try_get::<String, _>("correct_answer").map_err(ser)?,
        )?,
        explanation: row.try_get("explanation").map_err(ser)?,
    })
}

pub(crate) fn map_assessment_question_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AssessmentQuestion, StorageError> {
    Ok(AssessmentQuestion {
        id: QuestionId::new(row.try_get("id").map_err(ser)?),
        question_text: row.try_get("question_text").map_err(ser)?,
        domain: row.try_get("domain").map_err(ser)?,
        question_order: i64_to_u32(
            "question_order",
            row.try_get("question_order").map_err(ser)?,
        )?,
    })
}

/// Maps an assignment row joined with its lesson. `target_domains` is stored
/// as a JSON array; `text_cards` is a COUNT over the lesson's text cards.
pub(crate) fn map_assigned_lesson_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AssignedLesson, StorageError> {
    let target_domains: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("target_domains").map_err(ser)?)
            .map_err(ser)?;

    Ok(AssignedLesson {
        lesson_id: LessonId::new(row.try_get("lesson_id").map_err(ser)?),
        assignment_reason: row.try_get("assignment_reason").map_err(ser)?,
        assigned_at: row.try_get("assigned_at").map_err(ser)?,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        lesson_order: i64_to_u32("lesson_order", row.try_get("lesson_order").map_err(ser)?)?,
        tier: row.try_get("tier").map_err(ser)?,
        target_domains,
        text_cards: i64_to_u32("text_cards", row.try_get("text_cards").map_err(ser)?)?,
    })
}

pub(crate) fn map_official_row(row: &sqlx::sqlite::SqliteRow) -> Result<Official, StorageError> {
    let district = row
        .try_get::<Option<i64>, _>("district")
        .map_err(ser)?
        .map(|v| i64_to_u32("district", v))
        .transpose()?;

    Ok(Official {
        bioguide_id: BioguideId::new(row.try_get::<String, _>("bioguide_id").map_err(ser)?),
        first_name: row.try_get("first_name").map_err(ser)?,
        last_name: row.try_get("last_name").map_err(ser)?,
        middle_name: row.try_get("middle_name").map_err(ser)?,
        full_name: row.try_get("full_name").map_err(ser)?,
        honorific: row.try_get("honorific").map_err(ser)?,
        chamber: row.try_get("chamber").map_err(ser)?,
        state: row.try_get("state").map_err(ser)?,
        state_code: row.try_get("state_code").map_err(ser)?,
        district,
        party: row.try_get("party").map_err(ser)?,
        office_address: row.try_get("office_address").map_err(ser)?,
        phone_number: row.try_get("phone_number").map_err(ser)?,
        official_website: row.try_get("official_website").map_err(ser)?,
        image_url: row.try_get("image_url").map_err(ser)?,
        image_attribution: row.try_get("image_attribution").map_err(ser)?,
        birth_year: row.try_get("birth_year").map_err(ser)?,
        current_member: row.try_get("current_member").map_err(ser)?,
        first_term_start: row.try_get("first_term_start").map_err(ser)?,
        current_term_start: row.try_get("current_term_start").map_err(ser)?,
        congress_api_updated_at: row.try_get("congress_api_updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_bill_row(row: &sqlx::sqlite::SqliteRow) -> Result<Bill, StorageError> {
    let bill_type = BillType::parse(&row.try_get::<String, _>("bill_type").map_err(ser)?)
        .map_err(ser)?;

    Ok(Bill {
        id: BillId::new(row.try_get("id").map_err(ser)?),
        congress: i64_to_u32("congress", row.try_get("congress").map_err(ser)?)?,
        bill_type,
        bill_number: i64_to_u32("bill_number", row.try_get("bill_number").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        summary: row.try_get("summary").map_err(ser)?,
        latest_action_date: row
            .try_get::<Option<NaiveDate>, _>("latest_action_date")
            .map_err(ser)?,
        latest_action_text: row.try_get("latest_action_text").map_err(ser)?,
        introduced_date: row
            .try_get::<Option<NaiveDate>, _>("introduced_date")
            .map_err(ser)?,
        congress_api_url: row.try_get("congress_api_url").map_err(ser)?,
        congress_gov_url: row.try_get("congress_gov_url").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_sponsored_bill_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<BillWithSponsorship, StorageError> {
    Ok(BillWithSponsorship {
        bill: map_bill_row(row)?,
        sponsored_date: row
            .try_get::<Option<NaiveDate>, _>("sponsored_date")
            .map_err(ser)?,
        is_primary_sponsor: row.try_get("is_primary_sponsor").map_err(ser)?,
    })
}
