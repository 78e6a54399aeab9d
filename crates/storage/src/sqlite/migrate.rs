use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (lesson content, quiz and assessment questions,
/// per-user progress and assignments, the officials directory, the bill
/// cache, and indexes).
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lessons (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    lesson_order INTEGER NOT NULL,
                    tier TEXT NOT NULL,
                    target_domains TEXT NOT NULL DEFAULT '[]'
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lesson_cards (
                    id INTEGER PRIMARY KEY,
                    lesson_id INTEGER NOT NULL,
                    card_order INTEGER NOT NULL,
                    card_type TEXT NOT NULL,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS card_citations (
                    id INTEGER PRIMARY KEY,
                    card_id INTEGER NOT NULL,
                    citation_text TEXT NOT NULL,
                    source_name TEXT NOT NULL,
                    source_url TEXT NOT NULL,
                    FOREIGN KEY (card_id) REFERENCES lesson_cards(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lesson_quiz_questions (
                    id INTEGER PRIMARY KEY,
                    lesson_id INTEGER NOT NULL,
                    question_order INTEGER NOT NULL,
                    question_text TEXT NOT NULL,
                    option_a TEXT NOT NULL,
                    option_b TEXT NOT NULL,
                    option_c TEXT NOT NULL,
                    option_d TEXT NOT NULL,
                    correct_answer TEXT NOT NULL CHECK (correct_answer IN ('A', 'B', 'C', 'D')),
                    explanation TEXT NOT NULL,
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS assessment_questions (
                    id INTEGER PRIMARY KEY,
                    question_text TEXT NOT NULL,
                    domain TEXT NOT NULL,
                    question_order INTEGER NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_assessments (
                    id INTEGER PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    status TEXT NOT NULL,
                    classification TEXT,
                    completed_at TEXT,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_lesson_progress (
                    id INTEGER PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    lesson_id INTEGER NOT NULL,
                    status TEXT NOT NULL,
                    quiz_attempts INTEGER NOT NULL CHECK (quiz_attempts >= 0),
                    quiz_score INTEGER,
                    completed_at TEXT,
                    updated_at TEXT NOT NULL,
                    UNIQUE (user_id, lesson_id),
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_lesson_assignments (
                    id INTEGER PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    lesson_id INTEGER NOT NULL,
                    assignment_reason TEXT NOT NULL,
                    assigned_at TEXT NOT NULL,
                    UNIQUE (user_id, lesson_id),
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS federal_officials (
                    bioguide_id TEXT PRIMARY KEY,
                    first_name TEXT NOT NULL,
                    last_name TEXT NOT NULL,
                    middle_name TEXT,
                    full_name TEXT NOT NULL,
                    honorific TEXT,
                    chamber TEXT NOT NULL,
                    state TEXT NOT NULL,
                    state_code TEXT NOT NULL,
                    district INTEGER,
                    party TEXT NOT NULL,
                    office_address TEXT,
                    phone_number TEXT,
                    official_website TEXT,
                    image_url TEXT,
                    image_attribution TEXT,
                    birth_year INTEGER,
                    current_member INTEGER NOT NULL,
                    first_term_start INTEGER NOT NULL,
                    current_term_start INTEGER NOT NULL,
                    congress_api_updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS bills (
                    id INTEGER PRIMARY KEY,
                    congress INTEGER NOT NULL,
                    bill_type TEXT NOT NULL,
                    bill_number INTEGER NOT NULL,
                    title TEXT NOT NULL,
                    summary TEXT,
                    latest_action_date TEXT,
                    latest_action_text TEXT,
                    introduced_date TEXT,
                    congress_api_url TEXT,
                    congress_gov_url TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (congress, bill_type, bill_number)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS bill_sponsorships (
                    id INTEGER PRIMARY KEY,
                    bill_id INTEGER NOT NULL,
                    bioguide_id TEXT NOT NULL,
                    is_primary_sponsor INTEGER NOT NULL,
                    sponsored_date TEXT,
                    UNIQUE (bill_id, bioguide_id),
                    FOREIGN KEY (bill_id) REFERENCES bills(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_lesson_cards_lesson ON lesson_cards(lesson_id);",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_quiz_questions_lesson
             ON lesson_quiz_questions(lesson_id);",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_progress_user ON user_lesson_progress(user_id);",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_assignments_user ON user_lesson_assignments(user_id);",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_assessments_user ON user_assessments(user_id);",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_officials_state ON federal_officials(state_code);",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sponsorships_bioguide
             ON bill_sponsorships(bioguide_id);",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(1_i64)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}
