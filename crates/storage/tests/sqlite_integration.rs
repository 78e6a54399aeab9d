use chrono::{Duration, NaiveDate, Utc};
use civics_core::model::{
    BillType, BioguideId, LessonId, Official, OfficialFilter, ProgressStatus, UserId,
};
use civics_core::time::fixed_now;
use storage::repository::{
    AssessmentRepository, AssignmentRepository, BillRepository, LessonRepository, NewBill,
    NewSponsorship, OfficialRepository, ProgressRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_official(bioguide: &str, last_name: &str, state: &str, state_code: &str) -> Official {
    Official {
        bioguide_id: BioguideId::new(bioguide),
        first_name: "Pat".into(),
        last_name: last_name.into(),
        middle_name: None,
        full_name: format!("Pat {last_name}"),
        honorific: None,
        chamber: "House of Representatives".into(),
        state: state.into(),
        state_code: state_code.into(),
        district: Some(7),
        party: "Independent".into(),
        office_address: None,
        phone_number: None,
        official_website: None,
        image_url: None,
        image_attribution: None,
        birth_year: Some(1970),
        current_member: true,
        first_term_start: 2015,
        current_term_start: 2023,
        congress_api_updated_at: fixed_now(),
    }
}

async fn seed_lesson(repo: &SqliteRepository, id: i64, order: i64, tier: &str) {
    sqlx::query(
        "INSERT INTO lessons (id, title, description, lesson_order, tier, target_domains)
         VALUES (?1, ?2, 'About civics', ?3, ?4, ?5)",
    )
    .bind(id)
    .bind(format!("Lesson {id}"))
    .bind(order)
    .bind(tier)
    .bind(r#"["elections"]"#)
    .execute(repo.pool())
    .await
    .expect("seed lesson");
}

#[tokio::test]
async fn progress_upserts_follow_the_state_machine() {
    let repo = connect("memdb_progress").await;
    seed_lesson(&repo, 1, 1, "core").await;
    let user = UserId::new("u-1");
    let lesson = LessonId::new(1);
    let now = fixed_now();

    let started = repo.start_lesson(&user, lesson, now).await.unwrap();
    assert_eq!(started.status, ProgressStatus::InProgress);
    assert_eq!(started.quiz_attempts, 0);

    let failed = repo
        .record_quiz_attempt(&user, lesson, 2, false, now + Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(failed.status, ProgressStatus::InProgress);
    assert_eq!(failed.quiz_attempts, 1);
    assert_eq!(failed.quiz_score, Some(2));
    assert_eq!(failed.completed_at, None);

    let passed_at = now + Duration::minutes(10);
    let passed = repo
        .record_quiz_attempt(&user, lesson, 5, true, passed_at)
        .await
        .unwrap();
    assert_eq!(passed.status, ProgressStatus::Completed);
    assert_eq!(passed.quiz_attempts, 2);
    assert_eq!(passed.completed_at, Some(passed_at));

    // Restarting a completed lesson leaves everything in place.
    let restarted = repo
        .start_lesson(&user, lesson, now + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(restarted.status, ProgressStatus::Completed);
    assert_eq!(restarted.completed_at, Some(passed_at));
    assert_eq!(restarted.updated_at, passed_at);
}

#[tokio::test]
async fn failed_attempt_after_completion_keeps_the_completion_stamp() {
    let repo = connect("memdb_fail_after_pass").await;
    seed_lesson(&repo, 1, 1, "core").await;
    let user = UserId::new("u-1");
    let lesson = LessonId::new(1);
    let now = fixed_now();

    repo.record_quiz_attempt(&user, lesson, 5, true, now)
        .await
        .unwrap();
    let after = repo
        .record_quiz_attempt(&user, lesson, 1, false, now + Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(after.status, ProgressStatus::InProgress);
    assert_eq!(after.quiz_attempts, 2);
    assert_eq!(after.completed_at, Some(now));
}

#[tokio::test]
async fn directory_search_filters_and_paginates() {
    let repo = connect("memdb_directory").await;
    let officials = vec![
        build_official("A000001", "Adams", "Texas", "TX"),
        build_official("B000002", "Baker", "Texas", "TX"),
        build_official("C000003", "Castle", "Vermont", "VT"),
    ];
    repo.upsert_officials(&officials).await.unwrap();

    // State matches the code case-insensitively.
    let filter = OfficialFilter {
        state: Some("tx".into()),
        ..OfficialFilter::default()
    };
    let page = repo.search_officials(&filter, 1, 50).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.page_count, 1);
    assert_eq!(page.officials[0].last_name, "Adams");
    assert_eq!(page.officials[1].last_name, "Baker");

    // Full state name works the same way.
    let filter = OfficialFilter {
        state: Some("texas".into()),
        ..OfficialFilter::default()
    };
    assert_eq!(repo.search_officials(&filter, 1, 50).await.unwrap().total, 2);

    // Name substring is case-insensitive, pagination is 1-indexed.
    let filter = OfficialFilter {
        name: Some("PAT".into()),
        ..OfficialFilter::default()
    };
    let page = repo.search_officials(&filter, 2, 2).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.page_count, 2);
    assert_eq!(page.officials.len(), 1);
    assert_eq!(page.officials[0].last_name, "Castle");
}

#[tokio::test]
async fn official_upsert_overwrites_on_bioguide_conflict() {
    let repo = connect("memdb_official_upsert").await;
    let mut official = build_official("A000001", "Adams", "Texas", "TX");
    repo.upsert_officials(std::slice::from_ref(&official))
        .await
        .unwrap();

    official.party = "Democratic".into();
    official.current_term_start = 2025;
    repo.upsert_officials(std::slice::from_ref(&official))
        .await
        .unwrap();

    let fetched = repo
        .get_official(&BioguideId::new("A000001"))
        .await
        .unwrap()
        .expect("official exists");
    assert_eq!(fetched.party, "Democratic");
    assert_eq!(fetched.current_term_start, 2025);
}

#[tokio::test]
async fn bill_cache_upserts_and_joins_sponsorships() {
    let repo = connect("memdb_bills").await;
    let now = Utc::now();
    let sponsor = BioguideId::new("A000001");

    let older = repo
        .upsert_bill(
            &NewBill {
                congress: 118,
                bill_type: BillType::Hr,
                bill_number: 10,
                title: "Older bill".into(),
                summary: None,
                latest_action_date: None,
                latest_action_text: None,
                introduced_date: NaiveDate::from_ymd_opt(2023, 1, 5),
                congress_api_url: None,
                congress_gov_url: None,
            },
            now,
        )
        .await
        .unwrap();
    let newer = repo
        .upsert_bill(
            &NewBill {
                congress: 118,
                bill_type: BillType::S,
                bill_number: 42,
                title: "Newer bill".into(),
                summary: Some("A summary".into()),
                latest_action_date: None,
                latest_action_text: None,
                introduced_date: NaiveDate::from_ymd_opt(2024, 6, 1),
                congress_api_url: None,
                congress_gov_url: None,
            },
            now,
        )
        .await
        .unwrap();

    repo.upsert_sponsorship(&NewSponsorship {
        bill_id: older.id,
        bioguide_id: sponsor.clone(),
        is_primary_sponsor: true,
        sponsored_date: NaiveDate::from_ymd_opt(2023, 1, 5),
    })
    .await
    .unwrap();
    repo.upsert_sponsorship(&NewSponsorship {
        bill_id: newer.id,
        bioguide_id: sponsor.clone(),
        is_primary_sponsor: false,
        sponsored_date: None,
    })
    .await
    .unwrap();

    // Duplicate sponsorship write is ignored.
    repo.upsert_sponsorship(&NewSponsorship {
        bill_id: older.id,
        bioguide_id: sponsor.clone(),
        is_primary_sponsor: false,
        sponsored_date: None,
    })
    .await
    .unwrap();

    let all = repo.sponsored_bills(&sponsor, false).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].bill.title, "Newer bill");
    assert!(all[1].is_primary_sponsor);

    let primary = repo.sponsored_bills(&sponsor, true).await.unwrap();
    assert_eq!(primary.len(), 1);
    assert_eq!(primary[0].bill.id, older.id);

    // Re-upserting the bill keeps id and created_at, refreshes the rest.
    let refreshed = repo
        .upsert_bill(
            &NewBill {
                congress: 118,
                bill_type: BillType::Hr,
                bill_number: 10,
                title: "Older bill, amended".into(),
                summary: None,
                latest_action_date: None,
                latest_action_text: None,
                introduced_date: NaiveDate::from_ymd_opt(2023, 1, 5),
                congress_api_url: None,
                congress_gov_url: None,
            },
            now + Duration::days(3),
        )
        .await
        .unwrap();
    assert_eq!(refreshed.id, older.id);
    assert_eq!(refreshed.created_at, older.created_at);
    assert_eq!(refreshed.title, "Older bill, amended");
}

#[tokio::test]
async fn assignments_join_lesson_metadata_and_card_types() {
    let repo = connect("memdb_assignments").await;
    seed_lesson(&repo, 1, 2, "core").await;
    seed_lesson(&repo, 2, 1, "targeted").await;

    sqlx::query(
        "INSERT INTO lesson_cards (lesson_id, card_order, card_type, title, content)
         VALUES (1, 1, 'text', 'Intro', 'Body'), (1, 2, 'key_concept', 'Concept', 'Body')",
    )
    .execute(repo.pool())
    .await
    .unwrap();

    let user = UserId::new("u-1");
    for (lesson_id, reason) in [(1_i64, "foundation"), (2_i64, "gap: elections")] {
        sqlx::query(
            "INSERT INTO user_lesson_assignments (user_id, lesson_id, assignment_reason, assigned_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(user.as_str())
        .bind(lesson_id)
        .bind(reason)
        .bind(fixed_now())
        .execute(repo.pool())
        .await
        .unwrap();
    }

    let assigned = repo.assignments_for_user(&user).await.unwrap();
    assert_eq!(assigned.len(), 2);
    // Ordered by lesson_order, not insertion.
    assert_eq!(assigned[0].lesson_id, LessonId::new(2));
    assert_eq!(assigned[0].tier, "targeted");
    assert_eq!(assigned[0].assignment_reason, "gap: elections");
    assert_eq!(assigned[0].text_cards, 0);
    assert_eq!(assigned[1].target_domains, vec!["elections".to_string()]);
    assert_eq!(assigned[1].text_cards, 1);
}

#[tokio::test]
async fn assessment_counts_only_completed_rows() {
    let repo = connect("memdb_assessment").await;
    let user = UserId::new("u-1");
    assert!(!repo.has_completed_assessment(&user).await.unwrap());

    sqlx::query(
        "INSERT INTO user_assessments (user_id, status, created_at) VALUES (?1, 'pending', ?2)",
    )
    .bind(user.as_str())
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();
    assert!(!repo.has_completed_assessment(&user).await.unwrap());

    sqlx::query(
        "INSERT INTO user_assessments (user_id, status, completed_at, created_at)
         VALUES (?1, 'completed', ?2, ?2)",
    )
    .bind(user.as_str())
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();
    assert!(repo.has_completed_assessment(&user).await.unwrap());
}

#[tokio::test]
async fn lesson_content_nests_cards_and_citations() {
    let repo = connect("memdb_content").await;
    seed_lesson(&repo, 1, 1, "core").await;
    sqlx::query(
        "INSERT INTO lesson_cards (id, lesson_id, card_order, card_type, title, content)
         VALUES (10, 1, 1, 'text', 'Intro', 'Body')",
    )
    .execute(repo.pool())
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO card_citations (card_id, citation_text, source_name, source_url)
         VALUES (10, 'Art. I', 'U.S. Constitution', 'https://example.gov')",
    )
    .execute(repo.pool())
    .await
    .unwrap();

    let content = repo
        .lesson_content(LessonId::new(1))
        .await
        .unwrap()
        .expect("lesson exists");
    assert_eq!(content.lesson.title, "Lesson 1");
    assert_eq!(content.cards.len(), 1);
    assert_eq!(content.cards[0].citations.len(), 1);
    assert_eq!(content.cards[0].citations[0].source_name, "U.S. Constitution");

    assert!(repo.lesson_content(LessonId::new(99)).await.unwrap().is_none());
}
