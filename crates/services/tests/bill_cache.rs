use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};

use civics_core::Clock;
use civics_core::model::{BillType, BioguideId};
use civics_core::time::fixed_now;
use services::congress::{
    BillDetail, CongressApi, LatestAction, MemberDetail, MemberPage, SponsoredBillRef,
};
use services::error::CongressApiError;
use services::{BillCacheService, DirectoryService};
use storage::repository::{
    BillRepository, InMemoryRepository, NewBill, NewSponsorship, OfficialRepository, Storage,
};

/// Stub API that serves one bill and counts how often it is hit.
#[derive(Default)]
struct StubApi {
    list_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    fail_detail: bool,
    empty: bool,
}

#[async_trait]
impl CongressApi for StubApi {
    async fn current_members(
        &self,
        _congress: u32,
        _offset: u32,
        _limit: u32,
    ) -> Result<MemberPage, CongressApiError> {
        unimplemented!("not used by the bill cache")
    }

    async fn member_detail(
        &self,
        _bioguide_id: &str,
    ) -> Result<Option<MemberDetail>, CongressApiError> {
        unimplemented!("not used by the bill cache")
    }

    async fn sponsored_legislation(
        &self,
        _bioguide_id: &str,
    ) -> Result<Vec<SponsoredBillRef>, CongressApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.empty {
            return Ok(Vec::new());
        }
        Ok(vec![
            SponsoredBillRef {
                url: Some("https://api.congress.gov/v3/bill/118/s/42".into()),
            },
            // Amendment entries carry no url and must be skipped.
            SponsoredBillRef { url: None },
        ])
    }

    async fn bill_detail(&self, _url: &str) -> Result<Option<BillDetail>, CongressApiError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_detail {
            return Ok(None);
        }
        Ok(Some(BillDetail {
            congress: 118,
            bill_type: "S".into(),
            number: 42,
            title: "Voting Access Act".into(),
            summaries: Vec::new(),
            latest_action: Some(LatestAction {
                action_date: NaiveDate::from_ymd_opt(2024, 2, 1),
                text: Some("Read twice".into()),
            }),
            introduced_date: NaiveDate::from_ymd_opt(2024, 1, 15),
        }))
    }
}

fn storage_over(repo: &InMemoryRepository) -> Storage {
    Storage {
        progress: Arc::new(repo.clone()),
        assignments: Arc::new(repo.clone()),
        lessons: Arc::new(repo.clone()),
        assessments: Arc::new(repo.clone()),
        officials: Arc::new(repo.clone()),
        bills: Arc::new(repo.clone()),
    }
}

fn service(
    repo: &InMemoryRepository,
    api: Arc<StubApi>,
    clock: Clock,
) -> BillCacheService {
    BillCacheService::new(&storage_over(repo), api, clock).with_throttle(Duration::ZERO)
}

async fn seed_cached_bill(repo: &InMemoryRepository, sponsor: &BioguideId) {
    let bill = repo
        .upsert_bill(
            &NewBill {
                congress: 118,
                bill_type: BillType::Hr,
                bill_number: 7,
                title: "Cached bill".into(),
                summary: None,
                latest_action_date: None,
                latest_action_text: None,
                introduced_date: NaiveDate::from_ymd_opt(2023, 9, 1),
                congress_api_url: None,
                congress_gov_url: None,
            },
            fixed_now(),
        )
        .await
        .unwrap();
    repo.upsert_sponsorship(&NewSponsorship {
        bill_id: bill.id,
        bioguide_id: sponsor.clone(),
        is_primary_sponsor: true,
        sponsored_date: NaiveDate::from_ymd_opt(2023, 9, 1),
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn fresh_cache_never_touches_the_api() {
    let repo = InMemoryRepository::new();
    let sponsor = BioguideId::new("A000001");
    seed_cached_bill(&repo, &sponsor).await;

    let api = Arc::new(StubApi::default());
    let clock = Clock::fixed(fixed_now() + ChronoDuration::days(10));
    let bills = service(&repo, Arc::clone(&api), clock)
        .sponsored_bills(&sponsor)
        .await
        .unwrap();

    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].bill.title, "Cached bill");
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(api.detail_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stale_cache_refreshes_from_the_api() {
    let repo = InMemoryRepository::new();
    let sponsor = BioguideId::new("A000001");
    seed_cached_bill(&repo, &sponsor).await;

    let api = Arc::new(StubApi::default());
    let clock = Clock::fixed(fixed_now() + ChronoDuration::days(45));
    let bills = service(&repo, Arc::clone(&api), clock)
        .sponsored_bills(&sponsor)
        .await
        .unwrap();

    assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.detail_calls.load(Ordering::SeqCst), 1);
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].bill.bill_type, BillType::S);
    assert_eq!(bills[0].bill.bill_number, 42);
    assert_eq!(
        bills[0].bill.congress_gov_url.as_deref(),
        Some("https://www.congress.gov/bill/118th-congress/senate-bill/42")
    );
    assert_eq!(bills[0].sponsored_date, NaiveDate::from_ymd_opt(2024, 1, 15));

    // The refreshed row is now the newest; a second read hits the cache.
    let again = service(&repo, Arc::clone(&api), clock)
        .sponsored_bills(&sponsor)
        .await
        .unwrap();
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(again.len(), 2);
}

#[tokio::test]
async fn empty_api_result_yields_an_empty_list() {
    let repo = InMemoryRepository::new();
    let sponsor = BioguideId::new("B000002");
    let api = Arc::new(StubApi {
        empty: true,
        ..StubApi::default()
    });

    let bills = service(&repo, api, Clock::fixed(fixed_now()))
        .sponsored_bills(&sponsor)
        .await
        .unwrap();
    assert!(bills.is_empty());
}

#[tokio::test]
async fn failed_detail_fetches_are_skipped() {
    let repo = InMemoryRepository::new();
    let sponsor = BioguideId::new("C000003");
    let api = Arc::new(StubApi {
        fail_detail: true,
        ..StubApi::default()
    });

    let bills = service(&repo, Arc::clone(&api), Clock::fixed(fixed_now()))
        .sponsored_bills(&sponsor)
        .await
        .unwrap();
    assert!(bills.is_empty());
    assert_eq!(api.detail_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn member_profile_degrades_without_bill_data() {
    let repo = InMemoryRepository::new();
    let sponsor = BioguideId::new("D000004");

    struct FailingApi;
    #[async_trait]
    impl CongressApi for FailingApi {
        async fn current_members(
            &self,
            _: u32,
            _: u32,
            _: u32,
        ) -> Result<MemberPage, CongressApiError> {
            unimplemented!()
        }
        async fn member_detail(&self, _: &str) -> Result<Option<MemberDetail>, CongressApiError> {
            unimplemented!()
        }
        async fn sponsored_legislation(
            &self,
            _: &str,
        ) -> Result<Vec<SponsoredBillRef>, CongressApiError> {
            Err(CongressApiError::HttpStatus(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ))
        }
        async fn bill_detail(&self, _: &str) -> Result<Option<BillDetail>, CongressApiError> {
            unimplemented!()
        }
    }

    let official = civics_core::model::Official {
        bioguide_id: sponsor.clone(),
        first_name: "Dee".into(),
        last_name: "Doe".into(),
        middle_name: None,
        full_name: "Dee Doe".into(),
        honorific: None,
        chamber: "Senate".into(),
        state: "Vermont".into(),
        state_code: "VT".into(),
        district: None,
        party: "Independent".into(),
        office_address: None,
        phone_number: None,
        official_website: None,
        image_url: None,
        image_attribution: None,
        birth_year: None,
        current_member: true,
        first_term_start: 2019,
        current_term_start: 2025,
        congress_api_updated_at: fixed_now(),
    };
    repo.upsert_officials(std::slice::from_ref(&official))
        .await
        .unwrap();

    let storage = storage_over(&repo);
    let cache = BillCacheService::new(&storage, Arc::new(FailingApi), Clock::fixed(fixed_now()))
        .with_throttle(Duration::ZERO);
    let directory = DirectoryService::new(&storage, cache);

    let profile = directory.member_profile(&sponsor).await.unwrap();
    assert_eq!(profile.official.full_name, "Dee Doe");
    assert!(profile.sponsored_bills.is_empty());

    let missing = directory
        .member_profile(&BioguideId::new("Z999999"))
        .await;
    assert!(missing.is_err());
}
