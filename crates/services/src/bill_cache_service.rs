use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tracing::{debug, warn};

use civics_core::model::{BillType, BillWithSponsorship, BioguideId};
use civics_core::time::Clock;
use storage::repository::{BillRepository, NewBill, NewSponsorship, Storage};

use crate::congress::CongressApi;
use crate::error::BillCacheError;

/// Cached rows older than this are refreshed from the API.
const CACHE_TTL_DAYS: i64 = 30;

/// Pause between bill detail fetches during a refresh.
const DETAIL_THROTTLE: Duration = Duration::from_millis(300);

/// Read-through cache for an official's sponsored bills.
///
/// Reads come from local storage; when the newest cached row is older than
/// the TTL the whole set is refetched from Congress.gov and upserted back.
/// Individual bills that fail to fetch or parse are logged and skipped so
/// one bad record never empties a member's list.
#[derive(Clone)]
pub struct BillCacheService {
    bills: Arc<dyn BillRepository>,
    api: Arc<dyn CongressApi>,
    clock: Clock,
    throttle: Duration,
}

impl BillCacheService {
    #[must_use]
    pub fn new(storage: &Storage, api: Arc<dyn CongressApi>, clock: Clock) -> Self {
        Self {
            bills: Arc::clone(&storage.bills),
            api,
            clock,
            throttle: DETAIL_THROTTLE,
        }
    }

    /// Overrides the detail-fetch pause; tests set it to zero.
    #[must_use]
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Bills the official is the primary sponsor of, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BillCacheError` when storage fails or when a stale cache
    /// cannot list sponsored legislation from the API.
    pub async fn sponsored_bills(
        &self,
        bioguide_id: &BioguideId,
    ) -> Result<Vec<BillWithSponsorship>, BillCacheError> {
        let cached = self.bills.sponsored_bills(bioguide_id, true).await?;

        if let Some(newest) = cached.iter().map(|b| b.bill.updated_at).max() {
            let age = self.clock.now() - newest;
            if age <= ChronoDuration::days(CACHE_TTL_DAYS) {
                debug!(bioguide = %bioguide_id, rows = cached.len(), "bill cache hit");
                return Ok(cached);
            }
        }

        self.refresh(bioguide_id).await
    }

    async fn refresh(
        &self,
        bioguide_id: &BioguideId,
    ) -> Result<Vec<BillWithSponsorship>, BillCacheError> {
        let refs = self.api.sponsored_legislation(bioguide_id.as_str()).await?;
        if refs.is_empty() {
            return Ok(Vec::new());
        }

        let mut result = Vec::new();
        for bill_ref in refs {
            // Amendments carry no detail URL.
            let Some(url) = bill_ref.url else { continue };

            let detail = match self.api.bill_detail(&url).await {
                Ok(Some(detail)) => detail,
                Ok(None) => continue,
                Err(e) => {
                    warn!(url = %url, error = %e, "skipping bill after detail fetch failure");
                    continue;
                }
            };
            let bill_type = match BillType::parse(&detail.bill_type) {
                Ok(bill_type) => bill_type,
                Err(e) => {
                    warn!(url = %url, error = %e, "skipping bill with unknown type");
                    continue;
                }
            };

            let summary = detail
                .summaries
                .into_iter()
                .next()
                .and_then(|s| s.text);
            let new_bill = NewBill {
                congress: detail.congress,
                bill_type,
                bill_number: detail.number,
                title: detail.title,
                summary,
                latest_action_date: detail.latest_action.as_ref().and_then(|a| a.action_date),
                latest_action_text: detail.latest_action.and_then(|a| a.text),
                introduced_date: detail.introduced_date,
                congress_api_url: Some(url),
                congress_gov_url: Some(bill_type.congress_gov_url(detail.congress, detail.number)),
            };

            let stored = self.bills.upsert_bill(&new_bill, self.clock.now()).await?;
            self.bills
                .upsert_sponsorship(&NewSponsorship {
                    bill_id: stored.id,
                    bioguide_id: bioguide_id.clone(),
                    is_primary_sponsor: true,
                    sponsored_date: stored.introduced_date,
                })
                .await?;

            result.push(BillWithSponsorship {
                sponsored_date: stored.introduced_date,
                is_primary_sponsor: true,
                bill: stored,
            });

            if !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }
        }

        debug!(bioguide = %bioguide_id, rows = result.len(), "bill cache refreshed");
        Ok(result)
    }
}
