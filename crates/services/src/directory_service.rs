use std::sync::Arc;

use tracing::warn;

use civics_core::model::{
    BillWithSponsorship, BioguideId, Official, OfficialFilter, OfficialPage, YearFilter,
};
use storage::repository::{OfficialRepository, Storage};

use crate::bill_cache_service::BillCacheService;
use crate::error::DirectoryError;

/// Directory page size.
pub const PAGE_SIZE: u32 = 50;

/// Directory query parameters as they arrive from the UI, before
/// normalization. Select inputs send the `all` sentinel for "no filter" and
/// text inputs may be blank; both collapse to no constraint.
#[derive(Debug, Clone, Default)]
pub struct DirectoryQuery {
    pub name: Option<String>,
    pub party: Option<String>,
    pub chamber: Option<String>,
    pub state: Option<String>,
    pub district: Option<u32>,
    pub birth_year: Option<YearFilter>,
    pub first_term: Option<YearFilter>,
    pub current_term: Option<YearFilter>,
    /// 1-indexed; zero is treated as the first page.
    pub page: u32,
}

fn normalize(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl DirectoryQuery {
    fn into_filter(self) -> (OfficialFilter, u32) {
        let page = self.page.max(1);
        let filter = OfficialFilter {
            name: normalize(self.name),
            party: normalize(self.party),
            chamber: normalize(self.chamber),
            state: normalize(self.state),
            district: self.district,
            birth_year: self.birth_year,
            first_term: self.first_term,
            current_term: self.current_term,
        };
        (filter, page)
    }
}

/// One official with their sponsored legislation.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberProfile {
    pub official: Official,
    pub sponsored_bills: Vec<BillWithSponsorship>,
}

/// The officials directory: filtered search and member profiles.
#[derive(Clone)]
pub struct DirectoryService {
    officials: Arc<dyn OfficialRepository>,
    bill_cache: BillCacheService,
}

impl DirectoryService {
    #[must_use]
    pub fn new(storage: &Storage, bill_cache: BillCacheService) -> Self {
        Self {
            officials: Arc::clone(&storage.officials),
            bill_cache,
        }
    }

    /// One page of directory results for a query.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError` on query failure.
    pub async fn search(&self, query: DirectoryQuery) -> Result<OfficialPage, DirectoryError> {
        let (filter, page) = query.into_filter();
        Ok(self
            .officials
            .search_officials(&filter, page, PAGE_SIZE)
            .await?)
    }

    /// An official's profile with their sponsored bills.
    ///
    /// The bills leg degrades gracefully: when the cache cannot be read or
    /// refreshed the profile still renders, just without legislation.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::UnknownOfficial` when no official matches
    /// the bioguide id, or a storage error for the official lookup itself.
    pub async fn member_profile(
        &self,
        bioguide_id: &BioguideId,
    ) -> Result<MemberProfile, DirectoryError> {
        let official = self
            .officials
            .get_official(bioguide_id)
            .await?
            .ok_or_else(|| DirectoryError::UnknownOfficial(bioguide_id.clone()))?;

        let sponsored_bills = match self.bill_cache.sponsored_bills(bioguide_id).await {
            Ok(bills) => bills,
            Err(e) => {
                warn!(bioguide = %bioguide_id, error = %e, "sponsored bills unavailable");
                Vec::new()
            }
        };

        Ok(MemberProfile {
            official,
            sponsored_bills,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sentinel_and_blanks_collapse_to_no_filter() {
        let query = DirectoryQuery {
            name: Some("  ".into()),
            party: Some("All".into()),
            chamber: Some("all".into()),
            state: Some("TX".into()),
            page: 0,
            ..DirectoryQuery::default()
        };
        let (filter, page) = query.into_filter();
        assert_eq!(filter.name, None);
        assert_eq!(filter.party, None);
        assert_eq!(filter.chamber, None);
        assert_eq!(filter.state.as_deref(), Some("TX"));
        assert_eq!(page, 1);
    }

    #[test]
    fn name_is_trimmed_not_dropped() {
        let query = DirectoryQuery {
            name: Some("  adams ".into()),
            page: 3,
            ..DirectoryQuery::default()
        };
        let (filter, page) = query.into_filter();
        assert_eq!(filter.name.as_deref(), Some("adams"));
        assert_eq!(page, 3);
    }
}
