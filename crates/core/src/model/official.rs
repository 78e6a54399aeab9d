use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::BioguideId;

/// One congressional member, as synced from the congressional data API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Official {
    pub bioguide_id: BioguideId,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub full_name: String,
    pub honorific: Option<String>,
    pub chamber: String,
    pub state: String,
    pub state_code: String,
    pub district: Option<u32>,
    pub party: String,
    pub office_address: Option<String>,
    pub phone_number: Option<String>,
    pub official_website: Option<String>,
    pub image_url: Option<String>,
    pub image_attribution: Option<String>,
    pub birth_year: Option<i32>,
    pub current_member: bool,
    pub first_term_start: i32,
    pub current_term_start: i32,
    pub congress_api_updated_at: DateTime<Utc>,
}

/// Exact-or-comparison filter on a year-valued field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearFilter {
    Exact(i32),
    Before(i32),
    After(i32),
}

impl YearFilter {
    #[must_use]
    pub fn matches(&self, year: i32) -> bool {
        match *self {
            YearFilter::Exact(y) => year == y,
            YearFilter::Before(y) => year < y,
            YearFilter::After(y) => year > y,
        }
    }
}

/// Structured filter over the officials directory.
///
/// `None` fields apply no constraint (the UI's `all` sentinel and blank
/// inputs are normalized to `None` before the filter is built). The
/// `matches` predicate is the behavioral reference for the SQL the storage
/// layer generates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfficialFilter {
    /// Case-insensitive substring match on the full name.
    pub name: Option<String>,
    pub party: Option<String>,
    pub chamber: Option<String>,
    /// Matches either the full state name or the two-letter code,
    /// case-insensitively.
    pub state: Option<String>,
    pub district: Option<u32>,
    pub birth_year: Option<YearFilter>,
    pub first_term: Option<YearFilter>,
    pub current_term: Option<YearFilter>,
}

impl OfficialFilter {
    #[must_use]
    pub fn matches(&self, official: &Official) -> bool {
        if let Some(name) = &self.name {
            let needle = name.to_lowercase();
            if !official.full_name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if let Some(party) = &self.party {
            if official.party != *party {
                return false;
            }
        }
        if let Some(chamber) = &self.chamber {
            if official.chamber != *chamber {
                return false;
            }
        }
        if let Some(state) = &self.state {
            let matches_state = official.state.eq_ignore_ascii_case(state)
                || official.state_code.eq_ignore_ascii_case(state);
            if !matches_state {
                return false;
            }
        }
        if let Some(district) = self.district {
            if official.district != Some(district) {
                return false;
            }
        }
        if let Some(filter) = self.birth_year {
            match official.birth_year {
                Some(year) if filter.matches(year) => {}
                _ => return false,
            }
        }
        if let Some(filter) = self.first_term {
            if !filter.matches(official.first_term_start) {
                return false;
            }
        }
        if let Some(filter) = self.current_term {
            if !filter.matches(official.current_term_start) {
                return false;
            }
        }
        true
    }
}

/// One page of directory results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficialPage {
    pub officials: Vec<Official>,
    pub total: u32,
    /// 1-indexed page number.
    pub page: u32,
    pub page_count: u32,
}

impl OfficialPage {
    #[must_use]
    pub fn new(officials: Vec<Official>, total: u32, page: u32, page_size: u32) -> Self {
        let page_count = if page_size == 0 {
            0
        } else {
            total.div_ceil(page_size)
        };
        Self {
            officials,
            total,
            page,
            page_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn official(name: &str, party: &str, state: &str, code: &str) -> Official {
        Official {
            bioguide_id: BioguideId::new(format!("X{}", name.len())),
            first_name: name.split(' ').next().unwrap_or_default().to_string(),
            last_name: name.split(' ').next_back().unwrap_or_default().to_string(),
            middle_name: None,
            full_name: name.to_string(),
            honorific: None,
            chamber: "Senate".into(),
            state: state.into(),
            state_code: code.into(),
            district: None,
            party: party.into(),
            office_address: None,
            phone_number: None,
            official_website: None,
            image_url: None,
            image_attribution: None,
            birth_year: Some(1960),
            current_member: true,
            first_term_start: 2015,
            current_term_start: 2021,
            congress_api_updated_at: fixed_now(),
        }
    }

    #[test]
    fn party_and_state_filter_requires_both() {
        let filter = OfficialFilter {
            party: Some("Republican".into()),
            state: Some("TX".into()),
            ..OfficialFilter::default()
        };
        assert!(filter.matches(&official("John Cornyn", "Republican", "Texas", "TX")));
        assert!(!filter.matches(&official("Ted Budd", "Republican", "North Carolina", "NC")));
        assert!(!filter.matches(&official("Ron Wyden", "Democratic", "Texas", "TX")));
    }

    #[test]
    fn state_matches_full_name_and_code_case_insensitively() {
        let member = official("John Cornyn", "Republican", "Texas", "TX");
        for state in ["TX", "tx", "Texas", "texas", "TEXAS"] {
            let filter = OfficialFilter {
                state: Some(state.into()),
                ..OfficialFilter::default()
            };
            assert!(filter.matches(&member), "state filter {state:?} should match");
        }
    }

    #[test]
    fn name_search_is_case_insensitive_substring() {
        let member = official("Alexandria Ocasio-Cortez", "Democratic", "New York", "NY");
        let filter = OfficialFilter {
            name: Some("ocasio".into()),
            ..OfficialFilter::default()
        };
        assert!(filter.matches(&member));
        let filter = OfficialFilter {
            name: Some("cortezz".into()),
            ..OfficialFilter::default()
        };
        assert!(!filter.matches(&member));
    }

    #[test]
    fn year_filters_compare_strictly() {
        assert!(YearFilter::Exact(1960).matches(1960));
        assert!(!YearFilter::Before(1960).matches(1960));
        assert!(YearFilter::Before(1961).matches(1960));
        assert!(YearFilter::After(1959).matches(1960));
        assert!(!YearFilter::After(1960).matches(1960));
    }

    #[test]
    fn missing_birth_year_fails_a_birth_year_filter() {
        let mut member = official("Jane Doe", "Independent", "Maine", "ME");
        member.birth_year = None;
        let filter = OfficialFilter {
            birth_year: Some(YearFilter::Exact(1960)),
            ..OfficialFilter::default()
        };
        assert!(!filter.matches(&member));
    }

    #[test]
    fn page_count_rounds_up() {
        let page = OfficialPage::new(vec![], 101, 1, 50);
        assert_eq!(page.page_count, 3);
        let page = OfficialPage::new(vec![], 100, 1, 50);
        assert_eq!(page.page_count, 2);
        let page = OfficialPage::new(vec![], 0, 1, 50);
        assert_eq!(page.page_count, 0);
    }
}
