//! Typed client for the Congress.gov v3 API.
//!
//! Everything crossing the API boundary deserializes into the structs here;
//! tolerant fields (bill numbers arrive as strings or numbers depending on
//! the endpoint) are normalized during deserialization so the rest of the
//! crate only sees validated values.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use civics_core::model::{BioguideId, Official};

use crate::error::CongressApiError;

const DEFAULT_BASE_URL: &str = "https://api.congress.gov/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size used when listing members.
pub const MEMBER_PAGE_LIMIT: u32 = 250;

#[derive(Clone, Debug)]
pub struct CongressConfig {
    pub base_url: String,
    pub api_key: String,
}

impl CongressConfig {
    /// Reads the API key from `CONGRESS_API_KEY` and an optional base URL
    /// override from `CONGRESS_API_BASE_URL`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("CONGRESS_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("CONGRESS_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Some(Self { base_url, api_key })
    }
}

fn u32_from_string_or_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u32),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberPage {
    #[serde(default)]
    pub members: Vec<MemberSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pagination {
    pub count: u32,
    #[serde(default)]
    pub next: Option<String>,
}

/// A member as it appears in the list endpoint. The `name` field is in
/// "Last, First Middle" order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub bioguide_id: String,
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub district: Option<u32>,
    pub party_name: String,
    #[serde(default)]
    pub depiction: Option<Depiction>,
    pub terms: TermList,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TermList {
    #[serde(default)]
    pub item: Vec<TermSummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermSummary {
    pub chamber: String,
    pub start_year: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Depiction {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub attribution: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberDetailEnvelope {
    member: MemberDetail,
}

/// The richer member record from the detail endpoint. Most fields are
/// optional; the transform falls back to the list record when they are
/// missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub direct_order_name: Option<String>,
    #[serde(default)]
    pub honorific_name: Option<String>,
    #[serde(default)]
    pub terms: Vec<TermDetail>,
    #[serde(default)]
    pub address_information: Option<AddressInformation>,
    #[serde(default)]
    pub official_website_url: Option<String>,
    #[serde(default)]
    pub birth_year: Option<String>,
    #[serde(default)]
    pub current_member: Option<bool>,
    #[serde(default)]
    pub update_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermDetail {
    pub start_year: i32,
    #[serde(default)]
    pub state_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInformation {
    #[serde(default)]
    pub office_address: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SponsoredLegislationPage {
    #[serde(default)]
    sponsored_legislation: Vec<SponsoredBillRef>,
}

/// One entry from the sponsored-legislation list. Amendments carry no
/// detail URL and are skipped by the cache refresher.
#[derive(Debug, Clone, Deserialize)]
pub struct SponsoredBillRef {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BillDetailEnvelope {
    bill: BillDetail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDetail {
    pub congress: u32,
    #[serde(rename = "type")]
    pub bill_type: String,
    #[serde(deserialize_with = "u32_from_string_or_number")]
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub summaries: Vec<BillSummaryText>,
    #[serde(default)]
    pub latest_action: Option<LatestAction>,
    #[serde(default)]
    pub introduced_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillSummaryText {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestAction {
    #[serde(default)]
    pub action_date: Option<NaiveDate>,
    #[serde(default)]
    pub text: Option<String>,
}

/// The slice of the Congress.gov API the services use. A trait seam so the
/// cache refresher and the seeder can be tested against a stub.
#[async_trait]
pub trait CongressApi: Send + Sync {
    /// One page of current members for a congress.
    ///
    /// # Errors
    ///
    /// Returns `CongressApiError` on transport failure or a non-success
    /// status.
    async fn current_members(
        &self,
        congress: u32,
        offset: u32,
        limit: u32,
    ) -> Result<MemberPage, CongressApiError>;

    /// Detail record for one member. A non-success status is reported as
    /// `Ok(None)` so callers can fall back to the list record.
    ///
    /// # Errors
    ///
    /// Returns `CongressApiError` on transport failure.
    async fn member_detail(
        &self,
        bioguide_id: &str,
    ) -> Result<Option<MemberDetail>, CongressApiError>;

    /// Bills sponsored by a member.
    ///
    /// # Errors
    ///
    /// Returns `CongressApiError` on transport failure or a non-success
    /// status.
    async fn sponsored_legislation(
        &self,
        bioguide_id: &str,
    ) -> Result<Vec<SponsoredBillRef>, CongressApiError>;

    /// Detail record for one bill, addressed by the URL the list endpoint
    /// handed out. A non-success status is reported as `Ok(None)` so a bad
    /// bill never aborts a whole refresh.
    ///
    /// # Errors
    ///
    /// Returns `CongressApiError` on transport failure.
    async fn bill_detail(&self, url: &str) -> Result<Option<BillDetail>, CongressApiError>;
}

#[derive(Clone)]
pub struct CongressClient {
    client: Client,
    config: CongressConfig,
}

impl CongressClient {
    /// Builds a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns `CongressApiError` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: CongressConfig) -> Result<Self, CongressApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn keyed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.query(&[("api_key", self.config.api_key.as_str()), ("format", "json")])
    }
}

#[async_trait]
impl CongressApi for CongressClient {
    async fn current_members(
        &self,
        congress: u32,
        offset: u32,
        limit: u32,
    ) -> Result<MemberPage, CongressApiError> {
        let url = self.endpoint(&format!("member/congress/{congress}"));
        let response = self
            .keyed(self.client.get(url))
            .query(&[
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
                ("currentMember", "true".to_string()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CongressApiError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn member_detail(
        &self,
        bioguide_id: &str,
    ) -> Result<Option<MemberDetail>, CongressApiError> {
        let url = self.endpoint(&format!("member/{bioguide_id}"));
        let response = self.keyed(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            warn!(bioguide = %bioguide_id, status = %response.status(), "member detail unavailable");
            return Ok(None);
        }
        let envelope: MemberDetailEnvelope = response.json().await?;
        Ok(Some(envelope.member))
    }

    async fn sponsored_legislation(
        &self,
        bioguide_id: &str,
    ) -> Result<Vec<SponsoredBillRef>, CongressApiError> {
        let url = self.endpoint(&format!("member/{bioguide_id}/sponsored-legislation"));
        let response = self
            .keyed(self.client.get(url))
            .query(&[("limit", "250")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CongressApiError::HttpStatus(response.status()));
        }
        let page: SponsoredLegislationPage = response.json().await?;
        Ok(page.sponsored_legislation)
    }

    async fn bill_detail(&self, url: &str) -> Result<Option<BillDetail>, CongressApiError> {
        let response = self.keyed(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "bill detail unavailable");
            return Ok(None);
        }
        let envelope: BillDetailEnvelope = response.json().await?;
        Ok(Some(envelope.bill))
    }
}

/// Merges a list record and an optional detail record into an `Official`.
///
/// Returns `None` when the list record carries no terms; without a current
/// term there is no chamber to file the member under. All detail-derived
/// fields fall back to what the list record provides, including splitting
/// the "Last, First" name when the detail fetch failed.
#[must_use]
pub fn official_from_member(
    summary: &MemberSummary,
    detail: Option<&MemberDetail>,
    now: DateTime<Utc>,
) -> Option<Official> {
    let current_term = summary.terms.item.first()?;

    let (fallback_last, fallback_first) = split_list_name(&summary.name);
    let first_name = detail
        .and_then(|d| d.first_name.clone())
        .unwrap_or(fallback_first);
    let last_name = detail
        .and_then(|d| d.last_name.clone())
        .unwrap_or(fallback_last);
    let full_name = detail
        .and_then(|d| d.direct_order_name.clone())
        .unwrap_or_else(|| summary.name.clone());

    let detail_terms = detail.map(|d| d.terms.as_slice()).unwrap_or_default();
    let first_term_start = detail_terms
        .iter()
        .map(|t| t.start_year)
        .min()
        .unwrap_or(current_term.start_year);
    let state_code = detail_terms
        .first()
        .and_then(|t| t.state_code.clone())
        .unwrap_or_else(|| {
            summary
                .state
                .chars()
                .take(2)
                .collect::<String>()
                .to_uppercase()
        });

    let address = detail.and_then(|d| d.address_information.as_ref());

    Some(Official {
        bioguide_id: BioguideId::new(summary.bioguide_id.clone()),
        first_name,
        last_name,
        middle_name: detail.and_then(|d| d.middle_name.clone()),
        full_name,
        honorific: detail.and_then(|d| d.honorific_name.clone()),
        chamber: current_term.chamber.clone(),
        state: summary.state.clone(),
        state_code,
        district: summary.district,
        party: summary.party_name.clone(),
        office_address: address.and_then(|a| a.office_address.clone()),
        phone_number: address.and_then(|a| a.phone_number.clone()),
        official_website: detail.and_then(|d| d.official_website_url.clone()),
        image_url: summary.depiction.as_ref().and_then(|d| d.image_url.clone()),
        image_attribution: summary.depiction.as_ref().and_then(|d| d.attribution.clone()),
        birth_year: detail
            .and_then(|d| d.birth_year.as_deref())
            .and_then(|y| y.trim().parse().ok()),
        current_member: detail.and_then(|d| d.current_member).unwrap_or(true),
        first_term_start,
        current_term_start: current_term.start_year,
        congress_api_updated_at: detail.and_then(|d| d.update_date).unwrap_or(now),
    })
}

fn split_list_name(name: &str) -> (String, String) {
    let mut parts = name.splitn(2, ", ");
    let last = parts.next().unwrap_or_default().to_string();
    let first = parts
        .next()
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or_default()
        .to_string();
    (last, first)
}
