use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::BillId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown bill type: {0}")]
pub struct ParseBillTypeError(pub String);

/// The eight congressional bill and resolution types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillType {
    Hr,
    S,
    Hjres,
    Sjres,
    Hconres,
    Sconres,
    Hres,
    Sres,
}

impl BillType {
    /// Parses the API's type tag, tolerating case (the API reports `HR`,
    /// `S`, …; storage keeps the lower-cased form).
    pub fn parse(s: &str) -> Result<Self, ParseBillTypeError> {
        match s.to_ascii_lowercase().as_str() {
            "hr" => Ok(Self::Hr),
            "s" => Ok(Self::S),
            "hjres" => Ok(Self::Hjres),
            "sjres" => Ok(Self::Sjres),
            "hconres" => Ok(Self::Hconres),
            "sconres" => Ok(Self::Sconres),
            "hres" => Ok(Self::Hres),
            "sres" => Ok(Self::Sres),
            _ => Err(ParseBillTypeError(s.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hr => "hr",
            Self::S => "s",
            Self::Hjres => "hjres",
            Self::Sjres => "sjres",
            Self::Hconres => "hconres",
            Self::Sconres => "sconres",
            Self::Hres => "hres",
            Self::Sres => "sres",
        }
    }

    /// Synthesizes the canonical congress.gov URL for a bill.
    ///
    /// Plain Senate bills link as `senate-bill`; every other type links as
    /// `house-bill`, matching the upstream site's redirect behavior.
    #[must_use]
    pub fn congress_gov_url(&self, congress: u32, bill_number: u32) -> String {
        let slug = if *self == Self::S {
            "senate-bill"
        } else {
            "house-bill"
        };
        format!("https://www.congress.gov/bill/{congress}th-congress/{slug}/{bill_number}")
    }
}

/// A bill as stored locally. Uniquely identified by
/// (congress, bill_type, bill_number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub congress: u32,
    pub bill_type: BillType,
    pub bill_number: u32,
    pub title: String,
    pub summary: Option<String>,
    pub latest_action_date: Option<NaiveDate>,
    pub latest_action_text: Option<String>,
    pub introduced_date: Option<NaiveDate>,
    pub congress_api_url: Option<String>,
    pub congress_gov_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bill merged with the sponsorship fields linking it to one official.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillWithSponsorship {
    pub bill: Bill,
    pub sponsored_date: Option<NaiveDate>,
    pub is_primary_sponsor: bool,
}
