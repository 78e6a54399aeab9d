use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use civics_core::model::Official;
use services::congress::{
    CongressApi, CongressClient, CongressConfig, MEMBER_PAGE_LIMIT, official_from_member,
};
use storage::repository::{OfficialRepository, Storage};

const HOUSE: &str = "House of Representatives";
const SENATE: &str = "Senate";

#[derive(Debug, Clone)]
struct SeedConfig {
    db_url: String,
    congress: u32,
    delay: Duration,
}

impl SeedConfig {
    fn from_env() -> Self {
        let db_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:civics.sqlite3".into());
        let congress = std::env::var("CONGRESS_NUMBER")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(119);
        let delay = std::env::var("SEED_DELAY_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or(Duration::from_millis(500), Duration::from_millis);

        Self {
            db_url,
            congress,
            delay,
        }
    }
}

async fn fetch_all_members(
    api: &CongressClient,
    congress: u32,
    delay: Duration,
) -> Result<Vec<services::congress::MemberSummary>, Box<dyn std::error::Error>> {
    let mut members = Vec::new();
    let mut offset = 0;

    loop {
        let page = api
            .current_members(congress, offset, MEMBER_PAGE_LIMIT)
            .await?;
        members.extend(page.members);
        info!(fetched = members.len(), total = page.pagination.count, "fetched member page");

        if page.pagination.next.is_none() {
            break;
        }
        offset += MEMBER_PAGE_LIMIT;
        tokio::time::sleep(delay).await;
    }

    Ok(members)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = SeedConfig::from_env();

    let api_config = CongressConfig::from_env().ok_or("CONGRESS_API_KEY is not set")?;
    let api = CongressClient::new(api_config)?;
    let storage = Storage::sqlite(&config.db_url).await?;

    let members = fetch_all_members(&api, config.congress, config.delay).await?;
    let chamber_members: Vec<_> = members
        .into_iter()
        .filter(|m| {
            m.terms
                .item
                .first()
                .is_some_and(|t| t.chamber == HOUSE || t.chamber == SENATE)
        })
        .collect();
    info!(members = chamber_members.len(), "filtered to House and Senate members");

    let mut officials: Vec<Official> = Vec::with_capacity(chamber_members.len());
    for (i, member) in chamber_members.iter().enumerate() {
        info!(
            member = i + 1,
            total = chamber_members.len(),
            name = %member.name,
            "fetching member detail"
        );
        let detail = api.member_detail(&member.bioguide_id).await?;
        if detail.is_none() {
            warn!(bioguide = %member.bioguide_id, "seeding from list record only");
        }
        match official_from_member(member, detail.as_ref(), chrono::Utc::now()) {
            Some(official) => officials.push(official),
            None => warn!(bioguide = %member.bioguide_id, "member has no terms, skipping"),
        }
        tokio::time::sleep(config.delay).await;
    }

    storage.officials.upsert_officials(&officials).await?;

    let senators = officials.iter().filter(|o| o.chamber == SENATE).count();
    let representatives = officials.iter().filter(|o| o.chamber == HOUSE).count();
    println!(
        "Seeded {} officials ({senators} senators, {representatives} representatives) into {}",
        officials.len(),
        config.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
