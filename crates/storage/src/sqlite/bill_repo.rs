use chrono::{DateTime, Utc};

use civics_core::model::{Bill, BillWithSponsorship, BioguideId};

use super::{
    SqliteRepository,
    mapping::{map_bill_row, map_sponsored_bill_row},
};
use crate::repository::{BillRepository, NewBill, NewSponsorship, StorageError};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl BillRepository for SqliteRepository {
    async fn sponsored_bills(
        &self,
        bioguide_id: &BioguideId,
        primary_only: bool,
    ) -> Result<Vec<BillWithSponsorship>, StorageError> {
        let mut sql = String::from(
            r"
            SELECT
                b.id, b.congress, b.bill_type, b.bill_number, b.title, b.summary,
                b.latest_action_date, b.latest_action_text, b.introduced_date,
                b.congress_api_url, b.congress_gov_url, b.created_at, b.updated_at,
                s.sponsored_date, s.is_primary_sponsor
            FROM bill_sponsorships s
            JOIN bills b ON b.id = s.bill_id
            WHERE s.bioguide_id = ?1
            ",
        );
        if primary_only {
            sql.push_str(" AND s.is_primary_sponsor = 1");
        }
        sql.push_str(" ORDER BY b.introduced_date DESC");

        let rows = sqlx::query(&sql)
            .bind(bioguide_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_sponsored_bill_row).collect()
    }

    async fn upsert_bill(&self, bill: &NewBill, now: DateTime<Utc>) -> Result<Bill, StorageError> {
        // created_at survives the conflict path; only the mutable fields and
        // updated_at take the incoming values.
        let row = sqlx::query(
            r"
            INSERT INTO bills (
                congress, bill_type, bill_number, title, summary,
                latest_action_date, latest_action_text, introduced_date,
                congress_api_url, congress_gov_url, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            ON CONFLICT(congress, bill_type, bill_number) DO UPDATE SET
                title = excluded.title,
                summary = excluded.summary,
                latest_action_date = excluded.latest_action_date,
                latest_action_text = excluded.latest_action_text,
                introduced_date = excluded.introduced_date,
                congress_api_url = excluded.congress_api_url,
                congress_gov_url = excluded.congress_gov_url,
                updated_at = excluded.updated_at
            RETURNING id, congress, bill_type, bill_number, title, summary,
                      latest_action_date, latest_action_text, introduced_date,
                      congress_api_url, congress_gov_url, created_at, updated_at
            ",
        )
        .bind(i64::from(bill.congress))
        .bind(bill.bill_type.as_str())
        .bind(i64::from(bill.bill_number))
        .bind(&bill.title)
        .bind(&bill.summary)
        .bind(bill.latest_action_date)
        .bind(&bill.latest_action_text)
        .bind(bill.introduced_date)
        .bind(&bill.congress_api_url)
        .bind(&bill.congress_gov_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;
        map_bill_row(&row)
    }

    async fn upsert_sponsorship(&self, sponsorship: &NewSponsorship) -> Result<(), StorageError> {
        // First write wins; refreshes never rewrite sponsored_date.
        sqlx::query(
            r"
            INSERT INTO bill_sponsorships (bill_id, bioguide_id, is_primary_sponsor, sponsored_date)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(bill_id, bioguide_id) DO NOTHING
            ",
        )
        .bind(sponsorship.bill_id.value())
        .bind(sponsorship.bioguide_id.as_str())
        .bind(sponsorship.is_primary_sponsor)
        .bind(sponsorship.sponsored_date)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}
