use sqlx::Row;

use civics_core::model::{BioguideId, Official, OfficialFilter, OfficialPage, YearFilter};

use super::{SqliteRepository, mapping::map_official_row, mapping::ser};
use crate::repository::{OfficialRepository, StorageError};

const OFFICIAL_COLUMNS: &str = "bioguide_id, first_name, last_name, middle_name, full_name, \
     honorific, chamber, state, state_code, district, party, office_address, phone_number, \
     official_website, image_url, image_attribution, birth_year, current_member, \
     first_term_start, current_term_start, congress_api_updated_at";

enum Arg {
    Text(String),
    Int(i64),
}

/// Builds the WHERE clause for a directory filter with numbered binds.
///
/// Mirrors `OfficialFilter::matches`: name is a case-insensitive substring
/// match, state matches the full name or the two-letter code, and a year
/// filter on `birth_year` rejects rows where it is NULL.
fn build_where(filter: &OfficialFilter) -> (String, Vec<Arg>) {
    let mut clauses = Vec::new();
    let mut args = Vec::new();

    let mut next = |args: &mut Vec<Arg>, arg: Arg| {
        args.push(arg);
        format!("?{}", args.len())
    };

    if let Some(name) = &filter.name {
        let bind = next(&mut args, Arg::Text(format!("%{}%", name.to_lowercase())));
        clauses.push(format!("LOWER(full_name) LIKE {bind}"));
    }
    if let Some(party) = &filter.party {
        let bind = next(&mut args, Arg::Text(party.clone()));
        clauses.push(format!("party = {bind}"));
    }
    if let Some(chamber) = &filter.chamber {
        let bind = next(&mut args, Arg::Text(chamber.clone()));
        clauses.push(format!("chamber = {bind}"));
    }
    if let Some(state) = &filter.state {
        let full = next(&mut args, Arg::Text(state.clone()));
        let code = next(&mut args, Arg::Text(state.clone()));
        clauses.push(format!(
            "(state = {full} COLLATE NOCASE OR state_code = {code} COLLATE NOCASE)"
        ));
    }
    if let Some(district) = filter.district {
        let bind = next(&mut args, Arg::Int(i64::from(district)));
        clauses.push(format!("district = {bind}"));
    }
    for (column, year_filter) in [
        ("birth_year", filter.birth_year),
        ("first_term_start", filter.first_term),
        ("current_term_start", filter.current_term),
    ] {
        if let Some(year_filter) = year_filter {
            let (op, year) = match year_filter {
                YearFilter::Exact(y) => ("=", y),
                YearFilter::Before(y) => ("<", y),
                YearFilter::After(y) => (">", y),
            };
            let bind = next(&mut args, Arg::Int(i64::from(year)));
            clauses.push(format!("{column} {op} {bind}"));
        }
    }

    if clauses.is_empty() {
        (String::new(), args)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), args)
    }
}

fn bind_args<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    args: &'q [Arg],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            Arg::Text(s) => query.bind(s.as_str()),
            Arg::Int(i) => query.bind(*i),
        };
    }
    query
}

#[async_trait::async_trait]
impl OfficialRepository for SqliteRepository {
    async fn upsert_officials(&self, officials: &[Official]) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for official in officials {
            sqlx::query(
                r"
                INSERT INTO federal_officials (
                    bioguide_id, first_name, last_name, middle_name, full_name, honorific,
                    chamber, state, state_code, district, party, office_address, phone_number,
                    official_website, image_url, image_attribution, birth_year, current_member,
                    first_term_start, current_term_start, congress_api_updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                        ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
                ON CONFLICT(bioguide_id) DO UPDATE SET
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    middle_name = excluded.middle_name,
                    full_name = excluded.full_name,
                    honorific = excluded.honorific,
                    chamber = excluded.chamber,
                    state = excluded.state,
                    state_code = excluded.state_code,
                    district = excluded.district,
                    party = excluded.party,
                    office_address = excluded.office_address,
                    phone_number = excluded.phone_number,
                    official_website = excluded.official_website,
                    image_url = excluded.image_url,
                    image_attribution = excluded.image_attribution,
                    birth_year = excluded.birth_year,
                    current_member = excluded.current_member,
                    first_term_start = excluded.first_term_start,
                    current_term_start = excluded.current_term_start,
                    congress_api_updated_at = excluded.congress_api_updated_at
                ",
            )
            .bind(official.bioguide_id.as_str())
            .bind(&official.first_name)
            .bind(&official.last_name)
            .bind(&official.middle_name)
            .bind(&official.full_name)
            .bind(&official.honorific)
            .bind(&official.chamber)
            .bind(&official.state)
            .bind(&official.state_code)
            .bind(official.district.map(i64::from))
            .bind(&official.party)
            .bind(&official.office_address)
            .bind(&official.phone_number)
            .bind(&official.official_website)
            .bind(&official.image_url)
            .bind(&official.image_attribution)
            .bind(official.birth_year)
            .bind(official.current_member)
            .bind(official.first_term_start)
            .bind(official.current_term_start)
            .bind(official.congress_api_updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    async fn get_official(
        &self,
        bioguide_id: &BioguideId,
    ) -> Result<Option<Official>, StorageError> {
        let sql = format!("SELECT {OFFICIAL_COLUMNS} FROM federal_officials WHERE bioguide_id = ?1");
        let row = sqlx::query(&sql)
            .bind(bioguide_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        row.as_ref().map(map_official_row).transpose()
    }

    async fn search_officials(
        &self,
        filter: &OfficialFilter,
        page: u32,
        page_size: u32,
    ) -> Result<OfficialPage, StorageError> {
        let (where_clause, args) = build_where(filter);

        let count_sql = format!("SELECT COUNT(*) AS total FROM federal_officials {where_clause}");
        let count_row = bind_args(sqlx::query(&count_sql), &args)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let total: i64 = count_row.try_get("total").map_err(ser)?;
        let total = u32::try_from(total).map_err(|_| ser("result count overflow"))?;

        let offset = i64::from(page.saturating_sub(1)) * i64::from(page_size);
        let page_sql = format!(
            "SELECT {OFFICIAL_COLUMNS} FROM federal_officials {where_clause}
             ORDER BY last_name, first_name
             LIMIT ?{} OFFSET ?{}",
            args.len() + 1,
            args.len() + 2,
        );
        let rows = bind_args(sqlx::query(&page_sql), &args)
            .bind(i64::from(page_size))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let officials = rows
            .iter()
            .map(map_official_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OfficialPage::new(officials, total, page, page_size))
    }
}
