//! Issue repository: persistence and publication queries for the
//! `issues` table.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Database, DatabaseError};

/// One newspaper issue as stored and served.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub title: String,
    pub original_filename: String,
    pub page_image_urls: Vec<String>,
    pub total_pages: u32,
    pub publication_date: DateTime<Utc>,
    pub is_published: bool,
    pub external_video_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an issue. The stored `is_published` flag is always
/// recomputed at write time; callers cannot supply it.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub original_filename: String,
    pub page_image_urls: Vec<String>,
    pub publication_date: DateTime<Utc>,
    pub external_video_link: Option<String>,
}

impl Issue {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let urls_json: String = row.get("page_image_urls")?;
        let page_image_urls = serde_json::from_str(&urls_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            original_filename: row.get("original_filename")?,
            page_image_urls,
            total_pages: row.get("total_pages")?,
            publication_date: parse_datetime(&row.get::<_, String>("publication_date")?, 5)?,
            is_published: row.get("is_published")?,
            external_video_link: row.get("external_video_link")?,
            created_at: parse_datetime(&row.get::<_, String>("created_at")?, 9)?,
            updated_at: parse_datetime(&row.get::<_, String>("updated_at")?, 10)?,
        })
    }
}

/// The single publication rule: an issue counts as published once its
/// publication date is no longer in the future. Every write path and
/// the sweep derive the stored flag from this, never from caller input.
pub fn is_published_at(publication_date: &DateTime<Utc>, now: &DateTime<Utc>) -> bool {
    publication_date <= now
}

/// Calendar day of `date` in the portal's display timezone, `YYYY-MM-DD`.
pub fn day_of(date: &DateTime<Utc>, offset: &FixedOffset) -> String {
    date.with_timezone(offset).format("%Y-%m-%d").to_string()
}

fn parse_datetime(raw: &str, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Fixed-width RFC 3339 in UTC, so stored strings order chronologically.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Inserts a new issue, computing `is_published` and the calendar day at
/// write time. At most one issue may exist per calendar day; a second
/// insert for the same day fails with [`DatabaseError::DuplicateDay`].
pub fn insert(
    db: &Database,
    new_issue: NewIssue,
    display_offset: &FixedOffset,
) -> Result<Issue, DatabaseError> {
    let now = Utc::now();
    let issue = Issue {
        id: Uuid::new_v4().to_string(),
        title: new_issue.title,
        original_filename: new_issue.original_filename,
        total_pages: new_issue.page_image_urls.len() as u32,
        page_image_urls: new_issue.page_image_urls,
        publication_date: new_issue.publication_date,
        is_published: is_published_at(&new_issue.publication_date, &now),
        external_video_link: new_issue.external_video_link,
        created_at: now,
        updated_at: now,
    };

    let day = day_of(&issue.publication_date, display_offset);
    let urls_json = serde_json::to_string(&issue.page_image_urls)
        .map_err(|e| DatabaseError::Sqlite(rusqlite::Error::ToSqlConversionFailure(Box::new(e))))?;

    db.with_conn(|conn| {
        let result = conn.execute(
            "INSERT INTO issues (id, title, original_filename, page_image_urls, total_pages,
             publication_date, publication_day, is_published, external_video_link,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                issue.id,
                issue.title,
                issue.original_filename,
                urls_json,
                issue.total_pages,
                format_datetime(&issue.publication_date),
                day,
                issue.is_published,
                issue.external_video_link,
                format_datetime(&issue.created_at),
                format_datetime(&issue.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, ref message))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
                    && message
                        .as_deref()
                        .is_some_and(|m| m.contains("publication_day")) =>
            {
                Err(DatabaseError::DuplicateDay { day: day.clone() })
            }
            Err(e) => Err(e.into()),
        }
    })?;

    Ok(issue)
}

/// Finds an issue by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Issue>, DatabaseError> {
    db.with_conn(|conn| {
        first_row(
            conn,
            "SELECT * FROM issues WHERE id = ?1",
            params![id],
        )
    })
}

/// The most recent published issue, if any.
pub fn find_latest_published(db: &Database) -> Result<Option<Issue>, DatabaseError> {
    db.with_conn(|conn| {
        first_row(
            conn,
            "SELECT * FROM issues WHERE is_published = 1
             ORDER BY publication_date DESC LIMIT 1",
            [],
        )
    })
}

/// The published issue for one calendar day (`YYYY-MM-DD`).
pub fn find_by_day(db: &Database, day: &str) -> Result<Option<Issue>, DatabaseError> {
    db.with_conn(|conn| {
        first_row(
            conn,
            "SELECT * FROM issues WHERE is_published = 1 AND publication_day = ?1",
            params![day],
        )
    })
}

/// Calendar days that have a published issue, ascending, as
/// `(day, issue_id)` pairs. Optionally scoped to a month and/or year.
pub fn list_days(
    db: &Database,
    month: Option<u32>,
    year: Option<i32>,
) -> Result<Vec<(String, String)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = vec!["is_published = 1".to_string()];
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(year) = year {
            conditions.push(format!(
                "substr(publication_day, 1, 4) = ?{}",
                param_values.len() + 1
            ));
            param_values.push(Box::new(format!("{year:04}")));
        }
        if let Some(month) = month {
            conditions.push(format!(
                "substr(publication_day, 6, 2) = ?{}",
                param_values.len() + 1
            ));
            param_values.push(Box::new(format!("{month:02}")));
        }

        let sql = format!(
            "SELECT publication_day, id FROM issues WHERE {}
             ORDER BY publication_day ASC",
            conditions.join(" AND ")
        );
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// One-issue-per-page pagination ordered by publication date descending,
/// returning `(issue, total_count)`. `include_future` widens the result
/// from published issues to all issues.
pub fn find_page(
    db: &Database,
    page: u64,
    include_future: bool,
) -> Result<(Option<Issue>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let where_clause = if include_future {
            ""
        } else {
            "WHERE is_published = 1"
        };

        let total: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM issues {where_clause}"),
            [],
            |r| r.get(0),
        )?;

        let offset = page.saturating_sub(1) as i64;
        let issue = first_row(
            conn,
            &format!(
                "SELECT * FROM issues {where_clause}
                 ORDER BY publication_date DESC LIMIT 1 OFFSET ?1"
            ),
            params![offset],
        )?;

        Ok((issue, total))
    })
}

/// Deletes an issue record, reporting whether a row existed.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM issues WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    })
}

/// Publishes every issue whose date has passed, returning how many rows
/// changed. Same rule as [`is_published_at`], expressed in SQL; the flag
/// only ever moves from 0 to 1, so repeated sweeps are no-ops.
pub fn publish_due(db: &Database, now: DateTime<Utc>) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let stamp = format_datetime(&now);
        let changed = conn.execute(
            "UPDATE issues SET is_published = 1, updated_at = ?1
             WHERE is_published = 0 AND publication_date <= ?1",
            params![stamp],
        )?;
        Ok(changed as u64)
    })
}

fn first_row<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<Issue>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, Issue::from_row)?;
    match rows.next() {
        Some(Ok(row)) => Ok(Some(row)),
        Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
        None => Ok(None),
    }
}
