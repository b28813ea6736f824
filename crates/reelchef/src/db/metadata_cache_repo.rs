//! Video metadata cache: one row per normalized URL, written with UPSERT.
//!
//! The transcript is cached alongside the metadata so a cache hit skips
//! the platform call entirely. Entries never expire here; refreshing is
//! done by writing the entry again.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::model::{Platform, VideoMetadata};

use super::{json_column, to_json, Database, DatabaseError};

#[derive(Debug, Clone, PartialEq)]
pub struct CachedVideo {
    pub normalized_url: String,
    pub platform: Platform,
    pub metadata: VideoMetadata,
    pub transcript: String,
    pub transcript_language: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn from_row(row: &Row<'_>) -> Result<CachedVideo, rusqlite::Error> {
    Ok(CachedVideo {
        normalized_url: row.get("normalized_url")?,
        platform: row.get("platform")?,
        metadata: json_column(row, "metadata")?,
        transcript: row.get("transcript")?,
        transcript_language: row.get("transcript_language")?,
        fetched_at: row.get("fetched_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub fn get(db: &Database, normalized_url: &str) -> Result<Option<CachedVideo>, DatabaseError> {
    db.with_conn(|conn| {
        let entry = conn
            .query_row(
                "SELECT * FROM video_metadata_cache WHERE normalized_url = ?1",
                params![normalized_url],
                from_row,
            )
            .optional()?;
        Ok(entry)
    })
}

/// Inserts or overwrites the entry for `entry.normalized_url`.
///
/// `fetched_at` keeps the first fetch time; `updated_at` tracks the latest write.
pub fn upsert(db: &Database, entry: &CachedVideo) -> Result<(), DatabaseError> {
    let metadata = to_json("metadata", &entry.metadata)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO video_metadata_cache (normalized_url, platform, metadata, transcript,
             transcript_language, fetched_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(normalized_url) DO UPDATE SET
               platform = excluded.platform,
               metadata = excluded.metadata,
               transcript = excluded.transcript,
               transcript_language = excluded.transcript_language,
               updated_at = excluded.updated_at",
            params![
                entry.normalized_url,
                entry.platform,
                metadata,
                entry.transcript,
                entry.transcript_language,
                entry.fetched_at,
                entry.updated_at,
            ],
        )?;
        Ok(())
    })
}
