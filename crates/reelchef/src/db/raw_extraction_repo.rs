//! Raw extraction cache keyed by `(normalized_url, target_language)`.
//!
//! Entries are never updated in place. Concurrent writers for the same
//! key do not fail: the first row stays and later inserts are ignored.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::model::{RecipeDraft, TargetLanguage};

use super::{json_column, to_json, Database, DatabaseError};

#[derive(Debug, Clone, PartialEq)]
pub struct RawExtraction {
    pub normalized_url: String,
    pub target_language: TargetLanguage,
    pub draft: RecipeDraft,
    pub detected_language: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

fn from_row(row: &Row<'_>) -> Result<RawExtraction, rusqlite::Error> {
    Ok(RawExtraction {
        normalized_url: row.get("normalized_url")?,
        target_language: row.get("target_language")?,
        draft: json_column(row, "draft")?,
        detected_language: row.get("detected_language")?,
        confidence: row.get("confidence")?,
        created_at: row.get("created_at")?,
    })
}

pub fn get(
    db: &Database,
    normalized_url: &str,
    target_language: &TargetLanguage,
) -> Result<Option<RawExtraction>, DatabaseError> {
    db.with_conn(|conn| {
        let entry = conn
            .query_row(
                "SELECT * FROM raw_extractions WHERE normalized_url = ?1 AND target_language = ?2",
                params![normalized_url, target_language],
                from_row,
            )
            .optional()?;
        Ok(entry)
    })
}

/// Stores an extraction unless one already exists for the key.
/// Returns whether this call created the entry.
pub fn insert_if_absent(db: &Database, entry: &RawExtraction) -> Result<bool, DatabaseError> {
    let draft = to_json("draft", &entry.draft)?;
    db.with_conn(|conn| {
        let inserted = conn.execute(
            "INSERT INTO raw_extractions (normalized_url, target_language, draft,
             detected_language, confidence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(normalized_url, target_language) DO NOTHING",
            params![
                entry.normalized_url,
                entry.target_language,
                draft,
                entry.detected_language,
                entry.confidence,
                entry.created_at,
            ],
        )?;
        Ok(inserted == 1)
    })
}
