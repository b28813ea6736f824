//! Recipe repository.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::model::Recipe;

use super::{json_column, to_json, Database, DatabaseError};

fn from_row(row: &Row<'_>) -> Result<Recipe, rusqlite::Error> {
    Ok(Recipe {
        id: row.get("id")?,
        public_id: row.get("public_id")?,
        user_id: row.get("user_id")?,
        normalized_url: row.get("normalized_url")?,
        content: json_column(row, "content")?,
        source: json_column(row, "source")?,
        extraction: json_column(row, "extraction")?,
        created_at: row.get("created_at")?,
    })
}

/// Inserts a recipe on an existing connection or transaction.
///
/// Returns `false` when the user already has a recipe for the same video.
pub(crate) fn insert_with(conn: &Connection, recipe: &Recipe) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT INTO recipes (id, public_id, user_id, job_id, normalized_url, title,
         content, source, extraction, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT DO NOTHING",
        params![
            recipe.id,
            recipe.public_id,
            recipe.user_id,
            recipe.extraction.job_id,
            recipe.normalized_url,
            recipe.title(),
            to_json("content", &recipe.content)?,
            to_json("source", &recipe.source)?,
            to_json("extraction", &recipe.extraction)?,
            recipe.created_at,
        ],
    )?;
    Ok(inserted == 1)
}

pub fn insert(db: &Database, recipe: &Recipe) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| insert_with(conn, recipe))
}

pub fn find_by_public_id(db: &Database, public_id: &str) -> Result<Option<Recipe>, DatabaseError> {
    db.with_conn(|conn| {
        let recipe = conn
            .query_row(
                "SELECT * FROM recipes WHERE public_id = ?1",
                params![public_id],
                from_row,
            )
            .optional()?;
        Ok(recipe)
    })
}

/// Finds the recipe a user already extracted from a normalized URL.
pub fn find_by_user_and_url(
    db: &Database,
    user_id: &str,
    normalized_url: &str,
) -> Result<Option<Recipe>, DatabaseError> {
    db.with_conn(|conn| find_by_user_and_url_with(conn, user_id, normalized_url))
}

pub(crate) fn find_by_user_and_url_with(
    conn: &Connection,
    user_id: &str,
    normalized_url: &str,
) -> Result<Option<Recipe>, DatabaseError> {
    let recipe = conn
        .query_row(
            "SELECT * FROM recipes WHERE user_id = ?1 AND normalized_url = ?2",
            params![user_id, normalized_url],
            from_row,
        )
        .optional()?;
    Ok(recipe)
}

pub fn count_for_user(db: &Database, user_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE user_id = ?1",
            params![user_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
