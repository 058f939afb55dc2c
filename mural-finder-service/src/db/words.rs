//! Word queries.

use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, params};
use tracing::debug;

use super::WordStore;
use super::models::Word;
use crate::error::{ServiceResult, StoreError};

/// One read-only connection, scoped to a single search.
///
/// The connection closes when the session is dropped.
pub struct WordSession {
    conn: Connection,
}

impl WordSession {
    pub(super) fn new(conn: Connection) -> ServiceResult<Self> {
        register_fold_case(&conn)?;
        Ok(Self { conn })
    }
}

/// Register `fold_case(text)`, the same Unicode lower-casing the matcher applies.
///
/// SQLite's own `LIKE` folds ASCII letters only.
fn register_fold_case(conn: &Connection) -> ServiceResult<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<String>(0)?.to_lowercase()),
    )
    .map_err(StoreError::Connection)?;
    Ok(())
}

/// Escape `LIKE` wildcards so the fragment is matched literally.
fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl WordStore for WordSession {
    fn images_containing(&self, fragment: &str) -> ServiceResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                r#"
                SELECT image_name
                FROM words
                WHERE fold_case(word) LIKE ?1 ESCAPE '\'
                GROUP BY image_name
                ORDER BY MIN(rowid)
                "#,
            )
            .map_err(StoreError::Query)?;

        let images = stmt
            .query_map(params![like_pattern(&fragment.to_lowercase())], |row| row.get(0))
            .map_err(StoreError::Query)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(StoreError::Query)?;

        debug!(fragment, candidates = images.len(), "Prefiltered images");
        Ok(images)
    }

    fn words_for_image(&self, image_id: &str) -> ServiceResult<Vec<Word>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                r#"
                SELECT word, "left", top, width, height
                FROM words
                WHERE image_name = ?1
                ORDER BY rowid
                "#,
            )
            .map_err(StoreError::Query)?;

        let rows = stmt
            .query_map(params![image_id], Word::raw_from_row)
            .map_err(StoreError::Query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Query)?;

        rows.into_iter()
            .map(|(text, left, top, width, height)| Word::from_raw(text, left, top, width, height))
            .collect()
    }
}

#[cfg(test)]
pub(super) fn insert_words(
    conn: &mut Connection,
    image_id: &str,
    words: &[Word],
) -> ServiceResult<()> {
    let tx = conn.transaction().map_err(StoreError::Query)?;
    {
        let mut stmt = tx
            .prepare(
                r#"
                INSERT INTO words (image_name, word, "left", top, width, height)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .map_err(StoreError::Query)?;

        for word in words {
            stmt.execute(params![
                image_id,
                word.text,
                word.left,
                word.top,
                word.width,
                word.height,
            ])
            .map_err(StoreError::Query)?;
        }
    }
    tx.commit().map_err(StoreError::Query)?;

    Ok(())
}
