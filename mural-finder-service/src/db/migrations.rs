//! Database schema migrations.

use rusqlite::Connection;

use crate::error::{ServiceResult, StoreError};

/// Run all database migrations.
///
/// Databases written by the OCR step already carry the `words` table; the
/// statements are idempotent so those are left untouched.
pub(super) fn run_migrations(conn: &Connection) -> ServiceResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS words (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            image_name TEXT NOT NULL,
            word TEXT NOT NULL,
            "left" INTEGER NOT NULL,
            top INTEGER NOT NULL,
            width INTEGER NOT NULL,
            height INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_words_image ON words(image_name);
    "#,
    )
    .map_err(|e| StoreError::Migration {
        message: e.to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
