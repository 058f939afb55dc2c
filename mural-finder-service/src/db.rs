//! Database module for the OCR word store.
//!
//! The word database is produced by an external OCR step. This module owns
//! the schema, opens short-lived read-only sessions for searches, and exposes
//! the `WordStore` read interface the matcher runs against.

mod migrations;
pub mod models;
mod words;

pub use models::Word;
pub use words::WordSession;

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

use crate::error::{ServiceResult, StoreError};

/// Read interface over the recognized words of every image.
pub trait WordStore {
    /// Distinct image names having at least one word containing `fragment`,
    /// ignoring case, in order of first appearance.
    fn images_containing(&self, fragment: &str) -> ServiceResult<Vec<String>>;

    /// Every word recorded for `image_id`, in OCR reading order.
    fn words_for_image(&self, image_id: &str) -> ServiceResult<Vec<Word>>;
}

/// Handle to the SQLite word database.
///
/// Holds only the path; each search opens its own connection through
/// [`Database::session`] and closes it when the session is dropped.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Open or create the database at the given path and bring the schema up to date
    pub fn open(path: &Path) -> ServiceResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(StoreError::Connection)?;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a read-only session for one search
    pub fn session(&self) -> ServiceResult<WordSession> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(StoreError::Connection)?;

        WordSession::new(conn)
    }

    /// Append words for an image, preserving the given order as reading order.
    #[cfg(test)]
    pub fn insert_words(&self, image_id: &str, words: &[Word]) -> ServiceResult<()> {
        let mut conn = Connection::open(&self.path).map_err(StoreError::Connection)?;
        words::insert_words(&mut conn, image_id, words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("word_data.db");
        let db = Database::open(&path).unwrap();
        assert!(db.path().exists());
    }

    #[test]
    fn test_open_under_a_file_is_directory_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = Database::open(&blocker.join("word_data.db")).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::StoreUnavailable(StoreError::Directory { .. })
        ));
    }
}
