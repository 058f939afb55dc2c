//! Database model structs.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// One OCR-recognized word and its pixel bounding box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// Text as recognized, original casing preserved
    pub text: String,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Word {
    pub fn new(text: impl Into<String>, left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            text: text.into(),
            left,
            top,
            width,
            height,
        }
    }

    /// Build a word from raw stored integers, rejecting values that cannot be
    /// pixel coordinates.
    pub fn from_raw(
        text: String,
        left: i64,
        top: i64,
        width: i64,
        height: i64,
    ) -> ServiceResult<Self> {
        let field = |name: &str, value: i64| {
            u32::try_from(value).map_err(|_| {
                ServiceError::invalid_input(format!(
                    "word {:?} has out-of-range {}: {}",
                    text, name, value
                ))
            })
        };

        Ok(Self {
            left: field("left", left)?,
            top: field("top", top)?,
            width: field("width", width)?,
            height: field("height", height)?,
            text,
        })
    }

    /// Read a `word, left, top, width, height` row.
    ///
    /// Returns the raw row so validation errors can be reported separately
    /// from query errors.
    pub(crate) fn raw_from_row(
        row: &Row<'_>,
    ) -> Result<(String, i64, i64, i64, i64), rusqlite::Error> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_accepts_pixel_values() {
        let word = Word::from_raw("Hello".to_string(), 10, 10, 50, 20).unwrap();
        assert_eq!(word, Word::new("Hello", 10, 10, 50, 20));
    }

    #[test]
    fn test_from_raw_rejects_negative() {
        let err = Word::from_raw("Hello".to_string(), -1, 10, 50, 20).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput { .. }));
        assert!(err.to_string().contains("left"));
    }

    #[test]
    fn test_from_raw_rejects_overflow() {
        let err = Word::from_raw("Hello".to_string(), 0, 0, i64::from(u32::MAX) + 1, 20)
            .unwrap_err();
        assert!(err.to_string().contains("width"));
    }
}
